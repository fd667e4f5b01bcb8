//! Mattock World -- grid-world model: planes, blocks, entities, and events.
//!
//! This crate holds the passive half of the simulation: the two-plane block
//! grid, the entity registry with its type-tag index, per-behavior
//! capability tables, serde-backed level recipes, and the world-event sink.
//! It knows nothing about commands or scheduling -- the engine crate drives
//! all mutation through the narrow surfaces here.
//!
//! # Quick Start
//!
//! ```
//! use mattock_world::prelude::*;
//!
//! let level = LevelData {
//!     width: 2,
//!     height: 1,
//!     ground_plane: vec![BlockKind::Grass; 2],
//!     action_plane: vec![BlockKind::Empty, BlockKind::LogOak],
//!     player_start: GridPos::new(0, 0),
//!     player_facing: Facing::Right,
//!     entities: vec![],
//!     daytime: true,
//!     goal: Goal::Freeplay,
//! };
//!
//! let (mut world, registry) = level.build().unwrap();
//! let player = registry.player().unwrap();
//! assert!(world.can_destroy_at(player.forward_pos()));
//! assert_eq!(world.destroy_at(player.forward_pos()), Some(BlockKind::PlanksOak));
//! ```

#![deny(unsafe_code)]

pub mod block;
pub mod entity;
pub mod events;
pub mod facing;
pub mod grid;
pub mod level;
pub mod registry;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors produced by world-model operations.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// A plane's cell list does not match its declared dimensions.
    #[error("plane has {actual} cells, expected {expected}")]
    PlaneSizeMismatch { expected: usize, actual: usize },

    /// An entity id is already taken by a live entity.
    #[error("entity id '{id}' is already in use")]
    DuplicateEntity { id: entity::EntityId },

    /// A position lies outside the level grid.
    #[error("position {pos} is outside the level bounds")]
    PositionOutOfBounds { pos: facing::GridPos },
}

// ---------------------------------------------------------------------------
// Prelude
// ---------------------------------------------------------------------------

/// Convenience re-exports for common usage.
pub mod prelude {
    pub use crate::block::BlockKind;
    pub use crate::entity::{BehaviorKind, Capabilities, Entity, EntityId, TypeTag};
    pub use crate::events::{EventKind, EventSink, WorldEvent};
    pub use crate::facing::{Facing, GridPos, Turn};
    pub use crate::grid::{Goal, GridWorld, Plane, PlaneKind};
    pub use crate::level::{EntityDef, LevelData};
    pub use crate::registry::EntityRegistry;
    pub use crate::WorldError;
}
