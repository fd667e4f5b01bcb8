//! Mattock Engine -- cooperative command scheduling for a grid-world
//! simulation.
//!
//! An external program enqueues abstract actions (move, turn, destroy a
//! block, spawn an entity, ...) against a master queue; every live entity
//! also drains its own independent sub-queue. The scheduler resolves each
//! command's target -- one named entity, or a type filter that fans out
//! into per-entity continuations -- and threads asynchronous completions
//! (animation and timer callbacks) back into strict one-shot
//! success/failure transitions. There is no parallelism: "concurrency" is
//! many pending continuation chains interleaved across ticks of one
//! cooperative loop.
//!
//! # Quick Start
//!
//! ```
//! use mattock_engine::prelude::*;
//!
//! let level = LevelData {
//!     width: 3,
//!     height: 1,
//!     ground_plane: vec![BlockKind::Grass; 3],
//!     action_plane: vec![BlockKind::Empty, BlockKind::Empty, BlockKind::LogOak],
//!     player_start: GridPos::new(0, 0),
//!     player_facing: Facing::Right,
//!     entities: vec![],
//!     daytime: true,
//!     goal: Goal::Freeplay,
//! };
//!
//! let mut engine = Engine::new(level, EngineConfig::default(), InstantView::new()).unwrap();
//! engine.move_forward(Target::player());
//! engine.destroy_block(Target::player());
//! engine.start_attempt(|success, _snapshot| assert!(success));
//!
//! engine.run_ticks(600);
//! assert!(engine.is_finished());
//! assert!(engine.is_succeeded());
//! ```

#![deny(unsafe_code)]

pub mod api;
pub mod command;
mod dispatch;
pub mod engine;
mod handlers;
pub mod queue;
pub mod signal;
pub mod snapshot;
pub mod timer;
pub mod view;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

use mattock_world::entity::EntityId;
use mattock_world::facing::GridPos;

/// Why a command failed at dispatch. These classify per-command failures
/// for logs and direct-injection APIs; they fail the offending command,
/// never the scheduler.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// A concrete target has no live entity behind it.
    #[error("no live entity named '{id}'")]
    TargetNotFound { id: EntityId },

    /// A move relation was told to use its own actor as the reference.
    #[error("{target} cannot move relative to itself")]
    SelfReferenceInvalid { target: crate::command::Target },

    /// The world refused the action (blocked cell, placement rules,
    /// already in the requested state, ...).
    #[error("action precondition failed: {reason}")]
    ActionPreconditionFailed { reason: String },

    /// No valid cell to spawn into.
    #[error("no valid spawn cell at {pos}")]
    NoSpawnCell { pos: GridPos },
}

// ---------------------------------------------------------------------------
// Re-exports / prelude
// ---------------------------------------------------------------------------

/// Re-export the world crate for convenience.
pub use mattock_world;

/// Convenience re-exports for common engine usage.
pub mod prelude {
    pub use mattock_world::prelude::*;

    pub use crate::command::{
        Action, Command, CommandId, CommandOrigin, CommandState, Step, Target,
    };
    pub use crate::engine::{CompletionCallback, Engine, EngineConfig, SchedulerDiagnostics};
    pub use crate::queue::CommandQueue;
    pub use crate::signal::{Completion, SignalBus};
    pub use crate::snapshot::{EntitySnap, WorldSnapshot};
    pub use crate::timer::Timers;
    pub use crate::view::{
        BlockAnim, BumpAnim, InstantView, MoveAnim, Presentation, TurnAnim, UseAnim,
    };
    pub use crate::DispatchError;
}
