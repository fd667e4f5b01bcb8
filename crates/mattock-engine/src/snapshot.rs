//! Serializable world snapshots with a BLAKE3 content hash.
//!
//! A [`WorldSnapshot`] is the terminal-state value handed to the
//! attempt-completion callback, and doubles as a determinism probe: two
//! runs that end in the same state produce the same hash.

use mattock_world::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// EntitySnap / WorldSnapshot
// ---------------------------------------------------------------------------

/// One entity's externally visible state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitySnap {
    pub id: EntityId,
    pub tag: TypeTag,
    pub position: GridPos,
    pub facing: Facing,
    pub used: bool,
}

/// The world as observed at one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    pub tick: u64,
    pub daytime: bool,
    pub solved: bool,
    pub width: u32,
    pub height: u32,
    /// Row-major action-plane block kinds.
    pub action_plane: Vec<BlockKind>,
    /// Live entities in spawn order.
    pub entities: Vec<EntitySnap>,
    /// BLAKE3 hex digest of everything above.
    pub hash: String,
}

impl WorldSnapshot {
    /// Capture the current world and registry state.
    pub fn capture(tick: u64, world: &GridWorld, registry: &EntityRegistry) -> Self {
        let (width, height) = (world.width(), world.height());
        let mut action_plane = Vec::with_capacity((width as usize) * (height as usize));
        for y in 0..height as i32 {
            for x in 0..width as i32 {
                let kind = world
                    .block_at(PlaneKind::Action, GridPos::new(x, y))
                    .unwrap_or(BlockKind::Empty);
                action_plane.push(kind);
            }
        }

        let entities = registry
            .ids_in_spawn_order()
            .into_iter()
            .filter_map(|id| registry.get(&id))
            .map(|e| EntitySnap {
                id: e.id.clone(),
                tag: e.tag.clone(),
                position: e.pos,
                facing: e.facing,
                used: e.used,
            })
            .collect();

        let mut snapshot = Self {
            tick,
            daytime: world.is_daytime(),
            solved: world.is_solved(),
            width,
            height,
            action_plane,
            entities,
            hash: String::new(),
        };
        snapshot.hash = snapshot.compute_hash();
        snapshot
    }

    /// BLAKE3 hex digest over the canonical JSON of the snapshot, hash
    /// field excluded (it is derived).
    fn compute_hash(&self) -> String {
        #[derive(Serialize)]
        struct HashableState<'a> {
            tick: u64,
            daytime: bool,
            solved: bool,
            width: u32,
            height: u32,
            action_plane: &'a [BlockKind],
            entities: &'a [EntitySnap],
        }

        let hashable = HashableState {
            tick: self.tick,
            daytime: self.daytime,
            solved: self.solved,
            width: self.width,
            height: self.height,
            action_plane: &self.action_plane,
            entities: &self.entities,
        };
        let json_bytes = serde_json::to_vec(&hashable)
            .expect("snapshot state should always be JSON-serializable");
        blake3::hash(&json_bytes).to_hex().to_string()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
