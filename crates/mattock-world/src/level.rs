//! Serde-backed level descriptions.
//!
//! A [`LevelData`] is the immutable recipe a level is built from -- and
//! rebuilt from on reset. `build()` validates it once and produces the
//! mutable [`GridWorld`] + [`EntityRegistry`] pair; the caller keeps the
//! `LevelData` around to build again later.

use serde::{Deserialize, Serialize};

use crate::block::BlockKind;
use crate::entity::{BehaviorKind, Entity, EntityId, TypeTag};
use crate::facing::{Facing, GridPos};
use crate::grid::{Goal, GridWorld, Plane};
use crate::registry::EntityRegistry;
use crate::WorldError;

// ---------------------------------------------------------------------------
// LevelData
// ---------------------------------------------------------------------------

/// A complete level description.
///
/// ```
/// use mattock_world::level::LevelData;
///
/// let data: LevelData = serde_json::from_str(r#"{
///     "width": 2,
///     "height": 1,
///     "groundPlane": ["grass", "grass"],
///     "actionPlane": ["empty", "logOak"],
///     "playerStart": { "x": 0, "y": 0 },
///     "playerFacing": "right",
///     "entities": [],
///     "daytime": true,
///     "goal": { "kind": "freeplay" }
/// }"#).unwrap();
/// let (world, registry) = data.build().unwrap();
/// assert_eq!(registry.len(), 1); // the player
/// assert!(world.is_daytime());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelData {
    pub width: u32,
    pub height: u32,
    /// Row-major terrain kinds, `width * height` entries.
    pub ground_plane: Vec<BlockKind>,
    /// Row-major block kinds, `width * height` entries.
    pub action_plane: Vec<BlockKind>,
    pub player_start: GridPos,
    pub player_facing: Facing,
    #[serde(default)]
    pub entities: Vec<EntityDef>,
    #[serde(default = "default_daytime")]
    pub daytime: bool,
    pub goal: Goal,
}

fn default_daytime() -> bool {
    true
}

/// One entity in the level recipe.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDef {
    pub id: EntityId,
    pub tag: TypeTag,
    pub behavior: BehaviorKind,
    pub position: GridPos,
    pub facing: Facing,
}

impl LevelData {
    /// Validate the recipe and build the world and registry.
    pub fn build(&self) -> Result<(GridWorld, EntityRegistry), WorldError> {
        let ground = Plane::new(self.width, self.height, self.ground_plane.clone())?;
        let action = Plane::new(self.width, self.height, self.action_plane.clone())?;

        let world = GridWorld::new(
            self.width,
            self.height,
            ground,
            action,
            self.daytime,
            self.goal.clone(),
            self.player_start,
        );
        if !world.in_bounds(self.player_start) {
            return Err(WorldError::PositionOutOfBounds {
                pos: self.player_start,
            });
        }

        let mut registry = EntityRegistry::new();
        registry.insert(Entity::new(
            EntityId::player(),
            TypeTag::new("player"),
            BehaviorKind::Player,
            self.player_start,
            self.player_facing,
        ))?;

        for def in &self.entities {
            if def.id.is_player() {
                return Err(WorldError::DuplicateEntity {
                    id: def.id.clone(),
                });
            }
            if !world.in_bounds(def.position) {
                return Err(WorldError::PositionOutOfBounds { pos: def.position });
            }
            registry.insert(Entity::new(
                def.id.clone(),
                def.tag.clone(),
                def.behavior,
                def.position,
                def.facing,
            ))?;
        }

        Ok((world, registry))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(entities: Vec<EntityDef>) -> LevelData {
        LevelData {
            width: 3,
            height: 3,
            ground_plane: vec![BlockKind::Grass; 9],
            action_plane: vec![BlockKind::Empty; 9],
            player_start: GridPos::new(1, 1),
            player_facing: Facing::Up,
            entities,
            daytime: true,
            goal: Goal::Freeplay,
        }
    }

    #[test]
    fn build_places_the_player_singleton() {
        let (world, registry) = minimal(vec![]).build().unwrap();
        let player = registry.player().unwrap();
        assert_eq!(player.pos, GridPos::new(1, 1));
        assert_eq!(player.behavior, BehaviorKind::Player);
        assert_eq!(world.player_pos(), GridPos::new(1, 1));
    }

    #[test]
    fn build_rejects_out_of_bounds_entities() {
        let level = minimal(vec![EntityDef {
            id: EntityId::new("s1"),
            tag: TypeTag::new("sheep"),
            behavior: BehaviorKind::Creature,
            position: GridPos::new(9, 9),
            facing: Facing::Down,
        }]);
        assert!(matches!(
            level.build().unwrap_err(),
            WorldError::PositionOutOfBounds { .. }
        ));
    }

    #[test]
    fn build_rejects_entities_claiming_the_player_id() {
        let level = minimal(vec![EntityDef {
            id: EntityId::player(),
            tag: TypeTag::new("imposter"),
            behavior: BehaviorKind::Creature,
            position: GridPos::new(0, 0),
            facing: Facing::Down,
        }]);
        assert!(matches!(
            level.build().unwrap_err(),
            WorldError::DuplicateEntity { .. }
        ));
    }

    #[test]
    fn build_rejects_short_planes() {
        let mut level = minimal(vec![]);
        level.action_plane.pop();
        assert!(matches!(
            level.build().unwrap_err(),
            WorldError::PlaneSizeMismatch { .. }
        ));
    }

    #[test]
    fn rebuilding_from_the_same_recipe_is_stable() {
        let level = minimal(vec![EntityDef {
            id: EntityId::new("s1"),
            tag: TypeTag::new("sheep"),
            behavior: BehaviorKind::Creature,
            position: GridPos::new(0, 2),
            facing: Facing::Left,
        }]);
        let (_, first) = level.build().unwrap();
        let (_, second) = level.build().unwrap();
        assert_eq!(first.ids_in_spawn_order(), second.ids_in_spawn_order());
    }
}
