//! The entity registry: id map plus type-tag index.
//!
//! Lookup by id is the primary key; the secondary index maps each type tag
//! to the live entities carrying it, in spawn order. Spawn order matters:
//! type-filtered operations visit entities in the order they entered the
//! world, which keeps nearest-candidate ties and fan-out order stable.

use std::collections::HashMap;

use tracing::debug;

use crate::entity::{BehaviorKind, Entity, EntityId, TypeTag};
use crate::facing::{Facing, GridPos};
use crate::WorldError;

// ---------------------------------------------------------------------------
// EntityRegistry
// ---------------------------------------------------------------------------

/// Owns every live entity. Everything else refers to entities by
/// [`EntityId`] and takes a failed lookup as "no longer exists".
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<EntityId, Entity>,
    by_tag: HashMap<TypeTag, Vec<EntityId>>,
    spawn_order: Vec<EntityId>,
    /// Serial for generated identifiers (`sheep1`, `sheep2`, ...).
    next_serial: u64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully-formed entity. Fails on a duplicate id.
    pub fn insert(&mut self, entity: Entity) -> Result<(), WorldError> {
        if self.entities.contains_key(&entity.id) {
            return Err(WorldError::DuplicateEntity {
                id: entity.id.clone(),
            });
        }
        self.by_tag
            .entry(entity.tag.clone())
            .or_default()
            .push(entity.id.clone());
        self.spawn_order.push(entity.id.clone());
        self.entities.insert(entity.id.clone(), entity);
        Ok(())
    }

    /// Insert a new entity with a generated `<tag><serial>` identifier.
    /// Returns the id it was given.
    pub fn insert_generated(
        &mut self,
        tag: TypeTag,
        behavior: BehaviorKind,
        pos: GridPos,
        facing: Facing,
    ) -> EntityId {
        // Serials are registry-global; skip past any level-authored id that
        // happens to use the same `<tag><n>` shape.
        let id = loop {
            self.next_serial += 1;
            let candidate = EntityId::new(format!("{}{}", tag.as_str(), self.next_serial));
            if !self.entities.contains_key(&candidate) {
                break candidate;
            }
        };
        let entity = Entity::new(id.clone(), tag, behavior, pos, facing);
        let inserted = self.insert(entity);
        debug_assert!(inserted.is_ok());
        id
    }

    /// Remove an entity, dropping it from the id map, the type index, and
    /// the spawn-order list. Returns the removed record, or `None` when the
    /// id is not live.
    pub fn remove(&mut self, id: &EntityId) -> Option<Entity> {
        let entity = self.entities.remove(id)?;
        if let Some(ids) = self.by_tag.get_mut(&entity.tag) {
            ids.retain(|e| e != id);
            if ids.is_empty() {
                self.by_tag.remove(&entity.tag);
            }
        }
        self.spawn_order.retain(|e| e != id);
        debug!(entity = %id, tag = %entity.tag, "entity removed");
        Some(entity)
    }

    /// True when `id` names a live entity.
    #[inline]
    pub fn is_alive(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn get(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.get(id)
    }

    pub fn get_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(id)
    }

    /// The singleton player, if loaded.
    pub fn player(&self) -> Option<&Entity> {
        self.entities.get(&EntityId::player())
    }

    /// Live entities of `tag`, in spawn order.
    pub fn of_tag(&self, tag: &TypeTag) -> Vec<EntityId> {
        self.by_tag.get(tag).cloned().unwrap_or_default()
    }

    /// All live entity ids in spawn order.
    pub fn ids_in_spawn_order(&self) -> Vec<EntityId> {
        self.spawn_order.clone()
    }

    /// The entity standing on `pos`, if any.
    pub fn entity_at(&self, pos: GridPos) -> Option<&Entity> {
        self.spawn_order
            .iter()
            .filter_map(|id| self.entities.get(id))
            .find(|e| e.pos == pos)
    }

    /// True when some entity occupies `pos`.
    pub fn is_occupied(&self, pos: GridPos) -> bool {
        self.entity_at(pos).is_some()
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn sheep(id: &str, x: i32, y: i32) -> Entity {
        Entity::new(
            EntityId::new(id),
            TypeTag::new("sheep"),
            BehaviorKind::Creature,
            GridPos::new(x, y),
            Facing::Down,
        )
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let mut reg = EntityRegistry::new();
        reg.insert(sheep("s1", 0, 0)).unwrap();
        let err = reg.insert(sheep("s1", 1, 1)).unwrap_err();
        assert!(matches!(err, WorldError::DuplicateEntity { .. }));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn tag_index_preserves_spawn_order() {
        let mut reg = EntityRegistry::new();
        reg.insert(sheep("a", 0, 0)).unwrap();
        reg.insert(sheep("b", 1, 0)).unwrap();
        reg.insert(sheep("c", 2, 0)).unwrap();

        let ids = reg.of_tag(&TypeTag::new("sheep"));
        assert_eq!(
            ids,
            vec![EntityId::new("a"), EntityId::new("b"), EntityId::new("c")]
        );
    }

    #[test]
    fn removal_clears_both_indexes() {
        let mut reg = EntityRegistry::new();
        reg.insert(sheep("a", 0, 0)).unwrap();
        reg.insert(sheep("b", 1, 0)).unwrap();

        assert!(reg.remove(&EntityId::new("a")).is_some());
        assert!(!reg.is_alive(&EntityId::new("a")));
        assert_eq!(reg.of_tag(&TypeTag::new("sheep")), vec![EntityId::new("b")]);
        assert_eq!(reg.ids_in_spawn_order(), vec![EntityId::new("b")]);

        // Removing twice is a no-op.
        assert!(reg.remove(&EntityId::new("a")).is_none());
    }

    #[test]
    fn removing_the_last_of_a_tag_drops_the_index_entry() {
        let mut reg = EntityRegistry::new();
        reg.insert(sheep("only", 0, 0)).unwrap();
        reg.remove(&EntityId::new("only"));
        assert!(reg.of_tag(&TypeTag::new("sheep")).is_empty());
    }

    #[test]
    fn generated_ids_never_collide() {
        let mut reg = EntityRegistry::new();
        let a = reg.insert_generated(
            TypeTag::new("zombie"),
            BehaviorKind::Creature,
            GridPos::new(0, 0),
            Facing::Up,
        );
        let b = reg.insert_generated(
            TypeTag::new("zombie"),
            BehaviorKind::Creature,
            GridPos::new(1, 0),
            Facing::Up,
        );
        assert_ne!(a, b);
        assert_eq!(reg.of_tag(&TypeTag::new("zombie")), vec![a, b]);
    }

    #[test]
    fn entity_at_finds_occupants() {
        let mut reg = EntityRegistry::new();
        reg.insert(sheep("a", 2, 3)).unwrap();
        assert!(reg.is_occupied(GridPos::new(2, 3)));
        assert!(!reg.is_occupied(GridPos::new(3, 2)));
        assert_eq!(
            reg.entity_at(GridPos::new(2, 3)).map(|e| e.id.clone()),
            Some(EntityId::new("a"))
        );
    }
}
