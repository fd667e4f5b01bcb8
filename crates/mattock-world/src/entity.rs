//! The entity record and per-behavior capability tables.
//!
//! There is exactly one entity struct. What used to be a subclass chain in
//! older designs (player / agent / creature overriding placement rules) is a
//! [`BehaviorKind`] tag plus a [`Capabilities`] table selected by that tag:
//! one function set per kind, no virtual dispatch chain.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::block::BlockKind;
use crate::facing::{Facing, GridPos};
use crate::grid::PlaneKind;

// ---------------------------------------------------------------------------
// EntityId / TypeTag
// ---------------------------------------------------------------------------

/// Unique string identifier of one entity. `EntityId::player()` names the
/// singleton player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// The reserved player identifier.
    pub const PLAYER: &'static str = "Player";

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The singleton player's id.
    pub fn player() -> Self {
        Self(Self::PLAYER.to_owned())
    }

    /// True for the player's id.
    #[inline]
    pub fn is_player(&self) -> bool {
        self.0 == Self::PLAYER
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// A non-unique type tag shared by every entity of one kind
/// (`"sheep"`, `"zombie"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TypeTag(String);

impl TypeTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TypeTag {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

// ---------------------------------------------------------------------------
// BehaviorKind
// ---------------------------------------------------------------------------

/// Which capability table an entity uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorKind {
    /// The controllable protagonist.
    Player,
    /// The buildable helper: places into liquid, lays mechanisms.
    Agent,
    /// Mobs: movable, usable once (shearing), cannot build.
    Creature,
    /// Scenery entities: immobile, cannot build.
    Fixture,
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// The function set selected by a [`BehaviorKind`].
pub struct Capabilities {
    /// Whether move actions may relocate this entity.
    pub mobile: bool,
    /// Whether a use action has an effect (one-shot, see [`Entity::used`]).
    pub usable: bool,
    /// Placement rule: given the block to place and the ground block under
    /// the target cell, return the receiving plane, or `None` to forbid.
    pub place_over: fn(to_place: BlockKind, ground: BlockKind) -> Option<PlaneKind>,
}

fn place_never(_to_place: BlockKind, _ground: BlockKind) -> Option<PlaneKind> {
    None
}

/// Player placement: wheat only on wet farmland; solid blocks bridge liquid
/// on the ground plane and stack on the action plane otherwise.
fn place_player(to_place: BlockKind, ground: BlockKind) -> Option<PlaneKind> {
    if to_place == BlockKind::CropWheat {
        return (ground == BlockKind::FarmlandWet).then_some(PlaneKind::Action);
    }
    if !to_place.is_placeable() {
        return None;
    }
    if ground.is_liquid() {
        Some(PlaneKind::Ground)
    } else {
        Some(PlaneKind::Action)
    }
}

/// Agent placement: mechanisms never go into liquid; redstone and rails lay
/// on the action plane over solid ground; other solids only bridge liquid.
fn place_agent(to_place: BlockKind, ground: BlockKind) -> Option<PlaneKind> {
    if to_place.is_mechanism() {
        if ground.is_liquid() {
            return None;
        }
        return matches!(to_place, BlockKind::Rail | BlockKind::RedstoneWire)
            .then_some(PlaneKind::Action);
    }
    if to_place.is_solid() && ground.is_liquid() {
        return Some(PlaneKind::Ground);
    }
    None
}

const PLAYER_CAPS: Capabilities = Capabilities {
    mobile: true,
    usable: false,
    place_over: place_player,
};

const AGENT_CAPS: Capabilities = Capabilities {
    mobile: true,
    usable: false,
    place_over: place_agent,
};

const CREATURE_CAPS: Capabilities = Capabilities {
    mobile: true,
    usable: true,
    place_over: place_never,
};

const FIXTURE_CAPS: Capabilities = Capabilities {
    mobile: false,
    usable: false,
    place_over: place_never,
};

impl BehaviorKind {
    /// The capability table for this kind.
    pub fn capabilities(self) -> &'static Capabilities {
        match self {
            BehaviorKind::Player => &PLAYER_CAPS,
            BehaviorKind::Agent => &AGENT_CAPS,
            BehaviorKind::Creature => &CREATURE_CAPS,
            BehaviorKind::Fixture => &FIXTURE_CAPS,
        }
    }
}

// ---------------------------------------------------------------------------
// Entity
// ---------------------------------------------------------------------------

/// One simulated actor: position, facing, identity, and one-shot flags.
///
/// Entities never hold references to each other; relations go through
/// [`EntityId`] lookups so a destroyed entity simply stops resolving.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub tag: TypeTag,
    pub behavior: BehaviorKind,
    pub pos: GridPos,
    pub facing: Facing,
    /// Set once the entity has been used (e.g. a sheared sheep). Further
    /// use actions degrade to a no-op.
    pub used: bool,
}

impl Entity {
    pub fn new(
        id: EntityId,
        tag: TypeTag,
        behavior: BehaviorKind,
        pos: GridPos,
        facing: Facing,
    ) -> Self {
        Self {
            id,
            tag,
            behavior,
            pos,
            facing,
            used: false,
        }
    }

    /// The cell directly ahead.
    #[inline]
    pub fn forward_pos(&self) -> GridPos {
        self.pos.step(self.facing)
    }

    /// This entity's capability table.
    #[inline]
    pub fn capabilities(&self) -> &'static Capabilities {
        self.behavior.capabilities()
    }

    /// Placement decision for `to_place` over `ground`, per this entity's
    /// capability table.
    pub fn can_place_over(&self, to_place: BlockKind, ground: BlockKind) -> Option<PlaneKind> {
        (self.capabilities().place_over)(to_place, ground)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
