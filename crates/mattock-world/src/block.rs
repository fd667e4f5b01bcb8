//! Block kinds and their intrinsic traits.
//!
//! The level grid stores a [`BlockKind`] per cell. Traits that drive
//! scheduling decisions (walkable, destroyable, liquid, ...) are derived from
//! the kind here so that the rest of the crate never matches on raw kind
//! names. Kind names serialize in camelCase to stay compatible with level
//! data authored for the original asset tables (`"logOak"`, `"farmlandWet"`).

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// BlockKind
// ---------------------------------------------------------------------------

/// Every block kind the simulation understands.
///
/// `Empty` is a real kind, not an `Option`: an action-plane cell with no
/// block in it is `Empty`, and placement/path predicates test against it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlockKind {
    Empty,
    // Ground terrain.
    Grass,
    Dirt,
    Sand,
    Gravel,
    Stone,
    Cobblestone,
    Bedrock,
    Farmland,
    FarmlandWet,
    Water,
    Lava,
    // Trees and their harvest products.
    LogAcacia,
    LogBirch,
    LogJungle,
    LogOak,
    LogSpruce,
    PlanksAcacia,
    PlanksBirch,
    PlanksJungle,
    PlanksOak,
    PlanksSpruce,
    // Placeable specials.
    CropWheat,
    Rail,
    RedstoneWire,
    Piston,
    Torch,
    Tnt,
    Wool,
}

impl BlockKind {
    /// True for the absent-block kind.
    #[inline]
    pub fn is_empty(self) -> bool {
        self == BlockKind::Empty
    }

    /// True for flowing terrain that swallows placed blocks.
    #[inline]
    pub fn is_liquid(self) -> bool {
        matches!(self, BlockKind::Water | BlockKind::Lava)
    }

    /// True when an entity may stand in a cell holding this block on the
    /// action plane.
    #[inline]
    pub fn is_walkable(self) -> bool {
        matches!(
            self,
            BlockKind::Empty | BlockKind::Rail | BlockKind::RedstoneWire | BlockKind::Torch
        )
    }

    /// True when a punch removes this block from the action plane.
    pub fn is_destroyable(self) -> bool {
        matches!(
            self,
            BlockKind::Dirt
                | BlockKind::Sand
                | BlockKind::Gravel
                | BlockKind::Cobblestone
                | BlockKind::LogAcacia
                | BlockKind::LogBirch
                | BlockKind::LogJungle
                | BlockKind::LogOak
                | BlockKind::LogSpruce
                | BlockKind::PlanksAcacia
                | BlockKind::PlanksBirch
                | BlockKind::PlanksJungle
                | BlockKind::PlanksOak
                | BlockKind::PlanksSpruce
                | BlockKind::CropWheat
                | BlockKind::Tnt
                | BlockKind::Wool
        )
    }

    /// True for kinds a program may ask an entity to place.
    pub fn is_placeable(self) -> bool {
        matches!(
            self,
            BlockKind::Dirt
                | BlockKind::Sand
                | BlockKind::Gravel
                | BlockKind::Cobblestone
                | BlockKind::PlanksAcacia
                | BlockKind::PlanksBirch
                | BlockKind::PlanksJungle
                | BlockKind::PlanksOak
                | BlockKind::PlanksSpruce
                | BlockKind::CropWheat
                | BlockKind::Rail
                | BlockKind::RedstoneWire
                | BlockKind::Piston
                | BlockKind::Torch
                | BlockKind::Tnt
                | BlockKind::Wool
        )
    }

    /// True for the thin mechanism kinds that follow special placement rules
    /// (they sit on the action plane and never survive liquid).
    #[inline]
    pub fn is_mechanism(self) -> bool {
        matches!(
            self,
            BlockKind::Rail | BlockKind::RedstoneWire | BlockKind::Piston | BlockKind::Torch
        )
    }

    /// True for solid placeable matter (not empty, liquid, crop, or
    /// mechanism).
    #[inline]
    pub fn is_solid(self) -> bool {
        !self.is_empty() && !self.is_liquid() && !self.is_mechanism() && self != BlockKind::CropWheat
    }

    /// What destroying this block leaves behind as a drop: log and tree
    /// kinds convert to their planks, everything else drops as itself.
    pub fn harvested(self) -> BlockKind {
        match self {
            BlockKind::LogAcacia => BlockKind::PlanksAcacia,
            BlockKind::LogBirch => BlockKind::PlanksBirch,
            BlockKind::LogJungle => BlockKind::PlanksJungle,
            BlockKind::LogOak => BlockKind::PlanksOak,
            BlockKind::LogSpruce => BlockKind::PlanksSpruce,
            other => other,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Reuse the serde camelCase name so logs match level data.
        let name = serde_json::to_string(self).map_err(|_| fmt::Error)?;
        f.write_str(name.trim_matches('"'))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
