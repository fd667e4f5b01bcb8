//! The level grid: two block planes plus world-level flags.
//!
//! A [`GridWorld`] holds a ground plane (terrain an entity stands on) and an
//! action plane (blocks occupying cells) of identical dimensions, the
//! day/night flag, and the level's [`Goal`]. All mutation goes through the
//! narrow `destroy_at` / `place_at` surface so handlers cannot bypass the
//! trait checks in [`BlockKind`].

use serde::{Deserialize, Serialize};

use crate::block::BlockKind;
use crate::facing::GridPos;
use crate::WorldError;

// ---------------------------------------------------------------------------
// PlaneKind
// ---------------------------------------------------------------------------

/// Which of the two block planes an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaneKind {
    Ground,
    Action,
}

// ---------------------------------------------------------------------------
// Plane
// ---------------------------------------------------------------------------

/// A row-major rectangle of block kinds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plane {
    width: u32,
    height: u32,
    cells: Vec<BlockKind>,
}

impl Plane {
    /// Build a plane from row-major cells. The cell count must match the
    /// dimensions.
    pub fn new(width: u32, height: u32, cells: Vec<BlockKind>) -> Result<Self, WorldError> {
        let expected = (width as usize) * (height as usize);
        if cells.len() != expected {
            return Err(WorldError::PlaneSizeMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(Self {
            width,
            height,
            cells,
        })
    }

    /// A plane filled with a single kind.
    pub fn filled(width: u32, height: u32, kind: BlockKind) -> Self {
        Self {
            width,
            height,
            cells: vec![kind; (width as usize) * (height as usize)],
        }
    }

    #[inline]
    fn index(&self, pos: GridPos) -> Option<usize> {
        if pos.x < 0 || pos.y < 0 || pos.x >= self.width as i32 || pos.y >= self.height as i32 {
            return None;
        }
        Some((pos.y as usize) * (self.width as usize) + pos.x as usize)
    }

    /// The block at `pos`, or `None` out of bounds.
    #[inline]
    pub fn get(&self, pos: GridPos) -> Option<BlockKind> {
        self.index(pos).map(|i| self.cells[i])
    }

    /// Overwrite the block at `pos`. Returns the previous kind, or `None`
    /// (and no write) out of bounds.
    pub fn set(&mut self, pos: GridPos, kind: BlockKind) -> Option<BlockKind> {
        let i = self.index(pos)?;
        Some(std::mem::replace(&mut self.cells[i], kind))
    }

    /// Row-major view of all cells.
    pub fn cells(&self) -> &[BlockKind] {
        &self.cells
    }
}

// ---------------------------------------------------------------------------
// Goal
// ---------------------------------------------------------------------------

/// The level's declarative win condition, checked by
/// [`GridWorld::is_solved`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum Goal {
    /// Sandbox level: always counts as solved.
    Freeplay,
    /// The player must stand on this cell.
    ReachPosition { position: GridPos },
    /// At least `count` blocks of `block` must exist on the action plane.
    BlocksPlaced { block: BlockKind, count: u32 },
    /// No block of `block` may remain on the action plane.
    BlocksCleared { block: BlockKind },
}

// ---------------------------------------------------------------------------
// GridWorld
// ---------------------------------------------------------------------------

/// The mutable world grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridWorld {
    width: u32,
    height: u32,
    ground: Plane,
    action: Plane,
    daytime: bool,
    goal: Goal,
    /// Player cell, mirrored here so goal checks need no registry access.
    player_pos: GridPos,
}

impl GridWorld {
    /// Assemble a world from prebuilt planes. Dimensions must agree.
    pub fn new(
        width: u32,
        height: u32,
        ground: Plane,
        action: Plane,
        daytime: bool,
        goal: Goal,
        player_pos: GridPos,
    ) -> Self {
        debug_assert_eq!(ground.cells().len(), action.cells().len());
        Self {
            width,
            height,
            ground,
            action,
            daytime,
            goal,
            player_pos,
        }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// True when `pos` lies inside the grid rectangle.
    #[inline]
    pub fn in_bounds(&self, pos: GridPos) -> bool {
        pos.x >= 0 && pos.y >= 0 && pos.x < self.width as i32 && pos.y < self.height as i32
    }

    /// The block on `plane` at `pos` (`None` out of bounds).
    pub fn block_at(&self, plane: PlaneKind, pos: GridPos) -> Option<BlockKind> {
        match plane {
            PlaneKind::Ground => self.ground.get(pos),
            PlaneKind::Action => self.action.get(pos),
        }
    }

    /// True when an entity cannot enter `pos`: out of bounds, a non-walkable
    /// action-plane block, or liquid ground with nothing bridging it.
    pub fn is_blocked_at(&self, pos: GridPos) -> bool {
        let Some(action) = self.action.get(pos) else {
            return true;
        };
        if !action.is_walkable() {
            return true;
        }
        // An empty action cell over liquid is open water/lava, not a path.
        if action.is_empty() {
            if let Some(ground) = self.ground.get(pos) {
                if ground.is_liquid() {
                    return true;
                }
            }
        }
        false
    }

    /// True when the action-plane block at `pos` can be punched out.
    pub fn can_destroy_at(&self, pos: GridPos) -> bool {
        self.action
            .get(pos)
            .is_some_and(BlockKind::is_destroyable)
    }

    /// Remove the action-plane block at `pos`, returning what it dropped
    /// (log kinds convert to planks). `None` when there is nothing
    /// destroyable there.
    pub fn destroy_at(&mut self, pos: GridPos) -> Option<BlockKind> {
        if !self.can_destroy_at(pos) {
            return None;
        }
        let removed = self.action.set(pos, BlockKind::Empty)?;
        Some(removed.harvested())
    }

    /// Write `kind` onto `plane` at `pos`. Returns `false` (and leaves the
    /// grid untouched) out of bounds or when `kind` is not a placeable
    /// block.
    pub fn place_at(&mut self, pos: GridPos, kind: BlockKind, plane: PlaneKind) -> bool {
        if !self.in_bounds(pos) || !kind.is_placeable() {
            return false;
        }
        match plane {
            PlaneKind::Ground => self.ground.set(pos, kind),
            PlaneKind::Action => self.action.set(pos, kind),
        };
        true
    }

    /// Count action-plane blocks of `kind`.
    pub fn count_blocks(&self, kind: BlockKind) -> u32 {
        self.action.cells().iter().filter(|&&b| b == kind).count() as u32
    }

    /// True when the action-plane block in front of `pos`/`facing` is
    /// exactly `kind`.
    pub fn forward_block_is(&self, pos: GridPos, facing: crate::facing::Facing, kind: BlockKind) -> bool {
        self.block_at(PlaneKind::Action, pos.step(facing)) == Some(kind)
    }

    /// Whether it is currently daytime.
    #[inline]
    pub fn is_daytime(&self) -> bool {
        self.daytime
    }

    /// Flip the day/night flag.
    pub fn set_daytime(&mut self, daytime: bool) {
        self.daytime = daytime;
    }

    /// Keep the mirrored player cell current. Called by movement handlers.
    pub fn set_player_pos(&mut self, pos: GridPos) {
        self.player_pos = pos;
    }

    /// The mirrored player cell.
    #[inline]
    pub fn player_pos(&self) -> GridPos {
        self.player_pos
    }

    /// The level goal.
    pub fn goal(&self) -> &Goal {
        &self.goal
    }

    /// Evaluate the level goal against the current grid.
    pub fn is_solved(&self) -> bool {
        match &self.goal {
            Goal::Freeplay => true,
            Goal::ReachPosition { position } => self.player_pos == *position,
            Goal::BlocksPlaced { block, count } => self.count_blocks(*block) >= *count,
            Goal::BlocksCleared { block } => self.count_blocks(*block) == 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
