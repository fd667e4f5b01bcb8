//! Grid positions and the four cardinal facings.
//!
//! A [`GridPos`] is a signed integer cell coordinate pair. Positions outside
//! the level bounds are representable on purpose -- bounds checking belongs to
//! [`GridWorld`](crate::grid::GridWorld), not to the coordinate type, so that
//! "one step past the edge" can be computed and then rejected.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// GridPos
// ---------------------------------------------------------------------------

/// A cell coordinate on the level grid. `x` grows rightward, `y` grows
/// downward (row-major, matching level data layout).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: i32,
    pub y: i32,
}

impl GridPos {
    /// Construct a position from raw coordinates.
    #[inline]
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// The neighboring cell one step in `facing`.
    #[inline]
    pub fn step(self, facing: Facing) -> Self {
        let (dx, dy) = facing.delta();
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// Squared Euclidean distance to `other`.
    ///
    /// Monotone in true distance, so it is safe for nearest-candidate
    /// selection, and it stays in integer arithmetic.
    #[inline]
    pub fn distance_sq(self, other: GridPos) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// True when `other` occupies this cell or one of the eight surrounding
    /// cells.
    #[inline]
    pub fn is_adjacent(self, other: GridPos) -> bool {
        self.distance_sq(other) <= 2
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// ---------------------------------------------------------------------------
// Facing
// ---------------------------------------------------------------------------

/// One of the four cardinal directions an entity can face.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    Up,
    Right,
    Down,
    Left,
}

impl Facing {
    /// All facings in clockwise order starting from `Up`. The order is part
    /// of the contract: `from_index` and random direction rolls rely on it.
    pub const ALL: [Facing; 4] = [Facing::Up, Facing::Right, Facing::Down, Facing::Left];

    /// The facing at `index % 4` in clockwise order.
    #[inline]
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// The grid delta of one step in this direction.
    #[inline]
    pub fn delta(self) -> (i32, i32) {
        match self {
            Facing::Up => (0, -1),
            Facing::Right => (1, 0),
            Facing::Down => (0, 1),
            Facing::Left => (-1, 0),
        }
    }

    /// The facing after a 90-degree counter-clockwise turn.
    #[inline]
    pub fn turned_left(self) -> Self {
        match self {
            Facing::Up => Facing::Left,
            Facing::Left => Facing::Down,
            Facing::Down => Facing::Right,
            Facing::Right => Facing::Up,
        }
    }

    /// The facing after a 90-degree clockwise turn.
    #[inline]
    pub fn turned_right(self) -> Self {
        match self {
            Facing::Up => Facing::Right,
            Facing::Right => Facing::Down,
            Facing::Down => Facing::Left,
            Facing::Left => Facing::Up,
        }
    }

    /// The opposite facing.
    #[inline]
    pub fn reversed(self) -> Self {
        self.turned_left().turned_left()
    }

    /// Apply a relative turn.
    #[inline]
    pub fn turned(self, turn: Turn) -> Self {
        match turn {
            Turn::Left => self.turned_left(),
            Turn::Right => self.turned_right(),
        }
    }
}

// ---------------------------------------------------------------------------
// Turn
// ---------------------------------------------------------------------------

/// A relative quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Turn {
    Left,
    Right,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
