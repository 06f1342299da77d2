//! Entity definitions for the cave: cells, headings, and cell properties.

mod property;

pub use property::*;

use serde::{Deserialize, Serialize};

/// A cell of the cave grid.
///
/// `x` is the 1-based row counted from the bottom of the map, `y` the 1-based
/// column, so `(1, 1)` is the bottom-left corner. `(0, 0)` is the sentinel
/// "outside" cell reached by climbing out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    /// The sentinel cell representing a successful exit from the cave.
    pub const OUTSIDE: Cell = Cell { x: 0, y: 0 };

    /// The cell every agent starts in.
    pub const START: Cell = Cell { x: 1, y: 1 };

    /// Create a cell from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Check if this is the sentinel outside cell.
    pub fn is_outside(&self) -> bool {
        *self == Self::OUTSIDE
    }

    /// Check if the cell lies inside a `size` x `size` grid.
    pub fn in_bounds(&self, size: i32) -> bool {
        (1..=size).contains(&self.x) && (1..=size).contains(&self.y)
    }

    /// The cell one step away in the given heading (may be out of bounds).
    pub fn step(&self, heading: Heading) -> Cell {
        let (dx, dy) = heading.delta();
        Cell::new(self.x + dx, self.y + dy)
    }

    /// Orthogonal neighbours that lie inside the grid.
    pub fn neighbors(&self, size: i32) -> Vec<Cell> {
        [(-1, 0), (1, 0), (0, -1), (0, 1)]
            .into_iter()
            .map(|(dx, dy)| Cell::new(self.x + dx, self.y + dy))
            .filter(|cell| cell.in_bounds(size))
            .collect()
    }

    /// Iterate over every cell of a `size` x `size` grid in row-major order.
    pub fn all(size: i32) -> impl Iterator<Item = Cell> {
        (1..=size).flat_map(move |x| (1..=size).map(move |y| Cell::new(x, y)))
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Facing of the agent. Indices run clockwise.
///
/// `South` steps to `x + 1`, which is one row further from the bottom of the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Heading {
    #[default]
    East,
    South,
    West,
    North,
}

impl Heading {
    /// All headings in index order.
    pub const ALL: [Heading; 4] = [Heading::East, Heading::South, Heading::West, Heading::North];

    /// The heading with the given index (taken modulo 4).
    pub fn from_index(index: u8) -> Self {
        Self::ALL[(index % 4) as usize]
    }

    /// Index of this heading: east=0, south=1, west=2, north=3.
    pub fn index(&self) -> u8 {
        match self {
            Heading::East => 0,
            Heading::South => 1,
            Heading::West => 2,
            Heading::North => 3,
        }
    }

    /// Movement delta `(dx, dy)` of a forward step.
    pub fn delta(&self) -> (i32, i32) {
        match self {
            Heading::East => (0, 1),
            Heading::South => (1, 0),
            Heading::West => (0, -1),
            Heading::North => (-1, 0),
        }
    }

    /// Heading after a 90 degree left turn.
    pub fn turn_left(&self) -> Self {
        Self::from_index(self.index() + 3)
    }

    /// Heading after a 90 degree right turn.
    pub fn turn_right(&self) -> Self {
        Self::from_index(self.index() + 1)
    }
}
