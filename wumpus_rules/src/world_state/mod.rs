//! World state management - the ground-truth cave map.

mod transcript;

pub use transcript::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::entities::{Cell, Heading, Property, PropertySet};
use crate::error::RulesError;

/// Largest side length a map may declare.
pub const MAX_GRID_SIZE: i32 = 256;

/// The ground truth of a cave: what every cell holds and what can be sensed there.
///
/// Percept tags are derived, never stored by hand: every change to a hazard or
/// reward recomputes the percepts of the whole grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldMap {
    size: i32,
    /// Row-major cell contents, `(size * size)` entries.
    cells: Vec<PropertySet>,
}

impl WorldMap {
    /// Create an empty cave of the given side length, clamped to `1..=MAX_GRID_SIZE`.
    pub fn new(size: i32) -> Self {
        let size = size.clamp(1, MAX_GRID_SIZE);
        Self {
            size,
            cells: vec![PropertySet::new(); (size * size) as usize],
        }
    }

    /// Parse a map file.
    ///
    /// The first line holds the side length `N`, followed by `N` rows of `N`
    /// dot-separated cells. The last row of the file is row 1, so the start
    /// cell `(1, 1)` is the file's bottom-left cell. A cell lists its tags
    /// separated by spaces; `-` marks an empty cell. Percept tags found in the
    /// file are ignored and recomputed from the hazards.
    pub fn parse(text: &str) -> Result<Self, RulesError> {
        let mut lines = text.lines().enumerate();

        let (_, header) = lines.next().ok_or_else(|| RulesError::InvalidMap {
            line: 1,
            reason: "missing grid size".to_string(),
        })?;
        let size: i32 = header.trim().parse().map_err(|_| RulesError::InvalidMap {
            line: 1,
            reason: format!("'{}' is not a grid size", header.trim()),
        })?;
        if !(1..=MAX_GRID_SIZE).contains(&size) {
            return Err(RulesError::InvalidMap {
                line: 1,
                reason: format!("grid size must be between 1 and {}, got {}", MAX_GRID_SIZE, size),
            });
        }

        let mut world = WorldMap::new(size);
        for x in (1..=size).rev() {
            let (index, row) = lines.next().ok_or_else(|| RulesError::InvalidMap {
                line: (size - x) as usize + 2,
                reason: format!("expected {} rows", size),
            })?;
            let tokens: Vec<_> = row.trim().split('.').collect();
            if tokens.len() != size as usize {
                return Err(RulesError::InvalidMap {
                    line: index + 1,
                    reason: format!("expected {} cells, found {}", size, tokens.len()),
                });
            }

            for (y, token) in (1..=size).zip(tokens) {
                let contents = PropertySet::parse_symbols(&token.replace('-', " "))?;
                let cell = world.index(Cell::new(x, y)).ok_or_else(|| RulesError::InvalidMap {
                    line: index + 1,
                    reason: format!("cell ({}, {}) out of range", x, y),
                })?;
                world.cells[cell] = contents.iter().filter(|p| !p.is_percept()).collect();
            }
        }

        world.refresh_percepts();
        tracing::debug!(size, "parsed cave map");
        Ok(world)
    }

    /// Read and parse a map file from disk.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| RulesError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Side length of the grid.
    pub fn size(&self) -> i32 {
        self.size
    }

    /// Everything present at a cell: ground truth and percepts.
    ///
    /// This is exactly what the agent is told when standing in the cell.
    /// Cells outside the grid hold nothing.
    pub fn percepts_at(&self, cell: Cell) -> PropertySet {
        self.index(cell)
            .map(|i| self.cells[i])
            .unwrap_or_default()
    }

    /// Check if a cell holds a property.
    pub fn has(&self, cell: Cell, property: Property) -> bool {
        self.percepts_at(cell).contains(property)
    }

    /// Place a hazard or reward in a cell.
    pub fn place(&mut self, cell: Cell, property: Property) -> bool {
        if property.is_percept() {
            return false;
        }
        match self.index(cell) {
            Some(i) => {
                let added = self.cells[i].insert(property);
                self.refresh_percepts();
                added
            }
            None => false,
        }
    }

    /// Remove a hazard or reward from a cell.
    pub fn remove(&mut self, cell: Cell, property: Property) -> bool {
        match self.index(cell) {
            Some(i) if !property.is_percept() => {
                let removed = self.cells[i].remove(property);
                if removed {
                    self.refresh_percepts();
                }
                removed
            }
            _ => false,
        }
    }

    /// Pick up gold and potions lying in a cell. Returns what was taken.
    pub fn grab(&mut self, cell: Cell) -> PropertySet {
        let mut taken = PropertySet::new();
        for item in [Property::Gold, Property::HealingPotion] {
            if self.remove(cell, item) {
                taken.insert(item);
            }
        }
        taken
    }

    /// Shoot an arrow from `from` in the given heading.
    ///
    /// The arrow reaches the adjacent cell only. Returns true if it killed a wumpus.
    pub fn shoot(&mut self, from: Cell, heading: Heading) -> bool {
        let target = from.step(heading);
        let killed = self.remove(target, Property::Wumpus);
        if killed {
            tracing::info!(%target, "wumpus killed");
        }
        killed
    }

    /// Count cells holding a property.
    pub fn count(&self, property: Property) -> usize {
        self.cells.iter().filter(|c| c.contains(property)).count()
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        cell.in_bounds(self.size)
            .then(|| ((cell.x - 1) * self.size + (cell.y - 1)) as usize)
    }

    fn refresh_percepts(&mut self) {
        for contents in self.cells.iter_mut() {
            for percept in Property::PERCEPTS {
                contents.remove(percept);
            }
        }

        for cell in Cell::all(self.size) {
            let Some(i) = self.index(cell) else { continue };
            let contents = self.cells[i];
            for percept in contents.iter().filter_map(|p| p.percept()) {
                for neighbor in cell.neighbors(self.size) {
                    if let Some(j) = self.index(neighbor) {
                        self.cells[j].insert(percept);
                    }
                }
            }
        }
    }
}
