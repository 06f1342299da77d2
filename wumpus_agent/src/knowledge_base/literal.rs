//! Literals and the propositional variable registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use wumpus_rules::{Cell, Property};

/// A signed propositional variable.
///
/// Positive literals assert that a property holds in a cell, negative ones that
/// it does not. The variable id is the absolute value and is never zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal(i32);

impl Literal {
    /// Create a literal for variable `var` with the given polarity.
    pub fn new(var: u32, polarity: bool) -> Self {
        debug_assert!(var > 0, "variable ids start at 1");
        let var = var as i32;
        Self(if polarity { var } else { -var })
    }

    /// Create a literal from its signed integer form.
    pub fn from_signed(value: i32) -> Option<Self> {
        (value != 0).then_some(Self(value))
    }

    pub fn var(&self) -> usize {
        self.0.unsigned_abs() as usize
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn negate(&self) -> Self {
        Self(-self.0)
    }

    pub fn signed(&self) -> i32 {
        self.0
    }

    /// Dense index for per-literal tables: `2 * var + (negative as usize)`.
    pub(crate) fn code(&self) -> usize {
        2 * self.var() + usize::from(!self.is_positive())
    }
}

impl std::ops::Neg for Literal {
    type Output = Literal;

    fn neg(self) -> Literal {
        self.negate()
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lazily assigns variable ids to `(property, cell)` pairs.
///
/// Ids are handed out in order of first reference and never reused.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    ids: HashMap<(Property, Cell), u32>,
    names: Vec<(Property, Cell)>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Variable id for a pair, allocating one on first use.
    pub fn symbol(&mut self, property: Property, cell: Cell) -> u32 {
        if let Some(id) = self.ids.get(&(property, cell)) {
            return *id;
        }
        self.names.push((property, cell));
        let id = self.names.len() as u32;
        self.ids.insert((property, cell), id);
        id
    }

    /// Variable id for a pair, without allocating.
    pub fn get(&self, property: Property, cell: Cell) -> Option<u32> {
        self.ids.get(&(property, cell)).copied()
    }

    /// The pair a variable id stands for.
    pub fn name(&self, var: u32) -> Option<(Property, Cell)> {
        var.checked_sub(1)
            .and_then(|i| self.names.get(i as usize))
            .copied()
    }

    /// Literal asserting (or denying) a property in a cell.
    pub fn literal(&mut self, property: Property, cell: Cell, existence: bool) -> Literal {
        Literal::new(self.symbol(property, cell), existence)
    }

    /// Number of allocated variables.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Human-readable form of a literal, e.g. `¬B(1, 2)`.
    pub fn describe(&self, literal: Literal) -> String {
        let sign = if literal.is_positive() { "" } else { "¬" };
        match self.name(literal.var() as u32) {
            Some((property, cell)) => format!("{}{}{}", sign, property, cell),
            None => format!("{}x{}", sign, literal.var()),
        }
    }
}
