//! Cell properties: ground-truth hazards and rewards, and the percepts they emit.

use serde::{Deserialize, Serialize};

use crate::error::RulesError;

/// A tag attached to a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Property {
    // Ground truth
    Pit,
    Wumpus,
    PoisonGas,
    HealingPotion,
    Gold,

    // Percepts
    Stench,
    Breeze,
    Whiff,
    Glow,
}

impl Property {
    /// Every property, in bit order.
    pub const ALL: [Property; 9] = [
        Property::Pit,
        Property::Wumpus,
        Property::PoisonGas,
        Property::HealingPotion,
        Property::Gold,
        Property::Stench,
        Property::Breeze,
        Property::Whiff,
        Property::Glow,
    ];

    /// Properties describing what a cell really holds.
    pub const GROUND_TRUTH: [Property; 5] = [
        Property::Pit,
        Property::Wumpus,
        Property::PoisonGas,
        Property::HealingPotion,
        Property::Gold,
    ];

    /// Properties the agent senses from neighbouring cells.
    pub const PERCEPTS: [Property; 4] = [
        Property::Stench,
        Property::Breeze,
        Property::Whiff,
        Property::Glow,
    ];

    /// Short symbol used in map files and percept sets.
    pub fn symbol(&self) -> &'static str {
        match self {
            Property::Pit => "P",
            Property::Wumpus => "W",
            Property::PoisonGas => "P_G",
            Property::HealingPotion => "H_P",
            Property::Gold => "G",
            Property::Stench => "S",
            Property::Breeze => "B",
            Property::Whiff => "W_H",
            Property::Glow => "G_L",
        }
    }

    /// The percept this property emits into its neighbours, if any.
    pub fn percept(&self) -> Option<Property> {
        match self {
            Property::Pit => Some(Property::Breeze),
            Property::Wumpus => Some(Property::Stench),
            Property::PoisonGas => Some(Property::Whiff),
            Property::HealingPotion => Some(Property::Glow),
            _ => None,
        }
    }

    /// Check if this is a percept rather than ground truth.
    pub fn is_percept(&self) -> bool {
        Self::PERCEPTS.contains(self)
    }

    fn bit(&self) -> u16 {
        1 << (*self as u16)
    }
}

impl std::str::FromStr for Property {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Property::ALL
            .into_iter()
            .find(|property| property.symbol() == s)
            .ok_or_else(|| RulesError::UnknownTag(s.to_string()))
    }
}

impl std::fmt::Display for Property {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A small set of properties, used both for cell contents and percept sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PropertySet(u16);

impl PropertySet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a property. Returns true if it was not already present.
    pub fn insert(&mut self, property: Property) -> bool {
        let added = !self.contains(property);
        self.0 |= property.bit();
        added
    }

    /// Remove a property. Returns true if it was present.
    pub fn remove(&mut self, property: Property) -> bool {
        let present = self.contains(property);
        self.0 &= !property.bit();
        present
    }

    pub fn contains(&self, property: Property) -> bool {
        self.0 & property.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate over the contained properties in a fixed order.
    pub fn iter(&self) -> impl Iterator<Item = Property> + '_ {
        Property::ALL.into_iter().filter(|p| self.contains(*p))
    }

    /// Parse a whitespace-separated list of symbols, e.g. `"B S"`.
    pub fn parse_symbols(text: &str) -> Result<Self, RulesError> {
        text.split_whitespace().map(str::parse).collect()
    }
}

impl FromIterator<Property> for PropertySet {
    fn from_iter<I: IntoIterator<Item = Property>>(iter: I) -> Self {
        let mut set = PropertySet::new();
        for property in iter {
            set.insert(property);
        }
        set
    }
}

impl std::fmt::Display for PropertySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let symbols: Vec<_> = self.iter().map(|p| p.symbol()).collect();
        write!(f, "{{{}}}", symbols.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_parsing() {
        assert_eq!("P_G".parse::<Property>().unwrap(), Property::PoisonGas);
        assert_eq!("G_L".parse::<Property>().unwrap(), Property::Glow);
        assert!(matches!(
            "X".parse::<Property>(),
            Err(RulesError::UnknownTag(tag)) if tag == "X"
        ));
    }

    #[test]
    fn test_percept_pairing() {
        assert_eq!(Property::Pit.percept(), Some(Property::Breeze));
        assert_eq!(Property::Wumpus.percept(), Some(Property::Stench));
        assert_eq!(Property::PoisonGas.percept(), Some(Property::Whiff));
        assert_eq!(Property::HealingPotion.percept(), Some(Property::Glow));
        assert_eq!(Property::Gold.percept(), None);
        assert_eq!(Property::Breeze.percept(), None);
    }

    #[test]
    fn test_property_set() {
        let mut set = PropertySet::parse_symbols("B  S W_H").unwrap();
        assert_eq!(set.len(), 3);
        assert!(set.contains(Property::Whiff));
        assert!(!set.insert(Property::Breeze));
        assert!(set.remove(Property::Breeze));
        assert!(!set.contains(Property::Breeze));
        assert_eq!(set.to_string(), "{S, W_H}");
        assert!(PropertySet::new().is_empty());
    }
}
