//! Game mechanics: the action vocabulary, its cost table, and vital-stat rules.

use serde::{Deserialize, Serialize};

use crate::error::RulesError;

/// Health of a fresh agent, and the cap for healing.
pub const MAX_HEALTH: i32 = 100;

/// Health lost when entering a cell filled with poison gas.
pub const GAS_DAMAGE: i32 = 25;

/// Health restored by drinking a healing potion.
pub const HEAL_AMOUNT: i32 = 25;

/// Score lost when the agent falls into a pit or meets the wumpus.
pub const DEATH_PENALTY: i64 = 10_000;

/// Score gained for a piece of gold.
pub const GOLD_REWARD: i64 = 5_000;

/// Everything the agent can do in a single turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    Forward,
    TurnLeft,
    TurnRight,
    Grab,
    Shoot,
    Climb,
    Heal,
}

impl Action {
    /// All actions, in the order the planner tries them.
    pub const ALL: [Action; 7] = [
        Action::Forward,
        Action::TurnLeft,
        Action::TurnRight,
        Action::Grab,
        Action::Shoot,
        Action::Climb,
        Action::Heal,
    ];

    /// Score delta of performing the action.
    pub fn cost(&self) -> i64 {
        match self {
            Action::Forward | Action::TurnLeft | Action::TurnRight => -10,
            Action::Grab | Action::Heal => -10,
            Action::Shoot => -100,
            Action::Climb => 10,
        }
    }

    /// Single-letter symbol exchanged with the user interface.
    pub fn symbol(&self) -> &'static str {
        match self {
            Action::Forward => "F",
            Action::TurnLeft => "L",
            Action::TurnRight => "R",
            Action::Grab => "G",
            Action::Shoot => "S",
            Action::Climb => "C",
            Action::Heal => "H",
        }
    }

    /// Human-readable name used in run transcripts.
    pub fn display_name(&self) -> &'static str {
        match self {
            Action::Forward => "Forward",
            Action::TurnLeft => "Turn Left",
            Action::TurnRight => "Turn Right",
            Action::Grab => "Grab",
            Action::Shoot => "Shoot Arrow",
            Action::Climb => "Exit the Cave",
            Action::Heal => "Heal",
        }
    }
}

impl std::str::FromStr for Action {
    type Err = RulesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.symbol() == s)
            .ok_or_else(|| RulesError::UnknownAction(s.to_string()))
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Health after taking gas damage, floored at zero.
pub fn apply_gas_damage(health: i32) -> i32 {
    (health - GAS_DAMAGE).max(0)
}

/// Health after drinking a potion, capped at [`MAX_HEALTH`].
pub fn apply_heal(health: i32) -> i32 {
    (health + HEAL_AMOUNT).min(MAX_HEALTH)
}
