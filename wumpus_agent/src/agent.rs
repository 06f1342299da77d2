//! Agent controller - the single entry point that turns percepts into actions.
//!
//! Each call to [`AgentController::next_move`] runs three phases to completion:
//! 1. **Update**: replace what is known about the current cell with the fresh
//!    percepts and apply their direct consequences to health and score
//! 2. **Plan**: ask the [`SearchPlanner`] for the next action
//! 3. **Execute**: apply the action to the agent's own state

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

use wumpus_rules::{
    apply_gas_damage, apply_heal, Action, Cell, Heading, Property, PropertySet, DEATH_PENALTY,
    GOLD_REWARD, MAX_HEALTH,
};

use crate::knowledge_base::KnowledgeBase;
use crate::planner::{PlanContext, PlanError, PlanOutcome, PlannerConfig, SearchPlanner};

/// Unique identifier for an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgentId(pub Uuid);

impl AgentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for AgentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything the agent knows about itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Cell,
    /// Cell of the previous update; `None` before the first one.
    pub previous_position: Option<Cell>,
    pub heading: Heading,
    pub health: i32,
    pub has_potion: bool,
    pub score: i64,
    pub visited: BTreeSet<Cell>,
    pub history: Vec<Action>,
    pub last_percepts: PropertySet,
    pub gold_collected: u32,
}

impl AgentState {
    pub fn new() -> Self {
        Self {
            position: Cell::START,
            previous_position: None,
            heading: Heading::East,
            health: MAX_HEALTH,
            has_potion: false,
            score: 0,
            visited: BTreeSet::from([Cell::START]),
            history: Vec::new(),
            last_percepts: PropertySet::new(),
            gold_collected: 0,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    pub fn has_escaped(&self) -> bool {
        self.position.is_outside()
    }
}

impl Default for AgentState {
    fn default() -> Self {
        Self::new()
    }
}

/// Owns the knowledge base, the planner and the agent's state for one run.
pub struct AgentController {
    id: AgentId,
    kb: KnowledgeBase,
    planner: SearchPlanner,
    state: AgentState,
}

impl AgentController {
    pub fn new(config: PlannerConfig) -> Self {
        let id = AgentId::new();
        let kb = KnowledgeBase::new(config.grid_size);
        tracing::debug!(agent = %id, grid_size = config.grid_size, rules = kb.rule_count(), "agent created");
        Self {
            id,
            kb,
            planner: SearchPlanner::new(config),
            state: AgentState::new(),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(PlannerConfig::default())
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.kb
    }

    pub fn knowledge_mut(&mut self) -> &mut KnowledgeBase {
        &mut self.kb
    }

    pub fn planner(&self) -> &SearchPlanner {
        &self.planner
    }

    /// Perceive, plan and act. Returns the executed action.
    pub fn next_move(&mut self, percepts: PropertySet) -> Result<Action, PlanError> {
        self.update(percepts);
        let outcome = self.plan()?;
        self.apply(outcome.action);
        Ok(outcome.action)
    }

    /// Record the percepts sensed at the current cell.
    ///
    /// Each property at the cell is asserted with the polarity just sensed,
    /// replacing the previous observation there. Unchanged observations leave
    /// the knowledge base and its cached answers untouched.
    pub fn update(&mut self, percepts: PropertySet) {
        let cell = self.state.position;
        for property in Property::ALL {
            self.kb.add(property, cell, percepts.contains(property));
        }

        let was_alive = self.state.is_alive();
        let entered = self.state.previous_position != Some(cell);
        if entered && percepts.contains(Property::PoisonGas) {
            self.state.health = apply_gas_damage(self.state.health);
            tracing::debug!(agent = %self.id, %cell, health = self.state.health, "poisoned");
        }
        if was_alive && (percepts.contains(Property::Pit) || percepts.contains(Property::Wumpus))
        {
            self.state.health = 0;
            self.state.score -= DEATH_PENALTY;
            tracing::warn!(agent = %self.id, %cell, %percepts, "agent died");
        }

        self.state.previous_position = Some(cell);
        self.state.last_percepts = percepts;

        if !self.kb.is_consistent() {
            tracing::warn!(agent = %self.id, %cell, "knowledge base is inconsistent");
        }
    }

    /// Choose the next action from the current state.
    pub fn plan(&mut self) -> Result<PlanOutcome, PlanError> {
        let ctx = PlanContext {
            position: self.state.position,
            heading: self.state.heading,
            health: self.state.health,
            has_potion: self.state.has_potion,
            score: self.state.score,
            visited: &self.state.visited,
            percepts: self.state.last_percepts,
        };
        self.planner.plan(&mut self.kb, &ctx)
    }

    /// Apply an action to the agent's own state and charge its cost.
    ///
    /// Actions that cannot take effect (walking into a wall, grabbing nothing)
    /// still cost their usual amount.
    pub fn apply(&mut self, action: Action) {
        let cell = self.state.position;
        match action {
            Action::Forward => {
                let ahead = cell.step(self.state.heading);
                if ahead.in_bounds(self.planner.config().grid_size) {
                    self.state.position = ahead;
                }
            }
            Action::TurnLeft => self.state.heading = self.state.heading.turn_left(),
            Action::TurnRight => self.state.heading = self.state.heading.turn_right(),
            Action::Grab => self.grab(cell),
            Action::Shoot => {}
            Action::Climb => {
                if cell == self.planner.config().exit_cell {
                    self.state.position = Cell::OUTSIDE;
                }
            }
            Action::Heal => {
                if self.state.has_potion {
                    self.state.health = apply_heal(self.state.health);
                    self.state.has_potion = false;
                }
            }
        }

        self.state.score += action.cost();
        self.state.history.push(action);
        if !self.state.position.is_outside() {
            self.state.visited.insert(self.state.position);
        }
        tracing::debug!(
            agent = %self.id,
            %action,
            position = %self.state.position,
            score = self.state.score,
            health = self.state.health,
            "action applied"
        );
    }

    fn grab(&mut self, cell: Cell) {
        if self.state.last_percepts.remove(Property::Gold) {
            self.state.score += GOLD_REWARD;
            self.state.gold_collected += 1;
            self.kb.add(Property::Gold, cell, false);
            tracing::info!(agent = %self.id, %cell, "gold collected");
        }
        if self.state.last_percepts.remove(Property::HealingPotion) {
            self.state.has_potion = true;
            self.kb.add(Property::HealingPotion, cell, false);
            // The glow around the potion is gone with it.
            for neighbor in cell.neighbors(self.planner.config().grid_size) {
                self.kb.forget(Property::Glow, neighbor);
            }
            tracing::info!(agent = %self.id, %cell, "potion collected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller(size: i32) -> AgentController {
        AgentController::new(PlannerConfig {
            grid_size: size,
            ..PlannerConfig::default()
        })
    }

    fn percepts(properties: &[Property]) -> PropertySet {
        properties.iter().copied().collect()
    }

    #[test]
    fn test_first_move() {
        let mut agent = controller(4);
        let action = agent.next_move(PropertySet::new()).unwrap();

        assert_eq!(action, Action::Forward);
        let state = agent.state();
        assert_eq!(state.score, -10);
        assert_eq!(state.health, MAX_HEALTH);
        assert_eq!(state.position, Cell::new(1, 2));
        assert_eq!(state.visited.len(), 2);
        assert_eq!(state.history, vec![Action::Forward]);
    }

    #[test]
    fn test_stepping_into_pit_kills() {
        let mut agent = controller(4);
        agent.next_move(PropertySet::new()).unwrap();

        let result = agent.next_move(percepts(&[Property::Pit, Property::Breeze]));
        assert_eq!(result, Err(PlanError::AgentDead));
        assert_eq!(agent.state().health, 0);
        assert_eq!(agent.state().score, -10 - DEATH_PENALTY);

        // Already dead: no second penalty.
        agent.update(percepts(&[Property::Pit]));
        assert_eq!(agent.state().score, -10 - DEATH_PENALTY);
    }

    #[test]
    fn test_gold_credited_once() {
        let mut agent = controller(4);
        agent.next_move(PropertySet::new()).unwrap();

        let action = agent.next_move(percepts(&[Property::Gold])).unwrap();
        assert_eq!(action, Action::Grab);
        assert_eq!(agent.state().score, -20 + GOLD_REWARD);
        assert_eq!(agent.state().gold_collected, 1);

        agent.apply(Action::Grab);
        assert_eq!(agent.state().score, -30 + GOLD_REWARD);
        assert_eq!(agent.state().gold_collected, 1);
    }

    #[test]
    fn test_potion_and_heal() {
        let mut agent = controller(4);
        agent.next_move(PropertySet::new()).unwrap();

        let action = agent.next_move(percepts(&[Property::HealingPotion])).unwrap();
        assert_eq!(action, Action::Grab);
        assert!(agent.state().has_potion);
        assert!(!agent.knowledge().has(Property::Glow, Cell::START, false));

        agent.state.health = 50;
        agent.apply(Action::Heal);
        assert_eq!(agent.state().health, 75);
        assert!(!agent.state().has_potion);

        agent.apply(Action::Heal);
        assert_eq!(agent.state().health, 75);
    }

    #[test]
    fn test_pit_penalty_applies_after_lethal_gas() {
        let mut agent = controller(4);
        agent.state.health = 25;
        agent.update(percepts(&[Property::PoisonGas, Property::Pit]));

        assert_eq!(agent.state().health, 0);
        assert_eq!(agent.state().score, -DEATH_PENALTY);
    }

    #[test]
    fn test_repeated_observation_reuses_answers() {
        let mut agent = controller(4);
        agent.update(PropertySet::new());
        agent.plan().unwrap();
        let solves = agent.knowledge().solver_stats().solves;

        agent.update(PropertySet::new());
        agent.plan().unwrap();
        assert_eq!(agent.knowledge().solver_stats().solves, solves);

        agent.update(percepts(&[Property::Breeze]));
        assert!(agent.knowledge().has(Property::Breeze, Cell::START, true));
        assert!(!agent.knowledge().has(Property::Breeze, Cell::START, false));
    }

    #[test]
    fn test_gas_damage_on_entry_only() {
        let mut agent = controller(4);
        agent.update(percepts(&[Property::PoisonGas]));
        assert_eq!(agent.state().health, 75);

        agent.update(percepts(&[Property::PoisonGas]));
        assert_eq!(agent.state().health, 75);
    }

    #[test]
    fn test_walls_stop_forward() {
        let mut agent = controller(4);
        agent.apply(Action::TurnLeft);
        assert_eq!(agent.state().heading, Heading::North);

        agent.apply(Action::Forward);
        assert_eq!(agent.state().position, Cell::START);
        assert_eq!(agent.state().score, -20);
    }

    #[test]
    fn test_climb_only_at_exit() {
        let mut agent = controller(4);
        agent.apply(Action::Forward);
        agent.apply(Action::Climb);
        assert_eq!(agent.state().position, Cell::new(1, 2));

        agent.apply(Action::TurnLeft);
        agent.apply(Action::TurnLeft);
        agent.apply(Action::Forward);
        agent.apply(Action::Climb);
        assert!(agent.state().has_escaped());
        assert_eq!(agent.planner().config().exit_cell, Cell::START);
    }
}
