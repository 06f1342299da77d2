//! # Planner
//!
//! Chooses the agent's next action with a best-first search over hypothetical
//! compound states. Hazards are projected from the knowledge base: in strict
//! mode anything possibly dangerous is treated as deadly, in relaxed mode only
//! what is certainly dangerous is. Strict mode runs first and relaxed mode is
//! the fallback when no strictly safe plan exists.

mod node;

pub use node::*;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, BinaryHeap, HashMap, HashSet};
use thiserror::Error;

use wumpus_rules::{
    apply_gas_damage, apply_heal, Action, Cell, Heading, Property, PropertySet, DEATH_PENALTY,
    GOLD_REWARD,
};

use crate::knowledge_base::KnowledgeBase;

/// Hazards that disqualify a cell as a goal.
const DANGERS: [Property; 3] = [Property::Wumpus, Property::Pit, Property::PoisonGas];

/// How hazards are projected during search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SafetyMode {
    /// A hazard counts if it is possible.
    Strict,
    /// A hazard counts only if it is certain.
    Relaxed,
}

impl std::fmt::Display for SafetyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyMode::Strict => write!(f, "strict"),
            SafetyMode::Relaxed => write!(f, "relaxed"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    pub grid_size: i32,
    /// The only cell the agent may climb out from.
    pub exit_cell: Cell,
    /// Node expansions allowed per search before giving up.
    pub max_expansions: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            grid_size: 10,
            exit_cell: Cell::START,
            max_expansions: 200_000,
        }
    }
}

/// Snapshot of the agent the planner starts from.
#[derive(Debug, Clone, Copy)]
pub struct PlanContext<'a> {
    pub position: Cell,
    pub heading: Heading,
    pub health: i32,
    pub has_potion: bool,
    pub score: i64,
    pub visited: &'a BTreeSet<Cell>,
    /// What the agent currently senses.
    pub percepts: PropertySet,
}

/// The chosen action and how it was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanOutcome {
    pub action: Action,
    /// `None` when the action was taken without searching.
    pub mode: Option<SafetyMode>,
    pub expansions: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlanError {
    #[error("agent is dead")]
    AgentDead,

    #[error("agent has already left the cave")]
    OutsideCave,

    #[error("no plan found after {expansions} expansions")]
    NoPlan { expansions: usize },
}

/// Result of a single search in one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    Found {
        action: Action,
        plan: Vec<Action>,
        expansions: usize,
    },
    Exhausted {
        expansions: usize,
    },
    LimitReached {
        expansions: usize,
    },
}

/// Hazard judgements for one search, memoised per `(hazard, cell)`.
struct HazardView<'k> {
    kb: &'k mut KnowledgeBase,
    mode: SafetyMode,
    memo: HashMap<(Property, Cell), bool>,
}

impl<'k> HazardView<'k> {
    fn new(kb: &'k mut KnowledgeBase, mode: SafetyMode) -> Self {
        Self {
            kb,
            mode,
            memo: HashMap::new(),
        }
    }

    /// Whether `hazard` counts as present in `cell` under this view's mode.
    fn threatens(&mut self, hazard: Property, cell: Cell) -> bool {
        if let Some(answer) = self.memo.get(&(hazard, cell)) {
            return *answer;
        }
        let answer = match self.mode {
            SafetyMode::Strict => self.kb.possible(hazard, cell),
            SafetyMode::Relaxed => self.kb.certain(hazard, cell),
        };
        self.memo.insert((hazard, cell), answer);
        answer
    }

    fn is_safe(&mut self, cell: Cell) -> bool {
        !DANGERS.iter().any(|hazard| self.threatens(*hazard, cell))
    }

    fn certain(&mut self, property: Property, cell: Cell) -> bool {
        self.kb.certain(property, cell)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SearchPlanner {
    config: PlannerConfig,
}

impl SearchPlanner {
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Planner for the default 10x10 cave.
    pub fn with_defaults() -> Self {
        Self::new(PlannerConfig::default())
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Pick the next action, searching in strict mode and then relaxed mode.
    pub fn plan(
        &self,
        kb: &mut KnowledgeBase,
        ctx: &PlanContext<'_>,
    ) -> Result<PlanOutcome, PlanError> {
        if ctx.position.is_outside() {
            return Err(PlanError::OutsideCave);
        }
        if ctx.health <= 0 {
            return Err(PlanError::AgentDead);
        }

        // Something glitters right here: pick it up without searching.
        if ctx.percepts.contains(Property::Gold) || ctx.percepts.contains(Property::HealingPotion)
        {
            return Ok(PlanOutcome {
                action: Action::Grab,
                mode: None,
                expansions: 0,
            });
        }

        let mut total = 0;
        for mode in [SafetyMode::Strict, SafetyMode::Relaxed] {
            match self.search(kb, ctx, mode) {
                SearchOutcome::Found {
                    action,
                    plan,
                    expansions,
                } => {
                    tracing::debug!(%mode, %action, plan_len = plan.len(), expansions, "plan found");
                    return Ok(PlanOutcome {
                        action,
                        mode: Some(mode),
                        expansions,
                    });
                }
                SearchOutcome::Exhausted { expansions } => {
                    total += expansions;
                    tracing::debug!(%mode, expansions, "search space exhausted");
                }
                SearchOutcome::LimitReached { expansions } => {
                    total += expansions;
                    tracing::warn!(%mode, expansions, "expansion limit reached");
                }
            }
            if mode == SafetyMode::Strict {
                tracing::warn!(position = %ctx.position, "no strictly safe plan, relaxing");
            }
        }

        Err(PlanError::NoPlan { expansions: total })
    }

    /// Unvisited cells judged safe under `mode`, or just the outside sentinel
    /// when there are none.
    pub fn goal_cells(
        &self,
        kb: &mut KnowledgeBase,
        visited: &BTreeSet<Cell>,
        mode: SafetyMode,
    ) -> BTreeSet<Cell> {
        self.collect_goals(&mut HazardView::new(kb, mode), visited)
    }

    pub fn is_safe(&self, kb: &mut KnowledgeBase, cell: Cell, mode: SafetyMode) -> bool {
        HazardView::new(kb, mode).is_safe(cell)
    }

    fn collect_goals(&self, view: &mut HazardView<'_>, visited: &BTreeSet<Cell>) -> BTreeSet<Cell> {
        let mut goals = BTreeSet::new();
        for cell in Cell::all(self.config.grid_size) {
            if !visited.contains(&cell) && view.is_safe(cell) {
                goals.insert(cell);
            }
        }
        if goals.is_empty() {
            goals.insert(Cell::OUTSIDE);
        }
        goals
    }

    /// Best-first search from the context's state toward the goal cells.
    pub fn search(
        &self,
        kb: &mut KnowledgeBase,
        ctx: &PlanContext<'_>,
        mode: SafetyMode,
    ) -> SearchOutcome {
        let mut view = HazardView::new(kb, mode);
        let goals = self.collect_goals(&mut view, ctx.visited);

        let mut arena = NodeArena::new();
        let mut frontier = BinaryHeap::new();
        let mut closed: HashSet<SearchState> = HashSet::new();
        let mut seq: u64 = 0;

        let root = SearchNode {
            state: SearchState {
                position: ctx.position,
                heading: ctx.heading,
                health: ctx.health,
                has_potion: ctx.has_potion,
            },
            parent: None,
            action: None,
            score: ctx.score,
        };
        let root_id = arena.push(root);
        frontier.push(FrontierEntry::new(&root, root_id, seq));

        let mut expansions = 0;
        while let Some(entry) = frontier.pop() {
            let current = *arena.get(entry.node);
            if current.state.health <= 0 || closed.contains(&current.state) {
                continue;
            }
            if expansions >= self.config.max_expansions {
                return SearchOutcome::LimitReached { expansions };
            }
            expansions += 1;
            closed.insert(current.state);

            if current.parent.is_some() && goals.contains(&current.state.position) {
                let plan = arena.path_to(entry.node);
                if let Some(&action) = plan.first() {
                    tracing::trace!(%mode, expansions, nodes = arena.len(), "goal reached");
                    return SearchOutcome::Found {
                        action,
                        plan,
                        expansions,
                    };
                }
            }

            // The outside sentinel is terminal.
            if current.state.position.is_outside() {
                continue;
            }

            for action in Action::ALL {
                if let Some((state, score)) = self.successor(&mut view, &current, action) {
                    if closed.contains(&state) {
                        continue;
                    }
                    let child = SearchNode {
                        state,
                        parent: Some(entry.node),
                        action: Some(action),
                        score,
                    };
                    let id = arena.push(child);
                    seq += 1;
                    frontier.push(FrontierEntry::new(&child, id, seq));
                }
            }
        }

        SearchOutcome::Exhausted { expansions }
    }

    /// Project `action` from `node`, or `None` when it is not applicable.
    fn successor(
        &self,
        view: &mut HazardView<'_>,
        node: &SearchNode,
        action: Action,
    ) -> Option<(SearchState, i64)> {
        let mode = view.mode;
        let from = node.state;
        let mut next = from;
        let mut score = node.score;

        match action {
            Action::Forward => {
                let ahead = from.position.step(from.heading);
                if !ahead.in_bounds(self.config.grid_size) {
                    return None;
                }
                next.position = ahead;
            }
            Action::TurnLeft => next.heading = from.heading.turn_left(),
            Action::TurnRight => next.heading = from.heading.turn_right(),
            Action::Grab => {
                let potion = view.certain(Property::HealingPotion, from.position);
                let gold = view.certain(Property::Gold, from.position);
                if !potion && !gold {
                    return None;
                }
                if potion {
                    next.has_potion = true;
                }
                if gold && mode == SafetyMode::Relaxed {
                    score += GOLD_REWARD;
                }
            }
            Action::Shoot => {
                let target = from.position.step(from.heading);
                if !target.in_bounds(self.config.grid_size)
                    || !view.certain(Property::Wumpus, target)
                {
                    return None;
                }
            }
            Action::Climb => {
                if from.position != self.config.exit_cell {
                    return None;
                }
                next.position = Cell::OUTSIDE;
            }
            Action::Heal => {
                if !from.has_potion {
                    return None;
                }
                next.health = apply_heal(from.health);
                next.has_potion = false;
            }
        }

        if !next.position.is_outside() {
            let moved = next.position != from.position;
            if moved && view.threatens(Property::PoisonGas, next.position) {
                next.health = apply_gas_damage(next.health);
            }
            if view.threatens(Property::Pit, next.position)
                || view.threatens(Property::Wumpus, next.position)
            {
                next.health = 0;
                score -= DEATH_PENALTY;
            }
            if mode == SafetyMode::Strict && moved && view.certain(Property::Gold, next.position) {
                score += GOLD_REWARD;
            }
        }

        score += action.cost();
        Some((next, score))
    }
}
