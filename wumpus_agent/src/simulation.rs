//! Headless run loop pairing a ground-truth [`WorldMap`] with an agent.
//!
//! Every [`Simulation::step`] runs to completion: the agent senses its cell,
//! picks and executes one action, and the world applies the consequences.
//! Pausing only prevents the next step.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

use wumpus_rules::{Action, RulesError, Transcript, WorldMap};

use crate::agent::AgentController;
use crate::config::{AgentConfig, ConfigError};

/// Unique identifier for a simulation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunStatus {
    Running,
    Paused,
    /// The agent climbed out of the cave.
    Escaped,
    /// The agent died or had no move to make.
    Killed,
    /// The step limit was reached.
    Stalled,
}

impl RunStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, RunStatus::Escaped | RunStatus::Killed | RunStatus::Stalled)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
            RunStatus::Escaped => "escaped",
            RunStatus::Killed => "killed",
            RunStatus::Stalled => "stalled",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum SimulationError {
    #[error(transparent)]
    Rules(#[from] RulesError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to encode report: {0}")]
    Json(#[from] serde_json::Error),
}

/// Summary of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub status: RunStatus,
    pub score: i64,
    pub health: i32,
    pub steps: usize,
    pub gold_collected: u32,
    pub transcript: Vec<String>,
}

impl RunReport {
    pub fn to_json(&self) -> Result<String, SimulationError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

pub struct Simulation {
    id: RunId,
    world: WorldMap,
    agent: AgentController,
    transcript: Transcript,
    status: RunStatus,
    steps: usize,
    max_steps: usize,
}

impl Simulation {
    /// Set up a run. The cave size always comes from the map.
    pub fn new(world: WorldMap, mut config: AgentConfig) -> Result<Self, SimulationError> {
        if config.grid_size != world.size() {
            tracing::debug!(
                configured = config.grid_size,
                map = world.size(),
                "grid size taken from the map"
            );
            config.grid_size = world.size();
        }
        config.validate()?;

        let id = RunId::new();
        let agent = AgentController::new(config.planner_config());
        tracing::info!(run = %id, agent = %agent.id(), size = world.size(), "simulation created");

        Ok(Self {
            id,
            transcript: Transcript::new(),
            world,
            agent,
            status: RunStatus::Running,
            steps: 0,
            max_steps: config.max_steps,
        })
    }

    /// Load a map file and set up a run on it.
    pub fn from_map_file(
        path: impl AsRef<Path>,
        config: AgentConfig,
    ) -> Result<Self, SimulationError> {
        let world = WorldMap::load(path)?;
        Self::new(world, config)
    }

    pub fn id(&self) -> RunId {
        self.id
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn steps(&self) -> usize {
        self.steps
    }

    pub fn world(&self) -> &WorldMap {
        &self.world
    }

    pub fn agent(&self) -> &AgentController {
        &self.agent
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Stop before the next step.
    pub fn pause(&mut self) {
        if self.status == RunStatus::Running {
            self.status = RunStatus::Paused;
            tracing::info!(run = %self.id, steps = self.steps, "simulation paused");
        }
    }

    pub fn resume(&mut self) {
        if self.status == RunStatus::Paused {
            self.status = RunStatus::Running;
            tracing::info!(run = %self.id, steps = self.steps, "simulation resumed");
        }
    }

    /// Advance by one agent move. Does nothing unless the run is `Running`.
    pub fn step(&mut self) -> RunStatus {
        if self.status != RunStatus::Running {
            return self.status;
        }

        let cell = self.agent.state().position;
        let percepts = self.world.percepts_at(cell);
        match self.agent.next_move(percepts) {
            Ok(action) => {
                self.transcript.record(cell, action);
                self.steps += 1;
                match action {
                    Action::Grab => {
                        self.world.grab(cell);
                    }
                    Action::Shoot => {
                        self.world.shoot(cell, self.agent.state().heading);
                    }
                    _ => {}
                }
                if self.agent.state().has_escaped() {
                    self.status = RunStatus::Escaped;
                    tracing::info!(run = %self.id, score = self.agent.state().score, "agent escaped");
                }
            }
            Err(err) => {
                self.status = RunStatus::Killed;
                tracing::warn!(run = %self.id, %cell, error = %err, "run aborted");
            }
        }

        if self.status == RunStatus::Running && self.steps >= self.max_steps {
            self.status = RunStatus::Stalled;
            tracing::warn!(run = %self.id, steps = self.steps, "step limit reached");
        }
        self.status
    }

    /// Step until the run stops or `max_steps` more steps have been taken.
    pub fn run(&mut self, max_steps: usize) -> RunStatus {
        for _ in 0..max_steps {
            if self.step() != RunStatus::Running {
                break;
            }
        }
        self.status
    }

    /// Step until the run stops.
    pub fn run_to_end(&mut self) -> RunStatus {
        while self.step() == RunStatus::Running {}
        self.status
    }

    pub fn report(&self) -> RunReport {
        let state = self.agent.state();
        RunReport {
            run_id: self.id,
            status: self.status,
            score: state.score,
            health: state.health,
            steps: self.steps,
            gold_collected: state.gold_collected,
            transcript: self.transcript.lines(),
        }
    }

    pub fn write_transcript(&self, path: impl AsRef<Path>) -> Result<(), SimulationError> {
        Ok(self.transcript.write_to(path)?)
    }
}
