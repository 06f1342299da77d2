//! # Wumpus Agent
//!
//! The "brain" of the Wumpus World agent. This crate interfaces with
//! `wumpus_rules`, keeps what the agent can prove about the cave in a
//! propositional knowledge base, and plans each move with a risk-aware
//! best-first search.
//!
//! ## Core Components
//!
//! - **knowledge_base**: Propositional facts and rules, decided by an embedded SAT solver
//! - **planner**: Best-first search over hypothetical states, strict then relaxed
//! - **agent**: The controller turning percepts into actions
//! - **simulation**: Headless run loop against a ground-truth map
//! - **config**: TOML-loadable tunables
//!
//! ## Design Philosophy
//!
//! - **Knowledge-Driven**: Every decision is based on what the knowledge base entails
//! - **Percept-Driven**: The agent reacts to percepts and never reads the map directly
//! - **Deterministic**: The same map and configuration always produce the same run

pub mod agent;
pub mod config;
pub mod knowledge_base;
pub mod planner;
pub mod simulation;

pub use agent::*;
pub use config::*;
pub use knowledge_base::*;
pub use planner::*;
pub use simulation::*;
