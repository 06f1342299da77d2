//! Knowledge Base module - what the agent can prove about the cave.
//!
//! The knowledge base consists of:
//! - **Literals**: signed propositional variables naming `(property, cell)` pairs
//! - **Rules**: a fixed CNF linking percepts to the hazards in neighbouring cells
//! - **Assumptions**: literals observed by the agent
//! - **Solver**: a CDCL SAT solver deciding entailment under the assumptions

mod knowledge;
mod literal;
mod solver;

pub use knowledge::*;
pub use literal::*;
pub use solver::*;
