//! # Wumpus Rules
//!
//! The rules of the cave - cells, properties, actions, and the ground-truth map.
//! This crate is the single source of truth for the world and does not contain any reasoning.

pub mod entities;
pub mod error;
pub mod mechanics;
pub mod world_state;

pub use entities::*;
pub use error::*;
pub use mechanics::*;
pub use world_state::*;
