//! Search nodes for the planner, stored in a per-call arena.

use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};

use wumpus_rules::{Action, Cell, Heading};

/// Index of a node inside a [`NodeArena`].
pub type NodeId = usize;

/// The compound state searched over. Used as the deduplication key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchState {
    pub position: Cell,
    pub heading: Heading,
    pub health: i32,
    pub has_potion: bool,
}

/// A hypothetical state together with how it was reached.
#[derive(Debug, Clone, Copy)]
pub struct SearchNode {
    pub state: SearchState,
    pub parent: Option<NodeId>,
    /// Action taken from the parent; `None` only for the root.
    pub action: Option<Action>,
    /// Projected score after reaching this node.
    pub score: i64,
}

/// Owns every node created during one planning call.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<SearchNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node: SearchNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    pub fn get(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Actions leading from the root to `id`, root side first.
    pub fn path_to(&self, id: NodeId) -> Vec<Action> {
        let mut actions = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = &self.nodes[node_id];
            actions.push(node.action);
            current = node.parent;
        }
        // The walk ends with the root's `None`.
        while let Some(None) = actions.last() {
            actions.pop();
        }
        actions.into_iter().rev().flatten().collect()
    }
}

/// Frontier entry. `BinaryHeap` pops the greatest entry, which is the one
/// with the highest score, then the highest health, then carrying a potion,
/// then the earliest insertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrontierEntry {
    pub score: i64,
    pub health: i32,
    pub has_potion: bool,
    pub seq: u64,
    pub node: NodeId,
}

impl FrontierEntry {
    pub fn new(node: &SearchNode, id: NodeId, seq: u64) -> Self {
        Self {
            score: node.score,
            health: node.state.health,
            has_potion: node.state.has_potion,
            seq,
            node: id,
        }
    }

    fn key(&self) -> (i64, i32, bool, Reverse<u64>) {
        (self.score, self.health, self.has_potion, Reverse(self.seq))
    }
}

impl Ord for FrontierEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

impl PartialOrd for FrontierEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
