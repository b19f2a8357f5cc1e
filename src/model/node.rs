//! Node (reference vector) in the network.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use super::EdgeId;

/// Opaque node identifier.
///
/// Ids are handed out in increasing order, so sorting by id gives creation
/// order. That order is the canonical scan order for every search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference vector with its accumulated quantization error.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub position: Vec<f64>,
    /// Accumulated local error, in distance units (not squared).
    pub error: f64,
    /// neighbour id → id of the edge joining them
    pub(crate) neighbors: HashMap<NodeId, EdgeId>,
}

impl Node {
    pub(crate) fn new(id: NodeId, position: Vec<f64>, error: f64) -> Self {
        Self {
            id,
            position,
            error,
            neighbors: HashMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.position.len()
    }

    pub fn degree(&self) -> usize {
        self.neighbors.len()
    }

    /// Edge joining this node to `other`, if any.
    pub fn edge_to(&self, other: NodeId) -> Option<EdgeId> {
        self.neighbors.get(&other).copied()
    }

    /// Neighbour ids in canonical (creation) order.
    pub fn neighbor_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self.neighbors.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
