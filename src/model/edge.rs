//! Edge (undirected, aged) in the network.

use serde::{Deserialize, Serialize};
use super::NodeId;

/// Opaque edge identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EdgeId(pub u64);

impl std::fmt::Display for EdgeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An undirected edge between two distinct nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub id: EdgeId,
    /// Endpoints, stored with the smaller id first.
    pub endpoints: (NodeId, NodeId),
    /// Cycles since the edge was created or last refreshed.
    pub age: u64,
}

impl Edge {
    pub(crate) fn new(id: EdgeId, a: NodeId, b: NodeId) -> Self {
        let endpoints = if a <= b { (a, b) } else { (b, a) };
        Self { id, endpoints, age: 0 }
    }

    pub fn connects(&self, a: NodeId, b: NodeId) -> bool {
        self.endpoints == (a, b) || self.endpoints == (b, a)
    }
}
