//! # Network Graph
//!
//! The arena that owns every node and edge of the network. All structural
//! mutation goes through here so the invariants hold after every call:
//!
//! - every attached node has at least one incident edge
//! - at most one edge joins any pair of nodes
//! - both endpoints of every edge are attached nodes
//! - every position has the same dimension, fixed by the first node
//!
//! Nodes and edges live in id-keyed ordered maps. Ids grow monotonically,
//! so iteration is in creation order and every search that scans the graph
//! breaks ties the same way on every run.
//!
//! A node created with [`Graph::create_node`] is *detached*: it exists, but
//! is not part of the graph until an edge attaches it. Removing the last
//! edge of a node removes the node for good.

use std::collections::BTreeMap;

use hashbrown::HashMap;
use rand::Rng;
use smallvec::SmallVec;

use crate::model::*;
use crate::{Error, Result};

/// Nodes dropped from the graph as a side effect of removing one edge.
pub type RemovedNodes = SmallVec<[NodeId; 2]>;

// ============================================================================
// Graph
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: BTreeMap<NodeId, Node>,
    edges: BTreeMap<EdgeId, Edge>,
    /// Created but not yet joined by any edge.
    detached: HashMap<NodeId, Node>,
    dimension: Option<usize>,
    next_node_id: u64,
    next_edge_id: u64,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Two nodes drawn uniformly from `[0,1)^dimension`, zero error, joined
    /// by one edge of age 0.
    pub fn seeded<R: Rng + ?Sized>(dimension: usize, rng: &mut R) -> Result<Self> {
        let mut graph = Self::new();
        let a = graph.create_node(random_position(dimension, rng), 0.0)?;
        let b = graph.create_node(random_position(dimension, rng), 0.0)?;
        graph.add_or_refresh_edge(a, b)?;
        Ok(graph)
    }

    // ========================================================================
    // Node lifecycle
    // ========================================================================

    /// Allocate a detached node. The first node ever created fixes the
    /// graph's dimension; later positions must match it.
    pub fn create_node(&mut self, position: Vec<f64>, error: f64) -> Result<NodeId> {
        if position.is_empty() {
            return Err(Error::ZeroDimension);
        }
        match self.dimension {
            Some(d) if d != position.len() => {
                return Err(Error::DimensionMismatch { expected: d, got: position.len() });
            }
            Some(_) => {}
            None => self.dimension = Some(position.len()),
        }

        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        self.detached.insert(id, Node::new(id, position, error));
        Ok(id)
    }

    // ========================================================================
    // Edge lifecycle
    // ========================================================================

    /// Join `a` and `b`. If they are already joined, the existing edge's
    /// age is reset to 0 and it is returned; no second edge is created.
    /// Detached endpoints become part of the graph.
    pub fn add_or_refresh_edge(&mut self, a: NodeId, b: NodeId) -> Result<EdgeId> {
        if a == b {
            return Err(Error::SelfLoop(a));
        }
        for id in [a, b] {
            if !self.nodes.contains_key(&id) && !self.detached.contains_key(&id) {
                return Err(Error::NodeNotFound(id));
            }
        }

        if let Some(existing) = self.nodes.get(&a).and_then(|n| n.edge_to(b)) {
            if let Some(edge) = self.edges.get_mut(&existing) {
                edge.age = 0;
            }
            return Ok(existing);
        }

        for id in [a, b] {
            if let Some(node) = self.detached.remove(&id) {
                self.nodes.insert(id, node);
            }
        }

        let id = EdgeId(self.next_edge_id);
        self.next_edge_id += 1;
        self.edges.insert(id, Edge::new(id, a, b));
        if let Some(node) = self.nodes.get_mut(&a) {
            node.neighbors.insert(b, id);
        }
        if let Some(node) = self.nodes.get_mut(&b) {
            node.neighbors.insert(a, id);
        }
        Ok(id)
    }

    /// Remove an edge. Returns `None` if it is not in the graph, otherwise
    /// the endpoints that lost their last edge and were removed with it.
    pub fn remove_edge(&mut self, id: EdgeId) -> Option<RemovedNodes> {
        let edge = self.edges.remove(&id)?;
        let (a, b) = edge.endpoints;
        let mut removed = RemovedNodes::new();

        for (this, other) in [(a, b), (b, a)] {
            let orphaned = match self.nodes.get_mut(&this) {
                Some(node) => {
                    node.neighbors.remove(&other);
                    node.neighbors.is_empty()
                }
                None => false,
            };
            if orphaned {
                self.nodes.remove(&this);
                removed.push(this);
            }
        }

        if !removed.is_empty() {
            tracing::debug!(edge = %id, nodes = ?removed.as_slice(), "isolated nodes removed");
        }
        Some(removed)
    }

    /// Remove the edge joining `a` and `b`, if there is one.
    pub fn remove_edge_between(&mut self, a: NodeId, b: NodeId) -> Option<RemovedNodes> {
        let id = self.nodes.get(&a)?.edge_to(b)?;
        self.remove_edge(id)
    }

    /// Overwrite an edge's age. Used when restoring a saved network, where
    /// the stored age must survive the refresh performed on re-insertion.
    pub fn set_edge_age(&mut self, id: EdgeId, age: u64) -> Result<()> {
        let edge = self
            .edges
            .get_mut(&id)
            .ok_or(Error::EdgeNotFound(id))?;
        edge.age = age;
        Ok(())
    }

    /// Drop every node that was created but never attached. Returns how
    /// many were dropped.
    pub fn discard_detached(&mut self) -> usize {
        let dropped = self.detached.len();
        self.detached.clear();
        dropped
    }

    /// Increment the age of every edge incident to `node`.
    pub(crate) fn age_edges_of(&mut self, node: NodeId) {
        let Some(n) = self.nodes.get(&node) else { return };
        for edge_id in n.neighbors.values() {
            if let Some(edge) = self.edges.get_mut(edge_id) {
                edge.age += 1;
            }
        }
    }

    /// Ids of edges whose age exceeds `max_age`, in creation order.
    pub(crate) fn edges_older_than(&self, max_age: u64) -> Vec<EdgeId> {
        self.edges
            .values()
            .filter(|e| e.age > max_age)
            .map(|e| e.id)
            .collect()
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub(crate) fn nodes_mut(&mut self) -> impl Iterator<Item = &mut Node> {
        self.nodes.values_mut()
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Dimension of every position, once the first node has been created.
    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    pub fn contains_node(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Attached nodes in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Edges in creation order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge_between(&self, a: NodeId, b: NodeId) -> Option<&Edge> {
        let id = self.nodes.get(&a)?.edge_to(b)?;
        self.edges.get(&id)
    }

    /// Neighbours of `id` in creation order; empty if `id` is not attached.
    pub fn neighbors(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes.get(&id).map(Node::neighbor_ids).unwrap_or_default()
    }

    /// Check the invariants above and the agreement between adjacency maps
    /// and the edge set.
    pub fn check_invariants(&self) -> Result<()> {
        let violation = |msg: String| Err(Error::InvariantViolation(msg));

        for node in self.nodes.values() {
            if node.neighbors.is_empty() {
                return violation(format!("node {} has no edges", node.id));
            }
            if Some(node.dimension()) != self.dimension {
                return violation(format!(
                    "node {} has dimension {}, graph has {:?}",
                    node.id,
                    node.dimension(),
                    self.dimension
                ));
            }
            for (other, edge_id) in &node.neighbors {
                match self.edges.get(edge_id) {
                    Some(edge) if edge.connects(node.id, *other) => {}
                    _ => {
                        return violation(format!(
                            "node {} lists edge {edge_id} to {other}, which does not join them",
                            node.id
                        ));
                    }
                }
            }
        }

        let mut pairs = hashbrown::HashSet::with_capacity(self.edges.len());
        for edge in self.edges.values() {
            let (a, b) = edge.endpoints;
            if a == b {
                return violation(format!("edge {} is a self-loop", edge.id));
            }
            if !self.nodes.contains_key(&a) || !self.nodes.contains_key(&b) {
                return violation(format!("edge {} has an endpoint outside the graph", edge.id));
            }
            if !pairs.insert(edge.endpoints) {
                return violation(format!("more than one edge joins {a} and {b}"));
            }
        }

        let listed: usize = self.nodes.values().map(Node::degree).sum();
        if listed != 2 * self.edges.len() {
            return violation(format!(
                "adjacency lists hold {listed} entries for {} edges",
                self.edges.len()
            ));
        }
        Ok(())
    }
}

fn random_position<R: Rng + ?Sized>(dimension: usize, rng: &mut R) -> Vec<f64> {
    (0..dimension).map(|_| rng.gen_range(0.0..1.0)).collect()
}

// ============================================================================
// Tests
// ============================================================================
