//! Snapshot codec — save and restore the network as JSON.
//!
//! ```text
//! Graph ─► Snapshot::capture() ─► JSON ─► Snapshot::from_json() ─► restore() ─► Graph
//! ```
//!
//! Layout:
//!
//! ```json
//! {
//!   "iteration": 201,
//!   "nodes": { "0": { "position": [0.1, 0.2], "error": 0.03 } },
//!   "edges": { "0": { "nodes": ["0", "1"], "age": 4 } }
//! }
//! ```
//!
//! Ids are renumbered from 0 at capture time in creation order, so the
//! same network always produces the same document. Edges name their nodes
//! by those ids, written as decimal strings like the map keys. Periodic snapshots are
//! written compact, one document per line (JSON Lines).

use std::collections::BTreeMap;
use std::io::{Read, Write};

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};

use crate::graph::Graph;
use crate::model::NodeId;
use crate::{Error, Result};

/// Stored form of one node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRecord {
    pub position: Vec<f64>,
    pub error: f64,
}

/// Stored form of one edge: the ids of its two nodes and its age.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    #[serde(with = "id_pair")]
    pub nodes: [u64; 2],
    pub age: u64,
}

/// A flat, serializable image of a [`Graph`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// The `t` of the next cycle.
    #[serde(default = "first_iteration")]
    pub iteration: u64,
    pub nodes: BTreeMap<u64, NodeRecord>,
    pub edges: BTreeMap<u64, EdgeRecord>,
}

fn first_iteration() -> u64 {
    1
}

/// `[3, 7]` <-> `["3", "7"]`
mod id_pair {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(pair: &[u64; 2], s: S) -> Result<S::Ok, S::Error> {
        [pair[0].to_string(), pair[1].to_string()].serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u64; 2], D::Error> {
        let [a, b] = <[String; 2]>::deserialize(d)?;
        let parse = |id: &str| {
            id.parse::<u64>()
                .map_err(|_| D::Error::custom(format!("invalid node id {id:?}")))
        };
        Ok([parse(&a)?, parse(&b)?])
    }
}

impl Snapshot {
    /// Capture the graph, renumbering nodes and edges from 0.
    pub fn capture(graph: &Graph, iteration: u64) -> Self {
        let mut labels: HashMap<NodeId, u64> = HashMap::with_capacity(graph.node_count());
        let mut nodes = BTreeMap::new();
        for (label, node) in (0u64..).zip(graph.nodes()) {
            labels.insert(node.id, label);
            nodes.insert(
                label,
                NodeRecord { position: node.position.clone(), error: node.error },
            );
        }

        let mut edges = BTreeMap::new();
        for (label, edge) in (0u64..).zip(graph.edges()) {
            let (a, b) = edge.endpoints;
            // endpoints of a live edge are always attached, so both have labels
            if let (Some(&a), Some(&b)) = (labels.get(&a), labels.get(&b)) {
                edges.insert(label, EdgeRecord { nodes: [a, b], age: edge.age });
            }
        }

        Self { iteration, nodes, edges }
    }

    /// Rebuild a graph. Nodes are created first, then every edge is
    /// re-established through [`Graph::add_or_refresh_edge`] and its stored
    /// age forced back on.
    pub fn restore(&self) -> Result<Graph> {
        if self.edges.is_empty() {
            return Err(Error::InvalidSnapshot("snapshot has no edges".into()));
        }

        let mut graph = Graph::new();
        let mut ids: HashMap<u64, NodeId> = HashMap::with_capacity(self.nodes.len());
        for (&label, record) in &self.nodes {
            if !record.error.is_finite() || record.error < 0.0 {
                return Err(Error::InvalidSnapshot(format!(
                    "node {label} has invalid error {}",
                    record.error
                )));
            }
            if record.position.iter().any(|x| !x.is_finite()) {
                return Err(Error::InvalidSnapshot(format!(
                    "node {label} has a non-finite coordinate"
                )));
            }
            let id = graph
                .create_node(record.position.clone(), record.error)
                .map_err(|e| Error::InvalidSnapshot(format!("node {label}: {e}")))?;
            ids.insert(label, id);
        }

        for (&label, record) in &self.edges {
            let [a, b] = record.nodes;
            let lookup = |n: u64| {
                ids.get(&n).copied().ok_or_else(|| {
                    Error::InvalidSnapshot(format!("edge {label} references unknown node {n}"))
                })
            };
            let (a, b) = (lookup(a)?, lookup(b)?);
            if a == b {
                return Err(Error::InvalidSnapshot(format!("edge {label} is a self-loop")));
            }
            if graph.edge_between(a, b).is_some() {
                return Err(Error::InvalidSnapshot(format!(
                    "edge {label} duplicates an earlier edge"
                )));
            }
            let edge = graph.add_or_refresh_edge(a, b)?;
            graph
                .set_edge_age(edge, record.age)
                .map_err(|e| Error::InvalidSnapshot(format!("edge {label}: {e}")))?;
        }

        let dropped = graph.discard_detached();
        if dropped > 0 {
            tracing::warn!(dropped, "snapshot nodes without edges were discarded");
        }
        Ok(graph)
    }

    // ========================================================================
    // JSON
    // ========================================================================

    pub fn to_json(&self, pretty: bool) -> Result<String> {
        Ok(if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|e| Error::InvalidSnapshot(e.to_string()))
    }

    /// Write the document followed by a newline.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W, pretty: bool) -> Result<()> {
        writeln!(writer, "{}", self.to_json(pretty)?)?;
        Ok(())
    }
}
