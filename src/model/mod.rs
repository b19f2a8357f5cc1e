//! # Network Model
//!
//! Plain DTOs for the neural gas network: reference vectors (nodes) and
//! the aged adjacency edges between them.
//!
//! Design rule: no graph bookkeeping here. Invariants that span several
//! nodes or edges are enforced by [`crate::graph::Graph`], which is the
//! only type allowed to create or destroy these values.

pub mod node;
pub mod edge;
pub mod vector;

pub use node::{Node, NodeId};
pub use edge::{Edge, EdgeId};
pub use vector::{midpoint, move_toward, squared_distance};
