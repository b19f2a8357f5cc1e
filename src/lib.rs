//! # gng-rs — Growing Neural Gas
//!
//! Unsupervised, incremental topology learning. A stream of real-valued
//! vectors ("signals") is fed one at a time into a graph whose nodes
//! approximate the signal distribution and whose edges capture local
//! adjacency.
//!
//! ## Design Principles
//!
//! 1. **Graph owns everything**: nodes and edges live in an id-addressed arena,
//!    and only `Graph` methods create or destroy them
//! 2. **Deterministic scans**: ids grow monotonically and every search walks
//!    them in order, so ties resolve the same way on every run
//! 3. **I/O at the edges**: signal sources and the snapshot codec are plain
//!    collaborators of the engine, not part of it
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use gng_rs::{GngConfig, GngEngine, Graph, Snapshot};
//! use rand::SeedableRng;
//!
//! # fn example() -> gng_rs::Result<()> {
//! let mut rng = rand::rngs::StdRng::seed_from_u64(7);
//! let graph = Graph::seeded(2, &mut rng)?;
//! let mut engine = GngEngine::new(GngConfig::default(), graph)?;
//!
//! let mut signals = (0..10_000).map(|i| {
//!     let a = i as f64 * 0.01;
//!     vec![a.cos(), a.sin()]
//! });
//! engine.run(&mut signals, |_, _| Ok(()))?;
//!
//! let snapshot = Snapshot::capture(engine.graph(), engine.iteration());
//! println!("{}", snapshot.to_json(true)?);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod graph;
pub mod config;
pub mod engine;
pub mod signal;
pub mod snapshot;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{Node, NodeId, Edge, EdgeId};
pub use graph::Graph;
pub use config::GngConfig;
pub use engine::{GngEngine, StepReport, RunSummary};
pub use signal::{SignalSource, CsvSignalSource};
pub use snapshot::{Snapshot, NodeRecord, EdgeRecord};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed signal on line {line}: {message}")]
    MalformedSignal { line: usize, message: String },

    #[error("Dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("Signal component {index} is not finite: {value}")]
    NonFiniteSignal { index: usize, value: f64 },

    #[error("Vectors must have at least one component")]
    ZeroDimension,

    #[error("Input contains no signals")]
    EmptyInput,

    #[error("Invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Edge not found: {0}")]
    EdgeNotFound(EdgeId),

    #[error("Edge from node {0} to itself")]
    SelfLoop(NodeId),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
