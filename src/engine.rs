//! # GNG Engine
//!
//! Drives the per-signal update cycle against a [`Graph`]:
//!
//! ```text
//! signal x ─► find s1, s2 ─► age s1's edges ─► s1.error += |x - s1|
//!          ─► adapt s1 (ethag) and its neighbours (ethav)
//!          ─► join s1–s2 ─► prune edges older than amax
//!          ─► [t mod tau == 0] insert a node between q and r
//!          ─► decay every error by delta ─► t += 1
//! ```
//!
//! Every scan visits nodes in creation order and only replaces its current
//! best on strict improvement, so ties resolve to the oldest node.

use smallvec::SmallVec;

use crate::config::GngConfig;
use crate::graph::Graph;
use crate::model::*;
use crate::signal::SignalSource;
use crate::{Error, Result};

// ============================================================================
// Reports
// ============================================================================

/// What happened during one update cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Value of `t` for this cycle.
    pub iteration: u64,
    pub winner: NodeId,
    pub second: NodeId,
    pub pruned_edges: usize,
    /// Nodes dropped because pruning left them without edges.
    pub removed_nodes: SmallVec<[NodeId; 4]>,
    /// Node created by this cycle's insertion, if it was an insertion cycle.
    pub inserted: Option<NodeId>,
}

/// Totals for one call to [`GngEngine::run`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub cycles: u64,
    pub insertions: u64,
    pub nodes: usize,
    pub edges: usize,
}

// ============================================================================
// GngEngine
// ============================================================================

pub struct GngEngine {
    graph: Graph,
    config: GngConfig,
    /// Next cycle number; starts at 1.
    iteration: u64,
}

impl GngEngine {
    /// Build an engine over an existing graph (seeded or restored).
    pub fn new(config: GngConfig, graph: Graph) -> Result<Self> {
        config.validate()?;
        if graph.node_count() < 2 {
            return Err(Error::InvariantViolation(format!(
                "engine needs at least two connected nodes, graph has {}",
                graph.node_count()
            )));
        }
        graph.check_invariants()?;
        Ok(Self { graph, config, iteration: 1 })
    }

    /// Resume the cycle counter, e.g. from a snapshot.
    pub fn with_iteration(mut self, iteration: u64) -> Self {
        self.iteration = iteration.max(1);
        self
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The `t` the next cycle will run with.
    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    /// Dimension every signal must have.
    pub fn dimension(&self) -> usize {
        self.graph.dimension().unwrap_or_default()
    }

    // ========================================================================
    // One cycle
    // ========================================================================

    /// Process one signal. A signal of the wrong dimension, or with a NaN
    /// or infinite component, is rejected before anything is touched.
    pub fn step(&mut self, signal: &[f64]) -> Result<StepReport> {
        let expected = self.dimension();
        if signal.len() != expected {
            return Err(Error::DimensionMismatch { expected, got: signal.len() });
        }
        if let Some((index, &value)) = signal.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(Error::NonFiniteSignal { index, value });
        }
        let t = self.iteration;

        let (winner, second, winner_dist) = self.find_winners(signal)?;

        self.graph.age_edges_of(winner);

        let neighbors = self.graph.neighbors(winner);
        if let Some(node) = self.graph.node_mut(winner) {
            // squared distance from the search, taken before the move below
            node.error += winner_dist.sqrt();
            move_toward(&mut node.position, signal, self.config.ethag);
        }
        for id in neighbors {
            if let Some(node) = self.graph.node_mut(id) {
                move_toward(&mut node.position, signal, self.config.ethav);
            }
        }

        self.graph.add_or_refresh_edge(winner, second)?;

        let mut pruned_edges = 0;
        let mut removed_nodes: SmallVec<[NodeId; 4]> = SmallVec::new();
        for edge in self.graph.edges_older_than(self.config.amax) {
            if let Some(removed) = self.graph.remove_edge(edge) {
                pruned_edges += 1;
                removed_nodes.extend(removed);
            }
        }

        let inserted = if t % self.config.tau == 0 {
            Some(self.insert_node()?)
        } else {
            None
        };

        for node in self.graph.nodes_mut() {
            node.error *= self.config.delta;
        }

        self.iteration += 1;

        debug_assert!(self.graph.check_invariants().is_ok());
        tracing::trace!(
            t,
            winner = %winner,
            second = %second,
            pruned_edges,
            nodes = self.graph.node_count(),
            "cycle complete"
        );

        Ok(StepReport {
            iteration: t,
            winner,
            second,
            pruned_edges,
            removed_nodes,
            inserted,
        })
    }

    /// Nearest and second-nearest node, plus the nearest squared distance.
    fn find_winners(&self, signal: &[f64]) -> Result<(NodeId, NodeId, f64)> {
        let mut first: Option<(NodeId, f64)> = None;
        let mut second: Option<(NodeId, f64)> = None;

        for node in self.graph.nodes() {
            let d = squared_distance(&node.position, signal);
            match first {
                Some((_, d1)) if d >= d1 => {
                    if second.is_none_or(|(_, d2)| d < d2) {
                        second = Some((node.id, d));
                    }
                }
                _ => {
                    second = first;
                    first = Some((node.id, d));
                }
            }
        }

        match (first, second) {
            (Some((s1, d1)), Some((s2, _))) => Ok((s1, s2, d1)),
            _ => Err(Error::InvariantViolation(format!(
                "need two nodes to pick winners, graph has {}",
                self.graph.node_count()
            ))),
        }
    }

    /// Split the edge between the highest-error node `q` and its
    /// highest-error neighbour `r` with a new node at their midpoint.
    fn insert_node(&mut self) -> Result<NodeId> {
        let q = max_error(self.graph.nodes())
            .ok_or_else(|| Error::InvariantViolation("insertion into an empty graph".into()))?;
        let r = max_error(
            self.graph
                .neighbors(q)
                .into_iter()
                .filter_map(|id| self.graph.node(id)),
        )
        .ok_or_else(|| Error::InvariantViolation(format!("node {q} has no neighbours")))?;

        let alpha = self.config.alpha;
        let vanished = |id: NodeId| Error::InvariantViolation(format!("node {id} vanished"));

        let q_node = self.graph.node_mut(q).ok_or_else(|| vanished(q))?;
        q_node.error *= alpha;
        let (q_pos, q_err) = (q_node.position.clone(), q_node.error);

        let r_node = self.graph.node_mut(r).ok_or_else(|| vanished(r))?;
        r_node.error *= alpha;
        let mid = midpoint(&q_pos, &r_node.position);

        // x is attached before q–r goes so neither endpoint is ever orphaned
        let x = self.graph.create_node(mid, q_err)?;
        self.graph.add_or_refresh_edge(q, x)?;
        self.graph.add_or_refresh_edge(r, x)?;
        self.graph.remove_edge_between(q, r);

        tracing::debug!(q = %q, r = %r, x = %x, error = q_err, "node inserted");
        Ok(x)
    }

    // ========================================================================
    // Run loop
    // ========================================================================

    /// Consume signals until the source is exhausted or `max_iterations`
    /// cycles have run. `on_snapshot` is called between cycles every
    /// `snapshot_interval` cycles with the graph and the next `t`.
    pub fn run<S, F>(&mut self, source: &mut S, mut on_snapshot: F) -> Result<RunSummary>
    where
        S: SignalSource + ?Sized,
        F: FnMut(&Graph, u64) -> Result<()>,
    {
        tracing::info!(
            dimension = self.dimension(),
            nodes = self.graph.node_count(),
            edges = self.graph.edge_count(),
            t = self.iteration,
            "starting run"
        );

        let mut summary = RunSummary::default();
        loop {
            if self.config.max_iterations.is_some_and(|max| summary.cycles >= max) {
                tracing::info!(cycles = summary.cycles, "iteration limit reached");
                break;
            }
            let Some(signal) = source.next_signal()? else {
                break;
            };

            let report = self.step(&signal)?;
            summary.cycles += 1;
            if report.inserted.is_some() {
                summary.insertions += 1;
            }

            if let Some(every) = self.config.snapshot_interval
                && summary.cycles % every == 0
            {
                on_snapshot(&self.graph, self.iteration)?;
            }
        }

        summary.nodes = self.graph.node_count();
        summary.edges = self.graph.edge_count();
        tracing::info!(
            cycles = summary.cycles,
            insertions = summary.insertions,
            nodes = summary.nodes,
            edges = summary.edges,
            "run finished"
        );
        Ok(summary)
    }
}

/// First node with the strictly largest error.
fn max_error<'a>(nodes: impl Iterator<Item = &'a Node>) -> Option<NodeId> {
    let mut best: Option<&Node> = None;
    for node in nodes {
        if best.is_none_or(|b| node.error > b.error) {
            best = Some(node);
        }
    }
    best.map(|n| n.id)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    /// Two nodes at fixed positions, joined.
    fn two_node_graph(a: Vec<f64>, b: Vec<f64>) -> (Graph, NodeId, NodeId) {
        let mut g = Graph::new();
        let na = g.create_node(a, 0.0).unwrap();
        let nb = g.create_node(b, 0.0).unwrap();
        g.add_or_refresh_edge(na, nb).unwrap();
        (g, na, nb)
    }

    fn config(tau: u64, amax: u64) -> GngConfig {
        GngConfig { tau, amax, ..Default::default() }
    }

    #[test]
    fn test_winner_moves_and_accumulates_error() {
        let (g, a, b) = two_node_graph(vec![0.1, 0.1], vec![0.9, 0.9]);
        let mut engine = GngEngine::new(config(100, 50), g).unwrap();

        let report = engine.step(&[0.0, 0.0]).unwrap();
        assert_eq!(report.iteration, 1);
        assert_eq!(report.winner, a);
        assert_eq!(report.second, b);
        assert_eq!(report.inserted, None);

        let na = engine.graph().node(a).unwrap();
        assert!((na.position[0] - 0.08).abs() < EPS);
        assert!((na.error - 0.02f64.sqrt() * 0.995).abs() < EPS);

        let nb = engine.graph().node(b).unwrap();
        assert!((nb.position[0] - (0.9 - 0.006 * 0.9)).abs() < EPS);
        assert_eq!(nb.error, 0.0);
        assert_eq!(engine.iteration(), 2);
    }

    #[test]
    fn test_tie_goes_to_oldest_node() {
        let (g, a, b) = two_node_graph(vec![0.0], vec![2.0]);
        let mut engine = GngEngine::new(config(100, 50), g).unwrap();
        let report = engine.step(&[1.0]).unwrap();
        assert_eq!(report.winner, a);
        assert_eq!(report.second, b);
    }

    #[test]
    fn test_dimension_mismatch_leaves_state_untouched() {
        let (g, a, _) = two_node_graph(vec![0.1, 0.1], vec![0.9, 0.9]);
        let mut engine = GngEngine::new(config(100, 50), g).unwrap();
        let before = engine.graph().node(a).unwrap().clone();

        let err = engine.step(&[0.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 2, got: 3 }));
        assert_eq!(engine.iteration(), 1);
        assert_eq!(engine.graph().node(a).unwrap(), &before);
    }

    #[test]
    fn test_non_finite_signal_leaves_state_untouched() {
        let (g, _, _) = two_node_graph(vec![0.0, 0.0], vec![1.0, 1.0]);
        let mut engine = GngEngine::new(config(100, 50), g).unwrap();
        let before = engine.graph().clone();

        let err = engine.step(&[f64::NAN, 0.0]).unwrap_err();
        assert!(matches!(err, Error::NonFiniteSignal { index: 0, .. }));
        let err = engine.step(&[0.0, f64::NEG_INFINITY]).unwrap_err();
        assert!(matches!(err, Error::NonFiniteSignal { index: 1, .. }));

        assert_eq!(engine.iteration(), 1);
        let after: Vec<&Node> = engine.graph().nodes().collect();
        assert_eq!(after, before.nodes().collect::<Vec<_>>());
        assert_eq!(
            engine.graph().edges().collect::<Vec<_>>(),
            before.edges().collect::<Vec<_>>()
        );

        // the engine keeps working on the next good signal
        assert!(engine.step(&[0.1, 0.1]).is_ok());
        engine.graph().check_invariants().unwrap();
    }

    #[test]
    fn test_insertion_transfers_decayed_error() {
        let (g, a, b) = two_node_graph(vec![0.0, 0.0], vec![1.0, 1.0]);
        let cfg = GngConfig { tau: 1, ethag: 0.0, ethav: 0.0, delta: 1.0, ..Default::default() };
        let mut engine = GngEngine::new(cfg, g).unwrap();

        let report = engine.step(&[-3.0, 0.0]).unwrap();
        let x = report.inserted.unwrap();

        // a wins with |x - a| = 3, so q = a and r = b
        let g = engine.graph();
        assert!((g.node(a).unwrap().error - 1.5).abs() < EPS);
        assert_eq!(g.node(b).unwrap().error, 0.0);
        assert!((g.node(x).unwrap().error - 1.5).abs() < EPS);
        assert_eq!(g.node(x).unwrap().position, vec![0.5, 0.5]);
        assert!(g.edge_between(a, b).is_none());
        assert!(g.edge_between(a, x).is_some());
        assert!(g.edge_between(b, x).is_some());
        assert_eq!(g.node_count(), 3);
        g.check_invariants().unwrap();
    }

    #[test]
    fn test_new_node_is_decayed_in_its_birth_cycle() {
        let (g, a, _) = two_node_graph(vec![0.0], vec![1.0]);
        let cfg = GngConfig { tau: 1, ethag: 0.0, ethav: 0.0, delta: 0.5, ..Default::default() };
        let mut engine = GngEngine::new(cfg, g).unwrap();

        let x = engine.step(&[-2.0]).unwrap().inserted.unwrap();
        // a: (0 + 2) * alpha * delta; x copies a's value before delta, then decays too
        let g = engine.graph();
        assert!((g.node(a).unwrap().error - 0.5).abs() < EPS);
        assert!((g.node(x).unwrap().error - 0.5).abs() < EPS);
    }

    #[test]
    fn test_aged_edges_are_pruned_with_their_isolated_nodes() {
        // a – b – c in a line; signals near a keep a–b fresh, b–c ages
        let mut g = Graph::new();
        let a = g.create_node(vec![0.0], 0.0).unwrap();
        let b = g.create_node(vec![1.0], 0.0).unwrap();
        let c = g.create_node(vec![10.0], 0.0).unwrap();
        g.add_or_refresh_edge(a, b).unwrap();
        g.add_or_refresh_edge(b, c).unwrap();
        let cfg = GngConfig { amax: 1, ethag: 0.0, ethav: 0.0, ..Default::default() };
        let mut engine = GngEngine::new(cfg, g).unwrap();

        // b wins twice: b–c reaches age 2 > amax on the second cycle
        let first = engine.step(&[0.9]).unwrap();
        assert_eq!(first.pruned_edges, 0);
        let second = engine.step(&[0.9]).unwrap();
        assert_eq!(second.winner, b);
        assert_eq!(second.pruned_edges, 1);
        assert_eq!(second.removed_nodes.as_slice(), &[c]);
        assert!(!engine.graph().contains_node(c));
        assert!(engine.graph().edges().all(|e| e.age <= 1));
    }

    #[test]
    fn test_engine_rejects_single_node_graph() {
        assert!(GngEngine::new(GngConfig::default(), Graph::new()).is_err());
    }

    #[test]
    fn test_run_respects_max_iterations_and_snapshot_interval() {
        let (g, _, _) = two_node_graph(vec![0.0], vec![1.0]);
        let cfg = GngConfig {
            tau: 3,
            max_iterations: Some(7),
            snapshot_interval: Some(2),
            ..Default::default()
        };
        let mut engine = GngEngine::new(cfg, g).unwrap();
        let mut source = (0..).map(|i| vec![(i % 10) as f64 / 10.0]);

        let mut seen = Vec::new();
        let summary = engine
            .run(&mut source, |_, t| {
                seen.push(t);
                Ok(())
            })
            .unwrap();

        assert_eq!(summary.cycles, 7);
        assert_eq!(summary.insertions, 2);
        assert_eq!(seen, vec![3, 5, 7]);
        assert_eq!(engine.iteration(), 8);
    }
}
