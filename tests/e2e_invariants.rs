//! Property tests: graph invariants hold after every cycle for arbitrary
//! signal streams and parameters.

use proptest::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use gng_rs::model::squared_distance;
use gng_rs::{GngConfig, GngEngine, Graph};

fn signals(dim: usize) -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(-2.0f64..2.0, dim), 1..300)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn invariants_hold_after_every_cycle(
        seed in any::<u64>(),
        tau in 1u64..20,
        amax in 0u64..10,
        stream in signals(2),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let graph = Graph::seeded(2, &mut rng).unwrap();
        let config = GngConfig { tau, amax, ..Default::default() };
        let mut engine = GngEngine::new(config, graph).unwrap();

        for x in &stream {
            engine.step(x).unwrap();
            let g = engine.graph();
            prop_assert!(g.check_invariants().is_ok(), "{:?}", g.check_invariants());
            prop_assert!(g.node_count() >= 2);
            prop_assert!(g.nodes().all(|n| n.degree() >= 1));
            prop_assert!(g.nodes().all(|n| n.position.len() == 2));
            prop_assert!(g.edges().all(|e| e.age <= amax));
            prop_assert!(g.nodes().all(|n| n.error >= 0.0));
        }
    }

    #[test]
    fn refresh_always_resets_age(age in any::<u64>(), swap in any::<bool>()) {
        let mut g = Graph::new();
        let a = g.create_node(vec![0.0], 0.0).unwrap();
        let b = g.create_node(vec![1.0], 0.0).unwrap();
        let id = g.add_or_refresh_edge(a, b).unwrap();
        g.set_edge_age(id, age).unwrap();

        let again = if swap { g.add_or_refresh_edge(b, a) } else { g.add_or_refresh_edge(a, b) };
        prop_assert_eq!(again.unwrap(), id);
        prop_assert_eq!(g.edge(id).unwrap().age, 0);
        prop_assert_eq!(g.edge_count(), 1);
    }

    #[test]
    fn non_insertion_cycle_decays_each_error_once(
        seed in any::<u64>(),
        delta in 0.5f64..1.0,
        warmup in signals(3),
        x in prop::collection::vec(-1.0f64..1.0, 3),
    ) {
        let mut rng = StdRng::seed_from_u64(seed);
        let graph = Graph::seeded(3, &mut rng).unwrap();
        let config = GngConfig { tau: 7, delta, ..Default::default() };
        let mut engine = GngEngine::new(config, graph).unwrap();
        for s in &warmup {
            engine.step(s).unwrap();
        }
        // skip ahead to a cycle that does not insert
        while engine.iteration() % 7 == 0 {
            engine.step(&x).unwrap();
        }

        let before: Vec<_> = engine
            .graph()
            .nodes()
            .map(|n| (n.id, n.error, squared_distance(&n.position, &x)))
            .collect();
        let report = engine.step(&x).unwrap();
        prop_assert!(report.inserted.is_none());

        for (id, error, dist) in before {
            let Some(node) = engine.graph().node(id) else { continue };
            let gained = if id == report.winner { dist.sqrt() } else { 0.0 };
            let expected = (error + gained) * delta;
            prop_assert!((node.error - expected).abs() <= 1e-12 * expected.max(1.0));
        }
    }
}
