//! Integration tests for the engine and graph contracts:
//! boundedness, determinism, stabilization, recall, locality.

use approx::assert_abs_diff_eq;
use proptest::prelude::*;
use rcxi_core::vector::{distance, norm};
use rcxi_core::{
    Embedder, EngineConfig, GraphConfig, HashEmbedder, IdentityGlyph, PropagationGraph, Session,
    StateEngine, Topology,
};

fn quiet_config(dimension: usize) -> EngineConfig {
    EngineConfig::new(dimension, 0.85, 0.0, 0.05, 50)
}

/// Boundedness with the default (noisy) configuration over many steps.
#[test]
fn state_norm_never_exceeds_ceiling() {
    let mut engine = StateEngine::with_seed(EngineConfig::default(), 42).unwrap();
    let embedder = HashEmbedder::new(engine.dimension());
    let texts = ["spiral", "fold", "return", "spiral again", "unfold"];
    for i in 0..200 {
        let mut x = embedder.embed(texts[i % texts.len()]);
        // Inputs well outside the unit ball
        for v in &mut x {
            *v *= 40.0;
        }
        let state = engine.recursive_update(&x, "bounded").unwrap();
        assert!(norm(&state.vector) <= 1.0 + 1e-12);
    }
}

#[test]
fn identical_inputs_identical_trajectories() {
    let inputs: Vec<Vec<f64>> = (0..30)
        .map(|i| (0..6).map(|j| ((i * 7 + j) as f64 * 0.37).sin()).collect())
        .collect();
    let run = || {
        let mut engine = StateEngine::with_seed(quiet_config(6), 42).unwrap();
        let mut states = Vec::new();
        let mut tensions = Vec::new();
        let mut glyphs = Vec::new();
        for x in &inputs {
            states.push(engine.recursive_update(x, "det").unwrap().vector);
            tensions.push(engine.measure_tension().xi);
            glyphs.push(engine.form_glyph("det"));
        }
        (states, tensions, glyphs)
    };
    assert_eq!(run(), run());
}

#[test]
fn repeated_input_stabilizes_tension() {
    let mut engine = StateEngine::with_seed(quiet_config(8), 42).unwrap();
    let x = [0.2, -0.1, 0.3, 0.05, 0.0, 0.1, -0.2, 0.15];
    let mut tensions = Vec::new();
    for _ in 0..10 {
        engine.recursive_update(&x, "same").unwrap();
        tensions.push(engine.measure_tension().xi);
    }
    assert!(tensions.iter().all(|t| *t >= 0.0));
    assert!(tensions[9] < tensions[1], "{tensions:?}");
}

#[test]
fn converging_sequence_recalls_fixed_point() {
    let p = [0.3, -0.2, 0.4, 0.1];
    let mut engine = StateEngine::with_seed(quiet_config(4), 42).unwrap();
    for _ in 0..60 {
        engine.recursive_update(&p, "fixed point").unwrap();
        engine.measure_tension();
    }
    let attractors = engine.detect_attractors();
    assert!(!attractors.is_empty());
    let tolerance = 0.05 * norm(&p);
    assert!(
        attractors.iter().any(|a| distance(&a.centroid, &p) < tolerance),
        "no attractor near {p:?}: {attractors:?}"
    );
}

#[test]
fn convergence_sentinel_before_attractors() {
    let mut engine = StateEngine::with_seed(quiet_config(3), 42).unwrap();
    assert_eq!(engine.check_convergence(), (false, f64::INFINITY));
    engine.recursive_update(&[0.1, 0.2, 0.3], "one").unwrap();
    engine.recursive_update(&[0.3, 0.2, 0.1], "two").unwrap();
    // Two states cannot form a cluster of three
    let (converging, distance) = engine.check_convergence();
    assert!(!converging);
    assert!(distance.is_infinite() && distance > 0.0);
}

#[test]
fn glyph_tracks_tension_history() {
    let history = [0.02, 0.11, 0.07, 0.3, 0.01, 0.05];
    let a = IdentityGlyph::from_tensions(&history, 50, 5);
    let b = IdentityGlyph::from_tensions(&history, 50, 5);
    assert_eq!(a.spectrum_peaks, b.spectrum_peaks);

    let mut changed = history;
    changed[3] = 0.31;
    let c = IdentityGlyph::from_tensions(&changed, 50, 5);
    assert_ne!(a.spectrum_peaks, c.spectrum_peaks);
}

#[test]
fn chain_locality_decay() {
    let coordinates = (0..10).map(|i| [i as f64, 0.0, 0.0, 0.0, 0.0]).collect();
    let config = GraphConfig::new(10, Topology::NearestNeighbor { k: 1 }, 0.5);
    let mut graph = PropagationGraph::with_coordinates(config, coordinates).unwrap();
    let activations = graph.propagate_thought(0, 1.0, 3, 1e-9).unwrap();
    assert!(activations[1] > activations[9]);
    assert_abs_diff_eq!(activations[1], 0.25, epsilon = 1e-12);
}

#[test]
fn explicit_chain_matches_generated_chain() {
    let edges = (0..9).map(|i| (i, i + 1, 1.0)).collect();
    let config = GraphConfig::new(10, Topology::Explicit { edges }, 0.5);
    let mut graph = PropagationGraph::new(config).unwrap();
    let activations = graph.propagate_thought(0, 1.0, 3, 1e-9).unwrap();
    assert_abs_diff_eq!(activations[1], 0.25, epsilon = 1e-12);
    assert_eq!(activations[9], 0.0);
}

#[test]
fn session_drives_engine_and_graph_together() {
    let mut session = Session::new(
        EngineConfig::new(32, 0.85, 0.0, 0.05, 20),
        GraphConfig::new(12, Topology::default(), 0.5),
        HashEmbedder::new(32),
        Some(42),
    )
    .unwrap();
    for line in ["the web trembles", "a thread pulls taut", "the web trembles"] {
        session.step(line).unwrap();
    }
    let record = session.snapshot().to_record();
    assert!(record.tension >= 0.0);
    assert!((0.0..=1.0).contains(&record.mean_activation));
    assert!(record.stability <= 1.0);
    assert!(record.glyph_peaks.len() <= 5);
}

proptest! {
    #[test]
    fn prop_norm_bounded(
        inputs in prop::collection::vec(prop::collection::vec(-100.0f64..100.0, 4), 1..40),
        seed in any::<u64>(),
        ceiling in 0.1f64..5.0,
    ) {
        let mut config = EngineConfig::new(4, 0.7, 0.01, 0.05, 16);
        config.norm_ceiling = ceiling;
        let mut engine = StateEngine::with_seed(config, seed).unwrap();
        for x in &inputs {
            let state = engine.recursive_update(x, "prop").unwrap();
            prop_assert!(norm(&state.vector) <= ceiling * (1.0 + 1e-12));
            prop_assert!(engine.measure_tension().xi >= 0.0);
        }
    }

    #[test]
    fn prop_activations_stay_in_unit_interval(
        initial in prop::collection::vec(0.0f64..=1.0, 2..16),
        topology_seed in any::<u64>(),
        density in 0.0f64..=1.0,
        signal in -5.0f64..5.0,
        max_iterations in 0usize..12,
        origin in any::<prop::sample::Index>(),
    ) {
        let n = initial.len();
        let config = GraphConfig::new(
            n,
            Topology::FixedRandom { seed: topology_seed, density },
            0.5,
        );
        let mut graph = PropagationGraph::new(config).unwrap();
        for (i, a) in initial.iter().enumerate() {
            graph.set_activation(i, *a).unwrap();
        }
        let origin = origin.index(n);
        for iterations in 0..=max_iterations {
            let mut g = graph.clone();
            let activations = g.propagate_thought(origin, signal, iterations, 0.0).unwrap();
            prop_assert!(activations.iter().all(|a| (0.0..=1.0).contains(a)));
        }
    }
}
