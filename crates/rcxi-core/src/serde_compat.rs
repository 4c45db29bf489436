//! JSON serde for the v1 session wire format.
//!
//! camelCase field names. Engine buffers are exported in full so a session
//! resumes exactly where it stopped; the RNG stream is not exported and is
//! re-seeded on import. Infinite convergence distances are written as `null`.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{EngineConfig, GraphConfig};
use crate::engine::StateEngine;
use crate::error::{RcxiError, Result};
use crate::graph::{PropagationGraph, SpiderwebEdge, SpiderwebNode};
use crate::state::{RecursiveState, Ring, TensionMeasure};
use crate::time::now_iso8601;
use crate::vector::first_non_finite;

pub const CURRENT_VERSION: &str = "1";

// --- Wire format types ---

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireExport {
    pub version: String,
    #[serde(default)]
    pub exported_at: String,
    pub id: Uuid,
    pub engine: WireEngine,
    #[serde(default)]
    pub graph: Option<WireGraph>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireEngine {
    pub config: EngineConfig,
    pub current: Vec<f64>,
    pub history: Vec<RecursiveState>,
    #[serde(default)]
    pub tensions: Vec<TensionMeasure>,
    #[serde(default)]
    pub distances: Vec<Option<f64>>,
    pub next_sequence: u64,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct WireGraph {
    pub config: GraphConfig,
    pub nodes: Vec<SpiderwebNode>,
    pub edges: Vec<SpiderwebEdge>,
}

/// A decoded session: id, engine and (optionally) the graph it drove.
/// The graph is returned without the engine attached.
#[derive(Debug)]
pub struct ImportedSession {
    pub id: Uuid,
    pub engine: StateEngine,
    pub graph: Option<PropagationGraph>,
}

// --- Conversion ---

impl WireEngine {
    pub fn from_engine(engine: &StateEngine) -> Self {
        Self {
            config: engine.config.clone(),
            current: engine.current.clone(),
            history: engine.history.iter().cloned().collect(),
            tensions: engine.tensions.iter().copied().collect(),
            distances: engine
                .distances
                .iter()
                .map(|d| d.is_finite().then_some(*d))
                .collect(),
            next_sequence: engine.next_sequence,
        }
    }

    /// Rebuild an engine around `rng`. Buffers longer than the window keep
    /// their newest entries.
    pub fn into_engine(self, rng: SmallRng) -> Result<StateEngine> {
        let mut engine = StateEngine::new(self.config, rng)?;
        let d = engine.dimension();

        check_vector(&self.current, d, self.next_sequence)?;
        engine.check_within_ceiling(&self.current, self.next_sequence)?;
        for state in &self.history {
            check_vector(&state.vector, d, state.sequence_index)?;
            engine.check_within_ceiling(&state.vector, state.sequence_index)?;
        }
        let last_sequence = self.history.last().map_or(0, |s| s.sequence_index);
        if self.next_sequence <= last_sequence {
            return Err(RcxiError::Wire(format!(
                "next sequence {} does not follow last state {}",
                self.next_sequence, last_sequence
            )));
        }
        if self.tensions.iter().any(|t| !(t.xi >= 0.0 && t.xi.is_finite())) {
            return Err(RcxiError::Wire("tension values must be finite and non-negative".into()));
        }

        let window = engine.config.history_window;
        engine.history = fill_ring(window, self.history);
        engine.tensions = fill_ring(window, self.tensions);
        engine.distances = fill_ring(
            window,
            self.distances
                .into_iter()
                .map(|d| d.unwrap_or(f64::INFINITY)),
        );
        engine.current = self.current;
        engine.next_sequence = self.next_sequence;
        Ok(engine)
    }
}

impl WireGraph {
    pub fn from_graph(graph: &PropagationGraph) -> Self {
        Self {
            config: graph.config().clone(),
            nodes: graph.nodes().to_vec(),
            edges: graph.edges(),
        }
    }

    pub fn into_graph(self) -> Result<PropagationGraph> {
        PropagationGraph::from_parts(self.config, self.nodes, &self.edges)
    }
}

impl WireExport {
    pub fn new(id: Uuid, engine: &StateEngine, graph: Option<&PropagationGraph>) -> Self {
        Self {
            version: CURRENT_VERSION.to_string(),
            exported_at: now_iso8601(),
            id,
            engine: WireEngine::from_engine(engine),
            graph: graph.map(WireGraph::from_graph),
        }
    }

    pub fn into_session(self, rng: SmallRng) -> Result<ImportedSession> {
        if self.version != CURRENT_VERSION {
            return Err(RcxiError::Wire(format!(
                "unsupported version {:?}, expected {CURRENT_VERSION:?}",
                self.version
            )));
        }
        let engine = self.engine.into_engine(rng)?;
        let graph = self.graph.map(WireGraph::into_graph).transpose()?;
        Ok(ImportedSession {
            id: self.id,
            engine,
            graph,
        })
    }
}

fn check_vector(v: &[f64], dimension: usize, sequence_index: u64) -> Result<()> {
    if v.len() != dimension {
        return Err(RcxiError::Encoding {
            expected: dimension,
            actual: v.len(),
        });
    }
    if let Some(component) = first_non_finite(v) {
        return Err(RcxiError::NumericalInstability {
            sequence_index,
            component,
        });
    }
    Ok(())
}

fn fill_ring<T>(capacity: usize, items: impl IntoIterator<Item = T>) -> Ring<T> {
    let mut ring = Ring::new(capacity);
    for item in items {
        ring.push(item);
    }
    ring
}

/// Deserialize a v1 JSON export. `seed` fixes the resumed engine's RNG;
/// `None` seeds it from the operating system.
pub fn import_json(json: &str, seed: Option<u64>) -> Result<ImportedSession> {
    let wire: WireExport =
        serde_json::from_str(json).map_err(|e| RcxiError::Wire(e.to_string()))?;
    let rng = match seed {
        Some(seed) => SmallRng::seed_from_u64(seed),
        None => SmallRng::from_os_rng(),
    };
    let session = wire.into_session(rng)?;
    tracing::info!(
        id = %session.id,
        states = session.engine.history_len(),
        graph = session.graph.is_some(),
        "session imported"
    );
    Ok(session)
}

/// Serialize an engine and optional graph to v1 JSON. Any engine attached to
/// `graph` is ignored; `engine` is the one exported.
pub fn export_json(
    id: Uuid,
    engine: &StateEngine,
    graph: Option<&PropagationGraph>,
) -> Result<String> {
    let wire = WireExport::new(id, engine, graph);
    serde_json::to_string_pretty(&wire).map_err(|e| RcxiError::Wire(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Topology;

    fn engine() -> StateEngine {
        let mut e = StateEngine::with_seed(EngineConfig::new(3, 0.8, 0.0, 0.01, 6), 42).unwrap();
        for i in 0..9 {
            let x = (i as f64 * 0.7).sin() * 0.5;
            e.recursive_update(&[x, 0.2, -x], "wire").unwrap();
            e.measure_tension();
        }
        e
    }

    fn graph() -> PropagationGraph {
        let mut g = PropagationGraph::new(GraphConfig::new(
            6,
            Topology::NearestNeighbor { k: 2 },
            0.5,
        ))
        .unwrap();
        g.propagate_thought(2, 0.8, 5, 1e-6).unwrap();
        g
    }

    #[test]
    fn test_roundtrip_resumes_identically() {
        let mut original = engine();
        let id = Uuid::new_v4();
        let json = export_json(id, &original, Some(&graph())).unwrap();
        let imported = import_json(&json, Some(1)).unwrap();
        assert_eq!(imported.id, id);

        let mut resumed = imported.engine;
        assert_close(resumed.current_state(), original.current_state());
        assert_close(&resumed.tension_history(), &original.tension_history());
        assert_eq!(resumed.history_len(), original.history_len());
        assert_eq!(
            resumed.check_convergence().0,
            original.check_convergence().0
        );
        assert_eq!(
            resumed.form_glyph("x").source_window_size,
            original.form_glyph("x").source_window_size
        );

        // Noise-free, so the next step matches too
        let a = original.recursive_update(&[0.1, 0.1, 0.1], "next").unwrap();
        let b = resumed.recursive_update(&[0.1, 0.1, 0.1], "next").unwrap();
        assert_close(&a.vector, &b.vector);
        assert_eq!(a.sequence_index, b.sequence_index);
    }

    fn assert_close(a: &[f64], b: &[f64]) {
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b) {
            assert!((x - y).abs() < 1e-12, "{x} != {y}");
        }
    }

    #[test]
    fn test_graph_roundtrip() {
        let g = graph();
        let json = export_json(Uuid::nil(), &engine(), Some(&g)).unwrap();
        let restored = import_json(&json, Some(1)).unwrap().graph.unwrap();
        assert_eq!(restored.node_count(), g.node_count());
        assert_close(&restored.activations(), &g.activations());
        let pairs = |g: &PropagationGraph| -> Vec<(usize, usize)> {
            g.edges().iter().map(|e| (e.from_index, e.to_index)).collect()
        };
        assert_eq!(pairs(&restored), pairs(&g));
        assert!(restored.engine().is_none());
    }

    #[test]
    fn test_version_field() {
        let json = export_json(Uuid::nil(), &engine(), None).unwrap();
        let wire: WireExport = serde_json::from_str(&json).unwrap();
        assert_eq!(wire.version, CURRENT_VERSION);
        assert!(wire.graph.is_none());
        assert!(json.contains("nextSequence"));
    }

    #[test]
    fn test_rejects_unknown_version() {
        let json = export_json(Uuid::nil(), &engine(), None)
            .unwrap()
            .replace(r#""version": "1""#, r#""version": "0.9""#);
        assert!(matches!(import_json(&json, Some(1)), Err(RcxiError::Wire(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(import_json("{not json", None), Err(RcxiError::Wire(_))));
    }

    #[test]
    fn test_rejects_dimension_mismatch() {
        let mut wire = WireExport::new(Uuid::nil(), &engine(), None);
        wire.engine.current.push(0.0);
        let json = serde_json::to_string(&wire).unwrap();
        assert!(matches!(
            import_json(&json, Some(1)),
            Err(RcxiError::Encoding {
                expected: 3,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_rejects_state_outside_ceiling() {
        let mut wire = WireExport::new(Uuid::nil(), &engine(), None);
        wire.engine.current = vec![50.0, 0.0, 0.0];
        let json = serde_json::to_string(&wire).unwrap();
        assert!(matches!(import_json(&json, Some(1)), Err(RcxiError::Wire(_))));

        let mut wire = WireExport::new(Uuid::nil(), &engine(), None);
        wire.engine.history[0].vector = vec![0.0, 50.0, 0.0];
        let json = serde_json::to_string(&wire).unwrap();
        assert!(matches!(import_json(&json, Some(1)), Err(RcxiError::Wire(_))));
    }

    #[test]
    fn test_rejects_stale_sequence() {
        let mut wire = WireExport::new(Uuid::nil(), &engine(), None);
        wire.engine.next_sequence = 1;
        let json = serde_json::to_string(&wire).unwrap();
        assert!(matches!(import_json(&json, Some(1)), Err(RcxiError::Wire(_))));
    }

    #[test]
    fn test_infinite_distance_written_as_null() {
        let mut e = StateEngine::with_seed(EngineConfig::new(2, 0.8, 0.0, 0.01, 6), 42).unwrap();
        e.recursive_update(&[0.3, 0.3], "a").unwrap();
        let json = export_json(Uuid::nil(), &e, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["engine"]["distances"][0].is_null());
        let back = import_json(&json, Some(1)).unwrap();
        assert_eq!(back.engine.check_convergence(), (false, f64::INFINITY));
    }
}
