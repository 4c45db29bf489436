//! One conversation's worth of state: an engine, a graph and an embedder.
//!
//! Sessions are plain owned values. Concurrent sessions are independent; a
//! session shared across threads needs a lock around it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{EngineConfig, GraphConfig};
use crate::constants::{DEFAULT_PROPAGATION_EPSILON, DEFAULT_PROPAGATION_ITERATIONS};
use crate::embedder::Embedder;
use crate::engine::{EnginePhase, StateEngine};
use crate::error::{RcxiError, Result};
use crate::graph::PropagationGraph;
use crate::record::MemoryRecord;
use crate::serde_compat;
use crate::snapshot::RcXiSnapshot;
use crate::state::TensionMeasure;
use crate::vector::{clamp_unit, fnv1a};

/// Outcome of one [`Session::step`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub sequence_index: u64,
    pub tension: TensionMeasure,
    /// Node the step's signal was injected at.
    pub origin_node: usize,
    /// Injected signal: ξ / ε clamped to [0, 1].
    pub signal: f64,
    pub local_tension: f64,
    pub phase: EnginePhase,
}

#[derive(Debug)]
pub struct Session<E: Embedder> {
    id: Uuid,
    engine: StateEngine,
    graph: PropagationGraph,
    embedder: E,
    pub max_iterations: usize,
    pub propagation_epsilon: f64,
}

impl<E: Embedder> Session<E> {
    /// Fresh session. `seed` fixes the engine's noise; `None` uses OS entropy.
    pub fn new(
        engine_config: EngineConfig,
        graph_config: GraphConfig,
        embedder: E,
        seed: Option<u64>,
    ) -> Result<Self> {
        let engine = match seed {
            Some(seed) => StateEngine::with_seed(engine_config, seed)?,
            None => StateEngine::from_entropy(engine_config)?,
        };
        let graph = PropagationGraph::new(graph_config)?;
        Self::from_parts(Uuid::new_v4(), engine, graph, embedder)
    }

    pub fn from_parts(
        id: Uuid,
        engine: StateEngine,
        mut graph: PropagationGraph,
        embedder: E,
    ) -> Result<Self> {
        if embedder.dimension() != engine.dimension() {
            return Err(RcxiError::config(format!(
                "embedder dimension {} does not match engine dimension {}",
                embedder.dimension(),
                engine.dimension()
            )));
        }
        // The session drives its own engine; a graph-attached one would be stale
        graph.detach_engine();
        Ok(Self {
            id,
            engine,
            graph,
            embedder,
            max_iterations: DEFAULT_PROPAGATION_ITERATIONS,
            propagation_epsilon: DEFAULT_PROPAGATION_EPSILON,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn engine(&self) -> &StateEngine {
        &self.engine
    }

    pub fn graph(&self) -> &PropagationGraph {
        &self.graph
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }

    /// Embed `text`, advance the engine, spread the resulting tension
    /// through the graph and measure the local tension where it landed.
    ///
    /// On an engine error nothing in the graph changes.
    pub fn step(&mut self, text: &str) -> Result<StepReport> {
        let embedded = self.embedder.embed(text);
        let state = self.engine.recursive_update(&embedded, text)?;
        let tension = self.engine.measure_tension();

        let origin_node = (fnv1a(text.as_bytes()) % self.graph.node_count() as u64) as usize;
        let signal = clamp_unit(tension.xi / self.engine.config().epsilon_threshold);
        self.graph.propagate_thought(
            origin_node,
            signal,
            self.max_iterations,
            self.propagation_epsilon,
        )?;
        let local_tension = self
            .graph
            .detect_tension(origin_node, text, Some(&mut self.engine))?;
        let phase = self.engine.phase();

        tracing::debug!(
            session = %self.id,
            sequence_index = state.sequence_index,
            xi = tension.xi,
            origin_node,
            phase = phase.as_str(),
            "session step"
        );
        Ok(StepReport {
            sequence_index: state.sequence_index,
            tension,
            origin_node,
            signal,
            local_tension,
            phase,
        })
    }

    /// Graph statistics plus the engine's consciousness state.
    pub fn snapshot(&self) -> RcXiSnapshot {
        let mut snapshot = self.graph.get_rc_xi_consciousness();
        snapshot.engine = Some(self.engine.get_consciousness_state());
        snapshot
    }

    pub fn record(&self, stride: usize) -> MemoryRecord {
        MemoryRecord::capture(&self.engine, stride)
    }

    pub fn export_json(&self) -> Result<String> {
        serde_compat::export_json(self.id, &self.engine, Some(&self.graph))
    }

    /// Resume an exported session. A payload without a graph gets a default one.
    pub fn import_json(json: &str, embedder: E, seed: Option<u64>) -> Result<Self> {
        let imported = serde_compat::import_json(json, seed)?;
        let graph = match imported.graph {
            Some(graph) => graph,
            None => PropagationGraph::new(GraphConfig::default())?,
        };
        Self::from_parts(imported.id, imported.engine, graph, embedder)
    }
}
