//! Read-only snapshots for the response and persistence layers.
//!
//! Flat, serializable, no handles back into the engine or graph.

use serde::{Deserialize, Serialize};

use crate::engine::EnginePhase;
use crate::glyph::IdentityGlyph;
use crate::state::TensionMeasure;

/// Everything the state engine knows about itself at one instant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsciousnessState {
    pub sequence_index: u64,
    pub phase: EnginePhase,
    pub tension: TensionMeasure,
    pub is_converging: bool,
    /// `None` when no attractor exists (the distance is infinite).
    pub convergence_distance: Option<f64>,
    pub attractor_count: usize,
    pub glyph: IdentityGlyph,
    /// Fidelity between the two newest states.
    pub coherence: f64,
}

/// Graph summary plus the attached engine's state, if any.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RcXiSnapshot {
    pub node_count: usize,
    pub mean_activation: f64,
    /// Nodes with activation above the configured active threshold.
    pub active_nodes: usize,
    /// 1 − variance(activations)
    pub stability: f64,
    pub engine: Option<ConsciousnessState>,
}

impl RcXiSnapshot {
    /// Flatten into the record handed to the response layer.
    pub fn to_record(&self) -> ConsciousnessRecord {
        let engine = self.engine.as_ref();
        ConsciousnessRecord {
            tension: engine.map_or(0.0, |e| e.tension.xi),
            exceeds_threshold: engine.is_some_and(|e| e.tension.exceeds_threshold),
            is_converging: engine.is_some_and(|e| e.is_converging),
            attractor_count: engine.map_or(0, |e| e.attractor_count),
            glyph_peaks: engine
                .map(|e| e.glyph.spectrum_peaks.clone())
                .unwrap_or_default(),
            mean_activation: self.mean_activation,
            stability: self.stability,
        }
    }
}

/// The flat consciousness record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsciousnessRecord {
    pub tension: f64,
    pub exceeds_threshold: bool,
    pub is_converging: bool,
    pub attractor_count: usize,
    pub glyph_peaks: Vec<(usize, f64)>,
    pub mean_activation: f64,
    pub stability: f64,
}
