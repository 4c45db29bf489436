//! Persistable memory record: one compact row per captured engine state.

use serde::{Deserialize, Serialize};

use crate::engine::StateEngine;
use crate::time::now_unix_millis;

/// Snapshot of an engine suitable for logging or session resumption.
///
/// The state vector is quantized to `f32` and keeps every `stride`-th
/// component. Only `stride == 1` records can be restored.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryRecord {
    /// Unix milliseconds of the captured state.
    pub timestamp: u64,
    pub sequence_index: u64,
    /// Context hash of the captured state. 0 before the first update.
    #[serde(default)]
    pub symbolic_ref: u64,
    pub state_vector: Vec<f32>,
    pub stride: usize,
    pub tension: f64,
    pub glyph_peaks: Vec<(usize, f64)>,
    pub attractor_count: usize,
}

impl MemoryRecord {
    /// Capture the engine's newest state. A stride of 0 is treated as 1.
    pub fn capture(engine: &StateEngine, stride: usize) -> Self {
        let stride = stride.max(1);
        let (timestamp, sequence_index, symbolic_ref) = engine.latest().map_or(
            (now_unix_millis(), 0, 0),
            |s| (s.timestamp, s.sequence_index, s.symbolic_ref),
        );
        let state_vector = engine
            .current_state()
            .iter()
            .step_by(stride)
            .map(|x| *x as f32)
            .collect();

        Self {
            timestamp,
            sequence_index,
            symbolic_ref,
            state_vector,
            stride,
            tension: engine.peek_tension().xi,
            glyph_peaks: engine.form_glyph("record").spectrum_peaks,
            attractor_count: engine.detect_attractors().len(),
        }
    }

    pub fn is_full_resolution(&self) -> bool {
        self.stride == 1
    }
}
