use serde::{Deserialize, Serialize};

use crate::constants::{
    ACTIVE_THRESHOLD, DEFAULT_CONTRACTION_RATIO, DEFAULT_CONVERGED_STREAK,
    DEFAULT_CONVERGENCE_TOLERANCE, DEFAULT_DECAY, DEFAULT_DIMENSION, DEFAULT_EPSILON_THRESHOLD,
    DEFAULT_GLYPH_PEAKS, DEFAULT_HISTORY_WINDOW, DEFAULT_MIN_CLUSTER_SIZE, DEFAULT_NEIGHBORS,
    DEFAULT_NODE_COUNT, DEFAULT_NOISE_VARIANCE, DEFAULT_NORM_CEILING, DEFAULT_RADIUS_FACTOR,
};
use crate::error::{RcxiError, Result};

/// Tunables for a [`StateEngine`](crate::engine::StateEngine).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    /// State vector dimension d.
    pub dimension: usize,
    /// Contraction ratio L ∈ (0, 1).
    pub contraction_ratio: f64,
    /// Per-component noise variance σ² ≥ 0.
    pub noise_variance: f64,
    /// Tension threshold ε > 0.
    pub epsilon_threshold: f64,
    /// Ring-buffer capacity W ≥ 2 for state and tension history.
    pub history_window: usize,
    /// Norm ceiling enforced after every update.
    pub norm_ceiling: f64,
    /// Fixed clustering radius. `None` derives it from the history.
    pub attractor_radius: Option<f64>,
    /// Multiplier on the mean inter-state distance when the radius is derived.
    pub radius_factor: f64,
    pub min_cluster_size: usize,
    /// Convergence tolerance δ.
    pub convergence_tolerance: f64,
    /// In-tolerance states needed before the engine reports CONVERGED.
    pub converged_streak: usize,
    /// Number of spectrum peaks m in a glyph.
    pub glyph_peaks: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dimension: DEFAULT_DIMENSION,
            contraction_ratio: DEFAULT_CONTRACTION_RATIO,
            noise_variance: DEFAULT_NOISE_VARIANCE,
            epsilon_threshold: DEFAULT_EPSILON_THRESHOLD,
            history_window: DEFAULT_HISTORY_WINDOW,
            norm_ceiling: DEFAULT_NORM_CEILING,
            attractor_radius: None,
            radius_factor: DEFAULT_RADIUS_FACTOR,
            min_cluster_size: DEFAULT_MIN_CLUSTER_SIZE,
            convergence_tolerance: DEFAULT_CONVERGENCE_TOLERANCE,
            converged_streak: DEFAULT_CONVERGED_STREAK,
            glyph_peaks: DEFAULT_GLYPH_PEAKS,
        }
    }
}

impl EngineConfig {
    /// The five core parameters; everything else takes its default.
    pub fn new(
        dimension: usize,
        contraction_ratio: f64,
        noise_variance: f64,
        epsilon_threshold: f64,
        history_window: usize,
    ) -> Self {
        Self {
            dimension,
            contraction_ratio,
            noise_variance,
            epsilon_threshold,
            history_window,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.dimension == 0 {
            return Err(RcxiError::config("dimension must be positive"));
        }
        if !(self.contraction_ratio > 0.0 && self.contraction_ratio < 1.0) {
            return Err(RcxiError::config(format!(
                "contraction ratio must lie in (0, 1), got {}",
                self.contraction_ratio
            )));
        }
        if !(self.noise_variance >= 0.0 && self.noise_variance.is_finite()) {
            return Err(RcxiError::config(format!(
                "noise variance must be finite and non-negative, got {}",
                self.noise_variance
            )));
        }
        if !(self.epsilon_threshold > 0.0) {
            return Err(RcxiError::config(format!(
                "epsilon threshold must be positive, got {}",
                self.epsilon_threshold
            )));
        }
        if self.history_window < 2 {
            return Err(RcxiError::config(format!(
                "history window must be at least 2, got {}",
                self.history_window
            )));
        }
        if !(self.norm_ceiling > 0.0) {
            return Err(RcxiError::config("norm ceiling must be positive"));
        }
        if let Some(r) = self.attractor_radius
            && !(r > 0.0)
        {
            return Err(RcxiError::config("attractor radius must be positive"));
        }
        if !(self.radius_factor > 0.0) {
            return Err(RcxiError::config("radius factor must be positive"));
        }
        if self.min_cluster_size == 0 {
            return Err(RcxiError::config("minimum cluster size must be positive"));
        }
        if !(self.convergence_tolerance > 0.0) {
            return Err(RcxiError::config("convergence tolerance must be positive"));
        }
        if self.converged_streak == 0 {
            return Err(RcxiError::config("converged streak must be positive"));
        }
        Ok(())
    }
}

/// How a propagation graph wires its nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Topology {
    /// Link each node to its `k` nearest nodes in 5-D coordinate space.
    NearestNeighbor { k: usize },
    /// Link each unordered pair with probability `density`, drawn from `seed`.
    FixedRandom { seed: u64, density: f64 },
    /// Caller-supplied undirected edges `(from, to, weight)`.
    Explicit { edges: Vec<(usize, usize, f64)> },
}

impl Default for Topology {
    fn default() -> Self {
        Self::NearestNeighbor {
            k: DEFAULT_NEIGHBORS,
        }
    }
}

/// Tunables for a [`PropagationGraph`](crate::graph::PropagationGraph).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphConfig {
    pub node_count: usize,
    pub topology: Topology,
    /// Per-hop decay γ ∈ (0, 1).
    pub decay: f64,
    /// Seed for generated node coordinates.
    pub coordinate_seed: u64,
    /// Activation above which a node counts as active.
    pub active_threshold: f64,
    /// Weight of the engine's ξ in `detect_tension`.
    pub engine_weight: f64,
    /// Weight of neighbour disagreement in `detect_tension`.
    pub disagreement_weight: f64,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            node_count: DEFAULT_NODE_COUNT,
            topology: Topology::default(),
            decay: DEFAULT_DECAY,
            coordinate_seed: 0,
            active_threshold: ACTIVE_THRESHOLD,
            engine_weight: 0.5,
            disagreement_weight: 0.5,
        }
    }
}

impl GraphConfig {
    pub fn new(node_count: usize, topology: Topology, decay: f64) -> Self {
        Self {
            node_count,
            topology,
            decay,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.node_count == 0 {
            return Err(RcxiError::config("node count must be positive"));
        }
        if !(self.decay > 0.0 && self.decay < 1.0) {
            return Err(RcxiError::config(format!(
                "decay must lie in (0, 1), got {}",
                self.decay
            )));
        }
        if !(0.0..=1.0).contains(&self.active_threshold) {
            return Err(RcxiError::config("active threshold must lie in [0, 1]"));
        }
        if !(self.engine_weight >= 0.0 && self.disagreement_weight >= 0.0) {
            return Err(RcxiError::config("tension weights must be non-negative"));
        }
        match &self.topology {
            Topology::NearestNeighbor { k } if *k == 0 => {
                Err(RcxiError::config("nearest-neighbour k must be positive"))
            }
            Topology::FixedRandom { density, .. } if !(0.0..=1.0).contains(density) => Err(
                RcxiError::config(format!("density must lie in [0, 1], got {density}")),
            ),
            _ => Ok(()),
        }
    }
}
