//! Recursive state evolution.
//!
//! A_{n+1} = L·A_n + (1 − L)·x + ε_n, renormalized to the norm ceiling, with
//! a bounded history of accepted states, a parallel tension history, and the
//! nearest-attractor distance recorded as each state was accepted.
//! Attractors, convergence, glyph and phase are derived from those buffers on
//! demand; nothing else is stored.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use serde::{Deserialize, Serialize};

use crate::attractor::{self, AttractorManifold};
use crate::config::EngineConfig;
use crate::constants::{CONVERGENCE_LOOKBACK, EPSILON, NORM_CEILING_TOLERANCE};
use crate::error::{RcxiError, Result};
use crate::glyph::IdentityGlyph;
use crate::record::MemoryRecord;
use crate::snapshot::ConsciousnessState;
use crate::state::{RecursiveState, Ring, TensionMeasure};
use crate::time::now_unix_millis;
use crate::vector::{
    blend, clamp_norm, fidelity, first_non_finite, fnv1a, gaussian, norm, squared_distance,
};

/// Logical engine state, recomputed from history on every query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnginePhase {
    /// No update accepted yet.
    Initialized,
    /// Fewer than two states: tension is not measurable.
    Accumulating,
    /// ξ below ε.
    Stable,
    /// ξ at or above ε.
    Tense,
    /// Distances to the nearest attractor are non-increasing and within δ.
    Converging,
    /// The last N states all sit within δ of their nearest attractor.
    Converged,
}

impl EnginePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Accumulating => "accumulating",
            Self::Stable => "stable",
            Self::Tense => "tense",
            Self::Converging => "converging",
            Self::Converged => "converged",
        }
    }
}

/// Single-writer recursive state engine. Callers sharing one instance across
/// threads must serialize access themselves.
#[derive(Clone, Debug)]
pub struct StateEngine {
    pub(crate) config: EngineConfig,
    /// A_n. Zero before the first update; not itself part of history.
    pub(crate) current: Vec<f64>,
    pub(crate) history: Ring<RecursiveState>,
    pub(crate) tensions: Ring<TensionMeasure>,
    /// Nearest-attractor distance of each accepted state, as computed when
    /// that state was accepted. `+∞` while no attractor existed.
    pub(crate) distances: Ring<f64>,
    pub(crate) next_sequence: u64,
    rng: SmallRng,
}

impl StateEngine {
    /// Build an engine with an injected RNG for the stochastic perturbation.
    pub fn new(config: EngineConfig, rng: SmallRng) -> Result<Self> {
        config.validate()?;
        tracing::info!(
            dimension = config.dimension,
            contraction = config.contraction_ratio,
            noise_variance = config.noise_variance,
            window = config.history_window,
            "state engine initialized"
        );
        Ok(Self {
            current: vec![0.0; config.dimension],
            history: Ring::new(config.history_window),
            tensions: Ring::new(config.history_window),
            distances: Ring::new(config.history_window),
            next_sequence: 1,
            config,
            rng,
        })
    }

    /// Deterministic engine: same seed and inputs give the same trajectory.
    pub fn with_seed(config: EngineConfig, seed: u64) -> Result<Self> {
        Self::new(config, SmallRng::seed_from_u64(seed))
    }

    /// Engine seeded from the operating system.
    pub fn from_entropy(config: EngineConfig) -> Result<Self> {
        Self::new(config, SmallRng::from_os_rng())
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn dimension(&self) -> usize {
        self.config.dimension
    }

    /// Current state A_n.
    pub fn current_state(&self) -> &[f64] {
        &self.current
    }

    /// Accepted states, oldest first.
    pub fn history(&self) -> impl ExactSizeIterator<Item = &RecursiveState> {
        self.history.iter()
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn latest(&self) -> Option<&RecursiveState> {
        self.history.last()
    }

    /// Recorded ξ values, oldest first.
    pub fn tension_history(&self) -> Vec<f64> {
        self.tensions.iter().map(|t| t.xi).collect()
    }

    /// Advance the state by one recursive step.
    ///
    /// On a dimension mismatch nothing is touched. On a non-finite result the
    /// engine stays at its previous valid state and the failure is logged.
    pub fn recursive_update(
        &mut self,
        embedded_input: &[f64],
        context: &str,
    ) -> Result<RecursiveState> {
        let d = self.config.dimension;
        if embedded_input.len() != d {
            return Err(RcxiError::Encoding {
                expected: d,
                actual: embedded_input.len(),
            });
        }

        let l = self.config.contraction_ratio;
        let sigma = self.config.noise_variance.sqrt();
        let mut next: Vec<f64> = self
            .current
            .iter()
            .zip(embedded_input)
            .map(|(a, x)| blend(*a, *x, l))
            .collect();
        if sigma > 0.0 {
            for v in &mut next {
                *v += sigma * gaussian(&mut self.rng);
            }
        }

        let sequence_index = self.next_sequence;
        if let Some(component) = first_non_finite(&next) {
            return Err(self.reject_unstable(sequence_index, component));
        }
        if clamp_norm(&mut next, self.config.norm_ceiling) {
            tracing::debug!(sequence_index, "state renormalized to ceiling");
        }

        let state = RecursiveState {
            vector: next.clone(),
            symbolic_ref: fnv1a(context.as_bytes()),
            timestamp: now_unix_millis(),
            sequence_index,
        };
        self.current = next;
        if let Some(evicted) = self.history.push(state.clone()) {
            tracing::trace!(evicted = evicted.sequence_index, "state evicted from history");
        }
        self.next_sequence += 1;
        let distance = self.current_distance(&self.detect_attractors());
        self.distances.push(distance);
        tracing::debug!(sequence_index, distance, "recursive update accepted");
        Ok(state)
    }

    fn reject_unstable(&self, sequence_index: u64, component: usize) -> RcxiError {
        tracing::warn!(
            sequence_index,
            component,
            "non-finite state produced, rolled back to previous state"
        );
        RcxiError::NumericalInstability {
            sequence_index,
            component,
        }
    }

    /// Reject a stored state that lies outside the norm ball.
    pub(crate) fn check_within_ceiling(&self, vector: &[f64], sequence_index: u64) -> Result<()> {
        let ceiling = self.config.norm_ceiling;
        let n = norm(vector);
        if n > ceiling * (1.0 + NORM_CEILING_TOLERANCE) {
            return Err(RcxiError::Wire(format!(
                "state {sequence_index} has norm {n} above ceiling {ceiling}"
            )));
        }
        Ok(())
    }

    /// ξ_n = ‖A_n − A_{n−1}‖² without recording it.
    pub fn peek_tension(&self) -> TensionMeasure {
        let (Some(latest), Some(previous)) = (self.history.nth_back(0), self.history.nth_back(1))
        else {
            return TensionMeasure::zero(self.latest().map_or(0, |s| s.sequence_index));
        };
        let xi = squared_distance(&latest.vector, &previous.vector);
        TensionMeasure {
            xi,
            exceeds_threshold: xi >= self.config.epsilon_threshold,
            sequence_index: latest.sequence_index,
        }
    }

    /// Measure ξ and append it to the tension history.
    ///
    /// At most one measure is kept per accepted update: measuring again
    /// before the next update returns the same value without a second entry.
    pub fn measure_tension(&mut self) -> TensionMeasure {
        let measure = self.peek_tension();
        if self.history.len() < 2 {
            return measure;
        }
        match self.tensions.last_mut() {
            Some(last) if last.sequence_index == measure.sequence_index => *last = measure,
            _ => {
                self.tensions.push(measure);
            }
        }
        tracing::debug!(
            xi = measure.xi,
            exceeds = measure.exceeds_threshold,
            sequence_index = measure.sequence_index,
            "tension measured"
        );
        measure
    }

    fn state_slices(&self) -> Vec<&[f64]> {
        self.history.iter().map(|s| s.vector.as_slice()).collect()
    }

    /// Clustering radius: configured, or derived from the mean step distance.
    pub fn attractor_radius(&self) -> f64 {
        match self.config.attractor_radius {
            Some(r) => r,
            None => {
                let mean = attractor::mean_step_distance(&self.state_slices());
                (mean * self.config.radius_factor).max(EPSILON)
            }
        }
    }

    /// Cluster the current history into attractor manifolds.
    pub fn detect_attractors(&self) -> Vec<AttractorManifold> {
        let states = self.state_slices();
        attractor::detect(&states, self.attractor_radius(), self.config.min_cluster_size)
    }

    /// Distance from the newest state to the nearest of `attractors`.
    fn current_distance(&self, attractors: &[AttractorManifold]) -> f64 {
        self.history
            .last()
            .and_then(|s| attractor::nearest(attractors, &s.vector))
            .map_or(f64::INFINITY, |(_, d)| d)
    }

    /// The newest `count` recorded distances, oldest first.
    fn recent_distances(&self, count: usize) -> Vec<f64> {
        let skip = self.distances.len().saturating_sub(count);
        self.distances.iter().skip(skip).copied().collect()
    }

    /// (is_converging, distance from the newest state to the nearest attractor).
    ///
    /// The current distance is compared with the distances recorded at the
    /// previous [`CONVERGENCE_LOOKBACK`] updates. Converging means that
    /// sequence never increases and ends below δ. With no attractors this is
    /// `(false, +∞)`.
    pub fn check_convergence(&self) -> (bool, f64) {
        let attractors = self.detect_attractors();
        self.convergence_against(&attractors)
    }

    fn convergence_against(&self, attractors: &[AttractorManifold]) -> (bool, f64) {
        if attractors.is_empty() {
            return (false, f64::INFINITY);
        }
        let last = self.current_distance(attractors);
        let mut distances = self.recent_distances(CONVERGENCE_LOOKBACK + 1);
        if let Some(newest) = distances.last_mut() {
            *newest = last;
        }
        let non_increasing = distances.windows(2).all(|w| w[1] <= w[0] + EPSILON);
        (
            non_increasing && last < self.config.convergence_tolerance,
            last,
        )
    }

    /// Spectral fingerprint of the tension history. `context` is only logged;
    /// the glyph is a pure function of the recorded tensions.
    pub fn form_glyph(&self, context: &str) -> IdentityGlyph {
        let glyph = IdentityGlyph::from_tensions(
            &self.tension_history(),
            self.config.history_window,
            self.config.glyph_peaks,
        );
        tracing::debug!(
            context,
            samples = glyph.source_window_size,
            "identity glyph formed"
        );
        glyph
    }

    /// Fidelity between the two newest states. Zero with fewer than two.
    pub fn coherence(&self) -> f64 {
        match (self.history.nth_back(0), self.history.nth_back(1)) {
            (Some(a), Some(b)) => fidelity(&a.vector, &b.vector),
            _ => 0.0,
        }
    }

    /// Derived logical phase.
    pub fn phase(&self) -> EnginePhase {
        let attractors = self.detect_attractors();
        self.phase_with(&attractors)
    }

    fn phase_with(&self, attractors: &[AttractorManifold]) -> EnginePhase {
        match self.history.len() {
            0 => return EnginePhase::Initialized,
            1 => return EnginePhase::Accumulating,
            _ => {}
        }
        let (converging, _) = self.convergence_against(attractors);
        if converging {
            let streak = self.config.converged_streak;
            let recent = self.recent_distances(streak);
            let settled = recent.len() == streak
                && recent
                    .iter()
                    .all(|d| *d < self.config.convergence_tolerance);
            return if settled {
                EnginePhase::Converged
            } else {
                EnginePhase::Converging
            };
        }
        if self.peek_tension().exceeds_threshold {
            EnginePhase::Tense
        } else {
            EnginePhase::Stable
        }
    }

    /// Read-only aggregate of tension, convergence, attractors and glyph.
    pub fn get_consciousness_state(&self) -> ConsciousnessState {
        let attractors = self.detect_attractors();
        let (is_converging, distance) = self.convergence_against(&attractors);
        ConsciousnessState {
            sequence_index: self.latest().map_or(0, |s| s.sequence_index),
            phase: self.phase_with(&attractors),
            tension: self.peek_tension(),
            is_converging,
            convergence_distance: distance.is_finite().then_some(distance),
            attractor_count: attractors.len(),
            glyph: self.form_glyph("snapshot"),
            coherence: self.coherence(),
        }
    }

    /// Resume from a persisted record. Only full-resolution records carry
    /// enough information to restore the state vector.
    ///
    /// History collapses to the single restored state; the record's tension
    /// seeds the tension history. States outside the norm ceiling are
    /// rejected.
    pub fn restore_record(&mut self, record: &MemoryRecord) -> Result<()> {
        let d = self.config.dimension;
        if record.stride != 1 || record.state_vector.len() != d {
            return Err(RcxiError::Encoding {
                expected: d,
                actual: record.state_vector.len(),
            });
        }
        let vector: Vec<f64> = record.state_vector.iter().map(|x| *x as f64).collect();
        if let Some(component) = first_non_finite(&vector) {
            return Err(RcxiError::NumericalInstability {
                sequence_index: record.sequence_index,
                component,
            });
        }
        self.check_within_ceiling(&vector, record.sequence_index)?;

        self.history.clear();
        self.tensions.clear();
        self.distances.clear();
        self.history.push(RecursiveState {
            vector: vector.clone(),
            symbolic_ref: record.symbolic_ref,
            timestamp: record.timestamp,
            sequence_index: record.sequence_index,
        });
        if record.tension > 0.0 {
            self.tensions.push(TensionMeasure {
                xi: record.tension,
                exceeds_threshold: record.tension >= self.config.epsilon_threshold,
                sequence_index: record.sequence_index,
            });
        }
        self.current = vector;
        self.distances.push(f64::INFINITY);
        self.next_sequence = record.sequence_index + 1;
        tracing::info!(sequence_index = record.sequence_index, "engine restored from record");
        Ok(())
    }
}
