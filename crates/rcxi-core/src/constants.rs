/// Default state vector dimension.
pub const DEFAULT_DIMENSION: usize = 128;

/// Default contraction ratio L: weight of the previous state in the recursive update.
pub const DEFAULT_CONTRACTION_RATIO: f64 = 0.85;

/// Default per-component variance of the stochastic perturbation.
pub const DEFAULT_NOISE_VARIANCE: f64 = 1e-4;

/// Default tension threshold ε. ξ at or above this is TENSE.
pub const DEFAULT_EPSILON_THRESHOLD: f64 = 0.05;

/// Default ring-buffer capacity for state and tension history.
pub const DEFAULT_HISTORY_WINDOW: usize = 50;

/// Default Euclidean norm ceiling for every state vector.
pub const DEFAULT_NORM_CEILING: f64 = 1.0;

/// Relative slack on the norm ceiling when accepting stored states. Covers
/// `f32` quantization in memory records.
pub const NORM_CEILING_TOLERANCE: f64 = 1e-6;

/// Attractor radius as a multiple of the mean consecutive inter-state distance.
pub const DEFAULT_RADIUS_FACTOR: f64 = 1.0;

/// Clusters smaller than this are not attractors.
pub const DEFAULT_MIN_CLUSTER_SIZE: usize = 3;

/// Convergence tolerance δ: distance to the nearest centroid.
pub const DEFAULT_CONVERGENCE_TOLERANCE: f64 = 0.1;

/// Consecutive in-tolerance states required for CONVERGED.
pub const DEFAULT_CONVERGED_STREAK: usize = 3;

/// Number of prior updates compared by the convergence check.
pub const CONVERGENCE_LOOKBACK: usize = 3;

/// Number of spectrum peaks kept in an identity glyph.
pub const DEFAULT_GLYPH_PEAKS: usize = 5;

/// Default number of nodes in a propagation graph.
pub const DEFAULT_NODE_COUNT: usize = 32;

/// Default neighbour count for nearest-neighbour topology.
pub const DEFAULT_NEIGHBORS: usize = 4;

/// Default per-hop decay γ.
pub const DEFAULT_DECAY: f64 = 0.5;

/// Activation above which a node counts as active.
pub const ACTIVE_THRESHOLD: f64 = 0.5;

/// Coordinate axes of a graph node: thought, emotion, space, time, speed.
pub const NODE_DIMENSIONS: usize = 5;

/// Numerical epsilon for near-zero comparisons
pub const EPSILON: f64 = 1e-10;

/// Iteration cap for a session's per-step propagation.
pub const DEFAULT_PROPAGATION_ITERATIONS: usize = 20;

/// Largest per-node activation change at which propagation stops early.
pub const DEFAULT_PROPAGATION_EPSILON: f64 = 1e-4;
