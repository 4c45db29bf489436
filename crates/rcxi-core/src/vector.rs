//! Shared numeric primitives for state vectors and activations.
//!
//! Plain `f64` slices throughout. Both the state engine and the propagation
//! graph build on these, so the formulas live in exactly one place.

use rand::Rng;

use crate::constants::EPSILON;

/// Dot product. Extra components of the longer slice are ignored.
pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Euclidean norm. Components are scaled by the largest magnitude before
/// squaring, so finite vectors never overflow to infinity in the sum.
pub fn norm(v: &[f64]) -> f64 {
    let (scale, sum) = scaled_squares(v);
    scale * sum.sqrt()
}

/// Largest |x| and Σ(x / largest)².
fn scaled_squares(v: &[f64]) -> (f64, f64) {
    let scale = v.iter().fold(0.0f64, |m, x| m.max(x.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return (scale, if scale == 0.0 { 0.0 } else { 1.0 });
    }
    let sum = v.iter().map(|x| (x / scale) * (x / scale)).sum();
    (scale, sum)
}

/// Scale to unit length. Near-zero vectors are returned unchanged.
pub fn normalize(v: &[f64]) -> Vec<f64> {
    let n = norm(v);
    if n < EPSILON {
        return v.to_vec();
    }
    v.iter().map(|x| x / n).collect()
}

/// Scale `v` down in place so its norm does not exceed `ceiling`.
/// Direction is preserved; vectors already inside the ball are untouched.
/// Returns true if a rescale happened.
pub fn clamp_norm(v: &mut [f64], ceiling: f64) -> bool {
    let (scale, sum) = scaled_squares(v);
    let n = scale * sum.sqrt();
    if n <= ceiling || n < EPSILON {
        return false;
    }
    // Divide by the largest component first; ‖v‖ itself may not be representable
    let unit = sum.sqrt();
    for x in v.iter_mut() {
        *x = *x / scale / unit * ceiling;
    }
    true
}

/// ‖a − b‖²
pub fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// ‖a − b‖
pub fn distance(a: &[f64], b: &[f64]) -> f64 {
    squared_distance(a, b).sqrt()
}

/// Component-wise mean of a set of equal-length vectors.
/// Returns an empty vector for an empty set.
pub fn mean_vector<'a>(vectors: impl IntoIterator<Item = &'a [f64]>) -> Vec<f64> {
    let mut sum: Vec<f64> = Vec::new();
    let mut count = 0usize;
    for v in vectors {
        if sum.is_empty() {
            sum = vec![0.0; v.len()];
        }
        for (s, x) in sum.iter_mut().zip(v) {
            *s += x;
        }
        count += 1;
    }
    if count > 0 {
        for s in &mut sum {
            *s /= count as f64;
        }
    }
    sum
}

/// Cosine similarity in [-1, 1]. Zero if either vector is near-zero.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let na = norm(a);
    let nb = norm(b);
    if na < EPSILON || nb < EPSILON {
        return 0.0;
    }
    (dot(a, b) / (na * nb)).clamp(-1.0, 1.0)
}

/// Fidelity |⟨a|b⟩|² of the normalized vectors. Range: [0, 1].
pub fn fidelity(a: &[f64], b: &[f64]) -> f64 {
    let c = cosine_similarity(a, b);
    c * c
}

/// Index of the first non-finite component, if any.
pub fn first_non_finite(v: &[f64]) -> Option<usize> {
    v.iter().position(|x| !x.is_finite())
}

// --- Scalar transforms ---

/// Convex blend: w·a + (1 − w)·b
pub fn blend(a: f64, b: f64, w: f64) -> f64 {
    w * a + (1.0 - w) * b
}

/// Clamp to [0, 1]. NaN maps to 0.
pub fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() { 0.0 } else { x.clamp(0.0, 1.0) }
}

/// Arithmetic mean. Zero for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population variance. Zero for fewer than two values.
pub fn variance(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    values.iter().map(|x| (x - m) * (x - m)).sum::<f64>() / values.len() as f64
}

/// Σ wᵢ·xᵢ over paired (weight, value) terms.
pub fn weighted_sum(terms: &[(f64, f64)]) -> f64 {
    terms.iter().map(|(w, x)| w * x).sum()
}

/// Standard normal sample via the Box-Muller transform.
pub fn gaussian(rng: &mut impl Rng) -> f64 {
    // Clamp u1 away from 0 to avoid ln(0) = -inf
    let u1: f64 = rng.random::<f64>().max(f64::MIN_POSITIVE);
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

/// FNV-1a 64-bit hash. Stable across platforms and releases, used for
/// symbolic references and embedder seeds.
pub fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes.iter().fold(OFFSET, |hash, b| (hash ^ *b as u64).wrapping_mul(PRIME))
}
