//! Attractor detection over the state history.
//!
//! Greedy windowed clustering in insertion order: the earliest unclustered
//! state seeds a cluster and absorbs every later unclustered state within
//! `radius` of the seed. Small clusters are discarded.

use serde::{Deserialize, Serialize};

use crate::vector::{distance, mean_vector};

/// A region of state space where the trajectory has settled.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttractorManifold {
    pub centroid: Vec<f64>,
    /// Largest member-to-centroid distance.
    pub radius: f64,
    pub member_count: usize,
}

impl AttractorManifold {
    pub fn distance_to(&self, v: &[f64]) -> f64 {
        distance(&self.centroid, v)
    }
}

/// Mean distance between consecutive states. Zero for fewer than two states.
pub fn mean_step_distance(states: &[&[f64]]) -> f64 {
    if states.len() < 2 {
        return 0.0;
    }
    let total: f64 = states.windows(2).map(|w| distance(w[0], w[1])).sum();
    total / (states.len() - 1) as f64
}

/// Cluster `states` (oldest first). Deterministic for a fixed input and radius.
pub fn detect(states: &[&[f64]], radius: f64, min_size: usize) -> Vec<AttractorManifold> {
    if states.len() < min_size {
        return Vec::new();
    }

    let mut clustered = vec![false; states.len()];
    let mut attractors = Vec::new();

    for seed_idx in 0..states.len() {
        if clustered[seed_idx] {
            continue;
        }
        clustered[seed_idx] = true;
        let seed = states[seed_idx];
        let mut members = vec![seed_idx];

        for (j, state) in states.iter().enumerate().skip(seed_idx + 1) {
            if !clustered[j] && distance(seed, state) <= radius {
                clustered[j] = true;
                members.push(j);
            }
        }

        if members.len() < min_size {
            continue;
        }

        let centroid = mean_vector(members.iter().map(|&i| states[i]));
        let spread = members
            .iter()
            .map(|&i| distance(&centroid, states[i]))
            .fold(0.0, f64::max);

        attractors.push(AttractorManifold {
            centroid,
            radius: spread,
            member_count: members.len(),
        });
    }

    attractors
}

/// Nearest attractor to `v` as (index, distance). Ties go to the earlier attractor.
pub fn nearest(attractors: &[AttractorManifold], v: &[f64]) -> Option<(usize, f64)> {
    attractors
        .iter()
        .enumerate()
        .map(|(i, a)| (i, a.distance_to(v)))
        .fold(None, |best, (i, d)| match best {
            Some((_, bd)) if bd <= d => best,
            _ => Some((i, d)),
        })
}
