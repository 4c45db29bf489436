//! Text to fixed-dimension vector.
//!
//! The engine only needs *some* deterministic mapping; [`Embedder`] is the
//! seam for plugging in a learned model. [`HashEmbedder`] is the built-in
//! bag-of-tokens projection.

use rand::SeedableRng;
use rand::rngs::SmallRng;
use regex::Regex;
use std::sync::LazyLock;

use crate::vector::{fnv1a, gaussian, normalize};

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s']").unwrap());
static APOSTROPHE_TRIM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^'+|'+$").unwrap());

/// Lowercase words with inner apostrophes kept ("don't").
pub fn tokenize(text: &str) -> Vec<String> {
    let cleaned = NON_WORD.replace_all(text, " ");
    cleaned
        .to_lowercase()
        .split_whitespace()
        .map(|t| APOSTROPHE_TRIM.replace_all(t, "").to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Deterministic text embedding. Identical text must give identical vectors
/// of length [`dimension`](Embedder::dimension).
pub trait Embedder {
    fn dimension(&self) -> usize;
    fn embed(&self, text: &str) -> Vec<f64>;
}

/// Sum of per-token Gaussian vectors, normalized to unit length.
///
/// Each token's vector is drawn from a `SmallRng` seeded with the token's
/// FNV-1a hash XOR `salt`, so shared vocabulary gives correlated embeddings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HashEmbedder {
    dimension: usize,
    salt: u64,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self::with_salt(dimension, 0)
    }

    pub fn with_salt(dimension: usize, salt: u64) -> Self {
        Self { dimension, salt }
    }

    fn token_vector(&self, token: &str) -> impl Iterator<Item = f64> {
        let mut rng = SmallRng::seed_from_u64(fnv1a(token.as_bytes()) ^ self.salt);
        (0..self.dimension).map(move |_| gaussian(&mut rng))
    }
}

impl Embedder for HashEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    /// Empty or punctuation-only text embeds to the zero vector.
    fn embed(&self, text: &str) -> Vec<f64> {
        let mut sum = vec![0.0; self.dimension];
        for token in tokenize(text) {
            for (s, x) in sum.iter_mut().zip(self.token_vector(&token)) {
                *s += x;
            }
        }
        normalize(&sum)
    }
}
