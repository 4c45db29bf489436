use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// One accepted step of the recursive update. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecursiveState {
    pub vector: Vec<f64>,
    /// FNV-1a hash of the context the update was made under.
    pub symbolic_ref: u64,
    /// Unix milliseconds.
    pub timestamp: u64,
    pub sequence_index: u64,
}

/// Epistemic tension ξ between the two most recent states.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TensionMeasure {
    pub xi: f64,
    pub exceeds_threshold: bool,
    pub sequence_index: u64,
}

impl TensionMeasure {
    /// The ACCUMULATING sentinel: not enough history to measure.
    pub fn zero(sequence_index: u64) -> Self {
        Self {
            xi: 0.0,
            exceeds_threshold: false,
            sequence_index,
        }
    }
}

/// Fixed-capacity FIFO. Pushing at capacity evicts the oldest entry.
#[derive(Clone, Debug, PartialEq)]
pub struct Ring<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> Ring<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append, returning the evicted entry if the ring was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.items.len() >= self.capacity {
            self.items.pop_front()
        } else {
            None
        };
        self.items.push_back(item);
        evicted
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }

    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    pub fn last_mut(&mut self) -> Option<&mut T> {
        self.items.back_mut()
    }

    /// `n`-th entry counting back from the newest (0 = newest).
    pub fn nth_back(&self, n: usize) -> Option<&T> {
        self.items.len().checked_sub(n + 1).and_then(|i| self.items.get(i))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
