//! Weighted operation-kind selection.
//!
//! An [`OperationDistribution`] maps each host operation kind to a
//! selection weight.  Entries are kept in insertion order so that the
//! cumulative-sum scan in [`sample`](OperationDistribution::sample) walks
//! buckets in a stable order regardless of the kind type's `Ord`.

use crate::op::OpKind;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// A mapping from operation kind to selection weight.
#[derive(Debug, Clone)]
pub struct OperationDistribution<K: OpKind> {
    entries: Vec<(K, f64)>,
}

impl<K: OpKind> OperationDistribution<K> {
    /// Create an empty distribution.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Store an unnormalized weight for `kind`.
    ///
    /// Overwrites any existing weight for the same kind without changing
    /// its position in the scan order.
    pub fn set_weight(&mut self, kind: K, weight: f64) {
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == kind) {
            entry.1 = weight;
        } else {
            self.entries.push((kind, weight));
        }
    }

    /// Divide every weight by the sum of all weights.
    ///
    /// No-op when the sum is zero.  Afterwards all weights are
    /// non-negative and sum to 1.0 within floating-point tolerance.
    pub fn normalize(&mut self) {
        let sum: f64 = self.entries.iter().map(|(_, w)| w).sum();
        if sum == 0.0 {
            return;
        }
        for (_, weight) in &mut self.entries {
            *weight /= sum;
        }
    }

    /// Sample one kind with exactly one uniform draw.
    ///
    /// Walks entries in insertion order accumulating weight and returns
    /// the first kind whose cumulative weight exceeds the draw.  If
    /// floating-point rounding leaves no cumulative bucket above the draw,
    /// the first entry is returned as the defined fallback.  Returns
    /// `None` only for an empty distribution.
    pub fn sample(&self, rng: &mut ChaCha8Rng) -> Option<K> {
        let roll = rng.gen::<f64>();
        let mut cumulative = 0.0;
        for (kind, weight) in &self.entries {
            cumulative += weight;
            if roll < cumulative {
                return Some(kind.clone());
            }
        }
        self.entries.first().map(|(kind, _)| kind.clone())
    }

    /// The current weight for `kind`, if registered.
    pub fn weight(&self, kind: &K) -> Option<f64> {
        self.entries
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, w)| *w)
    }

    /// The registered kinds, in insertion order.
    pub fn kinds(&self) -> impl Iterator<Item = &K> {
        self.entries.iter().map(|(k, _)| k)
    }

    /// All entries, in insertion order.
    pub fn entries(&self) -> &[(K, f64)] {
        &self.entries
    }

    /// Sum of all weights.
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|(_, w)| w).sum()
    }

    /// Number of registered kinds.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no kinds are registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: OpKind> Default for OperationDistribution<K> {
    fn default() -> Self {
        Self::new()
    }
}
