//! Deterministic random number generation for the Isolation Forest.
//!
//! RULE: Nothing in the engine may call any platform RNG.
//! All randomness flows through DetectorRng instances derived
//! from the single seed in `IsolationForestConfig`.
//!
//! Each tree gets its own RNG stream, seeded deterministically
//! from (seed XOR tree_index * golden ratio). This means:
//!   - Adding more trees never changes earlier trees' streams.
//!   - Each tree is fully reproducible in isolation.

use rand::{RngCore, SeedableRng};
use rand_pcg::Pcg64Mcg;

/// A deterministic RNG for a single tree.
pub struct DetectorRng {
    inner: Pcg64Mcg,
}

impl DetectorRng {
    /// Create a stream from the master seed and a stable stream index.
    pub fn new(master_seed: u64, stream: u64) -> Self {
        let derived_seed = master_seed ^ stream.wrapping_mul(0x9e37_79b9_7f4a_7c15);
        Self {
            inner: Pcg64Mcg::seed_from_u64(derived_seed),
        }
    }

    /// Roll a float in [0.0, 1.0).
    pub fn next_f64(&mut self) -> f64 {
        let bits = self.inner.next_u64();
        (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Roll a usize in [0, n). `n` must be positive.
    pub fn next_below(&mut self, n: usize) -> usize {
        debug_assert!(n > 0, "n must be > 0");
        (self.inner.next_u64() % n.max(1) as u64) as usize
    }

    /// Roll a float in [low, high).
    pub fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + self.next_f64() * (high - low)
    }

    /// Draw `k` distinct indices from [0, n) by partial Fisher-Yates.
    pub fn sample_indices(&mut self, n: usize, k: usize) -> Vec<usize> {
        let k = k.min(n);
        let mut pool: Vec<usize> = (0..n).collect();
        for i in 0..k {
            let j = i + self.next_below(n - i);
            pool.swap(i, j);
        }
        pool.truncate(k);
        pool
    }
}

/// All tree streams for one forest.
pub struct RngBank {
    master_seed: u64,
}

impl RngBank {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn for_tree(&self, tree_index: usize) -> DetectorRng {
        DetectorRng::new(self.master_seed, tree_index as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_stream_is_reproducible() {
        let bank = RngBank::new(12345);
        let mut a = bank.for_tree(3);
        let mut b = bank.for_tree(3);
        for _ in 0..100 {
            assert_eq!(a.next_f64().to_bits(), b.next_f64().to_bits());
        }
    }

    #[test]
    fn sample_indices_are_distinct_and_in_range() {
        let mut rng = RngBank::new(7).for_tree(0);
        let mut sample = rng.sample_indices(50, 20);
        assert_eq!(sample.len(), 20);
        assert!(sample.iter().all(|i| *i < 50));
        sample.sort_unstable();
        sample.dedup();
        assert_eq!(sample.len(), 20, "indices must not repeat");
    }

    #[test]
    fn sample_larger_than_population_is_capped() {
        let mut rng = RngBank::new(7).for_tree(1);
        assert_eq!(rng.sample_indices(5, 10).len(), 5);
    }
}
