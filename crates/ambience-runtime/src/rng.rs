//! Randomness seam for chance gating and weighted sound selection.
//!
//! Abstracted behind a trait so tests can drive deterministic sequences
//! instead of `rand`'s thread-local generator.

use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

/// Source of randomness a [`crate::LayerRuntime`] needs: a uniform draw
/// in `[0.0, 1.0)` for chance gating, and a frequency-weighted index
/// pick for shuffle-mode sound selection.
pub trait ChanceRng {
    /// Uniform draw in `[0.0, 1.0)`.
    fn f64_below_one(&mut self) -> f64;

    /// Pick an index into `weights`, proportional to each weight.
    /// `weights` is never empty and every entry is `> 0.0`.
    fn weighted_choice(&mut self, weights: &[f64]) -> usize;
}

/// Production [`ChanceRng`] backed by `rand`'s thread-local generator.
#[derive(Debug, Default)]
pub struct ThreadRngSource {
    rng: rand::rngs::ThreadRng,
}

impl ThreadRngSource {
    pub fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }
}

impl ChanceRng for ThreadRngSource {
    fn f64_below_one(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn weighted_choice(&mut self, weights: &[f64]) -> usize {
        match WeightedIndex::new(weights) {
            Ok(dist) => dist.sample(&mut self.rng),
            // All-zero weights (e.g. every sound's frequency is 0): fall
            // back to uniform rather than panicking.
            Err(_) => self.rng.gen_range(0..weights.len()),
        }
    }
}

/// A fixed sequence of draws, for deterministic tests. `f64_below_one`
/// cycles through `rolls`; `weighted_choice` cycles through `indices`.
#[derive(Debug, Clone)]
pub struct FixedRng {
    rolls: Vec<f64>,
    roll_pos: usize,
    indices: Vec<usize>,
    index_pos: usize,
}

impl FixedRng {
    pub fn new(rolls: Vec<f64>, indices: Vec<usize>) -> Self {
        Self {
            rolls,
            roll_pos: 0,
            indices,
            index_pos: 0,
        }
    }

    pub fn always(roll: f64, index: usize) -> Self {
        Self::new(vec![roll], vec![index])
    }
}

impl ChanceRng for FixedRng {
    fn f64_below_one(&mut self) -> f64 {
        let v = self.rolls[self.roll_pos % self.rolls.len()];
        self.roll_pos += 1;
        v
    }

    fn weighted_choice(&mut self, _weights: &[f64]) -> usize {
        let v = self.indices[self.index_pos % self.indices.len()];
        self.index_pos += 1;
        v
    }
}
