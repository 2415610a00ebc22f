//! Random choice abstraction for determinism.
//!
//! The quest only ever needs one kind of randomness: choosing an item from
//! a non-empty authored pool (a clarifying follow-up, for instance). Tests
//! inject a scripted chooser so the choice is predictable.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Abstraction over uniform random choice.
pub trait DeterministicRng: Send + Sync {
    /// Returns an index in `0..len`. A `len` of 0 or 1 yields 0.
    fn pick_index(&mut self, len: usize) -> usize;
}

/// Production RNG seeded from the operating system.
#[derive(Debug)]
pub struct SystemRng(StdRng);

impl SystemRng {
    /// Creates an RNG seeded from OS entropy.
    #[must_use]
    pub fn new() -> Self {
        Self(StdRng::from_os_rng())
    }

    /// Creates an RNG with a fixed seed, for reproducible runs.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl Default for SystemRng {
    fn default() -> Self {
        Self::new()
    }
}

impl DeterministicRng for SystemRng {
    fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.0.random_range(0..len)
    }
}
