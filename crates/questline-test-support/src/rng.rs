//! Scripted choosers for the `DeterministicRng` seam.

use questline_core::rng::DeterministicRng;

/// Always picks the first item of the pool.
#[derive(Debug)]
pub struct MockRng;

impl DeterministicRng for MockRng {
    fn pick_index(&mut self, _len: usize) -> usize {
        0
    }
}

/// Picks the scripted indices in order, repeating the last one once the
/// script runs out (an empty script picks 0).
///
/// Indices are returned as scripted, without clamping to the pool, so
/// tests can exercise out-of-range handling.
#[derive(Debug)]
pub struct SequenceRng {
    values: Vec<usize>,
    index: usize,
}

impl SequenceRng {
    /// Create a chooser that answers with `values`.
    #[must_use]
    pub fn new(values: Vec<usize>) -> Self {
        Self { values, index: 0 }
    }
}

impl DeterministicRng for SequenceRng {
    fn pick_index(&mut self, _len: usize) -> usize {
        let picked = self
            .values
            .get(self.index)
            .or_else(|| self.values.last())
            .copied()
            .unwrap_or(0);
        self.index += 1;
        picked
    }
}
