// ============================================================
// Layer 4: Train/Validation/Test Splitter
// ============================================================
// Shuffles the full table with a fixed seed, then cuts it into
// three contiguous partitions by cumulative fraction:
//
//   [0, ⌊0.8·N⌋)        → training
//   [⌊0.8·N⌋, ⌊0.9·N⌋)  → validation
//   [⌊0.9·N⌋, N)        → test
//
// The partitions are disjoint by construction and together
// hold every input row exactly once. Because the seed is an
// explicit argument, the same table always splits the same way.
//
// Uses Fisher-Yates shuffle via rand::seq::SliceRandom on a
// seeded StdRng.
//
// Reference: rand crate documentation

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Cumulative cut points, as fractions of the table length.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitFractions {
    /// End of the training partition, e.g. 0.8
    pub train_end: f64,
    /// End of the validation partition, e.g. 0.9
    pub validation_end: f64,
}

impl Default for SplitFractions {
    fn default() -> Self {
        Self { train_end: 0.8, validation_end: 0.9 }
    }
}

impl SplitFractions {
    /// Row boundaries for a table of `total` rows.
    /// Truncates toward zero and clamps into [0, total].
    pub fn boundaries(&self, total: usize) -> (usize, usize) {
        let cut = |f: f64| ((total as f64 * f) as usize).min(total);
        let first  = cut(self.train_end);
        let second = cut(self.validation_end).max(first);
        (first, second)
    }
}

/// The three disjoint partitions of a shuffled table.
#[derive(Debug, Clone)]
pub struct Partitions<T> {
    pub train:      Vec<T>,
    pub validation: Vec<T>,
    pub test:       Vec<T>,
}

impl<T> Partitions<T> {
    pub fn sizes(&self) -> (usize, usize, usize) {
        (self.train.len(), self.validation.len(), self.test.len())
    }
}

/// Shuffle `samples` with `seed` and split into train/validation/test.
pub fn split_partitions<T>(
    mut samples: Vec<T>,
    fractions:   SplitFractions,
    seed:        u64,
) -> Partitions<T> {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total = samples.len();
    let (train_end, val_end) = fractions.boundaries(total);

    // split_off(n) leaves [0..n) behind and returns [n..)
    let test       = samples.split_off(val_end);
    let validation = samples.split_off(train_end);
    let train      = samples;

    tracing::debug!(
        "Dataset split (seed {}): {} train, {} validation, {} test",
        seed,
        train.len(),
        validation.len(),
        test.len(),
    );

    Partitions { train, validation, test }
}
