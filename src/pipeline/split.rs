//! Seeded shuffle split into train and test row indices.

use rand::{SeedableRng as _, seq::SliceRandom};
use rand_pcg::Pcg64;

/// Row indices for each side of a split.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..n` with a PCG generator seeded from `seed` and holds out
/// `ceil(n * test_fraction)` rows for testing.
///
/// The training side always keeps at least one row when `n > 0`.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> SplitIndices {
    let fraction = test_fraction.clamp(0.0, 1.0);
    let n_test = ((n as f64) * fraction).ceil() as usize;
    let n_test = n_test.min(n.saturating_sub(1));

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = Pcg64::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    SplitIndices {
        train,
        test: indices,
    }
}
