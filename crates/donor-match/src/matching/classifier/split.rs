use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Row indices for a seeded train/holdout partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldoutSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffles `0..rows` with `seed` and carves off `ceil(rows * test_ratio)`
/// rows for evaluation, always leaving at least one training row.
pub fn holdout_split(rows: usize, test_ratio: f64, seed: u64) -> HoldoutSplit {
    let mut indices: Vec<usize> = (0..rows).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let ratio = if test_ratio.is_finite() {
        test_ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let test_len = ((rows as f64 * ratio).ceil() as usize).min(rows.saturating_sub(1));
    let train = indices.split_off(test_len);

    HoldoutSplit {
        train,
        test: indices,
    }
}
