use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use super::tree::{DecisionTree, Sample, TreeParams};
use crate::config::TrainingConfig;
use crate::matching::domain::FEATURE_COUNT;

/// Bagged ensemble of CART trees with per-split feature subsampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Fits `config.trees` trees; tree `t` draws from a ChaCha stream seeded
    /// with `seed + 1 + t`, so a fixed seed reproduces the forest exactly.
    ///
    /// `samples` must be non-empty.
    pub(crate) fn fit(samples: &[Sample], labels: &[u8], config: &TrainingConfig) -> Self {
        let params = TreeParams {
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split.max(2),
            max_features: max_features(),
        };
        let rows = samples.len();

        let trees = (0..config.trees)
            .map(|tree| {
                let stream = config.seed.wrapping_add(1).wrapping_add(tree as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(stream);
                let bootstrap: Vec<usize> = (0..rows).map(|_| rng.gen_range(0..rows)).collect();
                DecisionTree::fit(samples, labels, bootstrap, &params, &mut rng)
            })
            .collect();

        Self { trees }
    }

    /// Mean positive-leaf rate across trees.
    pub fn predict_proba(&self, sample: &Sample) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self.trees.iter().map(|tree| tree.predict(sample)).sum();
        total / self.trees.len() as f64
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }

    pub(crate) fn is_well_formed(&self) -> bool {
        !self.trees.is_empty() && self.trees.iter().all(DecisionTree::is_well_formed)
    }
}

fn max_features() -> usize {
    ((FEATURE_COUNT as f64).sqrt() as usize).max(1)
}
