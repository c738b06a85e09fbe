//! Supervised match classifier: training contract, scoring, and artifacts.

mod forest;
pub mod metrics;
pub mod split;
pub mod store;
mod tree;

pub use forest::RandomForest;
pub use metrics::{classification_report, ClassMetrics, ClassificationReport};
pub use split::{holdout_split, HoldoutSplit};
pub use store::{load_model, save_model, ModelStoreError};
pub use tree::DecisionTree;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::domain::{FeatureVector, LabeledExample, FEATURE_COUNT, FEATURE_NAMES};
use crate::config::{ConfigError, TrainingConfig};

/// Probability above which a pair is classified as a match.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Read-only scoring capability shared across concurrent callers.
pub trait MatchScorer: Send + Sync {
    /// Probability in `[0, 1]` that the pair is a match.
    fn score(&self, features: &FeatureVector) -> f64;
}

/// Fitted estimator backing a [`MatchModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Estimator {
    Forest(RandomForest),
    /// Used when the training labels contain a single class.
    Constant { positive_probability: f64 },
}

/// Trained classifier artifact. Immutable once built; retraining produces a new one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchModel {
    pub feature_names: Vec<String>,
    pub estimator: Estimator,
    pub trained_rows: usize,
    pub seed: u64,
    pub holdout: Option<ClassificationReport>,
}

impl MatchModel {
    pub fn score(&self, features: &FeatureVector) -> f64 {
        let probability = match &self.estimator {
            Estimator::Forest(forest) => forest.predict_proba(&features.values()),
            Estimator::Constant {
                positive_probability,
            } => *positive_probability,
        };
        probability.clamp(0.0, 1.0)
    }

    pub fn is_constant(&self) -> bool {
        matches!(self.estimator, Estimator::Constant { .. })
    }

    pub fn holdout(&self) -> Option<&ClassificationReport> {
        self.holdout.as_ref()
    }
}

impl MatchScorer for MatchModel {
    fn score(&self, features: &FeatureVector) -> f64 {
        MatchModel::score(self, features)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TrainingError {
    #[error("training set is empty")]
    EmptyTrainingSet,
    #[error("feature rows ({features}) and labels ({labels}) differ in length")]
    LengthMismatch { features: usize, labels: usize },
    #[error("label {value} at row {row} is not 0 or 1")]
    InvalidLabel { row: usize, value: u8 },
    #[error("invalid training configuration: {0}")]
    InvalidConfig(#[from] ConfigError),
}

/// Trains on a seeded 1 - `test_ratio` share of the rows and evaluates on the rest.
///
/// The holdout report is logged and attached to the returned model. A
/// single-class training share yields a constant model whose probability is
/// the observed frequency of label 1.
pub fn train(
    features: &[FeatureVector],
    labels: &[u8],
    config: &TrainingConfig,
) -> Result<MatchModel, TrainingError> {
    config.validate()?;
    if features.len() != labels.len() {
        return Err(TrainingError::LengthMismatch {
            features: features.len(),
            labels: labels.len(),
        });
    }
    if features.is_empty() {
        return Err(TrainingError::EmptyTrainingSet);
    }
    if let Some((row, &value)) = labels.iter().enumerate().find(|&(_, &label)| label > 1) {
        return Err(TrainingError::InvalidLabel { row, value });
    }

    let split = holdout_split(features.len(), config.test_ratio, config.seed);
    let train_samples: Vec<_> = split.train.iter().map(|&i| features[i].values()).collect();
    let train_labels: Vec<u8> = split.train.iter().map(|&i| labels[i]).collect();

    let estimator = fit_estimator(&train_samples, &train_labels, config);
    let mut model = MatchModel {
        feature_names: FEATURE_NAMES.iter().map(|name| name.to_string()).collect(),
        estimator,
        trained_rows: train_samples.len(),
        seed: config.seed,
        holdout: None,
    };

    if split.test.is_empty() {
        warn!(rows = features.len(), "holdout split is empty; evaluation skipped");
    } else {
        let predictions: Vec<u8> = split
            .test
            .iter()
            .map(|&i| u8::from(model.score(&features[i]) > DECISION_THRESHOLD))
            .collect();
        let actual: Vec<u8> = split.test.iter().map(|&i| labels[i]).collect();
        let report = classification_report(&predictions, &actual);

        info!(
            accuracy = report.accuracy,
            train_rows = train_samples.len(),
            holdout_rows = actual.len(),
            "match classifier evaluated"
        );
        info!("classification report\n{report}");
        model.holdout = Some(report);
    }

    Ok(model)
}

pub fn train_examples(
    examples: &[LabeledExample],
    config: &TrainingConfig,
) -> Result<MatchModel, TrainingError> {
    let features: Vec<FeatureVector> = examples.iter().map(|example| example.features).collect();
    let labels: Vec<u8> = examples.iter().map(|example| example.label).collect();
    train(&features, &labels, config)
}

fn fit_estimator(
    samples: &[[f64; FEATURE_COUNT]],
    labels: &[u8],
    config: &TrainingConfig,
) -> Estimator {
    let positives = labels.iter().filter(|&&label| label == 1).count();
    if positives == 0 || positives == labels.len() {
        let positive_probability = positives as f64 / labels.len() as f64;
        warn!(
            rows = labels.len(),
            positive_probability, "single-class training set; using constant model"
        );
        return Estimator::Constant {
            positive_probability,
        };
    }

    Estimator::Forest(RandomForest::fit(samples, labels, config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(blood: u8, organ: u8, age_diff: u32, consent: u8) -> FeatureVector {
        FeatureVector {
            blood_match: blood,
            organ_match: organ,
            age_diff,
            urgency: 2,
            city_match: 1,
            consent,
        }
    }

    fn separable() -> (Vec<FeatureVector>, Vec<u8>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for age_diff in 0..30 {
            features.push(vector(1, 1, age_diff, 1));
            labels.push(1);
            features.push(vector(0, 1, age_diff, 1));
            labels.push(0);
            features.push(vector(1, 0, age_diff, 0));
            labels.push(0);
        }
        (features, labels)
    }

    fn config() -> TrainingConfig {
        TrainingConfig {
            trees: 20,
            ..TrainingConfig::default()
        }
    }

    #[test]
    fn train_rejects_mismatched_lengths() {
        let error = train(&[vector(1, 1, 0, 1)], &[], &config()).expect_err("mismatch");
        assert!(matches!(
            error,
            TrainingError::LengthMismatch {
                features: 1,
                labels: 0
            }
        ));
    }

    #[test]
    fn train_rejects_empty_and_invalid_labels() {
        assert!(matches!(
            train(&[], &[], &config()),
            Err(TrainingError::EmptyTrainingSet)
        ));
        assert!(matches!(
            train(&[vector(1, 1, 0, 1)], &[2], &config()),
            Err(TrainingError::InvalidLabel { row: 0, value: 2 })
        ));
    }

    #[test]
    fn train_rejects_invalid_config_before_fitting() {
        let (features, labels) = separable();
        for config in [
            TrainingConfig {
                trees: 0,
                ..TrainingConfig::default()
            },
            TrainingConfig {
                test_ratio: 1.0,
                ..TrainingConfig::default()
            },
            TrainingConfig {
                min_samples_split: 1,
                ..TrainingConfig::default()
            },
        ] {
            assert!(matches!(
                train(&features, &labels, &config),
                Err(TrainingError::InvalidConfig(_))
            ));
        }
    }

    #[test]
    fn train_is_reproducible_with_fixed_seed() {
        let (features, labels) = separable();
        let first = train(&features, &labels, &config()).expect("trains");
        let second = train(&features, &labels, &config()).expect("trains");

        let first_accuracy = first.holdout().expect("evaluated").accuracy;
        let second_accuracy = second.holdout().expect("evaluated").accuracy;
        assert_eq!(first_accuracy, second_accuracy);
        assert_eq!(first, second);
    }

    #[test]
    fn trained_forest_separates_matches() {
        let (features, labels) = separable();
        let model = train(&features, &labels, &config()).expect("trains");
        assert!(!model.is_constant());
        assert_eq!(model.trained_rows, 72);
        assert!(model.score(&vector(1, 1, 5, 1)) > DECISION_THRESHOLD);
        assert!(model.score(&vector(0, 1, 5, 1)) < DECISION_THRESHOLD);
        assert!(model.holdout().expect("evaluated").accuracy > 0.9);
    }

    #[test]
    fn single_class_training_still_scores() {
        let features: Vec<FeatureVector> = (0..10).map(|i| vector(1, 0, i, 1)).collect();
        let labels = vec![0; 10];
        let model = train(&features, &labels, &config()).expect("trains");

        assert!(model.is_constant());
        for probe in [vector(1, 1, 0, 1), vector(0, 0, 80, 0)] {
            let probability = model.score(&probe);
            assert!((0.0..=1.0).contains(&probability));
            assert_eq!(probability, 0.0);
        }
    }

    #[test]
    fn all_positive_training_scores_one() {
        let features: Vec<FeatureVector> = (0..5).map(|i| vector(1, 1, i, 1)).collect();
        let model = train(&features, &[1; 5], &config()).expect("trains");
        assert_eq!(model.score(&vector(0, 0, 3, 0)), 1.0);
    }
}
