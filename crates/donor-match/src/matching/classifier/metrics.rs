//! Holdout evaluation for the match classifier.

use serde::{Deserialize, Serialize};

/// Precision/recall breakdown for one label value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: u8,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Accuracy plus per-class metrics over a holdout set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub classes: Vec<ClassMetrics>,
    pub total: usize,
}

impl ClassificationReport {
    pub fn class(&self, label: u8) -> Option<&ClassMetrics> {
        self.classes.iter().find(|metrics| metrics.label == label)
    }
}

/// Computes the report from predicted and ground-truth labels of equal length.
pub fn classification_report(predictions: &[u8], labels: &[u8]) -> ClassificationReport {
    debug_assert_eq!(predictions.len(), labels.len());

    let total = predictions.len().min(labels.len());
    let correct = predictions
        .iter()
        .zip(labels)
        .filter(|(predicted, actual)| predicted == actual)
        .count();
    let accuracy = ratio(correct, total);

    let classes = [0u8, 1u8]
        .into_iter()
        .map(|label| {
            let mut true_positive = 0;
            let mut predicted = 0;
            let mut support = 0;
            for (&p, &a) in predictions.iter().zip(labels) {
                if p == label {
                    predicted += 1;
                }
                if a == label {
                    support += 1;
                    if p == label {
                        true_positive += 1;
                    }
                }
            }

            let precision = ratio(true_positive, predicted);
            let recall = ratio(true_positive, support);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };

            ClassMetrics {
                label,
                precision,
                recall,
                f1,
                support,
            }
        })
        .collect();

    ClassificationReport {
        accuracy,
        classes,
        total,
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl std::fmt::Display for ClassificationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:>8} {:>10} {:>10} {:>10} {:>10}",
            "label", "precision", "recall", "f1-score", "support"
        )?;
        for class in &self.classes {
            writeln!(
                f,
                "{:>8} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                class.label, class.precision, class.recall, class.f1, class.support
            )?;
        }
        write!(
            f,
            "{:>8} {:>32.2} {:>10}",
            "accuracy", self.accuracy, self.total
        )
    }
}
