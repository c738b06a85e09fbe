use rand::seq::index;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::matching::domain::FEATURE_COUNT;

pub(crate) type Sample = [f64; FEATURE_COUNT];

const MIN_GAIN: f64 = 1e-12;

#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub(crate) max_depth: Option<usize>,
    pub(crate) min_samples_split: usize,
    pub(crate) max_features: usize,
}

/// Arena node; children always sit at higher indices than their parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
enum Node {
    Leaf {
        positive_rate: f64,
        samples: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// Binary CART tree scored by gini impurity; leaves hold the positive-class rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    pub(crate) fn fit<R: Rng>(
        samples: &[Sample],
        labels: &[u8],
        indices: Vec<usize>,
        params: &TreeParams,
        rng: &mut R,
    ) -> Self {
        let mut builder = TreeBuilder {
            samples,
            labels,
            params,
            nodes: Vec::new(),
        };
        builder.grow(indices, 0, rng);
        Self {
            nodes: builder.nodes,
        }
    }

    pub fn predict(&self, sample: &Sample) -> f64 {
        let mut index = 0;
        loop {
            match self.nodes.get(index) {
                Some(Node::Leaf { positive_rate, .. }) => return *positive_rate,
                Some(Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                }) => {
                    let value = sample.get(*feature).copied().unwrap_or_default();
                    index = if value <= *threshold { *left } else { *right };
                }
                None => return 0.0,
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], index: usize) -> usize {
            match nodes.get(index) {
                Some(Node::Split { left, right, .. }) => {
                    1 + walk(nodes, *left).max(walk(nodes, *right))
                }
                _ => 0,
            }
        }
        walk(&self.nodes, 0)
    }

    /// Structural check for artifacts read back from disk.
    pub(crate) fn is_well_formed(&self) -> bool {
        !self.nodes.is_empty()
            && self.nodes.iter().enumerate().all(|(index, node)| match node {
                Node::Leaf { positive_rate, .. } => (0.0..=1.0).contains(positive_rate),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    *feature < FEATURE_COUNT
                        && threshold.is_finite()
                        && *left > index
                        && *right > index
                        && *left < self.nodes.len()
                        && *right < self.nodes.len()
                }
            })
    }
}

struct TreeBuilder<'a> {
    samples: &'a [Sample],
    labels: &'a [u8],
    params: &'a TreeParams,
    nodes: Vec<Node>,
}

#[derive(Debug, Clone, Copy)]
struct Candidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl TreeBuilder<'_> {
    fn grow<R: Rng>(&mut self, indices: Vec<usize>, depth: usize, rng: &mut R) -> usize {
        let total = indices.len();
        let positives = indices.iter().filter(|&&i| self.labels[i] == 1).count();
        let positive_rate = if total == 0 {
            0.0
        } else {
            positives as f64 / total as f64
        };

        let node_index = self.nodes.len();
        self.nodes.push(Node::Leaf {
            positive_rate,
            samples: total,
        });

        let pure = positives == 0 || positives == total;
        let depth_capped = self.params.max_depth.is_some_and(|max| depth >= max);
        if pure || depth_capped || total < self.params.min_samples_split {
            return node_index;
        }

        let Some(split) = self.best_split(&indices, positives, rng) else {
            return node_index;
        };

        let (left, right): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| self.samples[i][split.feature] <= split.threshold);
        let left = self.grow(left, depth + 1, rng);
        let right = self.grow(right, depth + 1, rng);

        self.nodes[node_index] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        node_index
    }

    /// Searches a random feature subset first, then the remaining features
    /// only if the subset offered no informative split.
    fn best_split<R: Rng>(
        &self,
        indices: &[usize],
        positives: usize,
        rng: &mut R,
    ) -> Option<Candidate> {
        let max_features = self.params.max_features.clamp(1, FEATURE_COUNT);
        let sampled = index::sample(rng, FEATURE_COUNT, max_features).into_vec();

        let best_of = |features: &mut dyn Iterator<Item = usize>| {
            features
                .filter_map(|feature| self.split_on(indices, feature, positives))
                .fold(None, |best: Option<Candidate>, candidate| match best {
                    Some(current) if current.gain >= candidate.gain => Some(current),
                    _ => Some(candidate),
                })
        };

        best_of(&mut sampled.iter().copied()).or_else(|| {
            best_of(&mut (0..FEATURE_COUNT).filter(|feature| !sampled.contains(feature)))
        })
    }

    fn split_on(&self, indices: &[usize], feature: usize, positives: usize) -> Option<Candidate> {
        let mut sorted: Vec<(f64, u8)> = indices
            .iter()
            .map(|&i| (self.samples[i][feature], self.labels[i]))
            .collect();
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

        let total = sorted.len();
        let parent = gini(positives, total);
        let mut left_positives = 0;
        let mut best: Option<Candidate> = None;

        for k in 1..total {
            let (previous_value, previous_label) = sorted[k - 1];
            left_positives += usize::from(previous_label);
            let value = sorted[k].0;
            if previous_value >= value {
                continue;
            }

            let right_total = total - k;
            let right_positives = positives - left_positives;
            let impurity = (k as f64 * gini(left_positives, k)
                + right_total as f64 * gini(right_positives, right_total))
                / total as f64;
            let gain = parent - impurity;

            if gain > MIN_GAIN && best.map_or(true, |current| gain > current.gain) {
                best = Some(Candidate {
                    feature,
                    threshold: (previous_value + value) / 2.0,
                    gain,
                });
            }
        }

        best
    }
}

fn gini(positives: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let p = positives as f64 / total as f64;
    2.0 * p * (1.0 - p)
}
