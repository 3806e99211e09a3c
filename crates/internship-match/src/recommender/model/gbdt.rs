//! Histogram-based gradient-boosted regression trees for binary log-loss.
//!
//! Every column is bucketed once before boosting. A split "after bucket k" is stored as the
//! raw threshold `x <= bound[k]`, so prediction never needs the buckets. NaN lands in a
//! dedicated bucket that always sits on the right-hand side of a split, matching the
//! `NaN <= t == false` behavior at prediction time.

use super::encoder::FeatureEncoder;
use super::{ModelArtifact, ModelError, Trainer};
use crate::recommender::domain::Label;
use crate::recommender::features::FeatureVector;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::debug;

const MIN_CHILD_HESSIAN: f64 = 1e-3;
const MIN_SPLIT_GAIN: f64 = 1e-9;
const PROBABILITY_FLOOR: f64 = 1e-6;

/// Boosting hyperparameters. Defaults mirror the production training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub max_depth: usize,
    pub learning_rate: f64,
    /// Fraction of rows sampled (without replacement) for each tree.
    pub subsample: f64,
    /// Fraction of columns sampled for each tree.
    pub colsample: f64,
    pub min_samples_leaf: usize,
    pub l2_regularization: f64,
    pub max_bins: usize,
    pub seed: u64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 8,
            learning_rate: 0.1,
            subsample: 0.8,
            colsample: 0.8,
            min_samples_leaf: 20,
            l2_regularization: 1.0,
            max_bins: 255,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn evaluate(&self, row: &[f64]) -> f64 {
        let mut index = 0;
        loop {
            match &self.nodes[index] {
                TreeNode::Leaf { value } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    index = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Fitted additive ensemble; the margin is `base_score + Σ tree(x)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedTrees {
    width: usize,
    base_score: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoostedTrees {
    pub fn fit(
        matrix: &[Vec<f64>],
        labels: &[Label],
        params: &BoostingParams,
    ) -> Result<Self, ModelError> {
        if matrix.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if matrix.len() != labels.len() {
            return Err(ModelError::LengthMismatch {
                features: matrix.len(),
                labels: labels.len(),
            });
        }
        let width = matrix[0].len();
        if matrix.iter().any(|row| row.len() != width) {
            return Err(ModelError::RaggedMatrix { expected: width });
        }

        let targets: Vec<f64> = labels.iter().map(|label| label.as_f64()).collect();
        let positive_rate = (targets.iter().sum::<f64>() / targets.len() as f64)
            .clamp(PROBABILITY_FLOOR, 1.0 - PROBABILITY_FLOOR);
        let base_score = (positive_rate / (1.0 - positive_rate)).ln();

        let columns: Vec<ColumnBins> = (0..width)
            .map(|feature| ColumnBins::build(matrix, feature, params.max_bins))
            .collect();
        let binned: Vec<Vec<u16>> = columns
            .iter()
            .enumerate()
            .map(|(feature, bins)| {
                matrix
                    .iter()
                    .map(|row| bins.bin_of(row[feature]))
                    .collect()
            })
            .collect();

        let mut rng = StdRng::seed_from_u64(params.seed);
        let mut margins = vec![base_score; matrix.len()];
        let mut gradients = vec![0.0; matrix.len()];
        let mut hessians = vec![0.0; matrix.len()];
        let mut trees = Vec::with_capacity(params.n_estimators);

        let row_sample = sample_size(matrix.len(), params.subsample);
        let column_sample = sample_size(width, params.colsample);
        let mut row_order: Vec<usize> = (0..matrix.len()).collect();
        let mut column_order: Vec<usize> = (0..width).collect();

        for round in 0..params.n_estimators {
            for (index, target) in targets.iter().enumerate() {
                let probability = sigmoid(margins[index]);
                gradients[index] = probability - target;
                hessians[index] = probability * (1.0 - probability);
            }

            row_order.shuffle(&mut rng);
            column_order.shuffle(&mut rng);
            let mut rows = row_order[..row_sample].to_vec();
            let mut features = column_order[..column_sample].to_vec();
            features.sort_unstable();

            let mut builder = TreeBuilder {
                params,
                columns: &columns,
                binned: &binned,
                gradients: &gradients,
                hessians: &hessians,
                features: &features,
                nodes: Vec::new(),
            };
            builder.grow(&mut rows, 0);
            let tree = RegressionTree {
                nodes: builder.nodes,
            };

            for (index, row) in matrix.iter().enumerate() {
                margins[index] += tree.evaluate(row);
            }
            debug!(round, nodes = tree.nodes.len(), "boosting round complete");
            trees.push(tree);
        }

        Ok(Self {
            width,
            base_score,
            trees,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    /// Whether every split references an in-range column and points forward to existing
    /// nodes, which guarantees evaluation terminates without indexing out of bounds.
    pub(crate) fn is_well_formed(&self) -> bool {
        self.base_score.is_finite()
            && self.trees.iter().all(|tree| {
                !tree.nodes.is_empty()
                    && tree.nodes.iter().enumerate().all(|(index, node)| match node {
                        TreeNode::Leaf { value } => value.is_finite(),
                        TreeNode::Split {
                            feature,
                            threshold,
                            left,
                            right,
                        } => {
                            *feature < self.width
                                && !threshold.is_nan()
                                && (index + 1..tree.nodes.len()).contains(left)
                                && (index + 1..tree.nodes.len()).contains(right)
                        }
                    })
            })
    }

    pub fn predict_margin(&self, row: &[f64]) -> f64 {
        self.base_score + self.trees.iter().map(|tree| tree.evaluate(row)).sum::<f64>()
    }

    pub fn predict_proba(&self, row: &[f64]) -> f64 {
        sigmoid(self.predict_margin(row))
    }
}

fn sigmoid(margin: f64) -> f64 {
    1.0 / (1.0 + (-margin).exp())
}

fn sample_size(total: usize, fraction: f64) -> usize {
    let size = (total as f64 * fraction.clamp(0.0, 1.0)).round() as usize;
    size.clamp(total.min(1), total)
}

/// Bucket boundaries for one column. Finite values fall in `0..=bounds.len()`, NaN in the
/// extra missing bucket after those. The last finite bucket only holds values larger than
/// anything seen while fitting.
struct ColumnBins {
    bounds: Vec<f64>,
}

impl ColumnBins {
    fn build(matrix: &[Vec<f64>], feature: usize, max_bins: usize) -> Self {
        let mut distinct: Vec<f64> = matrix
            .iter()
            .map(|row| row[feature])
            .filter(|value| value.is_finite())
            .collect();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();

        let max_bins = max_bins.max(2);
        let Some(&largest) = distinct.last() else {
            return Self { bounds: Vec::new() };
        };

        let mut bounds: Vec<f64> = if distinct.len() <= max_bins {
            distinct
                .windows(2)
                .map(|pair| midpoint(pair[0], pair[1]))
                .collect()
        } else {
            (1..max_bins)
                .map(|cut| {
                    let index = cut * distinct.len() / max_bins;
                    midpoint(distinct[index - 1], distinct[index])
                })
                .collect()
        };
        // Closing bound at the largest seen value lets a split separate every finite value
        // from the missing bucket.
        bounds.push(largest);
        bounds.dedup();

        Self { bounds }
    }

    fn bin_of(&self, value: f64) -> u16 {
        if value.is_nan() {
            return self.missing_bin();
        }
        self.bounds.partition_point(|bound| *bound < value) as u16
    }

    fn missing_bin(&self) -> u16 {
        self.bounds.len() as u16 + 1
    }

    fn bin_count(&self) -> usize {
        self.bounds.len() + 2
    }
}

fn midpoint(low: f64, high: f64) -> f64 {
    low + (high - low) / 2.0
}

#[derive(Clone, Copy, Default)]
struct GradientSum {
    gradient: f64,
    hessian: f64,
    count: usize,
}

impl GradientSum {
    fn add(&mut self, gradient: f64, hessian: f64) {
        self.gradient += gradient;
        self.hessian += hessian;
        self.count += 1;
    }

    fn minus(self, other: Self) -> Self {
        Self {
            gradient: self.gradient - other.gradient,
            hessian: self.hessian - other.hessian,
            count: self.count - other.count,
        }
    }

    fn objective(self, l2: f64) -> f64 {
        self.gradient * self.gradient / (self.hessian + l2)
    }
}

struct SplitCandidate {
    feature: usize,
    bin: u16,
    threshold: f64,
    gain: f64,
}

struct TreeBuilder<'a> {
    params: &'a BoostingParams,
    columns: &'a [ColumnBins],
    binned: &'a [Vec<u16>],
    gradients: &'a [f64],
    hessians: &'a [f64],
    features: &'a [usize],
    nodes: Vec<TreeNode>,
}

impl TreeBuilder<'_> {
    fn grow(&mut self, rows: &mut Vec<usize>, depth: usize) -> usize {
        let index = self.nodes.len();
        self.nodes.push(TreeNode::Leaf { value: 0.0 });

        let total = rows.iter().fold(GradientSum::default(), |mut sum, row| {
            sum.add(self.gradients[*row], self.hessians[*row]);
            sum
        });

        let split = if depth < self.params.max_depth
            && rows.len() >= 2 * self.params.min_samples_leaf.max(1)
        {
            self.best_split(rows, total)
        } else {
            None
        };

        match split {
            Some(split) => {
                let column = &self.binned[split.feature];
                let (mut left, mut right): (Vec<usize>, Vec<usize>) =
                    rows.iter().partition(|row| column[**row] <= split.bin);
                rows.clear();
                let left_index = self.grow(&mut left, depth + 1);
                let right_index = self.grow(&mut right, depth + 1);
                self.nodes[index] = TreeNode::Split {
                    feature: split.feature,
                    threshold: split.threshold,
                    left: left_index,
                    right: right_index,
                };
            }
            None => {
                let value = -total.gradient / (total.hessian + self.params.l2_regularization)
                    * self.params.learning_rate;
                self.nodes[index] = TreeNode::Leaf { value };
            }
        }

        index
    }

    fn best_split(&self, rows: &[usize], total: GradientSum) -> Option<SplitCandidate> {
        let l2 = self.params.l2_regularization;
        let min_leaf = self.params.min_samples_leaf.max(1);
        let parent_objective = total.objective(l2);
        let mut best: Option<SplitCandidate> = None;

        for &feature in self.features {
            let bins = &self.columns[feature];
            if bins.bounds.is_empty() {
                continue;
            }

            let mut histogram = vec![GradientSum::default(); bins.bin_count()];
            let column = &self.binned[feature];
            for &row in rows {
                histogram[column[row] as usize].add(self.gradients[row], self.hessians[row]);
            }

            let mut left = GradientSum::default();
            for (bin, bound) in bins.bounds.iter().enumerate() {
                let bucket = histogram[bin];
                left.gradient += bucket.gradient;
                left.hessian += bucket.hessian;
                left.count += bucket.count;
                let right = total.minus(left);

                if left.count < min_leaf || right.count < min_leaf {
                    continue;
                }
                if left.hessian < MIN_CHILD_HESSIAN || right.hessian < MIN_CHILD_HESSIAN {
                    continue;
                }

                let gain = left.objective(l2) + right.objective(l2) - parent_objective;
                let improves = best.as_ref().map_or(true, |current| gain > current.gain);
                if gain > MIN_SPLIT_GAIN && improves {
                    best = Some(SplitCandidate {
                        feature,
                        bin: bin as u16,
                        threshold: *bound,
                        gain,
                    });
                }
            }
        }

        best
    }
}

/// Fits the encoder and the ensemble together and packages them as an artifact.
#[derive(Debug, Clone, Default)]
pub struct GradientBoostingTrainer {
    params: BoostingParams,
}

impl GradientBoostingTrainer {
    pub fn new(params: BoostingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }
}

impl Trainer for GradientBoostingTrainer {
    type Model = ModelArtifact;

    fn train(
        &self,
        features: &[FeatureVector],
        labels: &[Label],
    ) -> Result<ModelArtifact, ModelError> {
        if features.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if features.len() != labels.len() {
            return Err(ModelError::LengthMismatch {
                features: features.len(),
                labels: labels.len(),
            });
        }

        let encoder = FeatureEncoder::fit(features);
        let matrix = features
            .iter()
            .map(|row| encoder.encode(row))
            .collect::<Result<Vec<_>, _>>()?;
        let ensemble = GradientBoostedTrees::fit(&matrix, labels, &self.params)?;

        Ok(ModelArtifact::new(encoder, ensemble))
    }
}
