//! Multi-class AdaBoost (SAMME) over shallow smartcore trees
//!
//! smartcore trees take no sample weights, so every round fits its tree on a
//! bootstrap sample drawn in proportion to the current weights. Errors and
//! reweighting are always computed over the full training set.

use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use tracing::debug;

use super::dense::{class_codes, predict_rows, training_matrix};
use super::tree::{DecisionTree, TreeConfig};
use super::{argmax, check_trainable, ClassifierStrategy, LabeledMatrix, ModelParams, StrategyKind, TrainedModel};
use crate::error::{PipelineError, Result};
use crate::pipeline::frame::FeatureMatrix;

/// Weighted errors below this are treated as a perfect fit.
const PERFECT_FIT: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostConfig {
    /// Maximum boosting iterations (weak learners).
    pub iterations: usize,
    pub max_depth: u16,
    pub min_samples_leaf: usize,
    /// Shrinkage applied to every learner's vote.
    pub learning_rate: f64,
}

impl Default for BoostConfig {
    fn default() -> Self {
        Self {
            iterations: 100,
            max_depth: 3,
            min_samples_leaf: 1,
            learning_rate: 0.5,
        }
    }
}

/// Weak learners and their votes.
#[derive(Debug, Clone)]
pub struct BoostedEnsemble {
    learners: Vec<(DecisionTree, f64)>,
    n_classes: usize,
}

impl BoostedEnsemble {
    pub fn len(&self) -> usize {
        self.learners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.learners.is_empty()
    }

    fn predict(&self, kind: StrategyKind, x: &DenseMatrix<f64>) -> Result<Vec<usize>> {
        let mut scores: Vec<Vec<f64>> = Vec::new();
        for (tree, alpha) in &self.learners {
            let votes = tree.predict(kind, x)?;
            if scores.is_empty() {
                scores = vec![vec![0.0; self.n_classes]; votes.len()];
            }
            for (row, vote) in scores.iter_mut().zip(votes) {
                row[vote] += alpha;
            }
        }
        Ok(scores.iter().map(|row| argmax(row)).collect())
    }
}

#[derive(Debug, Clone)]
pub struct BoostedDecisionTree {
    config: BoostConfig,
}

impl BoostedDecisionTree {
    pub fn new(config: BoostConfig) -> Self {
        Self { config }
    }
}

/// Row indices drawn with replacement, each with probability proportional to its weight.
fn weighted_bootstrap(weights: &[f64], rng: &mut StdRng) -> Option<Vec<usize>> {
    let dist = WeightedIndex::new(weights).ok()?;
    Some((0..weights.len()).map(|_| dist.sample(rng)).collect())
}

impl ClassifierStrategy for BoostedDecisionTree {
    fn kind(&self) -> StrategyKind {
        StrategyKind::BoostedDecisionTree
    }

    fn train(&self, data: &LabeledMatrix, rng: &mut StdRng) -> Result<TrainedModel> {
        check_trainable(self.kind(), data)?;
        if self.config.iterations == 0 || self.config.learning_rate <= 0.0 || self.config.max_depth == 0 {
            return Err(PipelineError::training(
                self.name(),
                "iterations, max_depth and learning rate must be positive",
            ));
        }

        let k = data.n_classes();
        if data.observed_classes() < 2 {
            return Err(PipelineError::training(self.name(), "boosting needs at least two classes"));
        }

        let n = data.n_rows();
        let rows = &data.features.rows;
        let codes = class_codes(&data.labels);
        let full = training_matrix(self.kind(), rows)?;
        let tree_config = TreeConfig {
            max_depth: self.config.max_depth,
            min_samples_split: 2,
            min_samples_leaf: self.config.min_samples_leaf,
        };

        let mut weights = vec![1.0 / n as f64; n];
        let mut learners = Vec::new();
        let chance = 1.0 - 1.0 / k as f64;

        for iteration in 0..self.config.iterations {
            let sample = weighted_bootstrap(&weights, rng)
                .ok_or_else(|| PipelineError::training(self.name(), "sample weights collapsed"))?;
            let sample_rows: Vec<Vec<f64>> = sample.iter().map(|&i| rows[i].clone()).collect();
            let sample_codes: Vec<u32> = sample.iter().map(|&i| codes[i]).collect();
            let x = training_matrix(self.kind(), &sample_rows)?;
            let tree = DecisionTree::fit(self.kind(), &x, &sample_codes, k, &tree_config, rng.gen())?;

            let missed: Vec<bool> = tree
                .predict(self.kind(), &full)?
                .into_iter()
                .zip(data.labels.iter())
                .map(|(predicted, &label)| predicted != label)
                .collect();

            let total: f64 = weights.iter().sum();
            let error: f64 = weights
                .iter()
                .zip(missed.iter())
                .filter(|&(_, &m)| m)
                .map(|(w, _)| w)
                .sum::<f64>()
                / total;

            if error <= PERFECT_FIT {
                debug!(iteration, "weak learner fits perfectly, stopping");
                learners.push((tree, 1.0));
                break;
            }
            if error >= chance {
                if learners.is_empty() {
                    return Err(PipelineError::training(
                        self.name(),
                        format!("first weak learner no better than chance (error {:.3})", error),
                    ));
                }
                debug!(iteration, error, "weak learner no better than chance, stopping");
                break;
            }

            let alpha = self.config.learning_rate * (((1.0 - error) / error).ln() + ((k - 1) as f64).ln());
            for (w, &m) in weights.iter_mut().zip(missed.iter()) {
                if m {
                    *w *= alpha.exp();
                }
            }
            let sum: f64 = weights.iter().sum();
            weights.iter_mut().for_each(|w| *w /= sum);

            learners.push((tree, alpha));
        }

        debug!(learners = learners.len(), "boosted ensemble trained");
        Ok(TrainedModel::new(
            self.kind(),
            data,
            ModelParams::Boosted(BoostedEnsemble { learners, n_classes: k }),
        ))
    }

    fn predict(&self, model: &TrainedModel, features: &FeatureMatrix) -> Result<Vec<String>> {
        let rows = model.rows_for(self.kind(), features)?;
        let ModelParams::Boosted(ensemble) = model.params() else {
            return Err(PipelineError::ModelMismatch {
                trained: model.kind().to_string(),
                requested: self.kind().to_string(),
            });
        };
        let indices = predict_rows(self.kind(), &rows, |x| ensemble.predict(self.kind(), x))?;
        Ok(model.names_of(indices))
    }
}
