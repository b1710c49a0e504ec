//! Random forest: bagged trees with per-split feature subsampling, fitted by smartcore
//!
//! The forest seed is drawn from the caller's random source, so one strategy
//! seed fixes every bootstrap sample and every feature subset.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{RandomForestClassifier, RandomForestClassifierParameters};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::SplitCriterion;
use tracing::debug;

use super::dense::{class_codes, class_indices, predict_rows, training_matrix};
use super::{check_trainable, ClassifierStrategy, LabeledMatrix, ModelParams, StrategyKind, TrainedModel};
use crate::error::{PipelineError, Result};
use crate::pipeline::frame::FeatureMatrix;

type ForestClassifier = RandomForestClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForestConfig {
    pub n_trees: u16,
    /// Features tried per split; `None` uses `floor(sqrt(p))`.
    pub max_features: Option<usize>,
    pub max_depth: u16,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_features: None,
            max_depth: 64,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl ForestConfig {
    fn features_per_split(&self, n_features: usize) -> usize {
        self.max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().floor() as usize)
            .clamp(1, n_features.max(1))
    }

    fn parameters(&self, n_features: usize, seed: u64) -> RandomForestClassifierParameters {
        let mut params = RandomForestClassifierParameters::default();
        params.criterion = SplitCriterion::Gini;
        params.max_depth = Some(self.max_depth);
        params.min_samples_split = self.min_samples_split;
        params.min_samples_leaf = self.min_samples_leaf;
        params.n_trees = self.n_trees;
        params.m = Some(self.features_per_split(n_features));
        params.keep_samples = false;
        params.seed = seed;
        params
    }
}

/// A fitted forest.
#[derive(Clone)]
pub struct Forest {
    classifier: Arc<ForestClassifier>,
    n_trees: usize,
    n_classes: usize,
}

impl fmt::Debug for Forest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forest")
            .field("n_trees", &self.n_trees)
            .field("n_classes", &self.n_classes)
            .finish_non_exhaustive()
    }
}

impl Forest {
    pub fn len(&self) -> usize {
        self.n_trees
    }

    pub fn is_empty(&self) -> bool {
        self.n_trees == 0
    }
}

#[derive(Debug, Clone)]
pub struct RandomForest {
    config: ForestConfig,
}

impl RandomForest {
    pub fn new(config: ForestConfig) -> Self {
        Self { config }
    }
}

impl ClassifierStrategy for RandomForest {
    fn kind(&self) -> StrategyKind {
        StrategyKind::RandomForest
    }

    fn train(&self, data: &LabeledMatrix, rng: &mut StdRng) -> Result<TrainedModel> {
        check_trainable(self.kind(), data)?;
        if self.config.n_trees == 0 || self.config.max_depth == 0 {
            return Err(PipelineError::training(
                self.name(),
                "forest needs at least one tree of positive depth",
            ));
        }

        let n_features = data.features.n_features();
        let x = training_matrix(self.kind(), &data.features.rows)?;
        let y = class_codes(&data.labels);
        let params = self.config.parameters(n_features, rng.gen());
        let classifier =
            RandomForestClassifier::fit(&x, &y, params).map_err(|e| PipelineError::training(self.name(), e.to_string()))?;

        debug!(
            trees = self.config.n_trees,
            mtry = self.config.features_per_split(n_features),
            "random forest trained"
        );

        let forest = Forest {
            classifier: Arc::new(classifier),
            n_trees: usize::from(self.config.n_trees),
            n_classes: data.n_classes(),
        };
        Ok(TrainedModel::new(self.kind(), data, ModelParams::Forest(forest)))
    }

    fn predict(&self, model: &TrainedModel, features: &FeatureMatrix) -> Result<Vec<String>> {
        let rows = model.rows_for(self.kind(), features)?;
        let ModelParams::Forest(forest) = model.params() else {
            return Err(PipelineError::ModelMismatch {
                trained: model.kind().to_string(),
                requested: self.kind().to_string(),
            });
        };
        let indices = predict_rows(self.kind(), &rows, |x| {
            let codes = forest
                .classifier
                .predict(x)
                .map_err(|e| PipelineError::prediction(self.name(), e.to_string()))?;
            class_indices(self.kind(), &codes, forest.n_classes)
        })?;
        Ok(model.names_of(indices))
    }
}
