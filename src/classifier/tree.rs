//! Single CART classification tree, fitted by smartcore
//!
//! Splits minimize Gini impurity. The random source only seeds smartcore, so
//! the same seed always grows the same tree.

use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::tree::decision_tree_classifier::{
    DecisionTreeClassifier, DecisionTreeClassifierParameters, SplitCriterion,
};
use tracing::debug;

use super::dense::{class_codes, class_indices, predict_rows, training_matrix};
use super::{check_trainable, ClassifierStrategy, LabeledMatrix, ModelParams, StrategyKind, TrainedModel};
use crate::error::{PipelineError, Result};
use crate::pipeline::frame::FeatureMatrix;

type TreeClassifier = DecisionTreeClassifier<f64, u32, DenseMatrix<f64>, Vec<u32>>;

/// Training parameters for a single tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub max_depth: u16,
    /// Nodes with fewer rows become leaves.
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 30,
            min_samples_split: 20,
            min_samples_leaf: 7,
        }
    }
}

impl TreeConfig {
    fn parameters(&self, seed: u64) -> DecisionTreeClassifierParameters {
        let mut params = DecisionTreeClassifierParameters::default();
        params.criterion = SplitCriterion::Gini;
        params.max_depth = Some(self.max_depth);
        params.min_samples_split = self.min_samples_split;
        params.min_samples_leaf = self.min_samples_leaf;
        params.seed = Some(seed);
        params
    }
}

/// A fitted classification tree over class indices.
#[derive(Clone)]
pub struct DecisionTree {
    classifier: Arc<TreeClassifier>,
    n_classes: usize,
}

impl fmt::Debug for DecisionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecisionTree")
            .field("n_classes", &self.n_classes)
            .finish_non_exhaustive()
    }
}

impl DecisionTree {
    /// Fit on `x` with class codes `y`; failures are reported against `kind`.
    pub(crate) fn fit(
        kind: StrategyKind,
        x: &DenseMatrix<f64>,
        y: &Vec<u32>,
        n_classes: usize,
        config: &TreeConfig,
        seed: u64,
    ) -> Result<Self> {
        let classifier = DecisionTreeClassifier::fit(x, y, config.parameters(seed))
            .map_err(|e| PipelineError::training(kind.label(), e.to_string()))?;
        Ok(Self {
            classifier: Arc::new(classifier),
            n_classes,
        })
    }

    /// Class index for every row of `x`.
    pub(crate) fn predict(&self, kind: StrategyKind, x: &DenseMatrix<f64>) -> Result<Vec<usize>> {
        let codes = self
            .classifier
            .predict(x)
            .map_err(|e| PipelineError::prediction(kind.label(), e.to_string()))?;
        class_indices(kind, &codes, self.n_classes)
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

#[derive(Debug, Clone)]
pub struct DecisionTreeStrategy {
    config: TreeConfig,
}

impl DecisionTreeStrategy {
    pub fn new(config: TreeConfig) -> Self {
        Self { config }
    }
}

impl ClassifierStrategy for DecisionTreeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::DecisionTree
    }

    fn train(&self, data: &LabeledMatrix, rng: &mut StdRng) -> Result<TrainedModel> {
        check_trainable(self.kind(), data)?;
        if self.config.max_depth == 0 {
            return Err(PipelineError::training(self.name(), "max_depth must be positive"));
        }

        let x = training_matrix(self.kind(), &data.features.rows)?;
        let y = class_codes(&data.labels);
        let tree = DecisionTree::fit(self.kind(), &x, &y, data.n_classes(), &self.config, rng.gen())?;

        debug!(rows = data.n_rows(), max_depth = self.config.max_depth, "decision tree trained");
        Ok(TrainedModel::new(self.kind(), data, ModelParams::Tree(tree)))
    }

    fn predict(&self, model: &TrainedModel, features: &FeatureMatrix) -> Result<Vec<String>> {
        let rows = model.rows_for(self.kind(), features)?;
        let ModelParams::Tree(tree) = model.params() else {
            return Err(PipelineError::ModelMismatch {
                trained: model.kind().to_string(),
                requested: self.kind().to_string(),
            });
        };
        let indices = predict_rows(self.kind(), &rows, |x| tree.predict(self.kind(), x))?;
        Ok(model.names_of(indices))
    }
}
