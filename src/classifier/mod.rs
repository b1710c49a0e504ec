//! Classifier strategies behind a uniform train/predict contract
//!
//! The model selector treats every strategy identically: the same labeled
//! training matrix goes in, a [`TrainedModel`] comes out, and predictions are
//! one class name per input row in input order.

pub mod boost;
mod dense;
pub mod forest;
pub mod svm;
pub mod tree;

use std::borrow::Cow;
use std::fmt;

use polars::prelude::DataFrame;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};
use crate::pipeline::frame::FeatureMatrix;
use crate::pipeline::labels::{label_values, ClassSet};

pub use boost::{BoostConfig, BoostedDecisionTree, BoostedEnsemble};
pub use forest::{Forest, ForestConfig, RandomForest};
pub use svm::{LinearSvm, SupportVectorMachine, SvmConfig};
pub use tree::{DecisionTree, DecisionTreeStrategy, TreeConfig};

/// The concrete algorithms. Declaration order is the selection priority used
/// to break ties (earlier wins).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    RandomForest,
    BoostedDecisionTree,
    SupportVectorMachine,
    DecisionTree,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::RandomForest,
        StrategyKind::BoostedDecisionTree,
        StrategyKind::SupportVectorMachine,
        StrategyKind::DecisionTree,
    ];

    /// Lower is preferred.
    pub fn priority(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            StrategyKind::RandomForest => "Random Forest",
            StrategyKind::BoostedDecisionTree => "Boosted Decision Tree",
            StrategyKind::SupportVectorMachine => "Support Vector Machine",
            StrategyKind::DecisionTree => "Decision Tree",
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            StrategyKind::RandomForest => "rf",
            StrategyKind::BoostedDecisionTree => "gbm",
            StrategyKind::SupportVectorMachine => "svm",
            StrategyKind::DecisionTree => "tree",
        }
    }

    pub fn from_short_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|k| k.short_name().eq_ignore_ascii_case(name.trim()))
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Numeric features with class-index labels, ready for training.
#[derive(Debug, Clone)]
pub struct LabeledMatrix {
    pub features: FeatureMatrix,
    pub labels: Vec<usize>,
    pub classes: ClassSet,
}

impl LabeledMatrix {
    pub fn new(features: FeatureMatrix, labels: Vec<usize>, classes: ClassSet) -> Result<Self> {
        if features.n_rows() != labels.len() {
            return Err(PipelineError::InputLengthMismatch {
                truth: labels.len(),
                predicted: features.n_rows(),
            });
        }
        Ok(Self {
            features,
            labels,
            classes,
        })
    }

    /// Extract `feature_names` and the encoded `label` column from a transformed frame.
    pub fn from_frame(df: &DataFrame, feature_names: &[String], label: &str, classes: &ClassSet) -> Result<Self> {
        let features = FeatureMatrix::from_frame(df, feature_names)?;
        let labels = classes.encode(&label_values(df, label)?)?;
        Self::new(features, labels, classes.clone())
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }

    pub fn n_classes(&self) -> usize {
        self.classes.len()
    }

    /// Number of classes with at least one row.
    pub fn observed_classes(&self) -> usize {
        let mut seen = vec![false; self.n_classes()];
        for &l in &self.labels {
            seen[l] = true;
        }
        seen.into_iter().filter(|&s| s).count()
    }
}

/// Strategy-specific learned parameters.
#[derive(Debug, Clone)]
pub enum ModelParams {
    Tree(DecisionTree),
    Boosted(BoostedEnsemble),
    Forest(Forest),
    Svm(LinearSvm),
}

/// Parameters produced by one strategy's training step. Immutable once built;
/// only the strategy that produced it can predict with it.
#[derive(Debug, Clone)]
pub struct TrainedModel {
    kind: StrategyKind,
    classes: ClassSet,
    feature_names: Vec<String>,
    params: ModelParams,
}

impl TrainedModel {
    pub fn new(kind: StrategyKind, data: &LabeledMatrix, params: ModelParams) -> Self {
        Self {
            kind,
            classes: data.classes.clone(),
            feature_names: data.features.names.clone(),
            params,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn classes(&self) -> &ClassSet {
        &self.classes
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn params(&self) -> &ModelParams {
        &self.params
    }

    /// Check ownership and line the input columns up with the training columns.
    fn rows_for<'a>(&self, requested: StrategyKind, features: &'a FeatureMatrix) -> Result<Cow<'a, [Vec<f64>]>> {
        if self.kind != requested {
            return Err(PipelineError::ModelMismatch {
                trained: self.kind.to_string(),
                requested: requested.to_string(),
            });
        }

        if features.names == self.feature_names {
            return Ok(Cow::Borrowed(features.rows.as_slice()));
        }

        let positions: Vec<usize> = self
            .feature_names
            .iter()
            .map(|name| {
                features
                    .names
                    .iter()
                    .position(|n| n == name)
                    .ok_or_else(|| PipelineError::schema("prediction", name))
            })
            .collect::<Result<_>>()?;

        Ok(Cow::Owned(
            features
                .rows
                .iter()
                .map(|row| positions.iter().map(|&p| row[p]).collect())
                .collect(),
        ))
    }

    fn names_of(&self, indices: Vec<usize>) -> Vec<String> {
        indices
            .into_iter()
            .map(|i| self.classes.name(i).to_string())
            .collect()
    }
}

/// Uniform contract implemented by every classifier algorithm.
///
/// `train` must be deterministic given the same data and the same random
/// source state; `predict` returns one label per row, in row order, and does
/// not need the label column.
pub trait ClassifierStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    fn name(&self) -> &'static str {
        self.kind().label()
    }

    fn train(&self, data: &LabeledMatrix, rng: &mut StdRng) -> Result<TrainedModel>;

    fn predict(&self, model: &TrainedModel, features: &FeatureMatrix) -> Result<Vec<String>>;
}

/// Reject inputs no strategy can learn from.
pub(crate) fn check_trainable(kind: StrategyKind, data: &LabeledMatrix) -> Result<()> {
    if data.n_rows() == 0 {
        return Err(PipelineError::training(kind.label(), "training subset is empty"));
    }
    if data.n_rows() < data.n_classes() {
        return Err(PipelineError::training(
            kind.label(),
            format!(
                "{} row(s) cannot cover {} classes",
                data.n_rows(),
                data.n_classes()
            ),
        ));
    }
    if data.features.n_features() == 0 {
        return Err(PipelineError::training(kind.label(), "no feature columns"));
    }
    Ok(())
}

/// Index of the largest score; the lowest index wins ties.
pub(crate) fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate().skip(1) {
        if s > scores[best] {
            best = i;
        }
    }
    best
}

/// Serializable description of one configured strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategySpec {
    DecisionTree(TreeConfig),
    BoostedDecisionTree(BoostConfig),
    RandomForest(ForestConfig),
    SupportVectorMachine(SvmConfig),
}

impl StrategySpec {
    pub fn default_for(kind: StrategyKind) -> Self {
        match kind {
            StrategyKind::DecisionTree => StrategySpec::DecisionTree(TreeConfig::default()),
            StrategyKind::BoostedDecisionTree => StrategySpec::BoostedDecisionTree(BoostConfig::default()),
            StrategyKind::RandomForest => StrategySpec::RandomForest(ForestConfig::default()),
            StrategyKind::SupportVectorMachine => StrategySpec::SupportVectorMachine(SvmConfig::default()),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            StrategySpec::DecisionTree(_) => StrategyKind::DecisionTree,
            StrategySpec::BoostedDecisionTree(_) => StrategyKind::BoostedDecisionTree,
            StrategySpec::RandomForest(_) => StrategyKind::RandomForest,
            StrategySpec::SupportVectorMachine(_) => StrategyKind::SupportVectorMachine,
        }
    }

    pub fn build(&self) -> Box<dyn ClassifierStrategy> {
        match self {
            StrategySpec::DecisionTree(c) => Box::new(DecisionTreeStrategy::new(c.clone())),
            StrategySpec::BoostedDecisionTree(c) => Box::new(BoostedDecisionTree::new(c.clone())),
            StrategySpec::RandomForest(c) => Box::new(RandomForest::new(c.clone())),
            StrategySpec::SupportVectorMachine(c) => Box::new(SupportVectorMachine::new(c.clone())),
        }
    }
}

/// One `StrategySpec` per algorithm with default hyperparameters, in priority order.
pub fn default_strategies() -> Vec<StrategySpec> {
    StrategyKind::ALL.into_iter().map(StrategySpec::default_for).collect()
}
