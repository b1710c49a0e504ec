//! End-to-end run: preprocess, partition, select, predict
//!
//! One random source seeded from `PipelineConfig::seed` is threaded through
//! the partitioner and then the model selector, so a seed fixes the whole run.

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

use crate::classifier::LabeledMatrix;
use crate::error::{PipelineError, Result};
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::frame::FeatureMatrix;
use crate::pipeline::labels::ClassSet;
use crate::pipeline::partition::Partition;
use crate::pipeline::preprocess::Preprocessor;
use crate::pipeline::selection::{ModelSelector, PartitionData, SelectionOutcome};

/// Source row positions of each subset.
#[derive(Debug, Clone, Serialize)]
pub struct PartitionRows {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    pub validation: Vec<usize>,
}

impl PartitionRows {
    pub fn total(&self) -> usize {
        self.train.len() + self.test.len() + self.validation.len()
    }
}

/// Everything learned before any classifier is trained.
pub struct PreparedData {
    pub preprocessor: Preprocessor,
    pub classes: ClassSet,
    pub rows: PartitionRows,
    pub data: PartitionData,
    rng: StdRng,
}

impl PreparedData {
    /// Fit the preprocessing chain on `training` and split the transformed rows.
    pub fn prepare(training: &DataFrame, config: &PipelineConfig) -> Result<Self> {
        config.validate()?;
        let label = config.label.as_str();

        let preprocessor = Preprocessor::fit(training, config)?;
        let transformed = preprocessor.transform(training)?;
        let classes = ClassSet::from_frame(&transformed, label)?;
        if classes.is_empty() {
            return Err(PipelineError::EmptyDataset("no class labels".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(config.seed);
        let partition = Partition::nested(
            &transformed,
            label,
            config.build_fraction,
            config.train_fraction,
            &mut rng,
        )?;

        let features = preprocessor.feature_names();
        let data = PartitionData {
            train: LabeledMatrix::from_frame(&partition.train, features, label, &classes)?,
            test: LabeledMatrix::from_frame(&partition.test, features, label, &classes)?,
            validation: LabeledMatrix::from_frame(&partition.validation, features, label, &classes)?,
        };

        Ok(Self {
            preprocessor,
            classes,
            rows: PartitionRows {
                train: partition.train_rows,
                test: partition.test_rows,
                validation: partition.validation_rows,
            },
            data,
            rng,
        })
    }

    /// Extract the feature matrix of unlabeled cases with the fitted chain.
    pub fn case_features(&self, cases: &DataFrame) -> Result<FeatureMatrix> {
        let transformed = self.preprocessor.transform(cases)?;
        FeatureMatrix::from_frame(&transformed, self.preprocessor.feature_names())
    }

    /// Train and compare the configured strategies.
    pub fn select(&mut self, config: &PipelineConfig) -> Result<SelectionOutcome> {
        ModelSelector::from_config(config).select(&self.data, &mut self.rng)
    }
}

pub struct PipelineOutcome {
    pub preprocessor: Preprocessor,
    pub classes: ClassSet,
    pub rows: PartitionRows,
    pub selection: SelectionOutcome,
    /// One label per case row, in input order.
    pub predictions: Option<Vec<String>>,
}

/// Run the whole pipeline on a labeled `training` frame and optional unlabeled
/// `cases`. Cases are checked against the fitted schema before any training.
pub fn run_pipeline(
    training: &DataFrame,
    cases: Option<&DataFrame>,
    config: &PipelineConfig,
) -> Result<PipelineOutcome> {
    let mut prepared = PreparedData::prepare(training, config)?;
    let case_features = cases.map(|df| prepared.case_features(df)).transpose()?;

    let selection = prepared.select(config)?;
    let predictions = case_features
        .map(|features| selection.predict(&features))
        .transpose()?;

    info!(
        winner = %selection.winner(),
        predictions = predictions.as_ref().map_or(0, |p| p.len()),
        "pipeline finished"
    );

    Ok(PipelineOutcome {
        preprocessor: prepared.preprocessor,
        classes: prepared.classes,
        rows: prepared.rows,
        selection,
        predictions,
    })
}
