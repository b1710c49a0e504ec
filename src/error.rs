//! Error types for the selection pipeline.
//!
//! Preprocessing errors (`SchemaMismatch`, `DegenerateColumn`, ...) abort a run.
//! Training and evaluation errors are isolated per strategy by the model
//! selector and only abort when every strategy fails.

use polars::prelude::PolarsError;
use thiserror::Error;

/// Errors raised by the library.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A dataset lacks a column that was retained from the reference dataset.
    #[error("schema mismatch in {stage}: column '{column}' is missing")]
    SchemaMismatch { stage: String, column: String },

    /// A learned standard deviation of zero reached the normalizer.
    #[error("column '{column}' has zero standard deviation and cannot be scaled")]
    DegenerateColumn { column: String },

    /// A classifier strategy could not produce a model from its input.
    #[error("{strategy} failed to train: {reason}")]
    TrainingFailure { strategy: String, reason: String },

    /// A trained model could not score its input.
    #[error("{strategy} failed to predict: {reason}")]
    PredictionFailure { strategy: String, reason: String },

    /// Truth and prediction sequences differ in length.
    #[error("label sequences differ in length: {truth} true vs {predicted} predicted")]
    InputLengthMismatch { truth: usize, predicted: usize },

    /// A label outside the class set learned during training.
    #[error("label '{label}' is not one of the trained classes")]
    UnknownLabel { label: String },

    /// A labeled dataset has rows without a label.
    #[error("label column '{column}' has {count} missing value(s)")]
    MissingLabel { column: String, count: usize },

    /// A feature column that cannot be read as numbers.
    #[error("feature column '{column}' is not numeric ({dtype})")]
    NonNumericFeature { column: String, dtype: String },

    #[error("dataset is empty: {0}")]
    EmptyDataset(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A trained model was handed to a strategy that did not produce it.
    #[error("model trained by {trained} cannot be used by {requested}")]
    ModelMismatch { trained: String, requested: String },

    #[error("all {0} classifier strategies failed")]
    AllStrategiesFailed(usize),

    #[error("unsupported file format '{0}' (supported: csv, parquet)")]
    UnsupportedFormat(String),

    #[error(transparent)]
    Polars(#[from] PolarsError),
}

impl PipelineError {
    pub fn schema(stage: &str, column: &str) -> Self {
        Self::SchemaMismatch {
            stage: stage.to_string(),
            column: column.to_string(),
        }
    }

    pub fn training(strategy: &str, reason: impl Into<String>) -> Self {
        Self::TrainingFailure {
            strategy: strategy.to_string(),
            reason: reason.into(),
        }
    }

    pub fn prediction(strategy: &str, reason: impl Into<String>) -> Self {
        Self::PredictionFailure {
            strategy: strategy.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
