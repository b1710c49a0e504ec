//! Fitted chain of preprocessing stages
//!
//! Every stage is fitted once on the reference (training) data, in order, each
//! on the output of the previous one. The fitted chain is immutable and is
//! replayed verbatim on the partitions and on the unlabeled cases, so no
//! statistic is ever learned from data other than the reference.

use polars::prelude::*;
use serde::Serialize;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::correlation::{CorrelatedPair, CorrelationPruner};
use crate::pipeline::frame::{ensure_numeric_features, feature_column_names};
use crate::pipeline::identifiers::IdentifierStripper;
use crate::pipeline::missing::MissingnessFilter;
use crate::pipeline::normalize::Normalizer;
use crate::pipeline::variance::{VarianceFilter, VarianceMetric};

/// A learned, immutable transformation from one frame to another.
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;

    /// Apply the learned transformation. Fails with `SchemaMismatch` when `df`
    /// lacks a column the stage retained from the reference data.
    fn transform(&self, df: &DataFrame) -> Result<DataFrame>;
}

/// Columns dropped by each stage while fitting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReductionLog {
    pub initial_features: usize,
    pub missing: Vec<String>,
    pub identifiers: Vec<String>,
    pub variance: Vec<String>,
    pub correlation: Vec<String>,
    pub final_features: usize,
}

impl ReductionLog {
    pub fn total_dropped(&self) -> usize {
        self.missing.len() + self.identifiers.len() + self.variance.len() + self.correlation.len()
    }
}

/// The full fitted preprocessing chain.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    label: String,
    missing: MissingnessFilter,
    identifiers: IdentifierStripper,
    variance: VarianceFilter,
    correlation: CorrelationPruner,
    normalizer: Normalizer,
    features: Vec<String>,
    log: ReductionLog,
}

impl Preprocessor {
    /// Fit every stage against the labeled reference frame.
    pub fn fit(reference: &DataFrame, config: &PipelineConfig) -> Result<Self> {
        let label = config.label.as_str();
        if reference.column(label).is_err() {
            return Err(PipelineError::schema("preprocessor", label));
        }
        if reference.height() == 0 {
            return Err(PipelineError::EmptyDataset("training data has no rows".to_string()));
        }
        let initial_features = feature_column_names(reference, label).len();

        let missing = MissingnessFilter::fit(reference, label, config.missing_threshold)?;
        let df = missing.transform(reference)?;

        let identifiers = IdentifierStripper::fit(&df, label, &config.identifier_columns);
        let df = identifiers.transform(&df)?;

        let variance = VarianceFilter::fit(&df, label, &config.variance)?;
        let df = variance.transform(&df)?;

        let correlation = CorrelationPruner::fit(&df, label, config.correlation_cutoff)?;
        let df = correlation.transform(&df)?;
        ensure_numeric_features(&df, label)?;

        let normalizer = Normalizer::fit(&df, label, config.degenerate_policy)?;

        let features = feature_column_names(&df, label);
        if features.is_empty() {
            return Err(PipelineError::EmptyDataset(
                "no feature columns survived preprocessing".to_string(),
            ));
        }

        let log = ReductionLog {
            initial_features,
            missing: missing.dropped().to_vec(),
            identifiers: identifiers.dropped().to_vec(),
            variance: variance.dropped().to_vec(),
            correlation: correlation.dropped().to_vec(),
            final_features: features.len(),
        };

        info!(
            initial = log.initial_features,
            missing = log.missing.len(),
            identifiers = log.identifiers.len(),
            variance = log.variance.len(),
            correlation = log.correlation.len(),
            remaining = log.final_features,
            "preprocessor fitted"
        );

        Ok(Self {
            label: label.to_string(),
            missing,
            identifiers,
            variance,
            correlation,
            normalizer,
            features,
            log,
        })
    }

    fn stages(&self) -> [&dyn Transform; 5] {
        [
            &self.missing,
            &self.identifiers,
            &self.variance,
            &self.correlation,
            &self.normalizer,
        ]
    }

    /// Replay the fitted stages on another frame. The label column is carried
    /// along when present and may be absent (unlabeled cases).
    pub fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        let mut current = df.clone();
        for stage in self.stages() {
            current = stage.transform(&current)?;
        }
        Ok(current)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Feature columns that survive every stage, in order.
    pub fn feature_names(&self) -> &[String] {
        &self.features
    }

    pub fn reduction_log(&self) -> &ReductionLog {
        &self.log
    }

    pub fn correlated_pairs(&self) -> &[CorrelatedPair] {
        self.correlation.pairs()
    }

    pub fn variance_metrics(&self) -> &[VarianceMetric] {
        self.variance.metrics()
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }
}
