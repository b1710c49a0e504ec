//! JSON run report
//!
//! Documents one run end to end: inputs, configuration, the columns each stage
//! dropped, every strategy's test result, the winner and its validation scores.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;

use crate::classifier::StrategyKind;
use crate::pipeline::config::PipelineConfig;
use crate::pipeline::correlation::CorrelatedPair;
use crate::pipeline::evaluate::{ClassMetrics, ConfusionMatrix};
use crate::pipeline::preprocess::ReductionLog;
use crate::pipeline::run::PipelineOutcome;
use crate::pipeline::variance::VarianceMetric;

#[derive(Debug, Clone, Serialize)]
pub struct ReportMetadata {
    pub timestamp: String,
    pub harsel_version: String,
    pub input_file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cases_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_file: Option<String>,
}

/// Scores of one model on one subset.
#[derive(Debug, Clone, Serialize)]
pub struct SubsetScores {
    pub rows: usize,
    pub accuracy: f64,
    pub error_rate: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kappa: Option<f64>,
    pub classes: Vec<String>,
    /// Counts indexed by (true class, predicted class).
    pub confusion: Vec<Vec<usize>>,
    pub per_class: Vec<ClassMetrics>,
}

impl SubsetScores {
    pub fn from_matrix(matrix: &ConfusionMatrix) -> Self {
        let k = matrix.classes().len();
        Self {
            rows: matrix.total(),
            accuracy: matrix.accuracy(),
            error_rate: matrix.error_rate(),
            kappa: matrix.kappa(),
            classes: matrix.classes().to_vec(),
            confusion: (0..k).map(|i| (0..k).map(|j| matrix.count(i, j)).collect()).collect(),
            per_class: matrix.class_metrics(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategyEntry {
    pub strategy: StrategyKind,
    pub selected: bool,
    pub training_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_accuracy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub test_kappa: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PartitionSizes {
    pub train: usize,
    pub test: usize,
    pub validation: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub metadata: ReportMetadata,
    pub config: PipelineConfig,
    pub reduction: ReductionLog,
    pub retained_features: Vec<String>,
    pub correlated_pairs: Vec<CorrelatedPair>,
    pub variance: Vec<VarianceMetric>,
    pub partitions: PartitionSizes,
    pub strategies: Vec<StrategyEntry>,
    pub winner: StrategyKind,
    pub test: SubsetScores,
    pub validation: SubsetScores,
    pub predictions: usize,
}

/// Paths recorded in the report metadata.
pub struct ReportPaths<'a> {
    pub input: &'a Path,
    pub cases: Option<&'a Path>,
    pub output: Option<&'a Path>,
}

impl RunReport {
    pub fn build(outcome: &PipelineOutcome, config: &PipelineConfig, paths: ReportPaths<'_>) -> Self {
        let selection = &outcome.selection;
        let strategies = selection
            .candidates()
            .iter()
            .map(|c| StrategyEntry {
                strategy: c.strategy,
                selected: c.selected,
                training_ms: c.training_time.as_millis() as u64,
                test_accuracy: c.test_accuracy,
                test_kappa: c.test_kappa,
                error: c.error.clone(),
            })
            .collect();

        Self {
            metadata: ReportMetadata {
                timestamp: Utc::now().to_rfc3339(),
                harsel_version: env!("CARGO_PKG_VERSION").to_string(),
                input_file: paths.input.display().to_string(),
                cases_file: paths.cases.map(|p| p.display().to_string()),
                output_file: paths.output.map(|p| p.display().to_string()),
            },
            config: config.clone(),
            reduction: outcome.preprocessor.reduction_log().clone(),
            retained_features: outcome.preprocessor.feature_names().to_vec(),
            correlated_pairs: outcome.preprocessor.correlated_pairs().to_vec(),
            variance: outcome.preprocessor.variance_metrics().to_vec(),
            partitions: PartitionSizes {
                train: outcome.rows.train.len(),
                test: outcome.rows.test.len(),
                validation: outcome.rows.validation.len(),
            },
            strategies,
            winner: selection.winner(),
            test: SubsetScores::from_matrix(selection.test_matrix()),
            validation: SubsetScores::from_matrix(selection.validation_matrix()),
            predictions: outcome.predictions.as_ref().map_or(0, |p| p.len()),
        }
    }
}

/// Export the run report to a JSON file
pub fn export_run_report(report: &RunReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize run report to JSON")?;

    std::fs::write(output_path, json)
        .with_context(|| format!("Failed to write run report to {}", output_path.display()))?;

    Ok(())
}
