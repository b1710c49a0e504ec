//! Missing value analysis and reduction

use polars::prelude::*;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::pipeline::frame::{feature_column_names, select_retained};
use crate::pipeline::Transform;

/// Default missingness threshold: columns must be less than 25% missing.
pub const DEFAULT_MISSING_THRESHOLD: f64 = 0.25;

/// Missing ratio (null count / row count) of every column, sorted descending.
pub fn analyze_missing_values(df: &DataFrame) -> Result<Vec<(String, f64)>> {
    // Handle empty DataFrame
    if df.height() == 0 {
        return Ok(Vec::new());
    }

    let rows = df.height() as f64;
    let mut missing_ratios: Vec<(String, f64)> = df
        .get_columns()
        .iter()
        .map(|col| (col.name().to_string(), col.null_count() as f64 / rows))
        .collect();

    // Stable sort keeps frame order among equal ratios
    missing_ratios.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    Ok(missing_ratios)
}

/// Features whose missing ratio is at or above the threshold (never the label).
pub fn get_features_above_threshold(
    missing_ratios: &[(String, f64)],
    threshold: f64,
    label: &str,
) -> Vec<String> {
    missing_ratios
        .iter()
        .filter(|(name, ratio)| *ratio >= threshold && name != label)
        .map(|(name, _)| name.clone())
        .collect()
}

/// Retains the feature columns whose missing ratio in the reference data is
/// strictly below the threshold.
#[derive(Debug, Clone)]
pub struct MissingnessFilter {
    label: String,
    threshold: f64,
    retained: Vec<String>,
    dropped: Vec<String>,
}

impl MissingnessFilter {
    pub fn fit(reference: &DataFrame, label: &str, threshold: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(PipelineError::InvalidConfig(format!(
                "missing threshold must be within [0, 1], got {}",
                threshold
            )));
        }
        if reference.height() == 0 {
            return Err(PipelineError::EmptyDataset(
                "reference dataset has no rows".to_string(),
            ));
        }

        let ratios = analyze_missing_values(reference)?;
        let dropped = get_features_above_threshold(&ratios, threshold, label);
        let retained: Vec<String> = feature_column_names(reference, label)
            .into_iter()
            .filter(|name| !dropped.contains(name))
            .collect();

        debug!(
            threshold,
            retained = retained.len(),
            dropped = dropped.len(),
            "missingness filter fitted"
        );

        Ok(Self {
            label: label.to_string(),
            threshold,
            retained,
            dropped,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn retained(&self) -> &[String] {
        &self.retained
    }

    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }
}

impl Transform for MissingnessFilter {
    fn name(&self) -> &'static str {
        "missingness filter"
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        select_retained(df, &self.retained, &self.label, self.name())
    }
}
