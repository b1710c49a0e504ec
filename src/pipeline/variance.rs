//! Near-zero-variance detection and reduction

use std::collections::HashMap;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::pipeline::frame::{feature_column_names, numeric_values, select_retained};
use crate::pipeline::Transform;

/// How the two near-zero-variance criteria combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VarianceRule {
    /// Flag when either the frequency ratio or the distinct-value ratio trips.
    Either,
    /// Flag only when both trip (the stricter reading used by caret's `nearZeroVar`).
    Both,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VarianceConfig {
    /// Most-frequent / second-most-frequent count above which a column is dominated.
    pub freq_ratio_cutoff: f64,
    /// Distinct values / row count below which a column has too few values.
    pub unique_ratio_cutoff: f64,
    pub rule: VarianceRule,
}

impl Default for VarianceConfig {
    fn default() -> Self {
        Self {
            freq_ratio_cutoff: 95.0 / 5.0,
            unique_ratio_cutoff: 0.01,
            rule: VarianceRule::Either,
        }
    }
}

/// Near-zero-variance indicators for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VarianceMetric {
    pub name: String,
    /// Infinite when the column holds fewer than two distinct values.
    pub freq_ratio: f64,
    pub unique_ratio: f64,
    pub zero_variance: bool,
    pub near_zero: bool,
}

/// Compute the frequency ratio and distinct-value ratio of a column's observed values.
///
/// `rows` is the full row count, so missing values dilute the distinct ratio.
pub fn variance_metric(name: &str, values: &[Option<f64>], rows: usize, config: &VarianceConfig) -> VarianceMetric {
    let mut counts: HashMap<u64, usize> = HashMap::new();
    for v in values.iter().flatten() {
        // fold -0.0 into 0.0
        let key = if *v == 0.0 { 0.0f64.to_bits() } else { v.to_bits() };
        *counts.entry(key).or_insert(0) += 1;
    }

    let distinct = counts.len();
    let unique_ratio = if rows == 0 {
        0.0
    } else {
        distinct as f64 / rows as f64
    };

    let mut frequencies: Vec<usize> = counts.into_values().collect();
    frequencies.sort_unstable_by(|a, b| b.cmp(a));
    let freq_ratio = match frequencies.as_slice() {
        [first, second, ..] => *first as f64 / *second as f64,
        _ => f64::INFINITY,
    };

    let zero_variance = distinct <= 1;
    let dominated = freq_ratio > config.freq_ratio_cutoff;
    let sparse = unique_ratio < config.unique_ratio_cutoff;
    let near_zero = zero_variance
        || match config.rule {
            VarianceRule::Either => dominated || sparse,
            VarianceRule::Both => dominated && sparse,
        };

    VarianceMetric {
        name: name.to_string(),
        freq_ratio,
        unique_ratio,
        zero_variance,
        near_zero,
    }
}

/// Flags and removes near-constant numeric columns. Non-numeric feature
/// columns are passed through untouched.
#[derive(Debug, Clone)]
pub struct VarianceFilter {
    label: String,
    metrics: Vec<VarianceMetric>,
    retained: Vec<String>,
    dropped: Vec<String>,
}

impl VarianceFilter {
    pub fn fit(reference: &DataFrame, label: &str, config: &VarianceConfig) -> Result<Self> {
        if config.freq_ratio_cutoff < 1.0 || !(0.0..=1.0).contains(&config.unique_ratio_cutoff) {
            return Err(PipelineError::InvalidConfig(format!(
                "variance cutoffs out of range: freq ratio {}, unique ratio {}",
                config.freq_ratio_cutoff, config.unique_ratio_cutoff
            )));
        }

        let rows = reference.height();
        let mut metrics = Vec::new();
        let mut retained = Vec::new();
        let mut dropped = Vec::new();

        for name in feature_column_names(reference, label) {
            if !reference.column(&name)?.dtype().is_primitive_numeric() {
                retained.push(name);
                continue;
            }
            let values = numeric_values(reference, &name)?;
            let metric = variance_metric(&name, &values, rows, config);
            if metric.near_zero {
                dropped.push(name);
            } else {
                retained.push(name);
            }
            metrics.push(metric);
        }

        debug!(dropped = dropped.len(), "variance filter fitted");

        Ok(Self {
            label: label.to_string(),
            metrics,
            retained,
            dropped,
        })
    }

    pub fn metrics(&self) -> &[VarianceMetric] {
        &self.metrics
    }

    pub fn retained(&self) -> &[String] {
        &self.retained
    }

    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }
}

impl Transform for VarianceFilter {
    fn name(&self) -> &'static str {
        "variance filter"
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        select_retained(df, &self.retained, &self.label, self.name())
    }
}
