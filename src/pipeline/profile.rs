//! Per-column statistics learned from a reference dataset

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::frame::numeric_values;

/// Missingness, spread and location of a single column.
///
/// Computed once from the training data and reused for every other dataset.
/// `mean`, `variance` and `std_dev` are `None` for non-numeric columns and for
/// columns without at least one observed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnStatistics {
    pub name: String,
    pub missing_ratio: f64,
    pub mean: Option<f64>,
    pub variance: Option<f64>,
    pub std_dev: Option<f64>,
}

impl ColumnStatistics {
    pub fn compute(df: &DataFrame, column: &str) -> Result<Self> {
        let col = df.column(column)?;
        let rows = df.height();
        let missing_ratio = if rows == 0 {
            0.0
        } else {
            col.null_count() as f64 / rows as f64
        };

        if !col.dtype().is_primitive_numeric() {
            return Ok(Self {
                name: column.to_string(),
                missing_ratio,
                mean: None,
                variance: None,
                std_dev: None,
            });
        }

        let observed: Vec<f64> = numeric_values(df, column)?.into_iter().flatten().collect();
        let (mean, variance) = mean_and_variance(&observed);

        Ok(Self {
            name: column.to_string(),
            missing_ratio,
            mean,
            variance,
            std_dev: variance.map(f64::sqrt),
        })
    }
}

/// Mean and sample variance (n - 1) via Welford's algorithm.
/// A single observation has variance 0.
pub fn mean_and_variance(values: &[f64]) -> (Option<f64>, Option<f64>) {
    if values.is_empty() {
        return (None, None);
    }

    let mut mean = 0.0;
    let mut m2 = 0.0;
    for (i, &x) in values.iter().enumerate() {
        let delta = x - mean;
        mean += delta / (i + 1) as f64;
        m2 += delta * (x - mean);
    }

    let variance = if values.len() > 1 {
        m2 / (values.len() - 1) as f64
    } else {
        0.0
    };
    (Some(mean), Some(variance))
}

/// Statistics for every column of the frame, in frame order.
pub fn profile_columns(df: &DataFrame) -> Result<Vec<ColumnStatistics>> {
    df.get_column_names()
        .iter()
        .map(|name| ColumnStatistics::compute(df, name.as_str()))
        .collect()
}
