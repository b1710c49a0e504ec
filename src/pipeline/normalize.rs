//! Centering and scaling with statistics learned from the reference data

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::pipeline::frame::{numeric_feature_names, numeric_values};
use crate::pipeline::profile::ColumnStatistics;
use crate::pipeline::Transform;

/// What to do with a column whose learned standard deviation is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegeneratePolicy {
    /// Fail with `DegenerateColumn`.
    Reject,
    /// Leave the column unscaled.
    Skip,
}

/// Learned location and scale of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaleParams {
    pub name: String,
    pub mean: f64,
    pub std_dev: f64,
}

/// Z-score normalizer: `(x - mean) / std_dev` per numeric feature column.
#[derive(Debug, Clone)]
pub struct Normalizer {
    params: Vec<ScaleParams>,
    skipped: Vec<String>,
}

impl Normalizer {
    pub fn fit(reference: &DataFrame, label: &str, policy: DegeneratePolicy) -> Result<Self> {
        let mut params = Vec::new();
        let mut skipped = Vec::new();

        for name in numeric_feature_names(reference, label) {
            let stats = ColumnStatistics::compute(reference, &name)?;
            match (stats.mean, stats.std_dev) {
                (Some(mean), Some(std_dev)) if std_dev > 0.0 && std_dev.is_finite() => {
                    params.push(ScaleParams { name, mean, std_dev });
                }
                _ => match policy {
                    DegeneratePolicy::Reject => {
                        return Err(PipelineError::DegenerateColumn { column: name });
                    }
                    DegeneratePolicy::Skip => {
                        warn!(column = %name, "zero standard deviation, column left unscaled");
                        skipped.push(name);
                    }
                },
            }
        }

        debug!(columns = params.len(), skipped = skipped.len(), "normalizer fitted");
        Ok(Self { params, skipped })
    }

    pub fn params(&self) -> &[ScaleParams] {
        &self.params
    }

    /// Columns left unscaled under `DegeneratePolicy::Skip`.
    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Map normalized values back to the original scale: `x * std_dev + mean`.
    pub fn inverse_transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.apply(df, "inverse normalizer", |x, p| x * p.std_dev + p.mean)
    }

    fn apply(&self, df: &DataFrame, stage: &str, f: impl Fn(f64, &ScaleParams) -> f64) -> Result<DataFrame> {
        let mut out = df.clone();
        for p in &self.params {
            if df.column(&p.name).is_err() {
                return Err(PipelineError::schema(stage, &p.name));
            }
            let scaled: Vec<Option<f64>> = numeric_values(df, &p.name)?
                .into_iter()
                .map(|v| v.map(|x| f(x, p)))
                .collect();
            out.with_column(Column::new(p.name.as_str().into(), scaled))?;
        }
        Ok(out)
    }
}

impl Transform for Normalizer {
    fn name(&self) -> &'static str {
        "normalizer"
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        self.apply(df, self.name(), |x, p| (x - p.mean) / p.std_dev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_uses_learned_statistics() {
        let reference = df! {
            "classe" => ["A", "B", "A"],
            "x" => [1.0f64, 2.0, 3.0],
        }
        .unwrap();
        let other = df! { "x" => [2.0f64, 4.0] }.unwrap();

        let normalizer = Normalizer::fit(&reference, "classe", DegeneratePolicy::Reject).unwrap();
        let out = normalizer.transform(&other).unwrap();
        let values: Vec<f64> = out.column("x").unwrap().f64().unwrap().into_no_null_iter().collect();

        // mean 2, sample std 1
        assert_eq!(values, vec![0.0, 2.0]);
    }

    #[test]
    fn test_zero_std_rejected() {
        let df = df! { "flat" => [3.0f64, 3.0, 3.0] }.unwrap();
        let err = Normalizer::fit(&df, "classe", DegeneratePolicy::Reject).unwrap_err();
        assert!(matches!(err, PipelineError::DegenerateColumn { ref column } if column == "flat"));
    }

    #[test]
    fn test_zero_std_skipped() {
        let df = df! {
            "flat" => [3.0f64, 3.0, 3.0],
            "x" => [1.0f64, 2.0, 3.0],
        }
        .unwrap();
        let normalizer = Normalizer::fit(&df, "classe", DegeneratePolicy::Skip).unwrap();
        assert_eq!(normalizer.skipped(), &["flat".to_string()]);

        let out = normalizer.transform(&df).unwrap();
        let flat: Vec<f64> = out.column("flat").unwrap().f64().unwrap().into_no_null_iter().collect();
        assert_eq!(flat, vec![3.0, 3.0, 3.0]);
        assert!(out.column("x").unwrap().f64().unwrap().into_no_null_iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_nulls_stay_null() {
        let df = df! { "x" => [Some(1.0f64), None, Some(3.0)] }.unwrap();
        let normalizer = Normalizer::fit(&df, "classe", DegeneratePolicy::Reject).unwrap();
        let out = normalizer.transform(&df).unwrap();
        assert_eq!(out.column("x").unwrap().null_count(), 1);
    }
}
