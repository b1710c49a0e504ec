//! Column-level helpers shared by the preprocessing stages

use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Names of all columns except the label, in frame order.
pub fn feature_column_names(df: &DataFrame, label: &str) -> Vec<String> {
    df.get_column_names()
        .iter()
        .map(|s| s.to_string())
        .filter(|name| name != label)
        .collect()
}

/// Names of the numeric columns except the label, in frame order.
pub fn numeric_feature_names(df: &DataFrame, label: &str) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| col.dtype().is_primitive_numeric() && col.name().as_str() != label)
        .map(|col| col.name().to_string())
        .collect()
}

/// Fail with `NonNumericFeature` on the first non-label column that is not numeric.
pub fn ensure_numeric_features(df: &DataFrame, label: &str) -> Result<()> {
    match df
        .get_columns()
        .iter()
        .find(|col| col.name().as_str() != label && !col.dtype().is_primitive_numeric())
    {
        Some(col) => Err(PipelineError::NonNumericFeature {
            column: col.name().to_string(),
            dtype: col.dtype().to_string(),
        }),
        None => Ok(()),
    }
}

/// Read a column as `f64` values, keeping nulls.
pub fn numeric_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let col = df.column(column)?;
    if !col.dtype().is_primitive_numeric() {
        return Err(PipelineError::NonNumericFeature {
            column: column.to_string(),
            dtype: col.dtype().to_string(),
        });
    }
    let cast = col.cast(&DataType::Float64)?;
    let values = cast.f64()?.into_iter().collect();
    Ok(values)
}

/// Project `df` onto `columns` (in that order), keeping the label column when present.
///
/// Every listed column must exist; a missing one is a `SchemaMismatch` attributed to `stage`.
pub fn select_retained(
    df: &DataFrame,
    columns: &[String],
    label: &str,
    stage: &str,
) -> Result<DataFrame> {
    let present: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();

    if let Some(missing) = columns.iter().find(|c| !present.contains(c)) {
        return Err(PipelineError::schema(stage, missing));
    }

    let mut selection: Vec<&str> = columns.iter().map(|s| s.as_str()).collect();
    if present.iter().any(|c| c == label) && !columns.iter().any(|c| c == label) {
        selection.push(label);
    }

    Ok(df.select(selection)?)
}

/// Row-major numeric features extracted from a transformed frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Extract `names` from `df` in order. Remaining nulls become 0.0, which is the
    /// training mean once the frame has been normalized.
    pub fn from_frame(df: &DataFrame, names: &[String]) -> Result<Self> {
        let height = df.height();
        let mut rows = vec![Vec::with_capacity(names.len()); height];

        for name in names {
            if df.column(name).is_err() {
                return Err(PipelineError::schema("feature extraction", name));
            }
            let values = numeric_values(df, name)?;
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value.filter(|v| v.is_finite()).unwrap_or(0.0));
            }
        }

        Ok(Self {
            names: names.to_vec(),
            rows,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.names.len()
    }

    /// Rows at the given positions, in the given order.
    pub fn subset(&self, indices: &[usize]) -> Self {
        Self {
            names: self.names.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}
