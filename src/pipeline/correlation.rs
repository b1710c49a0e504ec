//! Correlation-based feature reduction

use faer::Mat;
use polars::prelude::*;
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::pipeline::frame::{feature_column_names, numeric_feature_names, numeric_values, select_retained};
use crate::pipeline::Transform;

/// Default absolute correlation above which a pair is redundant.
pub const DEFAULT_CORRELATION_CUTOFF: f64 = 0.90;

/// Mean absolute correlations closer than this are treated as tied.
const TIE_TOLERANCE: f64 = 1e-12;

/// Represents a correlated pair of features
#[derive(Debug, Clone, Serialize)]
pub struct CorrelatedPair {
    pub feature1: String,
    pub feature2: String,
    pub correlation: f64,
}

/// Symmetric Pearson correlation matrix over numeric columns, unit diagonal.
#[derive(Debug, Clone)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    values: Mat<f64>,
}

impl CorrelationMatrix {
    /// Compute correlations between the named numeric columns of `df`.
    ///
    /// Complete columns go through one matrix product:
    /// 1. Standardize each column: Z = (X - mean) / (std * sqrt(n))
    /// 2. R = Z^T * Z
    ///
    /// If any column has nulls, each pair is correlated over the rows where
    /// both values are present instead. A constant column, or a pair with
    /// fewer than two shared rows, correlates 0.
    pub fn compute(df: &DataFrame, names: &[String]) -> Result<Self> {
        let columns: Vec<Vec<Option<f64>>> = names
            .iter()
            .map(|name| numeric_values(df, name))
            .collect::<Result<_>>()?;

        let values = if columns.iter().any(|c| c.iter().any(Option::is_none)) {
            debug!(columns = names.len(), "nulls present, correlating pairwise-complete rows");
            pairwise_complete(&columns)
        } else {
            complete_matrix(&columns, df.height())
        };

        Ok(Self {
            names: names.to_vec(),
            values,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[(i, j)]
    }

    pub fn get_by_name(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        Some(self.get(i, j))
    }

    /// Largest off-diagonal |r|, or 0 for fewer than two columns.
    pub fn max_abs_off_diagonal(&self) -> f64 {
        let n = self.len();
        let mut max = 0.0f64;
        for i in 0..n {
            for j in (i + 1)..n {
                max = max.max(self.get(i, j).abs());
            }
        }
        max
    }

    /// Pairs above the threshold, sorted by absolute correlation descending
    pub fn pairs_above(&self, threshold: f64) -> Vec<CorrelatedPair> {
        let n = self.len();
        let mut pairs = Vec::new();

        // Extract upper triangle
        for i in 0..n {
            for j in (i + 1)..n {
                let corr = self.get(i, j);
                if corr.abs() > threshold && !corr.is_nan() {
                    pairs.push(CorrelatedPair {
                        feature1: self.names[i].clone(),
                        feature2: self.names[j].clone(),
                        correlation: corr,
                    });
                }
            }
        }

        pairs.sort_by(|a, b| {
            b.correlation
                .abs()
                .partial_cmp(&a.correlation.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        pairs
    }
}

/// R = Z^T * Z over null-free columns.
fn complete_matrix(columns: &[Vec<Option<f64>>], n_rows: usize) -> Mat<f64> {
    let n_cols = columns.len();
    let standardized: Vec<Vec<f64>> = columns
        .par_iter()
        .map(|values| standardize(values))
        .collect();

    let mut z = Mat::<f64>::zeros(n_rows, n_cols);
    for (col_idx, col_data) in standardized.iter().enumerate() {
        for (row_idx, &val) in col_data.iter().enumerate() {
            z[(row_idx, col_idx)] = val;
        }
    }

    let mut values = z.transpose() * &z;
    for i in 0..n_cols {
        for j in 0..n_cols {
            values[(i, j)] = if i == j {
                1.0
            } else {
                values[(i, j)].clamp(-1.0, 1.0)
            };
        }
    }
    values
}

/// Pearson r for every pair over the rows both columns observe.
fn pairwise_complete(columns: &[Vec<Option<f64>>]) -> Mat<f64> {
    let n_cols = columns.len();
    let upper: Vec<(usize, usize, f64)> = (0..n_cols)
        .into_par_iter()
        .flat_map_iter(|i| {
            ((i + 1)..n_cols).map(move |j| {
                let r = pearson_correlation(&columns[i], &columns[j]).unwrap_or(0.0);
                (i, j, r.clamp(-1.0, 1.0))
            })
        })
        .collect();

    let mut values = Mat::<f64>::zeros(n_cols, n_cols);
    for i in 0..n_cols {
        values[(i, i)] = 1.0;
    }
    for (i, j, r) in upper {
        values[(i, j)] = r;
        values[(j, i)] = r;
    }
    values
}

/// Scale observed values to zero mean and unit norm; nulls map to 0.
fn standardize(values: &[Option<f64>]) -> Vec<f64> {
    let observed: Vec<f64> = values.iter().flatten().copied().collect();
    let n = observed.len();
    if n == 0 {
        return vec![0.0; values.len()];
    }

    let mean = observed.iter().sum::<f64>() / n as f64;
    let sum_sq: f64 = observed.iter().map(|x| (x - mean) * (x - mean)).sum();
    let norm = sum_sq.sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return vec![0.0; values.len()];
    }

    values
        .iter()
        .map(|v| v.map(|x| (x - mean) / norm).unwrap_or(0.0))
        .collect()
}

/// Find correlated numeric feature pairs using the matrix method.
pub fn find_correlated_pairs(df: &DataFrame, label: &str, threshold: f64) -> Result<Vec<CorrelatedPair>> {
    let names = numeric_feature_names(df, label);
    if names.len() < 2 {
        return Ok(Vec::new());
    }
    Ok(CorrelationMatrix::compute(df, &names)?.pairs_above(threshold))
}

/// Find correlated numeric feature pairs one pair at a time (parallel via Rayon).
///
/// Slower than [`find_correlated_pairs`] for wide frames but with no matrix allocation;
/// only rows where both values are present contribute to a pair.
pub fn find_correlated_pairs_pairwise(
    df: &DataFrame,
    label: &str,
    threshold: f64,
) -> Result<Vec<CorrelatedPair>> {
    let names = numeric_feature_names(df, label);
    let num_cols = names.len();
    if num_cols < 2 {
        return Ok(Vec::new());
    }

    let columns: Vec<Vec<Option<f64>>> = names
        .iter()
        .map(|name| numeric_values(df, name))
        .collect::<Result<_>>()?;

    let pairs: Vec<(usize, usize)> = (0..num_cols)
        .flat_map(|i| ((i + 1)..num_cols).map(move |j| (i, j)))
        .collect();

    let mut correlated: Vec<CorrelatedPair> = pairs
        .par_iter()
        .filter_map(|&(i, j)| {
            pearson_correlation(&columns[i], &columns[j]).and_then(|c| {
                if c.abs() > threshold && !c.is_nan() {
                    Some(CorrelatedPair {
                        feature1: names[i].clone(),
                        feature2: names[j].clone(),
                        correlation: c,
                    })
                } else {
                    None
                }
            })
        })
        .collect();

    correlated.sort_by(|a, b| {
        b.correlation
            .abs()
            .partial_cmp(&a.correlation.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    Ok(correlated)
}

/// Pearson correlation over complete pairs using single-pass Welford updates.
pub fn pearson_correlation(x: &[Option<f64>], y: &[Option<f64>]) -> Option<f64> {
    if x.is_empty() || x.len() != y.len() {
        return None;
    }

    let mut n = 0.0;
    let mut mean_x = 0.0;
    let mut mean_y = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    let mut cov_xy = 0.0;

    for (a, b) in x.iter().zip(y.iter()) {
        if let (Some(a), Some(b)) = (a, b) {
            n += 1.0;
            let dx = a - mean_x;
            let dy = b - mean_y;
            mean_x += dx / n;
            mean_y += dy / n;
            var_x += dx * (a - mean_x);
            var_y += dy * (b - mean_y);
            cov_xy += dx * (b - mean_y);
        }
    }

    if n < 2.0 || var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    Some(cov_xy / (var_x.sqrt() * var_y.sqrt()))
}

/// Greedy selection of columns whose removal leaves no pair above `cutoff`.
///
/// Each round considers the columns involved in at least one offending pair and
/// removes the one with the highest mean absolute correlation to the other
/// remaining columns; ties go to the column that comes later in `matrix` order.
pub fn select_features_to_drop(matrix: &CorrelationMatrix, cutoff: f64) -> Vec<String> {
    let n = matrix.len();
    let mut active: Vec<bool> = vec![true; n];
    let mut to_drop = Vec::new();

    loop {
        let remaining: Vec<usize> = (0..n).filter(|&i| active[i]).collect();
        if remaining.len() < 2 {
            break;
        }

        let mut offending = vec![false; n];
        for (a, &i) in remaining.iter().enumerate() {
            for &j in &remaining[a + 1..] {
                if matrix.get(i, j).abs() > cutoff {
                    offending[i] = true;
                    offending[j] = true;
                }
            }
        }
        if !offending.iter().any(|&o| o) {
            break;
        }

        let denominator = (remaining.len() - 1) as f64;
        let mut best: Option<(usize, f64)> = None;
        for &i in remaining.iter().filter(|&&i| offending[i]) {
            let mean_abs: f64 = remaining
                .iter()
                .filter(|&&j| j != i)
                .map(|&j| matrix.get(i, j).abs())
                .sum::<f64>()
                / denominator;

            best = match best {
                None => Some((i, mean_abs)),
                Some((_, best_mean)) if mean_abs > best_mean + TIE_TOLERANCE => Some((i, mean_abs)),
                Some((best_idx, best_mean))
                    if (mean_abs - best_mean).abs() <= TIE_TOLERANCE && i > best_idx =>
                {
                    Some((i, mean_abs))
                }
                keep => keep,
            };
        }

        match best {
            Some((i, mean_abs)) => {
                debug!(column = %matrix.names()[i], mean_abs, "dropping correlated column");
                active[i] = false;
                to_drop.push(matrix.names()[i].clone());
            }
            None => break,
        }
    }

    to_drop
}

/// Removes numeric columns that are highly linearly redundant with others.
/// The removal set is learned once from the reference data.
#[derive(Debug, Clone)]
pub struct CorrelationPruner {
    label: String,
    cutoff: f64,
    pairs: Vec<CorrelatedPair>,
    retained: Vec<String>,
    dropped: Vec<String>,
}

impl CorrelationPruner {
    pub fn fit(reference: &DataFrame, label: &str, cutoff: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&cutoff) {
            return Err(PipelineError::InvalidConfig(format!(
                "correlation cutoff must be within [0, 1], got {}",
                cutoff
            )));
        }

        let numeric = numeric_feature_names(reference, label);
        let (pairs, dropped) = if numeric.len() < 2 {
            (Vec::new(), Vec::new())
        } else {
            let matrix = CorrelationMatrix::compute(reference, &numeric)?;
            (matrix.pairs_above(cutoff), select_features_to_drop(&matrix, cutoff))
        };

        let retained = feature_column_names(reference, label)
            .into_iter()
            .filter(|name| !dropped.contains(name))
            .collect();

        debug!(
            cutoff,
            pairs = pairs.len(),
            dropped = dropped.len(),
            "correlation pruner fitted"
        );

        Ok(Self {
            label: label.to_string(),
            cutoff,
            pairs,
            retained,
            dropped,
        })
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// Offending pairs found in the reference data before pruning.
    pub fn pairs(&self) -> &[CorrelatedPair] {
        &self.pairs
    }

    pub fn retained(&self) -> &[String] {
        &self.retained
    }

    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }
}

impl Transform for CorrelationPruner {
    fn name(&self) -> &'static str {
        "correlation pruner"
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        select_retained(df, &self.retained, &self.label, self.name())
    }
}
