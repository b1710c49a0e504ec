//! Stratified, seeded partitioning
//!
//! Rows are grouped by class, each group is shuffled with the caller's random
//! source and cut at `round(p * group size)`. Groups are visited in class-set
//! order, so a given seed always yields the same split.

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::Serialize;
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::pipeline::labels::{label_values, ClassSet};

/// Row positions of a two-way split, each list ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Split {
    pub kept: Vec<usize>,
    pub held_out: Vec<usize>,
}

/// Split row positions by class so that about `fraction` of every class is kept.
pub fn stratified_indices(labels: &[String], fraction: f64, rng: &mut StdRng) -> Result<Split> {
    if !(fraction > 0.0 && fraction < 1.0) {
        return Err(PipelineError::InvalidConfig(format!(
            "split fraction must be in (0, 1), got {}",
            fraction
        )));
    }

    let classes = ClassSet::new(labels.iter().cloned());
    let mut strata: Vec<Vec<usize>> = vec![Vec::new(); classes.len()];
    for (row, label) in labels.iter().enumerate() {
        if let Some(class) = classes.index_of(label) {
            strata[class].push(row);
        }
    }

    let mut kept = Vec::with_capacity(labels.len());
    let mut held_out = Vec::with_capacity(labels.len());
    for mut rows in strata {
        rows.shuffle(rng);
        let cut = ((rows.len() as f64) * fraction).round() as usize;
        kept.extend_from_slice(&rows[..cut]);
        held_out.extend_from_slice(&rows[cut..]);
    }
    kept.sort_unstable();
    held_out.sort_unstable();

    Ok(Split { kept, held_out })
}

/// Rows of `df` at `indices`, in that order.
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx = IdxCa::from_vec(
        "idx".into(),
        indices.iter().map(|&i| i as IdxSize).collect(),
    );
    Ok(df.take(&idx)?)
}

/// Two-way stratified split of a labeled frame: `(kept, held_out)`.
pub fn stratified_split(
    df: &DataFrame,
    label: &str,
    fraction: f64,
    rng: &mut StdRng,
) -> Result<(DataFrame, DataFrame)> {
    let labels = label_values(df, label)?;
    let split = stratified_indices(&labels, fraction, rng)?;
    Ok((take_rows(df, &split.kept)?, take_rows(df, &split.held_out)?))
}

/// Nested train / test / validation partition of one labeled frame.
#[derive(Debug, Clone)]
pub struct Partition {
    pub train: DataFrame,
    pub test: DataFrame,
    pub validation: DataFrame,
    /// Source row positions of each subset.
    pub train_rows: Vec<usize>,
    pub test_rows: Vec<usize>,
    pub validation_rows: Vec<usize>,
}

impl Partition {
    /// Split into build/validation by `build_fraction`, then the build rows into
    /// train/test by `train_fraction`. Both cuts are stratified by `label`.
    pub fn nested(
        df: &DataFrame,
        label: &str,
        build_fraction: f64,
        train_fraction: f64,
        rng: &mut StdRng,
    ) -> Result<Self> {
        let labels = label_values(df, label)?;
        if labels.is_empty() {
            return Err(PipelineError::EmptyDataset("nothing to partition".to_string()));
        }

        let outer = stratified_indices(&labels, build_fraction, rng)?;
        let build_labels: Vec<String> = outer.kept.iter().map(|&i| labels[i].clone()).collect();
        let inner = stratified_indices(&build_labels, train_fraction, rng)?;

        let train_rows: Vec<usize> = inner.kept.iter().map(|&i| outer.kept[i]).collect();
        let test_rows: Vec<usize> = inner.held_out.iter().map(|&i| outer.kept[i]).collect();
        let validation_rows = outer.held_out;

        debug!(
            train = train_rows.len(),
            test = test_rows.len(),
            validation = validation_rows.len(),
            "partitioned labeled rows"
        );

        Ok(Self {
            train: take_rows(df, &train_rows)?,
            test: take_rows(df, &test_rows)?,
            validation: take_rows(df, &validation_rows)?,
            train_rows,
            test_rows,
            validation_rows,
        })
    }

    pub fn total_rows(&self) -> usize {
        self.train_rows.len() + self.test_rows.len() + self.validation_rows.len()
    }
}
