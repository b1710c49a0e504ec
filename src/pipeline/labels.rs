//! Label column handling
//!
//! Labels may arrive as strings, integers, floats or booleans; everything
//! downstream works with their string rendering and a fixed, sorted class set.

use std::collections::BTreeSet;

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

/// Sorted, de-duplicated class symbols learned from training labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassSet {
    classes: Vec<String>,
}

impl ClassSet {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: BTreeSet<String> = labels.into_iter().map(Into::into).collect();
        Self {
            classes: set.into_iter().collect(),
        }
    }

    /// Learn the class set from the label column of a labeled frame.
    pub fn from_frame(df: &DataFrame, label: &str) -> Result<Self> {
        let labels = label_values(df, label)?;
        Ok(Self::new(labels))
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.classes.binary_search_by(|c| c.as_str().cmp(label)).ok()
    }

    pub fn name(&self, index: usize) -> &str {
        &self.classes[index]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.classes
    }

    /// Map labels to class indices; any label outside the set is `UnknownLabel`.
    pub fn encode(&self, labels: &[String]) -> Result<Vec<usize>> {
        labels
            .iter()
            .map(|l| {
                self.index_of(l)
                    .ok_or_else(|| PipelineError::UnknownLabel { label: l.clone() })
            })
            .collect()
    }
}

/// Read the label column of a labeled frame. Null labels are rejected.
pub fn label_values(df: &DataFrame, label: &str) -> Result<Vec<String>> {
    let col = df
        .column(label)
        .map_err(|_| PipelineError::schema("label", label))?;

    let values = column_to_string_vec(col)?;
    let missing = values.iter().filter(|v| v.is_none()).count();
    if missing > 0 {
        return Err(PipelineError::MissingLabel {
            column: label.to_string(),
            count: missing,
        });
    }

    Ok(values.into_iter().flatten().collect())
}

/// Convert a column to a Vec of Option<String>
fn column_to_string_vec(col: &Column) -> Result<Vec<Option<String>>> {
    let values: Vec<Option<String>> = match col.dtype() {
        DataType::String => col
            .str()?
            .into_iter()
            .map(|v| v.map(|s| s.to_string()))
            .collect(),
        DataType::Int8 | DataType::Int16 | DataType::Int32 | DataType::Int64 => {
            let cast = col.cast(&DataType::Int64)?;
            cast.i64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::UInt8 | DataType::UInt16 | DataType::UInt32 | DataType::UInt64 => {
            let cast = col.cast(&DataType::UInt64)?;
            cast.u64()?
                .into_iter()
                .map(|v| v.map(|n| n.to_string()))
                .collect()
        }
        DataType::Float32 | DataType::Float64 => {
            let cast = col.cast(&DataType::Float64)?;
            cast.f64()?
                .into_iter()
                .map(|v| v.map(|n| format!("{}", n)))
                .collect()
        }
        DataType::Boolean => col
            .bool()?
            .into_iter()
            .map(|v| v.map(|b| b.to_string()))
            .collect(),
        _ => {
            let cast = col.cast(&DataType::String)?;
            cast.str()?
                .into_iter()
                .map(|v| v.map(|s| s.to_string()))
                .collect()
        }
    };

    Ok(values)
}
