//! Removal of bookkeeping columns that identify observations rather than measure them

use polars::prelude::*;

use crate::error::Result;
use crate::pipeline::frame::{feature_column_names, select_retained};
use crate::pipeline::Transform;

/// Row index, subject, raw and formatted timestamps, and window markers of the
/// wearable-sensor exports.
pub const DEFAULT_IDENTIFIER_COLUMNS: [&str; 7] = [
    "X",
    "user_name",
    "raw_timestamp_part_1",
    "raw_timestamp_part_2",
    "cvtd_timestamp",
    "new_window",
    "num_window",
];

pub fn default_identifier_columns() -> Vec<String> {
    DEFAULT_IDENTIFIER_COLUMNS.iter().map(|s| s.to_string()).collect()
}

/// Drops a fixed set of identifier columns; the remaining columns keep their order.
#[derive(Debug, Clone)]
pub struct IdentifierStripper {
    label: String,
    retained: Vec<String>,
    dropped: Vec<String>,
}

impl IdentifierStripper {
    pub fn fit(reference: &DataFrame, label: &str, identifiers: &[String]) -> Self {
        let (dropped, retained): (Vec<String>, Vec<String>) = feature_column_names(reference, label)
            .into_iter()
            .partition(|name| identifiers.contains(name));

        Self {
            label: label.to_string(),
            retained,
            dropped,
        }
    }

    pub fn retained(&self) -> &[String] {
        &self.retained
    }

    /// Identifier columns that were actually present in the reference data.
    pub fn dropped(&self) -> &[String] {
        &self.dropped
    }
}

impl Transform for IdentifierStripper {
    fn name(&self) -> &'static str {
        "identifier stripper"
    }

    fn transform(&self, df: &DataFrame) -> Result<DataFrame> {
        select_retained(df, &self.retained, &self.label, self.name())
    }
}
