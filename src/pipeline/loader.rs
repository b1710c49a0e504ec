//! Dataset loader for CSV and Parquet files

use anyhow::{Context, Result};
use polars::prelude::*;
use std::path::Path;
use tracing::debug;

use crate::error::PipelineError;

/// Tokens that mean "missing" in raw sensor exports: the NA marker, an empty
/// field, and the spreadsheet division-by-zero artifact.
pub const MISSING_TOKENS: [&str; 3] = ["NA", "", "#DIV/0!"];

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase()
}

/// Build a lazy scan for a file (CSV or Parquet based on extension)
fn scan_dataset(path: &Path, infer_schema_length: usize) -> Result<LazyFrame> {
    // 0 means full table scan
    let schema_length = if infer_schema_length == 0 {
        None
    } else {
        Some(infer_schema_length)
    };

    let extension = extension_of(path);
    let lf = match extension.as_str() {
        "csv" => LazyCsvReader::new(path)
            .with_infer_schema_length(schema_length)
            .with_null_values(Some(NullValues::AllColumns(
                MISSING_TOKENS.iter().map(|t| (*t).into()).collect(),
            )))
            .finish()
            .with_context(|| format!("Failed to load CSV file: {}", path.display()))?,
        "parquet" => LazyFrame::scan_parquet(path, Default::default())
            .with_context(|| format!("Failed to load Parquet file: {}", path.display()))?,
        _ => return Err(PipelineError::UnsupportedFormat(extension.clone()).into()),
    };

    Ok(lf)
}

/// Load a dataset into memory, normalizing missing-value tokens to null.
///
/// String columns whose non-null values all parse as numbers are converted to
/// `Float64`; `label` (when given) is left untouched.
pub fn load_dataset(path: &Path, infer_schema_length: usize, label: Option<&str>) -> Result<DataFrame> {
    let df = scan_dataset(path, infer_schema_length)?
        .collect()
        .with_context(|| format!("Failed to read dataset: {}", path.display()))?;

    let df = coerce_numeric_columns(df, label)?;
    debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "dataset loaded"
    );
    Ok(df)
}

/// Convert string columns holding only numbers (and missing tokens) to `Float64`.
pub fn coerce_numeric_columns(mut df: DataFrame, label: Option<&str>) -> Result<DataFrame> {
    let candidates: Vec<String> = df
        .get_columns()
        .iter()
        .filter(|col| matches!(col.dtype(), DataType::String) && Some(col.name().as_str()) != label)
        .map(|col| col.name().to_string())
        .collect();

    for name in candidates {
        let col = df.column(&name)?;
        let non_null = col.len() - col.null_count();
        if non_null == 0 {
            // all-missing text column: keep it numeric so the missingness filter sees it
            let cast = col.cast(&DataType::Float64)?;
            df.with_column(cast)?;
            continue;
        }
        let cast = col.cast(&DataType::Float64)?;
        if cast.null_count() == col.null_count() {
            debug!(column = %name, "coerced text column to Float64");
            df.with_column(cast)?;
        }
    }

    Ok(df)
}

/// Get column names from a dataset file without loading the rows
pub fn get_column_names(path: &Path) -> Result<Vec<String>> {
    let schema = scan_dataset(path, 100)?
        .collect_schema()
        .with_context(|| format!("Failed to read schema: {}", path.display()))?;
    Ok(schema.iter_names().map(|n| n.to_string()).collect())
}

/// Estimated in-memory size of a frame in megabytes
pub fn estimated_size_mb(df: &DataFrame) -> f64 {
    df.estimated_size() as f64 / (1024.0 * 1024.0)
}

/// Name of the prediction column in the output file.
pub const PREDICTION_COLUMN: &str = "prediction";

/// One row per case: the optional identifier column copied from `cases`, then
/// the predicted label.
pub fn predictions_frame(cases: &DataFrame, id_column: Option<&str>, predictions: &[String]) -> Result<DataFrame> {
    if cases.height() != predictions.len() {
        anyhow::bail!(
            "{} prediction(s) for {} case row(s)",
            predictions.len(),
            cases.height()
        );
    }

    let mut columns = Vec::with_capacity(2);
    if let Some(id) = id_column {
        let col = cases
            .column(id)
            .with_context(|| format!("Identifier column '{}' not found in cases file", id))?;
        columns.push(col.clone());
    }
    columns.push(Column::new(PREDICTION_COLUMN.into(), predictions));

    Ok(DataFrame::new(columns)?)
}

/// Save predictions to file (CSV or Parquet based on extension)
pub fn save_predictions(path: &Path, cases: &DataFrame, id_column: Option<&str>, predictions: &[String]) -> Result<()> {
    let mut df = predictions_frame(cases, id_column, predictions)?;

    match extension_of(path).as_str() {
        "csv" => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            CsvWriter::new(&mut file)
                .finish(&mut df)
                .with_context(|| format!("Failed to write CSV file: {}", path.display()))?;
        }
        "parquet" => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {}", path.display()))?;
            ParquetWriter::new(file)
                .finish(&mut df)
                .with_context(|| format!("Failed to write Parquet file: {}", path.display()))?;
        }
        other => return Err(PipelineError::UnsupportedFormat(other.to_string()).into()),
    }

    debug!(path = %path.display(), rows = df.height(), "predictions saved");
    Ok(())
}
