//! Shared test utilities and fixture generators

#![allow(dead_code)]

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const CLASSES: [&str; 5] = ["A", "B", "C", "D", "E"];

/// Columns the synthetic generator fills with 50% missing values.
pub const SPARSE_COLUMNS: usize = 10;
/// Constant or dominated columns.
pub const FLAT_COLUMNS: usize = 5;
/// Exact linear copies of a retained column.
pub const DUPLICATE_COLUMNS: usize = 2;
/// Identifier columns from the default identifier list.
pub const IDENTIFIER_COLUMNS: usize = 5;
/// Columns that survive preprocessing.
pub const GOOD_COLUMNS: usize = 38;
pub const SYNTHETIC_COLUMNS: usize =
    SPARSE_COLUMNS + FLAT_COLUMNS + DUPLICATE_COLUMNS + IDENTIFIER_COLUMNS + GOOD_COLUMNS;

/// Small labeled frame with one column for each kind of removal
///
/// - `classe`: label, 2 classes
/// - `X`: row index (identifier)
/// - `good`: clean numeric feature
/// - `good_copy`: `good` shifted by 0.1 (correlation 1.0)
/// - `sparse`: 80% missing
/// - `flat`: constant
/// - `noise`: unrelated numeric feature
pub fn create_test_dataframe() -> DataFrame {
    df! {
        "X" => [1i32, 2, 3, 4, 5, 6, 7, 8, 9, 10],
        "good" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        "good_copy" => [1.1f64, 2.1, 3.1, 4.1, 5.1, 6.1, 7.1, 8.1, 9.1, 10.1],
        "sparse" => [Some(1.0f64), None, None, None, None, None, None, None, None, Some(10.0)],
        "flat" => [5.0f64; 10],
        "noise" => [3.0f64, 7.0, 1.0, 9.0, 4.0, 2.0, 8.0, 6.0, 10.0, 5.0],
        "classe" => ["A", "B", "A", "B", "A", "B", "A", "B", "A", "B"],
    }
    .unwrap()
}

/// Create a DataFrame with specific missing value patterns
pub fn create_missing_test_dataframe() -> DataFrame {
    df! {
        "col_complete" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
        "col_20pct_missing" => [Some(1.0f64), None, Some(3.0), Some(4.0), Some(5.0)],
        "col_40pct_missing" => [Some(1.0f64), Some(2.0), None, None, Some(5.0)],
        "col_all_missing" => [None::<f64>, None, None, None, None],
        "classe" => ["A", "B", "A", "B", "A"],
    }
    .unwrap()
}

/// Create a DataFrame with known correlation patterns
pub fn create_correlation_test_dataframe() -> DataFrame {
    df! {
        "classe" => ["A", "B", "A", "B", "A", "B", "A", "B", "A", "B"],
        "a" => [1.0f64, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0],
        "b" => [2.0f64, 4.0, 6.0, 8.0, 10.0, 12.0, 14.0, 16.0, 18.0, 20.0], // b = 2a
        "c" => [10.0f64, 9.0, 8.0, 7.0, 6.0, 5.0, 4.0, 3.0, 2.0, 1.0],     // c = 11 - a
        "d" => [5.0f64, 1.0, 8.0, 2.0, 9.0, 3.0, 7.0, 4.0, 6.0, 0.0],
    }
    .unwrap()
}

/// Class of row `i`: classes cycle so every class has the same support.
pub fn class_of(row: usize) -> usize {
    row % CLASSES.len()
}

/// Feature columns of the synthetic sensor table, without the label.
///
/// Layout (60 columns): 5 identifiers, 5 class signals, 33 noise columns,
/// 10 half-missing columns, 5 flat columns and 2 exact copies. Class `k` has
/// `signal_k` in [2, 4] and every other signal in [-1, 1], so the classes are
/// linearly separable.
fn synthetic_columns(rows: usize, seed: u64) -> Vec<Column> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut columns: Vec<Column> = Vec::with_capacity(SYNTHETIC_COLUMNS);

    // identifiers
    let users = ["adelmo", "carlitos", "charles", "eurico", "jeremy", "pedro"];
    columns.push(Column::new("X".into(), (1..=rows as i64).collect::<Vec<_>>()));
    columns.push(Column::new(
        "user_name".into(),
        (0..rows).map(|i| users[i % users.len()]).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "raw_timestamp_part_1".into(),
        (0..rows as i64).map(|i| 1_322_489_729 + i).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "cvtd_timestamp".into(),
        (0..rows)
            .map(|i| format!("05/12/2011 11:{:02}", i % 60))
            .collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "num_window".into(),
        (0..rows as i64).map(|i| i / 20).collect::<Vec<_>>(),
    ));

    // class signals
    let mut signals: Vec<Vec<f64>> = Vec::with_capacity(CLASSES.len());
    for k in 0..CLASSES.len() {
        let values: Vec<f64> = (0..rows)
            .map(|i| {
                if class_of(i) == k {
                    rng.gen_range(2.0..4.0)
                } else {
                    rng.gen_range(-1.0..1.0)
                }
            })
            .collect();
        columns.push(Column::new(format!("signal_{}", k).into(), values.clone()));
        signals.push(values);
    }

    // noise
    let mut first_noise = Vec::new();
    for j in 0..GOOD_COLUMNS - CLASSES.len() {
        let values: Vec<f64> = (0..rows).map(|_| rng.gen::<f64>() * 10.0).collect();
        if j == 0 {
            first_noise = values.clone();
        }
        columns.push(Column::new(format!("noise_{}", j).into(), values));
    }

    // half missing
    for j in 0..SPARSE_COLUMNS {
        let values: Vec<Option<f64>> = (0..rows)
            .map(|i| {
                let value = rng.gen_range(-5.0..5.0);
                ((i + j) % 2 == 0).then_some(value)
            })
            .collect();
        columns.push(Column::new(format!("sparse_{}", j).into(), values));
    }

    // constant and dominated
    for j in 0..3 {
        columns.push(Column::new(format!("flat_{}", j).into(), vec![1.0f64; rows]));
    }
    for j in 3..FLAT_COLUMNS {
        let values: Vec<f64> = (0..rows)
            .map(|i| if i % 100 == j { 1.0 } else { 0.0 })
            .collect();
        columns.push(Column::new(format!("flat_{}", j).into(), values));
    }

    // exact copies, placed after their originals
    columns.push(Column::new(
        "signal_0_scaled".into(),
        signals[0].iter().map(|v| 2.0 * v + 1.0).collect::<Vec<_>>(),
    ));
    columns.push(Column::new(
        "noise_0_negated".into(),
        first_noise.iter().map(|v| -v).collect::<Vec<_>>(),
    ));

    columns
}

/// Labeled synthetic sensor table: 60 feature columns plus `classe`.
pub fn create_synthetic_training(rows: usize, seed: u64) -> DataFrame {
    let mut columns = synthetic_columns(rows, seed);
    let labels: Vec<&str> = (0..rows).map(|i| CLASSES[class_of(i)]).collect();
    columns.push(Column::new("classe".into(), labels));
    DataFrame::new(columns).unwrap()
}

/// Unlabeled cases drawn from the same distribution, with their true classes.
pub fn create_synthetic_cases(rows: usize, seed: u64) -> (DataFrame, Vec<String>) {
    let mut columns = synthetic_columns(rows, seed);
    columns.push(Column::new(
        "problem_id".into(),
        (1..=rows as i64).collect::<Vec<_>>(),
    ));
    let truth = (0..rows).map(|i| CLASSES[class_of(i)].to_string()).collect();
    (DataFrame::new(columns).unwrap(), truth)
}

/// Create a temporary directory with a test CSV file
pub fn create_temp_csv(df: &mut DataFrame) -> (TempDir, PathBuf) {
    create_temp_csv_named(df, "test_data.csv")
}

pub fn create_temp_csv_named(df: &mut DataFrame, name: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join(name);
    write_csv(df, &csv_path);

    (temp_dir, csv_path)
}

pub fn write_csv(df: &mut DataFrame, path: &Path) {
    let mut file = std::fs::File::create(path).unwrap();
    CsvWriter::new(&mut file).finish(df).unwrap();
}

/// Create a temporary directory with a test Parquet file
pub fn create_temp_parquet(df: &mut DataFrame) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let parquet_path = temp_dir.path().join("test_data.parquet");

    let file = std::fs::File::create(&parquet_path).unwrap();
    ParquetWriter::new(file).finish(df).unwrap();

    (temp_dir, parquet_path)
}

/// Assert that a DataFrame has expected shape
pub fn assert_shape(df: &DataFrame, expected_rows: usize, expected_cols: usize) {
    let (rows, cols) = df.shape();
    assert_eq!(rows, expected_rows, "Row count mismatch: expected {}, got {}", expected_rows, rows);
    assert_eq!(cols, expected_cols, "Column count mismatch: expected {}, got {}", expected_cols, cols);
}

/// Assert that a DataFrame contains specific columns
pub fn assert_has_columns(df: &DataFrame, expected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in expected_cols {
        assert!(
            actual_cols.contains(&col.to_string()),
            "Missing expected column: '{}'. Actual columns: {:?}",
            col,
            actual_cols
        );
    }
}

/// Assert that a DataFrame does NOT contain specific columns
pub fn assert_missing_columns(df: &DataFrame, unexpected_cols: &[&str]) {
    let actual_cols: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    for col in unexpected_cols {
        assert!(
            !actual_cols.contains(&col.to_string()),
            "Unexpected column still present: '{}'",
            col
        );
    }
}

pub fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}
