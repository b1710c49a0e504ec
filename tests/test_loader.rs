//! Unit tests for dataset loader

use harsel::pipeline::loader::estimated_size_mb;
use harsel::pipeline::{get_column_names, load_dataset, save_predictions};
use polars::prelude::*;
use std::io::Write;
use tempfile::TempDir;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_load_csv_file() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "a,b,c").unwrap();
    writeln!(file, "1,2,3").unwrap();
    writeln!(file, "4,5,6").unwrap();
    drop(file);

    let df = load_dataset(&csv_path, 100, None).unwrap();

    assert_eq!(df.height(), 2, "Should have 2 data rows");
    assert_eq!(df.width(), 3, "Should have 3 columns");
    assert_eq!(df.get_column_names(), &["a", "b", "c"]);
    assert!(estimated_size_mb(&df) >= 0.0);
}

#[test]
fn test_load_parquet_file() {
    let mut df = df! {
        "x" => [1i32, 2, 3],
        "y" => [4i32, 5, 6],
    }
    .unwrap();
    let (_temp_dir, parquet_path) = common::create_temp_parquet(&mut df);

    let loaded = load_dataset(&parquet_path, 100, None).unwrap();

    common::assert_shape(&loaded, 3, 2);
    assert_eq!(loaded.get_column_names(), &["x", "y"]);
}

#[test]
fn test_get_column_names_csv() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("test.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "col_a,col_b,col_c").unwrap();
    writeln!(file, "1,2,3").unwrap();
    drop(file);

    let columns = get_column_names(&csv_path).unwrap();

    assert_eq!(columns, vec!["col_a", "col_b", "col_c"]);
}

#[test]
fn test_unsupported_format() {
    let temp_dir = TempDir::new().unwrap();
    let bad_path = temp_dir.path().join("test.xlsx");
    std::fs::File::create(&bad_path).unwrap();

    let err = load_dataset(&bad_path, 100, None).unwrap_err();

    assert!(
        err.to_string().contains("unsupported file format"),
        "Error message should mention unsupported format: {}",
        err
    );
}

#[test]
fn test_nonexistent_file() {
    let path = std::path::Path::new("/nonexistent/path/to/file.csv");
    assert!(load_dataset(path, 100, None).is_err());
}

#[test]
fn test_missing_tokens_become_null() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("sensor.csv");

    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "roll,kurtosis,skewness,classe").unwrap();
    writeln!(file, "1.5,NA,0.2,A").unwrap();
    writeln!(file, "2.5,#DIV/0!,,B").unwrap();
    writeln!(file, "3.5,0.7,0.4,A").unwrap();
    drop(file);

    let df = load_dataset(&csv_path, 100, Some("classe")).unwrap();

    assert_eq!(df.column("roll").unwrap().null_count(), 0);
    assert_eq!(df.column("kurtosis").unwrap().null_count(), 2);
    assert_eq!(df.column("skewness").unwrap().null_count(), 1);
    assert_eq!(df.column("kurtosis").unwrap().dtype(), &DataType::Float64);
    assert_eq!(df.column("classe").unwrap().dtype(), &DataType::String);
}

#[test]
fn test_numeric_text_column_is_coerced() {
    let temp_dir = TempDir::new().unwrap();
    let csv_path = temp_dir.path().join("coerce.csv");

    // "#DIV/0!" is read as null, so the remaining text parses as numbers
    let mut file = std::fs::File::create(&csv_path).unwrap();
    writeln!(file, "amplitude,user_name").unwrap();
    writeln!(file, "#DIV/0!,pedro").unwrap();
    writeln!(file, "0.25,eurico").unwrap();
    writeln!(file, "-1,jeremy").unwrap();
    drop(file);

    let df = load_dataset(&csv_path, 100, None).unwrap();

    assert_eq!(df.column("amplitude").unwrap().dtype(), &DataType::Float64);
    assert_eq!(df.column("user_name").unwrap().dtype(), &DataType::String);
}

#[test]
fn test_numeric_label_is_not_coerced() {
    let mut df = df! {
        "x" => [1.0f64, 2.0],
        "classe" => ["1", "2"],
    }
    .unwrap();
    let (_temp_dir, parquet_path) = common::create_temp_parquet(&mut df);

    let loaded = load_dataset(&parquet_path, 100, Some("classe")).unwrap();
    assert_eq!(loaded.column("classe").unwrap().dtype(), &DataType::String);
}

#[test]
fn test_save_predictions_csv_with_ids() {
    let (cases, _) = common::create_synthetic_cases(4, 1);
    let predictions = common::strings(&["A", "B", "C", "D"]);
    let temp_dir = TempDir::new().unwrap();
    let out_path = temp_dir.path().join("predictions.csv");

    save_predictions(&out_path, &cases, Some("problem_id"), &predictions).unwrap();

    let saved = load_dataset(&out_path, 100, Some("prediction")).unwrap();
    common::assert_shape(&saved, 4, 2);
    let labels: Vec<&str> = saved
        .column("prediction")
        .unwrap()
        .str()
        .unwrap()
        .into_no_null_iter()
        .collect();
    assert_eq!(labels, vec!["A", "B", "C", "D"]);
}

#[test]
fn test_save_predictions_parquet_without_ids() {
    let (cases, _) = common::create_synthetic_cases(3, 1);
    let predictions = common::strings(&["E", "E", "A"]);
    let temp_dir = TempDir::new().unwrap();
    let out_path = temp_dir.path().join("predictions.parquet");

    save_predictions(&out_path, &cases, None, &predictions).unwrap();

    let saved = load_dataset(&out_path, 100, None).unwrap();
    assert_eq!(saved.get_column_names(), &["prediction"]);
}

#[test]
fn test_save_predictions_rejects_unknown_extension() {
    let (cases, _) = common::create_synthetic_cases(2, 1);
    let predictions = common::strings(&["A", "B"]);
    let temp_dir = TempDir::new().unwrap();

    let result = save_predictions(&temp_dir.path().join("out.json"), &cases, None, &predictions);
    assert!(result.is_err());
}
