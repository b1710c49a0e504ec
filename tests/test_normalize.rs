//! Tests for the fitted scaling, variance and identifier stages

use harsel::pipeline::identifiers::default_identifier_columns;
use harsel::pipeline::profile::mean_and_variance;
use harsel::pipeline::{
    DegeneratePolicy, IdentifierStripper, Normalizer, Transform, VarianceConfig, VarianceFilter, VarianceRule,
};
use harsel::PipelineError;
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

fn values(df: &DataFrame, column: &str) -> Vec<f64> {
    df.column(column).unwrap().f64().unwrap().into_no_null_iter().collect()
}

#[test]
fn test_normalized_reference_has_zero_mean_unit_variance() {
    let df = df! {
        "a" => [3.0f64, 7.0, 1.0, 9.0, 4.0, 2.0],
        "b" => [100.0f64, 250.0, 175.0, 90.0, 300.0, 120.0],
        "classe" => ["A", "B", "A", "B", "A", "B"],
    }
    .unwrap();

    let normalizer = Normalizer::fit(&df, "classe", DegeneratePolicy::Reject).unwrap();
    let out = normalizer.transform(&df).unwrap();

    for name in ["a", "b"] {
        let (mean, variance) = mean_and_variance(&values(&out, name));
        assert!(mean.unwrap().abs() < 1e-12);
        assert!((variance.unwrap() - 1.0).abs() < 1e-12);
    }
    common::assert_has_columns(&out, &["classe"]);
}

#[test]
fn test_inverse_transform_restores_values() {
    let df = df! {
        "a" => [3.0f64, 7.0, 1.0, 9.0],
        "b" => [0.5f64, -2.0, 4.25, 1.0],
    }
    .unwrap();

    let normalizer = Normalizer::fit(&df, "classe", DegeneratePolicy::Reject).unwrap();
    let restored = normalizer
        .inverse_transform(&normalizer.transform(&df).unwrap())
        .unwrap();

    for name in ["a", "b"] {
        for (x, y) in values(&df, name).iter().zip(values(&restored, name)) {
            assert!((x - y).abs() < 1e-9);
        }
    }
}

#[test]
fn test_other_data_uses_reference_statistics() {
    let reference = df! { "a" => [0.0f64, 10.0] }.unwrap();
    let later = df! { "a" => [5.0f64, 5.0, 5.0] }.unwrap();

    let normalizer = Normalizer::fit(&reference, "classe", DegeneratePolicy::Reject).unwrap();
    let out = normalizer.transform(&later).unwrap();

    // reference mean 5: a constant later frame maps to 0, not NaN
    assert_eq!(values(&out, "a"), vec![0.0, 0.0, 0.0]);
}

#[test]
fn test_transform_requires_learned_columns() {
    let reference = df! { "a" => [1.0f64, 2.0], "b" => [3.0f64, 5.0] }.unwrap();
    let later = df! { "a" => [1.0f64] }.unwrap();

    let normalizer = Normalizer::fit(&reference, "classe", DegeneratePolicy::Reject).unwrap();
    let err = normalizer.transform(&later).unwrap_err();
    assert!(matches!(err, PipelineError::SchemaMismatch { ref column, .. } if column == "b"));
}

#[test]
fn test_degenerate_column_policies() {
    let df = df! { "flat" => [2.0f64, 2.0, 2.0], "x" => [1.0f64, 2.0, 4.0] }.unwrap();

    assert!(matches!(
        Normalizer::fit(&df, "classe", DegeneratePolicy::Reject).unwrap_err(),
        PipelineError::DegenerateColumn { .. }
    ));
    let skipped = Normalizer::fit(&df, "classe", DegeneratePolicy::Skip).unwrap();
    assert_eq!(skipped.skipped(), &["flat".to_string()]);
    assert_eq!(skipped.params().len(), 1);
}

#[test]
fn test_variance_filter_on_synthetic_table() {
    let df = common::create_synthetic_training(1000, 7);
    let filter = VarianceFilter::fit(&df, "classe", &VarianceConfig::default()).unwrap();

    let mut dropped = filter.dropped().to_vec();
    dropped.retain(|c| c.starts_with("flat_"));
    assert_eq!(dropped.len(), common::FLAT_COLUMNS);

    let flat_3 = filter.metrics().iter().find(|m| m.name == "flat_3").unwrap();
    assert!((flat_3.freq_ratio - 99.0).abs() < 1e-9);
    assert!(flat_3.near_zero);
    assert!(!flat_3.zero_variance);
}

#[test]
fn test_variance_rule_both_is_stricter() {
    // 95 zeros and 5 distinct values: dominated (ratio 95) but 6% distinct
    let mut column = vec![0.0f64; 95];
    column.extend([1.0, 2.0, 3.0, 4.0, 5.0]);
    let df = df! { "spiky" => column }.unwrap();

    let either = VarianceFilter::fit(&df, "classe", &VarianceConfig::default()).unwrap();
    assert_eq!(either.dropped(), &["spiky".to_string()]);

    let both = VarianceFilter::fit(
        &df,
        "classe",
        &VarianceConfig {
            rule: VarianceRule::Both,
            ..VarianceConfig::default()
        },
    )
    .unwrap();
    assert!(both.dropped().is_empty());
}

#[test]
fn test_identifier_stripper_keeps_order() {
    let df = common::create_synthetic_training(10, 1);
    let stripper = IdentifierStripper::fit(&df, "classe", &default_identifier_columns());

    assert_eq!(stripper.dropped().len(), common::IDENTIFIER_COLUMNS);
    let out = stripper.transform(&df).unwrap();
    common::assert_missing_columns(&out, &["X", "user_name", "num_window"]);
    assert_eq!(out.get_column_names()[0].as_str(), "signal_0");
}
