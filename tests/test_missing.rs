//! Unit tests for missing value analysis

use harsel::pipeline::missing::{analyze_missing_values, get_features_above_threshold};
use harsel::pipeline::{MissingnessFilter, Transform};
use polars::prelude::*;

#[path = "common/mod.rs"]
mod common;

#[test]
fn test_analyze_missing_values_basic() {
    let df = df! {
        "col_complete" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
        "col_partial_missing" => [Some(1.0f64), Some(2.0), None, None, Some(5.0)],
        "col_all_missing" => [None::<f64>, None, None, None, None],
    }
    .unwrap();

    let ratios = analyze_missing_values(&df).unwrap();
    let ratio_map: std::collections::HashMap<_, _> = ratios.into_iter().collect();

    assert!((ratio_map["col_complete"] - 0.0).abs() < 0.001);
    assert!(
        (ratio_map["col_partial_missing"] - 0.4).abs() < 0.001,
        "col_partial_missing should have 40% missing, got {}",
        ratio_map["col_partial_missing"]
    );
    assert!((ratio_map["col_all_missing"] - 1.0).abs() < 0.001);
}

#[test]
fn test_analyze_missing_values_sorted_descending() {
    let df = common::create_missing_test_dataframe();

    let ratios = analyze_missing_values(&df).unwrap();

    for pair in ratios.windows(2) {
        assert!(
            pair[0].1 >= pair[1].1,
            "Ratios should be sorted descending: {} >= {}",
            pair[0].1,
            pair[1].1
        );
    }
}

#[test]
fn test_get_features_above_threshold() {
    let ratios = vec![
        ("feature_a".to_string(), 0.1),
        ("feature_b".to_string(), 0.35),
        ("classe".to_string(), 0.5),
        ("feature_c".to_string(), 0.9),
    ];

    let to_drop = get_features_above_threshold(&ratios, 0.3, "classe");

    assert_eq!(to_drop, vec!["feature_b".to_string(), "feature_c".to_string()]);
}

#[test]
fn test_threshold_is_inclusive() {
    let ratios = vec![
        ("just_below".to_string(), 0.249),
        ("exactly_at_threshold".to_string(), 0.25),
    ];

    let to_drop = get_features_above_threshold(&ratios, 0.25, "classe");

    assert_eq!(to_drop, vec!["exactly_at_threshold".to_string()]);
}

#[test]
fn test_empty_dataframe() {
    let df = DataFrame::empty();
    let ratios = analyze_missing_values(&df).unwrap();
    assert!(ratios.is_empty(), "Empty DataFrame should produce empty ratios");
}

#[test]
fn test_with_integer_columns() {
    let df = df! {
        "int_col" => [Some(1i32), None, Some(3), Some(4), None],
        "float_col" => [1.0f64, 2.0, 3.0, 4.0, 5.0],
    }
    .unwrap();

    let ratios = analyze_missing_values(&df).unwrap();
    let ratio_map: std::collections::HashMap<_, _> = ratios.into_iter().collect();

    assert!((ratio_map["int_col"] - 0.4).abs() < 0.001);
    assert!((ratio_map["float_col"] - 0.0).abs() < 0.001);
}

#[test]
fn test_filter_is_learned_once() {
    let reference = common::create_missing_test_dataframe();
    let filter = MissingnessFilter::fit(&reference, "classe", 0.3).unwrap();

    assert_eq!(
        filter.retained(),
        &["col_complete".to_string(), "col_20pct_missing".to_string()]
    );

    // a later frame with more gaps keeps exactly the learned columns
    let later = df! {
        "col_complete" => [None::<f64>, None],
        "col_20pct_missing" => [None::<f64>, Some(1.0)],
        "col_40pct_missing" => [1.0f64, 2.0],
    }
    .unwrap();
    let out = filter.transform(&later).unwrap();
    common::assert_shape(&out, 2, 2);
    common::assert_missing_columns(&out, &["col_40pct_missing"]);
}

#[test]
fn test_filter_never_drops_label() {
    let df = df! {
        "classe" => [Some("A"), None, None],
        "x" => [1.0f64, 2.0, 3.0],
    }
    .unwrap();

    let filter = MissingnessFilter::fit(&df, "classe", 0.25).unwrap();
    assert!(filter.dropped().is_empty());
    let out = filter.transform(&df).unwrap();
    common::assert_has_columns(&out, &["x", "classe"]);
}

#[test]
fn test_filter_rejects_empty_reference() {
    let df = df! { "x" => Vec::<f64>::new() }.unwrap();
    assert!(MissingnessFilter::fit(&df, "classe", 0.25).is_err());
}

#[test]
fn test_retained_columns_ignore_row_order() {
    use rand::rngs::StdRng;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    let df = common::create_synthetic_training(400, 13);
    let original = MissingnessFilter::fit(&df, "classe", 0.25).unwrap();

    let reversed = MissingnessFilter::fit(&df.reverse(), "classe", 0.25).unwrap();
    assert_eq!(original.retained(), reversed.retained());
    assert_eq!(original.dropped(), reversed.dropped());

    let mut order: Vec<IdxSize> = (0..df.height() as IdxSize).collect();
    order.shuffle(&mut StdRng::seed_from_u64(5));
    let shuffled = df.take(&IdxCa::from_vec("order".into(), order)).unwrap();
    let permuted = MissingnessFilter::fit(&shuffled, "classe", 0.25).unwrap();
    assert_eq!(original.retained(), permuted.retained());
    assert!(!original.dropped().is_empty());
}
