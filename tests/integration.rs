//! Integration tests for vigilar.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::uninlined_format_args,
    clippy::cast_lossless
)]

use std::sync::Arc;

use arrow::{
    array::{Float64Array, Int64Array, RecordBatch, StringArray},
    datatypes::{DataType, Field, Schema},
};
use vigilar::{
    compute_drift, ArrowDataset, ColumnMapping, Dataset, DriftAnalyzer, DriftSummary, Error,
    FeatureType,
};

/// Creates a reference-style snapshot with utility columns and mixed
/// feature types. `shift` offsets the numeric features to simulate drift.
fn create_snapshot(rows: usize, shift: f64) -> ArrowDataset {
    let schema = Arc::new(Schema::new(vec![
        Field::new("datetime", DataType::Utf8, false),
        Field::new("target", DataType::Float64, false),
        Field::new("prediction", DataType::Float64, false),
        Field::new("age", DataType::Float64, false),
        Field::new("income", DataType::Int64, false),
        Field::new("segment", DataType::Float64, false),
        Field::new("channel", DataType::Utf8, false),
    ]));

    let dates: Vec<String> = (0..rows).map(|i| format!("2024-01-{:02}", i % 28 + 1)).collect();
    let targets: Vec<f64> = (0..rows).map(|i| (i % 2) as f64).collect();
    let predictions: Vec<f64> = (0..rows).map(|i| ((i + 1) % 2) as f64).collect();
    let ages: Vec<f64> = (0..rows).map(|i| 20.0 + (i % 40) as f64 + shift).collect();
    let incomes: Vec<i64> = (0..rows).map(|i| 30_000 + (i as i64 % 50) * 1000).collect();
    let segments: Vec<f64> = (0..rows).map(|i| (i % 3) as f64).collect();
    // Numeric-coded categorical labels, as the categorical comparator expects.
    let channels: Vec<&str> = (0..rows)
        .map(|i| if i % 2 == 0 { "0" } else { "1" })
        .collect();

    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(StringArray::from(dates)),
            Arc::new(Float64Array::from(targets)),
            Arc::new(Float64Array::from(predictions)),
            Arc::new(Float64Array::from(ages)),
            Arc::new(Int64Array::from(incomes)),
            Arc::new(Float64Array::from(segments)),
            Arc::new(StringArray::from(channels)),
        ],
    )
    .unwrap();

    ArrowDataset::from_batch(batch).unwrap()
}

#[test]
fn test_end_to_end_inferred_classification() {
    let reference = create_snapshot(200, 0.0);
    let production = create_snapshot(200, 0.0);

    let summary = compute_drift(&reference, &production, None).unwrap();

    // Utility columns resolved by well-known names; id is never inferred.
    assert_eq!(summary.utility_columns.date.as_deref(), Some("datetime"));
    assert_eq!(summary.utility_columns.target.as_deref(), Some("target"));
    assert_eq!(
        summary.utility_columns.prediction.as_deref(),
        Some("prediction")
    );
    assert_eq!(summary.utility_columns.id, None);

    // Numeric columns minus utility become numerical features, string
    // columns become categorical features, in schema order.
    assert_eq!(
        summary.numerical_feature_names,
        vec!["age", "income", "segment"]
    );
    assert_eq!(summary.categorical_feature_names, vec!["channel"]);

    // Every named feature has a result; identical snapshots do not drift.
    for name in &summary.numerical_feature_names {
        let result = &summary.numerical_features[name];
        assert_eq!(result.feature_type, FeatureType::Numerical);
        assert!((result.p_value - 1.0).abs() < 1e-9, "feature {name}");
        assert_eq!(result.reference_histogram.num_bins(), 10);
        assert_eq!(result.production_histogram.num_bins(), 10);
    }
}

#[test]
fn test_end_to_end_with_mapping() {
    let reference = create_snapshot(200, 0.0);
    let production = create_snapshot(200, 0.0);

    let mapping = ColumnMapping::new()
        .with_date("datetime")
        .with_target("target")
        .with_prediction("prediction")
        .with_numerical_features(vec!["age".to_string(), "income".to_string()])
        .with_categorical_features(vec![
            "segment".to_string(),
            // String-typed, silently dropped by the numeric-value check.
            "channel".to_string(),
        ]);

    let analyzer = DriftAnalyzer::new(reference).with_mapping(mapping);
    let summary = analyzer.analyze(&production).unwrap();

    assert_eq!(summary.numerical_feature_names, vec!["age", "income"]);
    assert_eq!(summary.categorical_feature_names, vec!["segment"]);
    assert!(summary.feature("channel").is_none());

    let segment = &summary.categorical_features["segment"];
    assert_eq!(segment.feature_type, FeatureType::Categorical);
    assert!(segment.p_value > 0.95);
}

#[test]
fn test_shifted_production_is_detected() {
    let reference = create_snapshot(500, 0.0);
    let production = create_snapshot(500, 25.0);

    let summary = compute_drift(&reference, &production, None).unwrap();
    assert!(summary.numerical_features["age"].p_value < 1e-3);
}

#[test]
fn test_production_may_lack_target_and_prediction() {
    let reference = create_snapshot(100, 0.0);

    // Production snapshot carrying only the feature columns.
    let schema = Arc::new(Schema::new(vec![
        Field::new("age", DataType::Float64, false),
        Field::new("income", DataType::Int64, false),
        Field::new("segment", DataType::Float64, false),
        Field::new("channel", DataType::Utf8, false),
    ]));
    let batch = RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Float64Array::from(
                (0..100).map(|i| 20.0 + (i % 40) as f64).collect::<Vec<f64>>(),
            )),
            Arc::new(Int64Array::from(
                (0..100).map(|i| 30_000 + (i % 50) * 1000).collect::<Vec<i64>>(),
            )),
            Arc::new(Float64Array::from(
                (0..100).map(|i| (i % 3) as f64).collect::<Vec<f64>>(),
            )),
            Arc::new(StringArray::from(
                (0..100)
                    .map(|i| if i % 2 == 0 { "0" } else { "1" })
                    .collect::<Vec<&str>>(),
            )),
        ],
    )
    .unwrap();
    let production = ArrowDataset::from_batch(batch).unwrap();

    // Utility columns are resolved from the reference and never compared,
    // so their absence from production is fine.
    let summary = compute_drift(&reference, &production, None).unwrap();
    assert_eq!(summary.utility_columns.target.as_deref(), Some("target"));
    assert_eq!(summary.num_features(), 4);
}

#[test]
fn test_missing_feature_column_fails_whole_call() {
    let reference = create_snapshot(50, 0.0);

    let schema = Arc::new(Schema::new(vec![Field::new(
        "age",
        DataType::Float64,
        false,
    )]));
    let batch = RecordBatch::try_new(
        schema,
        vec![Arc::new(Float64Array::from(vec![30.0, 40.0, 50.0]))],
    )
    .unwrap();
    let production = ArrowDataset::from_batch(batch).unwrap();

    // "income" is classified from the reference but absent in production.
    let result = compute_drift(&reference, &production, None);
    match result {
        Err(Error::ColumnNotFound { name }) => assert_eq!(name, "income"),
        other => panic!("expected ColumnNotFound, got {:?}", other),
    }
}

#[test]
fn test_parquet_roundtrip_then_drift() {
    let temp_dir = tempfile::tempdir().unwrap();
    let ref_path = temp_dir.path().join("reference.parquet");
    let prod_path = temp_dir.path().join("production.parquet");

    let reference = create_snapshot(150, 0.0);
    let production = create_snapshot(150, 10.0);
    reference.to_parquet(&ref_path).unwrap();
    production.to_parquet(&prod_path).unwrap();

    let in_memory = compute_drift(&reference, &production, None).unwrap();

    let reference = ArrowDataset::from_parquet(&ref_path).unwrap();
    let production = ArrowDataset::from_parquet(&prod_path).unwrap();
    assert_eq!(reference.len(), 150);

    let from_disk = compute_drift(&reference, &production, None).unwrap();
    assert_eq!(in_memory, from_disk);
}

#[test]
fn test_summary_json_contract() {
    let reference = create_snapshot(100, 0.0);
    let production = create_snapshot(100, 5.0);

    let summary = compute_drift(&reference, &production, None).unwrap();
    let json = summary.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_slice(&json).unwrap();

    // The serialized shape is the contract renderers depend on.
    assert!(value["utility_columns"].is_object());
    assert!(value["numerical_feature_names"].is_array());
    assert!(value["categorical_feature_names"].is_array());

    let age = &value["numerical_features"]["age"];
    assert_eq!(age["feature_type"], "numerical");
    assert!(age["p_value"].is_number());
    assert_eq!(age["reference_histogram"]["densities"].as_array().unwrap().len(), 10);
    assert_eq!(age["reference_histogram"]["bin_edges"].as_array().unwrap().len(), 11);
    assert_eq!(age["production_histogram"]["densities"].as_array().unwrap().len(), 10);

    let restored = DriftSummary::from_json(&json).unwrap();
    assert_eq!(summary, restored);
}

#[test]
fn test_repeated_calls_are_bit_identical() {
    let reference = create_snapshot(120, 0.0);
    let production = create_snapshot(120, 3.0);

    let first = compute_drift(&reference, &production, None).unwrap();
    let second = compute_drift(&reference, &production, None).unwrap();

    for (name, result) in &first.numerical_features {
        let other = &second.numerical_features[name];
        assert_eq!(result.p_value.to_bits(), other.p_value.to_bits());
        assert_eq!(result.reference_histogram, other.reference_histogram);
        assert_eq!(result.production_histogram, other.production_histogram);
    }
}
