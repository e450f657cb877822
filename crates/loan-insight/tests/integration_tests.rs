//! Integration tests for the loan analysis pipeline.
//!
//! These tests drive the public API end to end over the CSV fixtures.

use loan_insight::bias::BIAS_REPORT_FILE;
use loan_insight::distribution::DISTRIBUTION_REPORT_FILE;
use loan_insight::profiler::statistics::{mean, sample_std};
use loan_insight::utils::finite_f64_values;
use loan_insight::{
    AnalysisConfig, AnalysisError, Assessor, BiasAnalyzer, ColumnKind, ConfigValidationError,
    DataCleaner, DataProfiler, DatasetSchema, DistributionAnalyzer, EncodingMethod,
    OutlierStrategy, ScalingMethod, TransformArtifacts, load_dataset,
};
use polars::prelude::*;
use pretty_assertions::assert_eq;
use std::path::PathBuf;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

fn fixtures_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_sample() -> (DataFrame, DatasetSchema) {
    let df = load_dataset(fixtures_path().join("loan_sample.csv"), b',')
        .expect("Failed to read fixture");
    let schema = DataProfiler::infer_schema(&df, None).expect("Failed to infer schema");
    (df, schema)
}

fn config(dir: &TempDir) -> loan_insight::AnalysisConfigBuilder {
    AnalysisConfig::builder()
        .input_path(fixtures_path().join("loan_sample.csv"))
        .output_dir(dir.path())
        .render_charts(false)
}

// ============================================================================
// Loading and Assessment
// ============================================================================

#[test]
fn test_load_and_assess_sample() {
    let (df, schema) = load_sample();
    let report = Assessor::assess(&df, &schema).unwrap();

    assert_eq!(report.rows, 30);
    assert_eq!(report.columns, 9);
    assert_eq!(report.duplicate_count, 2);

    let missing: Vec<&str> = report
        .columns_with_missing()
        .into_iter()
        .map(|c| c.name.as_str())
        .collect();
    assert_eq!(missing, vec!["annual_income", "credit_score", "region"]);
}

#[test]
fn test_schema_kinds() {
    let (_, schema) = load_sample();

    assert_eq!(schema.kind_of("loan_id"), Some(ColumnKind::Identifier));
    assert_eq!(schema.kind_of("annual_income"), Some(ColumnKind::Numeric));
    assert_eq!(schema.kind_of("gender"), Some(ColumnKind::Categorical));
    assert_eq!(
        schema.kind_of("loan_approval_status"),
        Some(ColumnKind::Categorical)
    );
}

#[test]
fn test_missing_dataset() {
    let err = load_dataset("does/not/exist.csv", b',').unwrap_err();
    assert_eq!(err.error_code(), "DATASET_NOT_FOUND");
    assert!(err.is_user_error());
}

// ============================================================================
// Distribution Analysis
// ============================================================================

#[test]
fn test_distribution_report() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir).build().unwrap();
    let (df, schema) = load_sample();

    let report = DistributionAnalyzer::new(&config).run(&df, &schema).unwrap();

    let names: Vec<&str> = report.numeric.iter().map(|n| n.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["applicant_age", "annual_income", "loan_amount", "credit_score"]
    );
    let income = &report.numeric[1];
    assert_eq!(income.stats.count, 28);
    assert!(
        income.stats.skewness.value().unwrap() > 1.0,
        "the 950k outlier skews right"
    );

    let region = report
        .categorical
        .iter()
        .find(|c| c.name == "region")
        .unwrap();
    assert_eq!(region.missing_count, 1);
    let total: f64 = region.frequencies.iter().map(|f| f.percentage).sum();
    assert!((total - 100.0).abs() < 1e-9);

    assert!(dir.path().join(DISTRIBUTION_REPORT_FILE).exists());
}

// ============================================================================
// Bias Analysis
// ============================================================================

#[test]
fn test_bias_flags_gender() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir).build().unwrap();
    let (df, schema) = load_sample();

    let report = BiasAnalyzer::new(&config).run(&df, &schema).unwrap();

    assert_eq!(report.class_balance.count_of("Approved"), 18);
    assert_eq!(report.class_balance.count_of("Rejected"), 12);
    assert!((report.overall_rate - 0.6).abs() < 1e-9);

    let gender = report
        .features
        .iter()
        .find(|f| f.feature == "gender")
        .unwrap();
    assert!(gender.has_flagged_groups());
    let male = gender.entries.iter().find(|e| e.group == "Male").unwrap();
    assert_eq!((male.group_size, male.group_positive), (17, 15));

    // the missing region forms its own group, listed last
    let region = report
        .features
        .iter()
        .find(|f| f.feature == "region")
        .unwrap();
    assert_eq!(region.entries.last().unwrap().group, "<missing>");

    let markdown = std::fs::read_to_string(dir.path().join(BIAS_REPORT_FILE)).unwrap();
    assert!(markdown.contains("not a hypothesis test"));
}

#[test]
fn test_bias_missing_target() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir).target_column("approved").build().unwrap();
    let (df, schema) = load_sample();

    let err = BiasAnalyzer::new(&config).run(&df, &schema).unwrap_err();
    assert!(matches!(err, AnalysisError::SchemaMismatch(_)));
}

// ============================================================================
// Cleaning and Transform
// ============================================================================

#[test]
fn test_clean_default_pipeline() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir).build().unwrap();
    let (df, schema) = load_sample();

    let result = DataCleaner::new(&config).run(df, &schema).unwrap();
    let summary = &result.summary;

    assert_eq!(summary.rows_before, 30);
    assert_eq!(summary.rows_after, 28);
    assert_eq!(result.data.height(), 28);
    assert_eq!(summary.missing_after, 0);

    for column in ["applicant_age", "annual_income", "loan_amount", "credit_score"] {
        let values =
            finite_f64_values(result.data.column(column).unwrap().as_materialized_series())
                .unwrap();
        assert!(mean(&values).unwrap().abs() < 1e-9, "{} mean", column);
        assert!(
            (sample_std(&values).unwrap() - 1.0).abs() < 1e-9,
            "{} std",
            column
        );
    }

    // identifiers pass through untouched
    assert_eq!(
        result.data.column("loan_id").unwrap().dtype(),
        &DataType::String
    );

    for suffix in [
        ".csv",
        "_encoding_map.json",
        "_scaling_params.json",
        "_summary.json",
    ] {
        let path = dir.path().join(format!("{}{}", config.output_name, suffix));
        assert!(path.exists(), "missing {}", path.display());
    }
}

#[test]
fn test_clean_one_hot_and_normalize() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir)
        .encoding_method(EncodingMethod::OneHot)
        .scaling_method(ScalingMethod::Normalize)
        .outlier_strategy(OutlierStrategy::Remove)
        .build()
        .unwrap();
    let (df, schema) = load_sample();

    let result = DataCleaner::new(&config).clean(df, &schema).unwrap();

    assert!(result.data.height() < 28);
    let indicators = ["region_Urban", "region_Rural", "region_Suburban"];
    for row in 0..result.data.height() {
        let set: i32 = indicators
            .iter()
            .map(|c| {
                result
                    .data
                    .column(c)
                    .unwrap()
                    .get(row)
                    .unwrap()
                    .try_extract::<i32>()
                    .unwrap()
            })
            .sum();
        assert_eq!(set, 1);
    }

    let age = finite_f64_values(
        result
            .data
            .column("applicant_age")
            .unwrap()
            .as_materialized_series(),
    )
    .unwrap();
    assert_eq!(age.iter().copied().fold(f64::INFINITY, f64::min), 0.0);
    assert_eq!(age.iter().copied().fold(f64::NEG_INFINITY, f64::max), 1.0);
}

#[test]
fn test_transform_replays_artifacts() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir).outlier_strategy(OutlierStrategy::Keep).build().unwrap();
    let (df, schema) = load_sample();
    let cleaned = DataCleaner::new(&config).run(df.clone(), &schema).unwrap();

    let artifacts = TransformArtifacts::load(
        dir.path().join(format!("{}_encoding_map.json", config.output_name)),
        dir.path().join(format!("{}_scaling_params.json", config.output_name)),
    )
    .unwrap();
    assert_eq!(artifacts.encoding_map, cleaned.encoding_map);

    let transformed = artifacts.apply(df).unwrap();
    assert_eq!(
        transformed.get_column_names(),
        cleaned.data.get_column_names()
    );
    assert_eq!(transformed.height(), 30);
}

#[test]
fn test_transform_rows_without_outcome() {
    let dir = TempDir::new().unwrap();
    let config = config(&dir).build().unwrap();
    let (df, schema) = load_sample();
    let cleaned = DataCleaner::new(&config).run(df.clone(), &schema).unwrap();
    assert!(cleaned.encoding_map.contains_key(&config.target_column));

    let artifacts = TransformArtifacts::load(
        dir.path().join(format!("{}_encoding_map.json", config.output_name)),
        dir.path().join(format!("{}_scaling_params.json", config.output_name)),
    )
    .unwrap()
    .with_target_column(&config.target_column);

    let new_rows = df.drop(&config.target_column).unwrap();
    let transformed = artifacts.apply(new_rows).unwrap();

    assert_eq!(transformed.height(), 30);
    assert!(transformed.column(&config.target_column).is_err());
    assert_eq!(
        transformed.column("gender").unwrap().dtype(),
        &DataType::UInt32
    );
}

#[test]
fn test_unknown_mode_is_config_error() {
    let err = "zscore".parse::<OutlierStrategy>().unwrap_err();
    assert!(matches!(err, ConfigValidationError::UnknownMode { .. }));
    assert!(err.to_string().contains("cap|remove|keep"));
}
