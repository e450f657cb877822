//! Data profiling module for dataset analysis.
//!
//! This module provides functionality for profiling datasets, including:
//! - Column kind inference (identifier, numeric, categorical)
//! - Descriptive statistics and normality tests
//! - Per-column profiles shared by the assessor and the distribution analyzer

pub mod normality;
mod schema;
pub mod statistics;

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{ColumnKind, ColumnSchema, DatasetSchema};
use crate::utils::{dtype_name, finite_f64_values, string_mode, value_counts};

pub use normality::{NormalityTest, NormalityTestKind, run_normality_tests};
pub use schema::MIN_PATTERN_VALUES;
pub use statistics::{BoxSummary, DescriptiveStats, HistogramBin};

/// Summary of a single column, recomputed fresh on every run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub kind: ColumnKind,
    pub non_null_count: usize,
    pub missing_count: usize,
    pub missing_percentage: f64,
    /// Distinct non-null values.
    pub unique_count: usize,
    /// Most frequent value, rendered as text.
    pub mode: Option<String>,
    /// Present for numeric columns.
    pub stats: Option<DescriptiveStats>,
    /// Tests that were applicable to the column; empty when degenerate.
    pub normality: Vec<NormalityTest>,
}

impl ColumnProfile {
    /// True when the column has no usable numeric spread.
    pub fn is_degenerate(&self) -> bool {
        self.stats.as_ref().is_none_or(DescriptiveStats::is_degenerate)
    }
}

/// Data profiler for analyzing dataset structure and characteristics.
pub struct DataProfiler;

impl DataProfiler {
    /// Infer the logical kind of every column once, at load time.
    ///
    /// Columns with dtypes the pipeline cannot analyze are left out of the
    /// schema with a warning.
    pub fn infer_schema(df: &DataFrame, id_column: Option<&str>) -> Result<DatasetSchema> {
        let mut columns = Vec::with_capacity(df.width());

        for col in df.get_columns() {
            let series = col.as_materialized_series();
            let name = series.name().to_string();
            match schema::infer_column_kind(series, id_column)? {
                Some(kind) => {
                    debug!("Column '{}' inferred as {}", name, kind);
                    columns.push(ColumnSchema {
                        name,
                        dtype: dtype_name(series.dtype()),
                        kind,
                    });
                }
                None => warn!(
                    "Column '{}' has unsupported dtype {} and is ignored",
                    name,
                    series.dtype()
                ),
            }
        }

        Ok(DatasetSchema { columns })
    }

    /// Profile one column of `df` as `kind`.
    ///
    /// `alpha` is the significance level of the normality tests.
    pub fn profile_column(
        df: &DataFrame,
        name: &str,
        kind: ColumnKind,
        alpha: f64,
    ) -> Result<ColumnProfile> {
        let col = df.column(name)?;
        let series = col.as_materialized_series();
        let rows = df.height();
        let missing_count = series.null_count();
        let missing_percentage = if rows > 0 {
            (missing_count as f64 / rows as f64) * 100.0
        } else {
            0.0
        };
        let unique_count = value_counts(series)?.len();

        let (stats, normality) = if kind == ColumnKind::Numeric {
            let values = finite_f64_values(series)?;
            let stats = DescriptiveStats::from_values(&values);
            let normality = if stats.is_degenerate() {
                Vec::new()
            } else {
                run_normality_tests(&values, alpha)
            };
            (Some(stats), normality)
        } else {
            (None, Vec::new())
        };

        Ok(ColumnProfile {
            name: name.to_string(),
            dtype: dtype_name(series.dtype()),
            kind,
            non_null_count: series.len() - missing_count,
            missing_count,
            missing_percentage,
            unique_count,
            mode: string_mode(series),
            stats,
            normality,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Statistic;

    fn loan_frame() -> DataFrame {
        df![
            "applicant_id" => ["A1", "A2", "A3", "A4", "A5"],
            "income" => [Some(40_000.0), Some(52_000.0), None, Some(61_000.0), Some(58_000.0)],
            "gender" => [Some("F"), Some("M"), Some("F"), None, Some("F")],
            "loan_approval_status" => ["Approved", "Rejected", "Approved", "Approved", "Rejected"],
        ]
        .unwrap()
    }

    #[test]
    fn test_infer_schema() {
        let schema = DataProfiler::infer_schema(&loan_frame(), None).unwrap();
        assert_eq!(schema.identifier_columns(), vec!["applicant_id"]);
        assert_eq!(schema.numeric_columns(), vec!["income"]);
        assert_eq!(
            schema.categorical_columns(),
            vec!["gender", "loan_approval_status"]
        );
    }

    #[test]
    fn test_infer_schema_configured_id() {
        let df = df!["row" => [1i64, 2, 3], "x" => [0.5, 0.6, 0.7]].unwrap();
        let schema = DataProfiler::infer_schema(&df, Some("row")).unwrap();
        assert_eq!(schema.kind_of("row"), Some(ColumnKind::Identifier));
        assert_eq!(schema.kind_of("x"), Some(ColumnKind::Numeric));
    }

    #[test]
    fn test_profile_numeric_column() {
        let profile =
            DataProfiler::profile_column(&loan_frame(), "income", ColumnKind::Numeric, 0.05)
                .unwrap();
        assert_eq!(profile.missing_count, 1);
        assert_eq!(profile.non_null_count, 4);
        assert!((profile.missing_percentage - 20.0).abs() < 1e-9);
        let stats = profile.stats.unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, Statistic::Defined(40_000.0));
        assert_eq!(stats.max, Statistic::Defined(61_000.0));
        // Shapiro-Wilk applies from three values, D'Agostino needs twenty
        assert_eq!(profile.normality.len(), 1);
        assert_eq!(profile.normality[0].kind, NormalityTestKind::ShapiroWilk);
    }

    #[test]
    fn test_profile_categorical_column() {
        let profile =
            DataProfiler::profile_column(&loan_frame(), "gender", ColumnKind::Categorical, 0.05)
                .unwrap();
        assert_eq!(profile.unique_count, 2);
        assert_eq!(profile.mode.as_deref(), Some("F"));
        assert!(profile.stats.is_none());
        assert!(profile.normality.is_empty());
    }

    #[test]
    fn test_profile_degenerate_column() {
        let df = df!["flat" => [3.0, 3.0, 3.0, 3.0]].unwrap();
        let profile = DataProfiler::profile_column(&df, "flat", ColumnKind::Numeric, 0.05).unwrap();
        assert!(profile.is_degenerate());
        assert!(profile.normality.is_empty());
        assert_eq!(profile.stats.unwrap().skewness, Statistic::Undefined);
    }
}
