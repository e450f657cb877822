//! First look at a freshly loaded table: shape, dtypes, missing values,
//! duplicates and summary statistics.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

use crate::error::Result;
use crate::profiler::{DataProfiler, DescriptiveStats};
use crate::types::{ColumnKind, DatasetSchema};
use crate::utils::{any_value_to_string, truncate_str, value_counts};

/// Rows shown in the preview section.
const PREVIEW_ROWS: usize = 5;
/// Frequencies listed per categorical column.
const TOP_VALUES: usize = 5;

/// Per-column line of the assessment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnOverview {
    pub name: String,
    pub dtype: String,
    pub kind: ColumnKind,
    pub non_null_count: usize,
    pub missing_count: usize,
    pub missing_percentage: f64,
    pub unique_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalSummary {
    pub name: String,
    pub unique_count: usize,
    /// Most frequent values with their counts, at most five.
    pub top_values: Vec<(String, usize)>,
}

/// Result of [`Assessor::assess`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssessmentReport {
    pub rows: usize,
    pub columns: usize,
    pub column_overview: Vec<ColumnOverview>,
    pub duplicate_count: usize,
    /// Summary statistics per numeric column, in table order.
    pub numeric_stats: Vec<(String, DescriptiveStats)>,
    pub categorical_summaries: Vec<CategoricalSummary>,
    /// Number of columns per dtype.
    pub dtype_counts: BTreeMap<String, usize>,
    pub preview_header: Vec<String>,
    pub preview_rows: Vec<Vec<String>>,
}

impl AssessmentReport {
    /// Columns with at least one missing value.
    pub fn columns_with_missing(&self) -> Vec<&ColumnOverview> {
        self.column_overview
            .iter()
            .filter(|c| c.missing_count > 0)
            .collect()
    }

    /// Sectioned text rendering for the console.
    ///
    /// Note: This function uses `println!` intentionally for user-facing CLI output.
    pub fn print(&self) {
        println!("\n{}", "=".repeat(80));
        println!("DATASET ASSESSMENT");
        println!("{}\n", "=".repeat(80));

        println!("SHAPE");
        println!("{}", "-".repeat(40));
        println!("  Rows (observations): {}", self.rows);
        println!("  Columns (features):  {}", self.columns);
        println!();

        println!("COLUMNS");
        println!("{}", "-".repeat(40));
        println!(
            "  {:<28} {:<12} {:<12} {:>9} {:>9} {:>8}",
            "Column", "Dtype", "Kind", "Non-null", "Unique", "Missing"
        );
        println!("  {}", "-".repeat(82));
        for col in &self.column_overview {
            println!(
                "  {:<28} {:<12} {:<12} {:>9} {:>9} {:>7.1}%",
                truncate_str(&col.name, 28),
                col.dtype,
                col.kind.to_string(),
                col.non_null_count,
                col.unique_count,
                col.missing_percentage
            );
        }
        println!();

        println!("PREVIEW (first {} rows)", self.preview_rows.len());
        println!("{}", "-".repeat(40));
        println!("  {}", self.preview_header.join(" | "));
        for row in &self.preview_rows {
            println!("  {}", row.join(" | "));
        }
        println!();

        println!("MISSING VALUES");
        println!("{}", "-".repeat(40));
        let missing = self.columns_with_missing();
        if missing.is_empty() {
            println!("  No missing values found");
        } else {
            for col in missing {
                println!(
                    "  {:<28} {:>6} ({:.2}%)",
                    truncate_str(&col.name, 28),
                    col.missing_count,
                    col.missing_percentage
                );
            }
        }
        println!();

        println!("DUPLICATE ROWS");
        println!("{}", "-".repeat(40));
        if self.duplicate_count > 0 {
            println!(
                "  {} duplicate rows found (handled by `clean`)",
                self.duplicate_count
            );
        } else {
            println!("  No duplicate rows found");
        }
        println!();

        println!("NUMERIC COLUMNS");
        println!("{}", "-".repeat(40));
        if self.numeric_stats.is_empty() {
            println!("  No numeric columns found");
        } else {
            println!(
                "  {:<24} {:>7} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12} {:>12}",
                "Column", "Count", "Mean", "Std", "Min", "25%", "50%", "75%", "Max"
            );
            for (name, stats) in &self.numeric_stats {
                println!(
                    "  {:<24} {:>7} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2} {:>12.2}",
                    truncate_str(name, 24),
                    stats.count,
                    stats.mean,
                    stats.std,
                    stats.min,
                    stats.q1,
                    stats.median,
                    stats.q3,
                    stats.max
                );
            }
        }
        println!();

        println!("CATEGORICAL COLUMNS");
        println!("{}", "-".repeat(40));
        if self.categorical_summaries.is_empty() {
            println!("  No categorical columns found");
        }
        for summary in &self.categorical_summaries {
            println!("  {} ({} unique)", summary.name, summary.unique_count);
            for (value, count) in &summary.top_values {
                println!("    {:<30} {:>6}", truncate_str(value, 30), count);
            }
        }
        println!();

        println!("DATA TYPES");
        println!("{}", "-".repeat(40));
        for (dtype, count) in &self.dtype_counts {
            println!("  {:<12} {}", dtype, count);
        }
        println!("{}", "=".repeat(80));
    }
}

/// Produces an [`AssessmentReport`] for a table and its inferred schema.
pub struct Assessor;

impl Assessor {
    pub fn assess(df: &DataFrame, schema: &DatasetSchema) -> Result<AssessmentReport> {
        info!("Assessing dataset ({} x {})", df.height(), df.width());

        let mut column_overview = Vec::with_capacity(schema.columns.len());
        let mut numeric_stats = Vec::new();
        let mut categorical_summaries = Vec::new();
        let mut dtype_counts: BTreeMap<String, usize> = BTreeMap::new();

        for col in &schema.columns {
            // significance level is irrelevant here: tests are not reported
            let profile = DataProfiler::profile_column(df, &col.name, col.kind, 0.05)?;
            debug!(
                "Column '{}': {} missing, {} unique",
                profile.name, profile.missing_count, profile.unique_count
            );
            *dtype_counts.entry(profile.dtype.clone()).or_insert(0) += 1;

            match col.kind {
                ColumnKind::Numeric => {
                    if let Some(stats) = profile.stats.clone() {
                        numeric_stats.push((col.name.clone(), stats));
                    }
                }
                ColumnKind::Categorical => {
                    let series = df.column(&col.name)?.as_materialized_series();
                    let top_values = value_counts(series)?.into_iter().take(TOP_VALUES).collect();
                    categorical_summaries.push(CategoricalSummary {
                        name: col.name.clone(),
                        unique_count: profile.unique_count,
                        top_values,
                    });
                }
                ColumnKind::Identifier => {}
            }

            column_overview.push(ColumnOverview {
                name: profile.name,
                dtype: profile.dtype,
                kind: profile.kind,
                non_null_count: profile.non_null_count,
                missing_count: profile.missing_count,
                missing_percentage: profile.missing_percentage,
                unique_count: profile.unique_count,
            });
        }

        let duplicate_count = count_duplicates(df)?;
        let (preview_header, preview_rows) = preview(df, PREVIEW_ROWS)?;

        Ok(AssessmentReport {
            rows: df.height(),
            columns: df.width(),
            column_overview,
            duplicate_count,
            numeric_stats,
            categorical_summaries,
            dtype_counts,
            preview_header,
            preview_rows,
        })
    }
}

/// Number of rows that repeat an earlier row exactly.
pub(crate) fn count_duplicates(df: &DataFrame) -> PolarsResult<usize> {
    if df.height() == 0 {
        return Ok(0);
    }
    let unique = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
    Ok(df.height() - unique.height())
}

fn preview(df: &DataFrame, rows: usize) -> PolarsResult<(Vec<String>, Vec<Vec<String>>)> {
    let header = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    let head = df.head(Some(rows));
    let mut body = Vec::with_capacity(head.height());
    for idx in 0..head.height() {
        let row = head
            .get_columns()
            .iter()
            .map(|col| {
                col.get(idx).map(|value| match value {
                    AnyValue::Null => "null".to_string(),
                    other => any_value_to_string(&other),
                })
            })
            .collect::<PolarsResult<Vec<_>>>()?;
        body.push(row);
    }
    Ok((header, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::DataProfiler;
    use crate::types::Statistic;
    use pretty_assertions::assert_eq;

    fn loan_frame() -> DataFrame {
        df![
            "applicant_id" => ["A1", "A2", "A3", "A3", "A5", "A6"],
            "income" => [Some(40.0), Some(52.0), None, None, Some(61.0), Some(58.0)],
            "region" => ["Urban", "Rural", "Urban", "Urban", "Urban", "Suburban"],
        ]
        .unwrap()
    }

    #[test]
    fn test_assess_shape_and_missing() {
        let df = loan_frame();
        let schema = DataProfiler::infer_schema(&df, None).unwrap();
        let report = Assessor::assess(&df, &schema).unwrap();

        assert_eq!((report.rows, report.columns), (6, 3));
        let missing: Vec<&str> = report
            .columns_with_missing()
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(missing, vec!["income"]);
        let income = &report.column_overview[1];
        assert_eq!(income.non_null_count, 4);
        assert!((income.missing_percentage - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_assess_duplicates() {
        let df = loan_frame();
        let schema = DataProfiler::infer_schema(&df, None).unwrap();
        let report = Assessor::assess(&df, &schema).unwrap();
        assert_eq!(report.duplicate_count, 1);
    }

    #[test]
    fn test_assess_numeric_summary() {
        let df = loan_frame();
        let schema = DataProfiler::infer_schema(&df, None).unwrap();
        let report = Assessor::assess(&df, &schema).unwrap();

        let (name, stats) = &report.numeric_stats[0];
        assert_eq!(name, "income");
        assert_eq!(stats.count, 4);
        // sorted: 40, 52, 58, 61 -> Q1 at position 0.75
        assert_eq!(stats.q1, Statistic::Defined(49.0));
        assert_eq!(stats.median, Statistic::Defined(55.0));
    }

    #[test]
    fn test_assess_categorical_and_dtypes() {
        let df = loan_frame();
        let schema = DataProfiler::infer_schema(&df, None).unwrap();
        let report = Assessor::assess(&df, &schema).unwrap();

        let region = &report.categorical_summaries[0];
        assert_eq!(region.unique_count, 3);
        assert_eq!(region.top_values[0], ("Urban".to_string(), 4));
        assert_eq!(report.dtype_counts.get("String"), Some(&2));
        assert_eq!(report.dtype_counts.get("Float64"), Some(&1));
    }

    #[test]
    fn test_preview_limits_rows() {
        let df = loan_frame();
        let schema = DataProfiler::infer_schema(&df, None).unwrap();
        let report = Assessor::assess(&df, &schema).unwrap();
        assert_eq!(report.preview_rows.len(), 5);
        assert_eq!(report.preview_header, vec!["applicant_id", "income", "region"]);
        assert_eq!(report.preview_rows[2][1], "null");
    }

    #[test]
    fn test_count_duplicates_empty() {
        let df = DataFrame::empty();
        assert_eq!(count_duplicates(&df).unwrap(), 0);
    }
}
