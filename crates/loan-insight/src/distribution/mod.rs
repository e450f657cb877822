//! Distribution analysis of numeric and categorical columns.
//!
//! Numeric columns get descriptive statistics, normality tests, a
//! distribution label and three charts (histogram with density overlay, box
//! plot, Q-Q plot). Categorical columns get value counts, proportions and a bar chart.

use polars::prelude::*;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::charts::{self, BarChartLabels};
use crate::config::AnalysisConfig;
use crate::error::Result;
use crate::profiler::statistics::{box_summary, build_histogram, gaussian_kde, sorted_copy};
use crate::profiler::{DescriptiveStats, NormalityTest, NormalityTestKind, run_normality_tests};
use crate::reporting::{ReportWriter, markdown};
use crate::types::DatasetSchema;
use crate::utils::{finite_f64_values, safe_file_stem, truncate_str, value_counts};

/// Name of the markdown summary written by [`DistributionAnalyzer::run`].
pub const DISTRIBUTION_REPORT_FILE: &str = "DISTRIBUTION_REPORT.md";

/// Categories shown in a categorical bar chart.
const TOP_CATEGORIES: usize = 10;
/// Q-Q plots draw at most this many points.
const QQ_MAX_POINTS: usize = 2000;
/// Evaluation points of the density overlay.
const KDE_POINTS: usize = 200;

/// Skewness magnitude below which a column counts as symmetric.
const SYMMETRIC_SKEW: f64 = 0.5;
/// Skewness magnitude above which a column counts as strongly skewed.
const STRONG_SKEW: f64 = 1.0;
/// Excess kurtosis bound for the "Normal (Gaussian)" label.
const NORMAL_KURTOSIS: f64 = 3.0;

/// Analysis of one numeric column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NumericDistribution {
    pub name: String,
    pub missing_percentage: f64,
    pub stats: DescriptiveStats,
    pub normality: Vec<NormalityTest>,
    /// `None` when the column is degenerate.
    pub distribution_type: Option<String>,
    pub skew_direction: Option<String>,
    /// Chart files written for this column.
    pub charts: Vec<String>,
}

impl NumericDistribution {
    /// The test that decides normality: D'Agostino-Pearson when it applies,
    /// Shapiro-Wilk otherwise.
    pub fn deciding_test(&self) -> Option<&NormalityTest> {
        self.normality
            .iter()
            .find(|t| t.kind == NormalityTestKind::DAgostinoPearson)
            .or_else(|| self.normality.first())
    }

    pub fn is_normal(&self) -> Option<bool> {
        self.deciding_test().map(|t| t.is_normal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryFrequency {
    pub value: String,
    pub count: usize,
    /// Share of non-missing values, in percent.
    pub percentage: f64,
}

/// Analysis of one categorical column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoricalDistribution {
    pub name: String,
    pub missing_count: usize,
    /// All categories, most frequent first.
    pub frequencies: Vec<CategoryFrequency>,
    pub chart: Option<String>,
}

/// Result of [`DistributionAnalyzer::run`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DistributionReport {
    pub rows: usize,
    pub numeric: Vec<NumericDistribution>,
    pub categorical: Vec<CategoricalDistribution>,
    pub significance_level: f64,
    pub warnings: Vec<String>,
}

impl DistributionReport {
    /// Console rendering.
    ///
    /// Note: This function uses `println!` intentionally for user-facing CLI output.
    pub fn print(&self) {
        println!("\n{}", "=".repeat(80));
        println!("DISTRIBUTION ANALYSIS");
        println!("{}\n", "=".repeat(80));

        println!("NUMERIC COLUMNS ({})", self.numeric.len());
        println!("{}", "-".repeat(40));
        for col in &self.numeric {
            let s = &col.stats;
            println!("  {}", col.name);
            println!("    Mean:     {:.4}", s.mean);
            println!("    Median:   {:.4}", s.median);
            println!("    Std Dev:  {:.4}", s.std);
            println!("    Min:      {:.4}", s.min);
            println!("    Max:      {:.4}", s.max);
            println!(
                "    Skewness: {:.4} ({})",
                s.skewness,
                col.skew_direction.as_deref().unwrap_or("undefined")
            );
            println!("    Kurtosis: {:.4}", s.kurtosis);
            if col.normality.is_empty() {
                println!("    Normality tests: undefined");
            }
            for test in &col.normality {
                println!(
                    "    {}: statistic {:.4}, p-value {:.4} -> {}",
                    test.kind.display_name(),
                    test.statistic,
                    test.p_value,
                    if test.is_normal { "normal" } else { "non-normal" }
                );
            }
            println!(
                "    Likely distribution: {}",
                col.distribution_type.as_deref().unwrap_or("undefined")
            );
        }
        println!();

        println!("CATEGORICAL COLUMNS ({})", self.categorical.len());
        println!("{}", "-".repeat(40));
        for col in &self.categorical {
            println!("  {} ({} categories)", col.name, col.frequencies.len());
            for freq in &col.frequencies {
                println!(
                    "    {:<30} {:>7} {:>7.2}%",
                    truncate_str(&freq.value, 30),
                    freq.count,
                    freq.percentage
                );
            }
        }

        if !self.warnings.is_empty() {
            println!();
            println!("WARNINGS");
            println!("{}", "-".repeat(40));
            for warning in &self.warnings {
                println!("  - {}", warning);
            }
        }
        println!("{}", "=".repeat(80));
    }
}

/// Label of the likely distribution family.
pub fn classify_distribution(skewness: f64, excess_kurtosis: f64, is_normal: bool) -> &'static str {
    if is_normal && skewness.abs() < SYMMETRIC_SKEW && excess_kurtosis.abs() < NORMAL_KURTOSIS {
        "Normal (Gaussian)"
    } else if skewness.abs() < SYMMETRIC_SKEW {
        "Approximately Normal"
    } else if skewness > STRONG_SKEW {
        "Right-skewed"
    } else if skewness < -STRONG_SKEW {
        "Left-skewed"
    } else {
        "Moderately Skewed"
    }
}

pub fn skew_direction(skewness: f64) -> &'static str {
    if skewness.abs() < SYMMETRIC_SKEW {
        "Symmetric"
    } else if skewness > 0.0 {
        "Right-skewed"
    } else {
        "Left-skewed"
    }
}

/// Pairs of (theoretical normal quantile, sample value) for a Q-Q plot.
///
/// Large samples are thinned to a deterministic random subset.
pub fn qq_points(values: &[f64]) -> Vec<(f64, f64)> {
    let sorted = sorted_copy(values);
    let n = sorted.len();
    let Ok(normal) = Normal::new(0.0, 1.0) else {
        return Vec::new();
    };
    let mut points: Vec<(f64, f64)> = sorted
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let p = (i as f64 + 1.0 - 0.375) / (n as f64 + 0.25);
            (normal.inverse_cdf(p), *v)
        })
        .collect();

    if points.len() > QQ_MAX_POINTS {
        let mut rng = StdRng::seed_from_u64(42);
        let mut kept: Vec<usize> = (0..points.len())
            .collect::<Vec<_>>()
            .choose_multiple(&mut rng, QQ_MAX_POINTS)
            .copied()
            .collect();
        kept.sort_unstable();
        points = kept.into_iter().map(|i| points[i]).collect();
    }
    points
}

/// Runs the distribution analysis with the charting and test settings of
/// an [`AnalysisConfig`].
pub struct DistributionAnalyzer<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> DistributionAnalyzer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Analyze every numeric and categorical column, render charts and
    /// write `DISTRIBUTION_REPORT.md` to the output directory.
    pub fn run(&self, df: &DataFrame, schema: &DatasetSchema) -> Result<DistributionReport> {
        let report = self.analyze(df, schema, self.config.render_charts)?;
        let writer = ReportWriter::new(&self.config.output_dir);
        writer.write_text(DISTRIBUTION_REPORT_FILE, &markdown::distribution_report(&report))?;
        Ok(report)
    }

    /// Analysis without the markdown side effect. Charts are rendered only
    /// when `render_charts` is set.
    pub fn analyze(
        &self,
        df: &DataFrame,
        schema: &DatasetSchema,
        render_charts: bool,
    ) -> Result<DistributionReport> {
        info!("Analyzing distributions of {} columns", schema.columns.len());
        let chart_dir = render_charts.then_some(self.config.output_dir.as_path());
        if let Some(dir) = chart_dir {
            std::fs::create_dir_all(dir)?;
        }

        let mut report = DistributionReport {
            rows: df.height(),
            significance_level: self.config.significance_level,
            ..Default::default()
        };

        for name in schema.numeric_columns() {
            if df.column(&name).is_err() {
                continue;
            }
            let dist = self.analyze_numeric(df, &name, chart_dir, &mut report.warnings)?;
            report.numeric.push(dist);
        }
        for name in schema.categorical_columns() {
            if df.column(&name).is_err() {
                continue;
            }
            let dist = self.analyze_categorical(df, &name, chart_dir, &mut report.warnings)?;
            report.categorical.push(dist);
        }

        Ok(report)
    }

    /// Statistics, tests and (optionally) charts of one numeric column.
    pub fn analyze_numeric(
        &self,
        df: &DataFrame,
        name: &str,
        chart_dir: Option<&Path>,
        warnings: &mut Vec<String>,
    ) -> Result<NumericDistribution> {
        let series = df.column(name)?.as_materialized_series();
        let values = finite_f64_values(series)?;
        let missing_percentage = if df.height() > 0 {
            series.null_count() as f64 / df.height() as f64 * 100.0
        } else {
            0.0
        };
        let stats = DescriptiveStats::from_values(&values);

        let degenerate = values.len() < 3 || stats.is_degenerate();
        let normality = if degenerate {
            let note = format!(
                "Column '{}' is degenerate ({} values); statistical tests skipped",
                name,
                values.len()
            );
            warn!("{}", note);
            warnings.push(note);
            Vec::new()
        } else {
            run_normality_tests(&values, self.config.significance_level)
        };

        let mut dist = NumericDistribution {
            name: name.to_string(),
            missing_percentage,
            stats,
            normality,
            distribution_type: None,
            skew_direction: None,
            charts: Vec::new(),
        };
        if let Some(skew) = dist.stats.skewness.value() {
            dist.skew_direction = Some(skew_direction(skew).to_string());
            let kurtosis = dist.stats.kurtosis.value().unwrap_or(0.0);
            let is_normal = dist.is_normal().unwrap_or(false);
            dist.distribution_type = Some(classify_distribution(skew, kurtosis, is_normal).to_string());
        }
        debug!(
            "Column '{}': skew {}, label {:?}",
            name, dist.stats.skewness, dist.distribution_type
        );

        if let Some(dir) = chart_dir {
            if degenerate {
                warnings.push(format!("No charts for degenerate column '{}'", name));
            } else {
                self.render_numeric_charts(dir, &mut dist, &values, warnings);
            }
        }
        Ok(dist)
    }

    fn render_numeric_charts(
        &self,
        dir: &Path,
        dist: &mut NumericDistribution,
        values: &[f64],
        warnings: &mut Vec<String>,
    ) {
        let stem = safe_file_stem(&dist.name);

        let sorted = sorted_copy(values);

        let hist_file = format!("dist_{}.png", stem);
        let bins = build_histogram(&sorted, self.config.histogram_bins);
        let density = gaussian_kde(values, KDE_POINTS);
        match charts::histogram_with_density(&dir.join(&hist_file), &dist.name, &bins, &density) {
            Ok(()) => dist.charts.push(hist_file),
            Err(e) => chart_failed(e, warnings),
        }

        if let Some(summary) = box_summary(&sorted) {
            let box_file = format!("box_{}.png", stem);
            match charts::box_plot(&dir.join(&box_file), &dist.name, &summary) {
                Ok(()) => dist.charts.push(box_file),
                Err(e) => chart_failed(e, warnings),
            }
        }

        let qq_file = format!("qq_{}.png", stem);
        let mean = dist.stats.mean.value().unwrap_or(0.0);
        let std = dist.stats.std.value().unwrap_or(1.0);
        match charts::qq_plot(&dir.join(&qq_file), &dist.name, &qq_points(values), mean, std) {
            Ok(()) => dist.charts.push(qq_file),
            Err(e) => chart_failed(e, warnings),
        }
    }

    /// Value counts, proportions and (optionally) a bar chart of one
    /// categorical column.
    pub fn analyze_categorical(
        &self,
        df: &DataFrame,
        name: &str,
        chart_dir: Option<&Path>,
        warnings: &mut Vec<String>,
    ) -> Result<CategoricalDistribution> {
        let series = df.column(name)?.as_materialized_series();
        let counts = value_counts(series)?;
        let non_null: usize = counts.iter().map(|(_, c)| c).sum();
        let frequencies: Vec<CategoryFrequency> = counts
            .into_iter()
            .map(|(value, count)| CategoryFrequency {
                value,
                count,
                percentage: count as f64 / non_null as f64 * 100.0,
            })
            .collect();

        let mut dist = CategoricalDistribution {
            name: name.to_string(),
            missing_count: series.null_count(),
            frequencies,
            chart: None,
        };

        if let Some(dir) = chart_dir {
            if dist.frequencies.is_empty() {
                warnings.push(format!("No values to plot for '{}'", name));
            } else {
                let file = format!("categorical_{}.png", safe_file_stem(name));
                let top: Vec<&CategoryFrequency> =
                    dist.frequencies.iter().take(TOP_CATEGORIES).collect();
                let title = if dist.frequencies.len() > TOP_CATEGORIES {
                    format!("Categorical Distribution: {} (Top {})", name, TOP_CATEGORIES)
                } else {
                    format!("Categorical Distribution: {}", name)
                };
                let labels = BarChartLabels {
                    title: &title,
                    x_desc: "Categories",
                    y_desc: "Count",
                };
                let categories: Vec<String> = top.iter().map(|f| f.value.clone()).collect();
                let values: Vec<f64> = top.iter().map(|f| f.count as f64).collect();
                match charts::bar_chart(&dir.join(&file), &labels, &categories, &values, None) {
                    Ok(()) => dist.chart = Some(file),
                    Err(e) => chart_failed(e, warnings),
                }
            }
        }
        Ok(dist)
    }
}

fn chart_failed(err: crate::error::AnalysisError, warnings: &mut Vec<String>) {
    warn!("{}", err);
    warnings.push(err.to_string());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::DataProfiler;
    use crate::types::Statistic;
    use pretty_assertions::assert_eq;

    fn quiet_config(dir: &Path) -> AnalysisConfig {
        AnalysisConfig::builder()
            .output_dir(dir)
            .render_charts(false)
            .build()
            .unwrap()
    }

    // ==================== classification tests ====================

    #[test]
    fn test_classify_distribution() {
        assert_eq!(classify_distribution(0.1, 0.2, true), "Normal (Gaussian)");
        assert_eq!(classify_distribution(0.1, 4.0, true), "Approximately Normal");
        assert_eq!(classify_distribution(0.3, 0.0, false), "Approximately Normal");
        assert_eq!(classify_distribution(1.8, 5.0, false), "Right-skewed");
        assert_eq!(classify_distribution(-1.2, 1.0, false), "Left-skewed");
        assert_eq!(classify_distribution(0.7, 0.0, false), "Moderately Skewed");
    }

    #[test]
    fn test_skew_direction() {
        assert_eq!(skew_direction(0.2), "Symmetric");
        assert_eq!(skew_direction(0.9), "Right-skewed");
        assert_eq!(skew_direction(-0.6), "Left-skewed");
    }

    #[test]
    fn test_qq_points_are_ordered() {
        let points = qq_points(&[3.0, 1.0, 2.0]);
        assert_eq!(points.len(), 3);
        assert_eq!(points.iter().map(|p| p.1).collect::<Vec<_>>(), vec![1.0, 2.0, 3.0]);
        assert!(points[0].0 < 0.0 && points[2].0 > 0.0);
        assert!(points[1].0.abs() < 1e-12);
    }

    #[test]
    fn test_qq_points_thinned() {
        let values: Vec<f64> = (0..5000).map(|i| i as f64).collect();
        let points = qq_points(&values);
        assert_eq!(points.len(), QQ_MAX_POINTS);
        assert!(points.windows(2).all(|w| w[0].0 < w[1].0));
    }

    // ==================== analyzer tests ====================

    #[test]
    fn test_analyze_numeric_and_categorical() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = quiet_config(dir.path());
        let df = df![
            "income" => (1..=40).map(|i| i as f64 * 1000.0).collect::<Vec<_>>(),
            "region" => (0..40).map(|i| if i % 4 == 0 { "Rural" } else { "Urban" }).collect::<Vec<_>>(),
        ]
        .unwrap();
        let schema = DataProfiler::infer_schema(&df, None).unwrap();

        let report = DistributionAnalyzer::new(&config)
            .analyze(&df, &schema, false)
            .unwrap();

        let income = &report.numeric[0];
        assert_eq!(income.stats.count, 40);
        assert_eq!(income.normality.len(), 2);
        assert_eq!(income.skew_direction.as_deref(), Some("Symmetric"));
        assert!(income.charts.is_empty());

        let region = &report.categorical[0];
        assert_eq!(
            region.frequencies[0],
            CategoryFrequency {
                value: "Urban".to_string(),
                count: 30,
                percentage: 75.0
            }
        );
    }

    #[test]
    fn test_degenerate_columns_are_undefined() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = quiet_config(dir.path());
        let df = df![
            "flat" => [5.0, 5.0, 5.0, 5.0],
            "empty" => [None::<f64>, None, None, None],
        ]
        .unwrap();
        let schema = DataProfiler::infer_schema(&df, None).unwrap();

        let report = DistributionAnalyzer::new(&config)
            .analyze(&df, &schema, false)
            .unwrap();

        for col in &report.numeric {
            assert!(col.normality.is_empty());
            assert_eq!(col.distribution_type, None);
        }
        assert_eq!(report.numeric[1].stats.mean, Statistic::Undefined);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_run_writes_markdown() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = quiet_config(dir.path());
        let df = df!["income" => [1.0, 2.0, 3.5, 4.0, 8.0]].unwrap();
        let schema = DataProfiler::infer_schema(&df, None).unwrap();

        DistributionAnalyzer::new(&config).run(&df, &schema).unwrap();

        let content =
            std::fs::read_to_string(dir.path().join(DISTRIBUTION_REPORT_FILE)).unwrap();
        assert!(content.contains("income"));
    }
}
