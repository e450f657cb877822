//! Class balance and group-wise approval-rate disparity.
//!
//! The disparity check is a fixed-threshold heuristic: a group is flagged
//! when its positive rate differs from the overall rate by more than
//! `bias_threshold`. No hypothesis test or multiple-comparison correction is
//! applied.

use chrono::Local;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::charts::{self, BarChartLabels};
use crate::config::AnalysisConfig;
use crate::distribution::{DistributionAnalyzer, NumericDistribution};
use crate::error::{AnalysisError, Result};
use crate::reporting::{ReportWriter, markdown};
use crate::types::DatasetSchema;
use crate::utils::{is_numeric_dtype, optional_string_values, safe_file_stem};

/// Name of the markdown report written by [`BiasAnalyzer::run`].
pub const BIAS_REPORT_FILE: &str = "DISTRIBUTION_BIAS_ANALYSIS_REPORT.md";
pub const CLASS_BALANCE_CHART: &str = "01_class_balance.png";

/// Group label for rows whose feature value is missing.
pub const MISSING_GROUP: &str = "<missing>";

/// Majority/minority ratio above which the target counts as imbalanced.
pub const IMBALANCE_RATIO_LIMIT: f64 = 1.5;

/// Groups drawn in a bias chart.
const MAX_CHART_GROUPS: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassCount {
    pub label: String,
    pub count: usize,
    pub percentage: f64,
}

/// Target-class counts and imbalance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassBalance {
    pub target_column: String,
    /// Classes, most frequent first.
    pub classes: Vec<ClassCount>,
    /// Majority count / minority count; `None` with fewer than two classes.
    pub imbalance_ratio: Option<f64>,
    pub is_imbalanced: bool,
    /// Rows excluded because the target is missing.
    pub missing_target: usize,
}

impl ClassBalance {
    /// Balance of a target column given its values (missing as `None`).
    pub fn from_values(target_column: &str, values: &[Option<String>]) -> Self {
        let mut order: Vec<String> = Vec::new();
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut missing_target = 0;
        for value in values {
            match value {
                Some(v) => {
                    let count = counts.entry(v.as_str()).or_insert(0);
                    if *count == 0 {
                        order.push(v.clone());
                    }
                    *count += 1;
                }
                None => missing_target += 1,
            }
        }

        let total: usize = counts.values().sum();
        let mut classes: Vec<ClassCount> = order
            .into_iter()
            .map(|label| {
                let count = counts.get(label.as_str()).copied().unwrap_or(0);
                ClassCount {
                    percentage: count as f64 / total as f64 * 100.0,
                    label,
                    count,
                }
            })
            .collect();
        classes.sort_by(|a, b| b.count.cmp(&a.count));

        let imbalance_ratio = match (classes.first(), classes.last()) {
            (Some(major), Some(minor)) if classes.len() >= 2 => {
                Some(major.count as f64 / minor.count as f64)
            }
            _ => None,
        };

        Self {
            target_column: target_column.to_string(),
            is_imbalanced: imbalance_ratio.is_some_and(|r| r > IMBALANCE_RATIO_LIMIT),
            classes,
            imbalance_ratio,
            missing_target,
        }
    }

    pub fn count_of(&self, label: &str) -> usize {
        self.classes
            .iter()
            .find(|c| c.label == label)
            .map_or(0, |c| c.count)
    }
}

/// Positive rate of one group of one feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiasEntry {
    pub feature: String,
    pub group: String,
    pub group_size: usize,
    pub group_positive: usize,
    pub group_rate: f64,
    pub overall_rate: f64,
    /// `|group_rate - overall_rate|`.
    pub difference: f64,
    /// `difference > threshold` (strict).
    pub flagged: bool,
}

impl BiasEntry {
    pub fn new(
        feature: &str,
        group: &str,
        group_size: usize,
        group_positive: usize,
        overall_rate: f64,
        threshold: f64,
    ) -> Self {
        let group_rate = if group_size > 0 {
            group_positive as f64 / group_size as f64
        } else {
            0.0
        };
        let difference = (group_rate - overall_rate).abs();
        Self {
            feature: feature.to_string(),
            group: group.to_string(),
            group_size,
            group_positive,
            group_rate,
            overall_rate,
            difference,
            flagged: difference > threshold,
        }
    }
}

/// All groups of one feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureBias {
    pub feature: String,
    /// Groups by descending size; the missing group, if any, comes last.
    pub entries: Vec<BiasEntry>,
    /// Highest minus lowest group rate.
    pub spread: f64,
    pub spread_exceeds_threshold: bool,
    pub chart: Option<String>,
}

impl FeatureBias {
    pub fn has_flagged_groups(&self) -> bool {
        self.entries.iter().any(|e| e.flagged)
    }

    pub fn flagged_entries(&self) -> impl Iterator<Item = &BiasEntry> {
        self.entries.iter().filter(|e| e.flagged)
    }
}

/// Result of [`BiasAnalyzer::run`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiasReport {
    pub generated_at: String,
    pub rows: usize,
    pub columns: usize,
    /// Rows with a non-missing target.
    pub analyzed_rows: usize,
    pub target_column: String,
    pub positive_label: String,
    pub threshold: f64,
    pub overall_rate: f64,
    pub class_balance: ClassBalance,
    pub class_balance_chart: Option<String>,
    pub features: Vec<FeatureBias>,
    pub numeric_summary: Vec<NumericDistribution>,
    pub warnings: Vec<String>,
}

impl BiasReport {
    pub fn flagged_entries(&self) -> Vec<&BiasEntry> {
        self.features.iter().flat_map(|f| f.flagged_entries()).collect()
    }

    /// Console rendering.
    ///
    /// Note: This function uses `println!` intentionally for user-facing CLI output.
    pub fn print(&self) {
        println!("\n{}", "=".repeat(80));
        println!("CLASS BALANCE & BIAS ANALYSIS");
        println!("{}\n", "=".repeat(80));

        println!("CLASS BALANCE ({})", self.target_column);
        println!("{}", "-".repeat(40));
        for class in &self.class_balance.classes {
            println!(
                "  {:<24} {:>7} ({:.2}%)",
                class.label, class.count, class.percentage
            );
        }
        match self.class_balance.imbalance_ratio {
            Some(ratio) => println!("  Imbalance ratio: {:.2}:1", ratio),
            None => println!("  Imbalance ratio: undefined (fewer than two classes)"),
        }
        if self.class_balance.is_imbalanced {
            println!("  WARNING: dataset shows class imbalance");
        }
        if self.class_balance.missing_target > 0 {
            println!(
                "  {} rows with a missing target were excluded",
                self.class_balance.missing_target
            );
        }
        println!();

        println!(
            "GROUP APPROVAL RATES (positive = '{}', overall {:.1}%, threshold {:.0} points)",
            self.positive_label,
            self.overall_rate * 100.0,
            self.threshold * 100.0
        );
        println!("{}", "-".repeat(40));
        for feature in &self.features {
            println!(
                "  {} (spread {:.1} points{})",
                feature.feature,
                feature.spread * 100.0,
                if feature.spread_exceeds_threshold { ", exceeds threshold" } else { "" }
            );
            for entry in &feature.entries {
                println!(
                    "    {:<24} n={:<6} rate {:>6.1}%  diff {:>5.1}{}",
                    entry.group,
                    entry.group_size,
                    entry.group_rate * 100.0,
                    entry.difference * 100.0,
                    if entry.flagged { "  FLAGGED" } else { "" }
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

/// Group-wise approval-rate comparison driven by an [`AnalysisConfig`].
pub struct BiasAnalyzer<'a> {
    config: &'a AnalysisConfig,
}

impl<'a> BiasAnalyzer<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Analyze, render charts and write the markdown report.
    pub fn run(&self, df: &DataFrame, schema: &DatasetSchema) -> Result<BiasReport> {
        let report = self.analyze(df, schema, self.config.render_charts)?;
        ReportWriter::new(&self.config.output_dir)
            .write_text(BIAS_REPORT_FILE, &markdown::bias_report(&report))?;
        Ok(report)
    }

    pub fn analyze(
        &self,
        df: &DataFrame,
        schema: &DatasetSchema,
        render_charts: bool,
    ) -> Result<BiasReport> {
        let target = self.config.target_column.as_str();
        let target_col = df.column(target).map_err(|_| {
            AnalysisError::SchemaMismatch(format!(
                "target column '{}' not found; available columns: {:?}",
                target,
                df.get_column_names()
            ))
        })?;
        let target_series = target_col.as_materialized_series();
        let target_values = optional_string_values(target_series)?;
        let mut warnings = Vec::new();

        let class_balance = ClassBalance::from_values(target, &target_values);
        if class_balance.missing_target > 0 {
            let note = format!(
                "{} rows with a missing '{}' were excluded from the analysis",
                class_balance.missing_target, target
            );
            warn!("{}", note);
            warnings.push(note);
        }

        let positive_label =
            resolve_positive_label(&self.config.positive_label, target_series, &class_balance);
        if positive_label != self.config.positive_label {
            let note = format!(
                "positive label '{}' not present in '{}'; using '{}'",
                self.config.positive_label, target, positive_label
            );
            warn!("{}", note);
            warnings.push(note);
        }

        let analyzed_rows = target_values.len() - class_balance.missing_target;
        let positives = class_balance.count_of(&positive_label);
        let overall_rate = if analyzed_rows > 0 {
            positives as f64 / analyzed_rows as f64
        } else {
            0.0
        };
        info!(
            "Overall '{}' rate: {:.1}% over {} rows",
            positive_label,
            overall_rate * 100.0,
            analyzed_rows
        );

        let outcomes: Vec<Option<bool>> = target_values
            .iter()
            .map(|v| v.as_ref().map(|v| *v == positive_label))
            .collect();

        let chart_dir = render_charts.then_some(self.config.output_dir.as_path());
        if let Some(dir) = chart_dir {
            std::fs::create_dir_all(dir)?;
        }

        let mut features = Vec::new();
        for feature in self.designated_features(schema) {
            let Ok(col) = df.column(&feature) else {
                let note = format!("bias feature '{}' not found; skipped", feature);
                warn!("{}", note);
                warnings.push(note);
                continue;
            };
            let values = optional_string_values(col.as_materialized_series())?;
            let mut bias = feature_bias(
                &feature,
                &values,
                &outcomes,
                overall_rate,
                self.config.bias_threshold,
            );
            debug!(
                "Feature '{}': {} groups, spread {:.3}",
                feature,
                bias.entries.len(),
                bias.spread
            );

            if let Some(dir) = chart_dir
                && (self.config.chart_all_features || bias.has_flagged_groups())
            {
                let file = format!("bias_{}.png", safe_file_stem(&feature));
                match render_bias_chart(&dir.join(&file), &bias) {
                    Ok(()) => bias.chart = Some(file),
                    Err(e) => {
                        warn!("{}", e);
                        warnings.push(e.to_string());
                    }
                }
            }
            features.push(bias);
        }

        let class_balance_chart = match chart_dir {
            Some(dir) if !class_balance.classes.is_empty() => {
                match render_class_balance_chart(&dir.join(CLASS_BALANCE_CHART), &class_balance) {
                    Ok(()) => Some(CLASS_BALANCE_CHART.to_string()),
                    Err(e) => {
                        warn!("{}", e);
                        warnings.push(e.to_string());
                        None
                    }
                }
            }
            _ => None,
        };

        // numeric summary for the report; charts belong to `distributions`
        let distribution = DistributionAnalyzer::new(self.config);
        let mut numeric_summary = Vec::new();
        for name in schema.numeric_columns() {
            if name == target || df.column(&name).is_err() {
                continue;
            }
            numeric_summary.push(distribution.analyze_numeric(df, &name, None, &mut warnings)?);
        }

        Ok(BiasReport {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            rows: df.height(),
            columns: df.width(),
            analyzed_rows,
            target_column: target.to_string(),
            positive_label,
            threshold: self.config.bias_threshold,
            overall_rate,
            class_balance,
            class_balance_chart,
            features,
            numeric_summary,
            warnings,
        })
    }

    /// Configured features, or every categorical column except the target.
    fn designated_features(&self, schema: &DatasetSchema) -> Vec<String> {
        match &self.config.bias_features {
            Some(features) => features.clone(),
            None => schema
                .categorical_columns()
                .into_iter()
                .filter(|c| *c != self.config.target_column)
                .collect(),
        }
    }
}

/// The configured label when present, `"1"` for a numeric target, else the
/// lexicographically first class.
fn resolve_positive_label(configured: &str, target: &Series, balance: &ClassBalance) -> String {
    if balance.classes.is_empty() || balance.count_of(configured) > 0 {
        return configured.to_string();
    }
    if is_numeric_dtype(target.dtype()) && balance.count_of("1") > 0 {
        return "1".to_string();
    }
    balance
        .classes
        .iter()
        .map(|c| c.label.as_str())
        .min()
        .unwrap_or(configured)
        .to_string()
}

/// Group rates of one feature. Rows whose outcome is `None` are excluded.
pub fn feature_bias(
    feature: &str,
    values: &[Option<String>],
    outcomes: &[Option<bool>],
    overall_rate: f64,
    threshold: f64,
) -> FeatureBias {
    let mut order: Vec<String> = Vec::new();
    let mut tallies: HashMap<String, (usize, usize)> = HashMap::new();
    let mut missing = (0usize, 0usize);

    for (value, outcome) in values.iter().zip(outcomes) {
        let Some(positive) = outcome else { continue };
        let tally = match value {
            Some(v) => {
                if !tallies.contains_key(v) {
                    order.push(v.clone());
                }
                tallies.entry(v.clone()).or_insert((0, 0))
            }
            None => &mut missing,
        };
        tally.0 += 1;
        if *positive {
            tally.1 += 1;
        }
    }

    let mut entries: Vec<BiasEntry> = order
        .iter()
        .map(|group| {
            let (size, pos) = tallies.get(group).copied().unwrap_or((0, 0));
            BiasEntry::new(feature, group, size, pos, overall_rate, threshold)
        })
        .collect();
    entries.sort_by(|a, b| b.group_size.cmp(&a.group_size));
    if missing.0 > 0 {
        entries.push(BiasEntry::new(
            feature,
            MISSING_GROUP,
            missing.0,
            missing.1,
            overall_rate,
            threshold,
        ));
    }

    let max = entries.iter().map(|e| e.group_rate).fold(f64::NAN, f64::max);
    let min = entries.iter().map(|e| e.group_rate).fold(f64::NAN, f64::min);
    let spread = if entries.is_empty() { 0.0 } else { max - min };

    FeatureBias {
        feature: feature.to_string(),
        entries,
        spread,
        spread_exceeds_threshold: spread > threshold,
        chart: None,
    }
}

fn render_class_balance_chart(path: &std::path::Path, balance: &ClassBalance) -> Result<()> {
    let title = format!("Class Distribution: {}", balance.target_column);
    let labels = BarChartLabels {
        title: &title,
        x_desc: "Class",
        y_desc: "Count",
    };
    let categories: Vec<String> = balance.classes.iter().map(|c| c.label.clone()).collect();
    let counts: Vec<f64> = balance.classes.iter().map(|c| c.count as f64).collect();
    charts::bar_chart(path, &labels, &categories, &counts, None)
}

fn render_bias_chart(path: &std::path::Path, bias: &FeatureBias) -> Result<()> {
    let title = format!("Approval Rate by {}", bias.feature);
    let labels = BarChartLabels {
        title: &title,
        x_desc: &bias.feature,
        y_desc: "Approval Rate (%)",
    };
    let shown: Vec<&BiasEntry> = bias.entries.iter().take(MAX_CHART_GROUPS).collect();
    let categories: Vec<String> = shown.iter().map(|e| e.group.clone()).collect();
    let rates: Vec<f64> = shown.iter().map(|e| e.group_rate * 100.0).collect();
    let overall = bias.entries.first().map(|e| e.overall_rate * 100.0);
    charts::bar_chart(path, &labels, &categories, &rates, overall)
}
