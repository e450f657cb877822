//! Markdown rendering of the distribution and bias reports.

use std::fmt::Write;

use crate::bias::BiasReport;
use crate::distribution::{DistributionReport, NumericDistribution};

// `write!` into a String cannot fail; results are discarded with `let _`.

fn numeric_section(out: &mut String, col: &NumericDistribution) {
    let s = &col.stats;
    let _ = writeln!(out, "### {}\n", col.name);
    let _ = writeln!(
        out,
        "- **Distribution Type:** {}",
        col.distribution_type.as_deref().unwrap_or("undefined")
    );
    let _ = writeln!(out, "- **Count:** {}", s.count);
    let _ = writeln!(out, "- **Missing:** {:.2}%", col.missing_percentage);
    let _ = writeln!(out, "- **Mean:** {:.2}", s.mean);
    let _ = writeln!(out, "- **Median:** {:.2}", s.median);
    let _ = writeln!(out, "- **Std Dev:** {:.2}", s.std);
    let _ = writeln!(out, "- **Min / Max:** {:.2} / {:.2}", s.min, s.max);
    let _ = writeln!(
        out,
        "- **Skewness:** {:.3} ({})",
        s.skewness,
        col.skew_direction.as_deref().unwrap_or("undefined")
    );
    let _ = writeln!(out, "- **Excess Kurtosis:** {:.3}", s.kurtosis);
    if col.normality.is_empty() {
        let _ = writeln!(out, "- **Normality Tests:** undefined");
    }
    for test in &col.normality {
        let _ = writeln!(
            out,
            "- **{}:** statistic {:.4}, p-value {:.4} ({})",
            test.kind.display_name(),
            test.statistic,
            test.p_value,
            if test.is_normal { "normal" } else { "non-normal" }
        );
    }
    if let Some(normal) = col.is_normal() {
        let _ = writeln!(
            out,
            "- **Normal Distribution:** {}",
            if normal { "Yes" } else { "No" }
        );
    }
    let _ = writeln!(out);
    for chart in &col.charts {
        let _ = writeln!(out, "![{}]({})\n", col.name, chart);
    }
}

/// Content of `DISTRIBUTION_REPORT.md`.
pub fn distribution_report(report: &DistributionReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Distribution Analysis Report\n");
    let _ = writeln!(out, "- **Total Rows:** {}", report.rows);
    let _ = writeln!(out, "- **Numeric Columns:** {}", report.numeric.len());
    let _ = writeln!(out, "- **Categorical Columns:** {}", report.categorical.len());
    let _ = writeln!(
        out,
        "- **Significance Level:** {} (normal when p > alpha)\n",
        report.significance_level
    );

    let _ = writeln!(out, "## Numeric Columns\n");
    if report.numeric.is_empty() {
        let _ = writeln!(out, "No numeric columns found.\n");
    }
    for col in &report.numeric {
        numeric_section(&mut out, col);
    }

    let _ = writeln!(out, "## Categorical Columns\n");
    if report.categorical.is_empty() {
        let _ = writeln!(out, "No categorical columns found.\n");
    }
    for col in &report.categorical {
        let _ = writeln!(out, "### {}\n", col.name);
        let _ = writeln!(
            out,
            "{} categories, {} missing values.\n",
            col.frequencies.len(),
            col.missing_count
        );
        let _ = writeln!(out, "| Value | Count | Percentage |");
        let _ = writeln!(out, "|---|---:|---:|");
        for freq in &col.frequencies {
            let _ = writeln!(
                out,
                "| {} | {} | {:.2}% |",
                freq.value, freq.count, freq.percentage
            );
        }
        let _ = writeln!(out);
        if let Some(chart) = &col.chart {
            let _ = writeln!(out, "![{}]({})\n", col.name, chart);
        }
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "## Warnings\n");
        for warning in &report.warnings {
            let _ = writeln!(out, "- {}", warning);
        }
    }
    out
}

/// Content of `DISTRIBUTION_BIAS_ANALYSIS_REPORT.md`.
pub fn bias_report(report: &BiasReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Distribution and Bias Analysis Report\n");
    let _ = writeln!(out, "## Dataset Overview\n");
    let _ = writeln!(out, "- **Total Rows:** {}", report.rows);
    let _ = writeln!(out, "- **Total Columns:** {}", report.columns);
    let _ = writeln!(out, "- **Rows Analyzed:** {}", report.analyzed_rows);
    let _ = writeln!(out, "- **Analysis Date:** {}\n", report.generated_at);
    let _ = writeln!(out, "---\n");

    let balance = &report.class_balance;
    let _ = writeln!(out, "## Class Balance: {}\n", balance.target_column);
    for class in &balance.classes {
        let _ = writeln!(
            out,
            "- **{}:** {} ({:.2}%)",
            class.label, class.count, class.percentage
        );
    }
    match balance.imbalance_ratio {
        Some(ratio) => {
            let _ = writeln!(out, "\n**Imbalance Ratio:** {:.2}:1\n", ratio);
        }
        None => {
            let _ = writeln!(out, "\n**Imbalance Ratio:** undefined (fewer than two classes)\n");
        }
    }
    if balance.is_imbalanced {
        let _ = writeln!(
            out,
            "**Warning:** the dataset shows class imbalance. Consider oversampling the \
             minority class, undersampling the majority class or class weights.\n"
        );
    }
    if balance.missing_target > 0 {
        let _ = writeln!(
            out,
            "{} rows with a missing target were excluded.\n",
            balance.missing_target
        );
    }
    if let Some(chart) = &report.class_balance_chart {
        let _ = writeln!(out, "![Class Balance]({})\n", chart);
    }
    let _ = writeln!(out, "---\n");

    let _ = writeln!(out, "## Numerical Feature Distributions\n");
    if report.numeric_summary.is_empty() {
        let _ = writeln!(out, "No numeric features.\n");
    }
    for col in &report.numeric_summary {
        numeric_section(&mut out, col);
    }
    let _ = writeln!(out, "---\n");

    let _ = writeln!(out, "## Bias Analysis\n");
    let _ = writeln!(
        out,
        "Positive outcome: `{}`. Overall positive rate: {:.1}%.\n",
        report.positive_label,
        report.overall_rate * 100.0
    );
    let _ = writeln!(
        out,
        "A group is flagged when its positive rate differs from the overall rate by \
         more than {:.0} percentage points. This is a fixed-threshold heuristic \
         without correction for multiple comparisons; it is not a hypothesis test.\n",
        report.threshold * 100.0
    );
    let _ = writeln!(
        out,
        "| Feature | Group | Size | Positive | Group Rate | Overall Rate | Difference | Flagged |"
    );
    let _ = writeln!(out, "|---|---|---:|---:|---:|---:|---:|---|");
    for entry in report.features.iter().flat_map(|f| f.entries.iter()) {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {:.1}% | {:.1}% | {:.1} | {} |",
            entry.feature,
            entry.group,
            entry.group_size,
            entry.group_positive,
            entry.group_rate * 100.0,
            entry.overall_rate * 100.0,
            entry.difference * 100.0,
            if entry.flagged { "yes" } else { "no" }
        );
    }
    let _ = writeln!(out);

    for feature in &report.features {
        let _ = writeln!(out, "### {}\n", feature.feature);
        if feature.has_flagged_groups() {
            let groups: Vec<&str> = feature.flagged_entries().map(|e| e.group.as_str()).collect();
            let _ = writeln!(out, "**Flagged groups:** {}\n", groups.join(", "));
        } else {
            let _ = writeln!(out, "No group exceeds the threshold.\n");
        }
        let _ = writeln!(
            out,
            "Spread between highest and lowest group rate: {:.1} points{}.\n",
            feature.spread * 100.0,
            if feature.spread_exceeds_threshold { " (exceeds threshold)" } else { "" }
        );
        if let Some(chart) = &feature.chart {
            let _ = writeln!(out, "![Bias Analysis]({})\n", chart);
        }
    }

    if !report.warnings.is_empty() {
        let _ = writeln!(out, "## Warnings\n");
        for warning in &report.warnings {
            let _ = writeln!(out, "- {}", warning);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::{CategoricalDistribution, CategoryFrequency};
    use crate::profiler::DescriptiveStats;

    #[test]
    fn test_distribution_report_sections() {
        let report = DistributionReport {
            rows: 4,
            numeric: vec![NumericDistribution {
                name: "income".to_string(),
                missing_percentage: 0.0,
                stats: DescriptiveStats::from_values(&[1.0, 2.0, 3.0, 10.0]),
                normality: Vec::new(),
                distribution_type: Some("Right-skewed".to_string()),
                skew_direction: Some("Right-skewed".to_string()),
                charts: vec!["dist_income.png".to_string()],
            }],
            categorical: vec![CategoricalDistribution {
                name: "region".to_string(),
                missing_count: 1,
                frequencies: vec![CategoryFrequency {
                    value: "Urban".to_string(),
                    count: 3,
                    percentage: 100.0,
                }],
                chart: None,
            }],
            significance_level: 0.05,
            warnings: vec![],
        };

        let md = distribution_report(&report);
        assert!(md.starts_with("# Distribution Analysis Report"));
        assert!(md.contains("### income"));
        assert!(md.contains("![income](dist_income.png)"));
        assert!(md.contains("- **Normality Tests:** undefined"));
        assert!(md.contains("| Urban | 3 | 100.00% |"));
    }
}
