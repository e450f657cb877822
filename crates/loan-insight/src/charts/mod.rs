//! PNG chart rendering with `plotters`.
//!
//! Every chart is a fixed 1200x800 bitmap. Failures are returned as
//! [`AnalysisError::Chart`]; callers log them and carry on.

use plotters::prelude::*;
use std::fmt::Display;
use std::path::Path;

use crate::error::{AnalysisError, Result};
use crate::profiler::{BoxSummary, HistogramBin};
use crate::utils::truncate_str;

const CHART_SIZE: (u32, u32) = (1200, 800);

fn chart_error(path: &Path, err: impl Display) -> AnalysisError {
    AnalysisError::Chart {
        chart: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Span `[lo, hi]` widened when it collapses to a point.
fn padded_range(lo: f64, hi: f64) -> (f64, f64) {
    if (hi - lo).abs() < f64::EPSILON {
        let pad = lo.abs().max(1.0) * 0.5;
        (lo - pad, hi + pad)
    } else {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    }
}

/// Histogram scaled to a density, with the kernel density estimate on top.
pub fn histogram_with_density(
    path: &Path,
    column: &str,
    bins: &[HistogramBin],
    density: &[(f64, f64)],
) -> Result<()> {
    if bins.is_empty() {
        return Err(chart_error(path, "no values to plot"));
    }
    let total: usize = bins.iter().map(|b| b.count).sum();
    let bars: Vec<(f64, f64, f64)> = bins
        .iter()
        .map(|b| {
            let width = (b.end - b.start).max(f64::EPSILON);
            (b.start, b.end, b.count as f64 / (total as f64 * width))
        })
        .collect();

    let x_lo = bars
        .iter()
        .map(|b| b.0)
        .chain(density.iter().map(|p| p.0))
        .fold(f64::INFINITY, f64::min);
    let x_hi = bars
        .iter()
        .map(|b| b.1)
        .chain(density.iter().map(|p| p.0))
        .fold(f64::NEG_INFINITY, f64::max);
    let y_hi = bars
        .iter()
        .map(|b| b.2)
        .chain(density.iter().map(|p| p.1))
        .fold(0.0, f64::max);
    let (x_lo, x_hi) = padded_range(x_lo, x_hi);
    let y_hi = if y_hi > 0.0 { y_hi * 1.1 } else { 1.0 };

    let area = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    area.fill(&WHITE).map_err(|e| chart_error(path, e))?;

    let mut chart = ChartBuilder::on(&area)
        .caption(format!("Distribution of {}", column), ("sans-serif", 40))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(85)
        .build_cartesian_2d(x_lo..x_hi, 0.0..y_hi)
        .map_err(|e| chart_error(path, e))?;

    chart
        .configure_mesh()
        .x_desc(column)
        .y_desc("Density")
        .label_style(("sans-serif", 20))
        .draw()
        .map_err(|e| chart_error(path, e))?;

    chart
        .draw_series(bars.iter().map(|(start, end, height)| {
            Rectangle::new([(*start, 0.0), (*end, *height)], BLUE.mix(0.5).filled())
        }))
        .map_err(|e| chart_error(path, e))?;

    if !density.is_empty() {
        chart
            .draw_series(LineSeries::new(
                density.iter().copied(),
                RED.stroke_width(3),
            ))
            .map_err(|e| chart_error(path, e))?;
    }

    area.present().map_err(|e| chart_error(path, e))?;
    Ok(())
}

/// Sample quantiles against theoretical normal quantiles, with the
/// `mean + std * z` reference line.
pub fn qq_plot(
    path: &Path,
    column: &str,
    points: &[(f64, f64)],
    mean: f64,
    std: f64,
) -> Result<()> {
    if points.is_empty() {
        return Err(chart_error(path, "no values to plot"));
    }
    let z_lo = points.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let z_hi = points.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
    let line = [(z_lo, mean + std * z_lo), (z_hi, mean + std * z_hi)];
    let y_lo = points
        .iter()
        .map(|p| p.1)
        .chain(line.iter().map(|p| p.1))
        .fold(f64::INFINITY, f64::min);
    let y_hi = points
        .iter()
        .map(|p| p.1)
        .chain(line.iter().map(|p| p.1))
        .fold(f64::NEG_INFINITY, f64::max);
    let (z_lo, z_hi) = padded_range(z_lo, z_hi);
    let (y_lo, y_hi) = padded_range(y_lo, y_hi);

    let area = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    area.fill(&WHITE).map_err(|e| chart_error(path, e))?;

    let mut chart = ChartBuilder::on(&area)
        .caption(format!("Q-Q Plot of {}", column), ("sans-serif", 40))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(85)
        .build_cartesian_2d(z_lo..z_hi, y_lo..y_hi)
        .map_err(|e| chart_error(path, e))?;

    chart
        .configure_mesh()
        .x_desc("Theoretical Quantiles")
        .y_desc("Sample Quantiles")
        .label_style(("sans-serif", 20))
        .draw()
        .map_err(|e| chart_error(path, e))?;

    chart
        .draw_series(
            points
                .iter()
                .map(|(x, y)| Circle::new((*x, *y), 3, BLUE.filled())),
        )
        .map_err(|e| chart_error(path, e))?;
    chart
        .draw_series(LineSeries::new(line, RED.stroke_width(2)))
        .map_err(|e| chart_error(path, e))?;

    area.present().map_err(|e| chart_error(path, e))?;
    Ok(())
}

/// Horizontal Tukey box plot of one column.
pub fn box_plot(path: &Path, column: &str, summary: &BoxSummary) -> Result<()> {
    let x_lo = summary
        .outliers
        .iter()
        .copied()
        .fold(summary.whisker_low, f64::min);
    let x_hi = summary
        .outliers
        .iter()
        .copied()
        .fold(summary.whisker_high, f64::max);
    let (x_lo, x_hi) = padded_range(x_lo, x_hi);

    let area = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    area.fill(&WHITE).map_err(|e| chart_error(path, e))?;

    let mut chart = ChartBuilder::on(&area)
        .caption(format!("Box Plot of {}", column), ("sans-serif", 40))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(20)
        .build_cartesian_2d(x_lo..x_hi, 0.0..1.0)
        .map_err(|e| chart_error(path, e))?;

    chart
        .configure_mesh()
        .disable_y_mesh()
        .y_labels(0)
        .x_desc(column)
        .label_style(("sans-serif", 20))
        .draw()
        .map_err(|e| chart_error(path, e))?;

    let (lo, mid, hi) = (0.3, 0.5, 0.7);
    chart
        .draw_series(std::iter::once(Rectangle::new(
            [(summary.q1, lo), (summary.q3, hi)],
            BLUE.mix(0.4).filled(),
        )))
        .map_err(|e| chart_error(path, e))?;

    let segments = [
        vec![(summary.median, lo), (summary.median, hi)],
        vec![(summary.whisker_low, mid), (summary.q1, mid)],
        vec![(summary.q3, mid), (summary.whisker_high, mid)],
        vec![(summary.whisker_low, 0.4), (summary.whisker_low, 0.6)],
        vec![(summary.whisker_high, 0.4), (summary.whisker_high, 0.6)],
    ];
    chart
        .draw_series(
            segments
                .into_iter()
                .map(|points| PathElement::new(points, BLACK.stroke_width(2))),
        )
        .map_err(|e| chart_error(path, e))?;

    chart
        .draw_series(
            summary
                .outliers
                .iter()
                .map(|x| Circle::new((*x, mid), 4, RED.filled())),
        )
        .map_err(|e| chart_error(path, e))?;

    area.present().map_err(|e| chart_error(path, e))?;
    Ok(())
}

/// Text of a bar chart.
pub struct BarChartLabels<'a> {
    pub title: &'a str,
    pub x_desc: &'a str,
    pub y_desc: &'a str,
}

/// Vertical bar chart over named categories.
///
/// `reference` draws a horizontal line (e.g. the overall approval rate).
pub fn bar_chart(
    path: &Path,
    text: &BarChartLabels<'_>,
    categories: &[String],
    values: &[f64],
    reference: Option<f64>,
) -> Result<()> {
    if categories.is_empty() || categories.len() != values.len() {
        return Err(chart_error(path, "categories and values must be non-empty and aligned"));
    }
    let n = categories.len();
    let y_hi = values
        .iter()
        .copied()
        .chain(reference)
        .fold(0.0, f64::max);
    let y_hi = if y_hi > 0.0 { y_hi * 1.15 } else { 1.0 };
    let labels: Vec<String> = categories.iter().map(|c| truncate_str(c, 14)).collect();

    let area = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    area.fill(&WHITE).map_err(|e| chart_error(path, e))?;

    let mut chart = ChartBuilder::on(&area)
        .caption(text.title, ("sans-serif", 40))
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(85)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0.0..y_hi)
        .map_err(|e| chart_error(path, e))?;

    let label_for = |x: &f64| {
        let idx = x.round();
        if (x - idx).abs() < 1e-6 && idx >= 0.0 && (idx as usize) < n {
            labels[idx as usize].clone()
        } else {
            String::new()
        }
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&label_for)
        .x_desc(text.x_desc)
        .y_desc(text.y_desc)
        .label_style(("sans-serif", 20))
        .draw()
        .map_err(|e| chart_error(path, e))?;

    chart
        .draw_series(values.iter().enumerate().map(|(i, v)| {
            let x = i as f64;
            Rectangle::new([(x - 0.4, 0.0), (x + 0.4, *v)], BLUE.mix(0.7).filled())
        }))
        .map_err(|e| chart_error(path, e))?;

    if let Some(level) = reference {
        chart
            .draw_series(LineSeries::new(
                [(-0.5, level), (n as f64 - 0.5, level)],
                RED.stroke_width(2),
            ))
            .map_err(|e| chart_error(path, e))?;
    }

    area.present().map_err(|e| chart_error(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_padded_range() {
        let (lo, hi) = padded_range(0.0, 10.0);
        assert!((lo + 0.5).abs() < 1e-12 && (hi - 10.5).abs() < 1e-12);
        let (lo, hi) = padded_range(4.0, 4.0);
        assert!(lo < 4.0 && hi > 4.0);
    }

    #[test]
    fn test_bar_chart_rejects_misaligned_input() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.png");
        let text = BarChartLabels {
            title: "t",
            x_desc: "x",
            y_desc: "y",
        };
        let err = bar_chart(&path, &text, &["a".to_string()], &[], None).unwrap_err();
        assert_eq!(err.error_code(), "CHART_ERROR");
        assert!(!path.exists());
    }

    #[test]
    fn test_histogram_rejects_empty_bins() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("empty.png");
        assert!(histogram_with_density(&path, "income", &[], &[]).is_err());
    }
}
