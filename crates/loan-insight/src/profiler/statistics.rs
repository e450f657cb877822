//! Descriptive statistics over plain `f64` slices.
//!
//! Every function ignores ordering of its input unless its name says
//! `sorted`, and returns `None` where the statistic is undefined.

use crate::types::Statistic;
use serde::{Deserialize, Serialize};

/// Summary statistics of a numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStats {
    /// Number of non-null values.
    pub count: usize,
    pub mean: Statistic,
    /// Sample standard deviation (ddof = 1).
    pub std: Statistic,
    pub min: Statistic,
    pub q1: Statistic,
    pub median: Statistic,
    pub q3: Statistic,
    pub max: Statistic,
    /// Fisher-Pearson coefficient of skewness (biased).
    pub skewness: Statistic,
    /// Excess kurtosis (biased, normal = 0).
    pub kurtosis: Statistic,
}

impl DescriptiveStats {
    /// Compute all statistics for `values` (nulls already removed).
    pub fn from_values(values: &[f64]) -> Self {
        let sorted = sorted_copy(values);
        Self {
            count: values.len(),
            mean: mean(values).into(),
            std: sample_std(values).into(),
            min: sorted.first().copied().into(),
            q1: quantile_sorted(&sorted, 0.25).into(),
            median: quantile_sorted(&sorted, 0.5).into(),
            q3: quantile_sorted(&sorted, 0.75).into(),
            max: sorted.last().copied().into(),
            skewness: skewness(values).into(),
            kurtosis: excess_kurtosis(values).into(),
        }
    }

    /// Whether the column carries no spread (empty, single value or constant).
    pub fn is_degenerate(&self) -> bool {
        match self.std.value() {
            Some(std) => std <= f64::EPSILON,
            None => true,
        }
    }
}

/// A single histogram bin `[start, end)` (the last bin is closed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub start: f64,
    pub end: f64,
    pub count: usize,
}

/// Copy and sort `values` ascending. NaNs are not expected.
pub fn sorted_copy(values: &[f64]) -> Vec<f64> {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted
}

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (ddof = 1). Undefined below two values.
pub fn sample_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mean = mean(values)?;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n as f64 - 1.0);
    Some(variance.sqrt())
}

/// Central moments m2, m3, m4 (population, divided by n).
fn central_moments(values: &[f64]) -> Option<(f64, f64, f64)> {
    let n = values.len() as f64;
    let mean = mean(values)?;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - mean;
        let d2 = d * d;
        m2 += d2;
        m3 += d2 * d;
        m4 += d2 * d2;
    }
    Some((m2 / n, m3 / n, m4 / n))
}

/// Biased Fisher-Pearson skewness `m3 / m2^1.5`.
///
/// Undefined for fewer than three values or zero variance.
pub fn skewness(values: &[f64]) -> Option<f64> {
    if values.len() < 3 {
        return None;
    }
    let (m2, m3, _) = central_moments(values)?;
    if m2 <= f64::EPSILON * f64::EPSILON {
        return None;
    }
    Some(m3 / m2.powf(1.5))
}

/// Biased excess kurtosis `m4 / m2^2 - 3`.
///
/// Undefined for fewer than three values or zero variance.
pub fn excess_kurtosis(values: &[f64]) -> Option<f64> {
    if values.len() < 3 {
        return None;
    }
    let (m2, _, m4) = central_moments(values)?;
    if m2 <= f64::EPSILON * f64::EPSILON {
        return None;
    }
    Some(m4 / (m2 * m2) - 3.0)
}

/// Quantile with linear interpolation between the closest ranks.
pub fn quantile_sorted(sorted: &[f64], quantile: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = quantile.clamp(0.0, 1.0) * (sorted.len() as f64 - 1.0);
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return Some(sorted[lower]);
    }
    let weight = pos - lower as f64;
    Some(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}

/// IQR fences `[Q1 - k*IQR, Q3 + k*IQR]` of already sorted values.
pub fn iqr_fences(sorted: &[f64], multiplier: f64) -> Option<(f64, f64)> {
    let q1 = quantile_sorted(sorted, 0.25)?;
    let q3 = quantile_sorted(sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - multiplier * iqr, q3 + multiplier * iqr))
}

/// Tukey box-plot geometry: quartiles, whiskers at the most extreme values
/// inside the 1.5 IQR fences, and the points beyond them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxSummary {
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub whisker_low: f64,
    pub whisker_high: f64,
    pub outliers: Vec<f64>,
}

pub fn box_summary(sorted: &[f64]) -> Option<BoxSummary> {
    let (lower, upper) = iqr_fences(sorted, 1.5)?;
    let inside = || sorted.iter().copied().filter(move |v| *v >= lower && *v <= upper);
    Some(BoxSummary {
        q1: quantile_sorted(sorted, 0.25)?,
        median: quantile_sorted(sorted, 0.5)?,
        q3: quantile_sorted(sorted, 0.75)?,
        whisker_low: inside().next()?,
        whisker_high: inside().last()?,
        outliers: sorted
            .iter()
            .copied()
            .filter(|v| *v < lower || *v > upper)
            .collect(),
    })
}

/// Equal-width histogram over sorted values.
pub fn build_histogram(sorted: &[f64], bins: usize) -> Vec<HistogramBin> {
    if sorted.is_empty() || bins == 0 {
        return Vec::new();
    }

    let min = sorted.first().copied().unwrap_or(0.0);
    let max = sorted.last().copied().unwrap_or(min);
    if (max - min).abs() < f64::EPSILON {
        return vec![HistogramBin {
            start: min,
            end: max,
            count: sorted.len(),
        }];
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];

    for value in sorted {
        let mut index = ((value - min) / width) as usize;
        if index >= bins {
            index = bins - 1;
        }
        counts[index] += 1;
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| HistogramBin {
            start: min + idx as f64 * width,
            end: min + (idx as f64 + 1.0) * width,
            count,
        })
        .collect()
}

/// Gaussian kernel density estimate evaluated on `points` evenly spaced
/// positions spanning the data range padded by three bandwidths.
///
/// Bandwidth follows Scott's rule `h = std * n^(-1/5)`.
pub fn gaussian_kde(values: &[f64], points: usize) -> Vec<(f64, f64)> {
    let Some(std) = sample_std(values) else {
        return Vec::new();
    };
    if std <= f64::EPSILON || points < 2 {
        return Vec::new();
    }

    let n = values.len() as f64;
    let bandwidth = std * n.powf(-0.2);
    let sorted = sorted_copy(values);
    let lo = sorted[0] - 3.0 * bandwidth;
    let hi = sorted[sorted.len() - 1] + 3.0 * bandwidth;
    let step = (hi - lo) / (points - 1) as f64;
    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());

    (0..points)
        .map(|i| {
            let x = lo + i as f64 * step;
            let density = values
                .iter()
                .map(|v| {
                    let z = (x - v) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                * norm;
            (x, density)
        })
        .collect()
}
