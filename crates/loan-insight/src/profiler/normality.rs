//! Normality tests: Shapiro-Wilk (Royston's approximation) and the
//! D'Agostino-Pearson K² omnibus test.
//!
//! Both are built on the normal and chi-squared distributions from `statrs`.

use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use super::statistics::{mean, sorted_copy};

/// Shapiro-Wilk is defined for 3..=5000 observations.
pub const SHAPIRO_MIN_N: usize = 3;
pub const SHAPIRO_MAX_N: usize = 5000;

/// D'Agostino-Pearson needs enough data for its kurtosis component.
pub const DAGOSTINO_MIN_N: usize = 20;

/// Which test produced a [`NormalityTest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalityTestKind {
    ShapiroWilk,
    DAgostinoPearson,
}

impl NormalityTestKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ShapiroWilk => "Shapiro-Wilk",
            Self::DAgostinoPearson => "D'Agostino-Pearson",
        }
    }
}

/// Outcome of a normality test at significance level `alpha`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    pub kind: NormalityTestKind,
    pub statistic: f64,
    pub p_value: f64,
    /// `p_value > alpha`: normality is not rejected.
    pub is_normal: bool,
}

impl NormalityTest {
    fn decide(kind: NormalityTestKind, statistic: f64, p_value: f64, alpha: f64) -> Self {
        Self {
            kind,
            statistic,
            p_value,
            is_normal: p_value > alpha,
        }
    }
}

fn standard_normal() -> Option<Normal> {
    Normal::new(0.0, 1.0).ok()
}

/// Evaluate `c[0] + c[1] x + c[2] x^2 + ...`.
fn poly(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Shapiro-Wilk W statistic and p-value (Royston 1992/1995).
///
/// Returns `None` outside 3..=5000 observations or for zero range.
pub fn shapiro_wilk(values: &[f64], alpha: f64) -> Option<NormalityTest> {
    let n = values.len();
    if !(SHAPIRO_MIN_N..=SHAPIRO_MAX_N).contains(&n) {
        return None;
    }
    let x = sorted_copy(values);
    let range = x[n - 1] - x[0];
    if range <= f64::EPSILON * x[n - 1].abs().max(1.0) {
        return None;
    }

    let normal = standard_normal()?;
    let half = n / 2;
    let an = n as f64;

    // Coefficients for the upper half, largest first; a[i] weights x[n-1-i] - x[i].
    let mut a = vec![0.0; half];
    if n == 3 {
        a[0] = std::f64::consts::FRAC_1_SQRT_2;
    } else {
        let m: Vec<f64> = (0..half)
            .map(|i| normal.inverse_cdf((an - i as f64 - 0.375) / (an + 0.25)))
            .collect();
        let summ2 = 2.0 * m.iter().map(|v| v * v).sum::<f64>();
        let ssumm2 = summ2.sqrt();
        let rsn = 1.0 / an.sqrt();

        const C1: [f64; 6] = [0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056];
        const C2: [f64; 6] = [0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633];

        let a1 = m[0] / ssumm2 + poly(&C1, rsn);
        let (first, fac) = if n > 5 {
            let a2 = m[1] / ssumm2 + poly(&C2, rsn);
            let fac = ((summ2 - 2.0 * m[0] * m[0] - 2.0 * m[1] * m[1])
                / (1.0 - 2.0 * a1 * a1 - 2.0 * a2 * a2))
                .sqrt();
            a[1] = a2;
            (2, fac)
        } else {
            let fac = ((summ2 - 2.0 * m[0] * m[0]) / (1.0 - 2.0 * a1 * a1)).sqrt();
            (1, fac)
        };
        a[0] = a1;
        for i in first..half {
            a[i] = m[i] / fac;
        }
    }

    let mu = mean(&x)?;
    let ss: f64 = x.iter().map(|v| (v - mu).powi(2)).sum();
    let b: f64 = (0..half).map(|i| a[i] * (x[n - 1 - i] - x[i])).sum();
    let w = (b * b / ss).clamp(0.0, 1.0);

    let p_value = if n == 3 {
        const PI6: f64 = 6.0 / std::f64::consts::PI;
        const STQR: f64 = std::f64::consts::PI / 3.0;
        (PI6 * (w.sqrt().asin() - STQR)).max(0.0)
    } else {
        let w1 = (1.0 - w).ln();
        let (y, m, s) = if n <= 11 {
            const G: [f64; 2] = [-2.273, 0.459];
            const C3: [f64; 4] = [0.544, -0.39978, 0.025054, -6.714e-4];
            const C4: [f64; 4] = [1.3822, -0.77857, 0.062767, -0.0020322];
            let gamma = poly(&G, an);
            if w1 >= gamma {
                return Some(NormalityTest::decide(
                    NormalityTestKind::ShapiroWilk,
                    w,
                    1e-99,
                    alpha,
                ));
            }
            (-(gamma - w1).ln(), poly(&C3, an), poly(&C4, an).exp())
        } else {
            const C5: [f64; 4] = [-1.5861, -0.31082, -0.083751, 0.0038915];
            const C6: [f64; 3] = [-0.4803, -0.082676, 0.0030302];
            let ln_n = an.ln();
            (w1, poly(&C5, ln_n), poly(&C6, ln_n).exp())
        };
        normal.sf((y - m) / s)
    };

    Some(NormalityTest::decide(
        NormalityTestKind::ShapiroWilk,
        w,
        p_value.clamp(0.0, 1.0),
        alpha,
    ))
}

/// Z-score of the sample skewness (D'Agostino 1970).
fn skew_z(b1: f64, n: f64) -> f64 {
    let y = b1 * ((n + 1.0) * (n + 3.0) / (6.0 * (n - 2.0))).sqrt();
    let beta2 = 3.0 * (n * n + 27.0 * n - 70.0) * (n + 1.0) * (n + 3.0)
        / ((n - 2.0) * (n + 5.0) * (n + 7.0) * (n + 9.0));
    let w2 = -1.0 + (2.0 * (beta2 - 1.0)).sqrt();
    let delta = 1.0 / (0.5 * w2.ln()).sqrt();
    let alpha = (2.0 / (w2 - 1.0)).sqrt();
    delta * (y / alpha).asinh()
}

/// Z-score of the sample kurtosis (Anscombe & Glynn 1983).
fn kurtosis_z(b2: f64, n: f64) -> f64 {
    let expected = 3.0 * (n - 1.0) / (n + 1.0);
    let variance = 24.0 * n * (n - 2.0) * (n - 3.0) / ((n + 1.0) * (n + 1.0) * (n + 3.0) * (n + 5.0));
    let x = (b2 - expected) / variance.sqrt();
    let sqrt_beta1 = 6.0 * (n * n - 5.0 * n + 2.0) / ((n + 7.0) * (n + 9.0))
        * (6.0 * (n + 3.0) * (n + 5.0) / (n * (n - 2.0) * (n - 3.0))).sqrt();
    let a = 6.0
        + 8.0 / sqrt_beta1 * (2.0 / sqrt_beta1 + (1.0 + 4.0 / (sqrt_beta1 * sqrt_beta1)).sqrt());
    let term1 = 1.0 - 2.0 / (9.0 * a);
    let denom = 1.0 + x * (2.0 / (a - 4.0)).sqrt();
    let term2 = denom.signum() * ((1.0 - 2.0 / a) / denom.abs()).cbrt();
    (term1 - term2) / (2.0 / (9.0 * a)).sqrt()
}

/// D'Agostino-Pearson K² test. `K² = Zs² + Zk²` follows chi-squared(2).
///
/// Returns `None` below 20 observations or for zero variance.
pub fn dagostino_pearson(values: &[f64], alpha: f64) -> Option<NormalityTest> {
    if values.len() < DAGOSTINO_MIN_N {
        return None;
    }
    let n = values.len() as f64;
    let mu = mean(values)?;
    let (mut m2, mut m3, mut m4) = (0.0, 0.0, 0.0);
    for v in values {
        let d = v - mu;
        m2 += d * d;
        m3 += d * d * d;
        m4 += d * d * d * d;
    }
    m2 /= n;
    m3 /= n;
    m4 /= n;
    if m2 <= f64::EPSILON * f64::EPSILON {
        return None;
    }

    let b1 = m3 / m2.powf(1.5);
    let b2 = m4 / (m2 * m2);
    let k2 = skew_z(b1, n).powi(2) + kurtosis_z(b2, n).powi(2);
    if !k2.is_finite() {
        return None;
    }

    let chi2 = ChiSquared::new(2.0).ok()?;
    Some(NormalityTest::decide(
        NormalityTestKind::DAgostinoPearson,
        k2,
        chi2.sf(k2),
        alpha,
    ))
}

/// Run every applicable test for a sample of `values.len()` observations.
pub fn run_normality_tests(values: &[f64], alpha: f64) -> Vec<NormalityTest> {
    [shapiro_wilk(values, alpha), dagostino_pearson(values, alpha)]
        .into_iter()
        .flatten()
        .collect()
}
