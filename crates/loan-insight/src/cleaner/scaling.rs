//! Feature scaling: standardization and min-max normalization.

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::ScalingMethod;
use crate::error::Result;
use crate::profiler::statistics::{mean, sample_std};
use crate::utils::finite_f64_values;

const EPSILON: f64 = 1e-12;

/// Fitted scaling parameters of one column, as stored in
/// `<output_name>_scaling_params.json`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ScalingParams {
    Standardize { mean: f64, std: f64 },
    Normalize { min: f64, max: f64 },
}

/// Scaling parameters keyed by column name.
pub type ScalingParamsMap = BTreeMap<String, ScalingParams>;

impl ScalingParams {
    /// Fit parameters on the finite values of `series`.
    ///
    /// `None` for [`ScalingMethod::None`] or a column without values.
    pub fn fit(series: &Series, method: ScalingMethod) -> Result<Option<Self>> {
        let values = finite_f64_values(series)?;
        if values.is_empty() {
            return Ok(None);
        }
        let params = match method {
            ScalingMethod::None => return Ok(None),
            ScalingMethod::Standardize => {
                let Some(m) = mean(&values) else {
                    return Ok(None);
                };
                // a single value has no sample std; treat it as constant
                let std = sample_std(&values).unwrap_or(0.0);
                Self::Standardize { mean: m, std }
            }
            ScalingMethod::Normalize => {
                let min = values.iter().copied().fold(f64::INFINITY, f64::min);
                let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                Self::Normalize { min, max }
            }
        };
        Ok(Some(params))
    }

    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Standardize { .. } => "standardize",
            Self::Normalize { .. } => "normalize",
        }
    }

    /// True when the fitted column had no spread; such columns scale to 0.0.
    pub fn is_constant(&self) -> bool {
        match *self {
            Self::Standardize { std, .. } => std.abs() <= EPSILON,
            Self::Normalize { min, max } => (max - min).abs() <= EPSILON,
        }
    }

    pub fn scale(&self, value: f64) -> f64 {
        if self.is_constant() {
            return 0.0;
        }
        match *self {
            Self::Standardize { mean, std } => (value - mean) / std,
            Self::Normalize { min, max } => (value - min) / (max - min),
        }
    }

    /// Replace `column` in `df` with its scaled values. Nulls stay null and
    /// the column becomes `Float64`.
    pub fn apply(&self, df: &mut DataFrame, column: &str) -> Result<()> {
        let series = df.column(column)?.as_materialized_series();
        let scaled = series
            .cast(&DataType::Float64)?
            .f64()?
            .apply(|v| v.map(|val| self.scale(val)));
        df.replace(column, scaled.into_series())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scaled(df: &DataFrame, name: &str) -> Vec<f64> {
        finite_f64_values(df.column(name).unwrap().as_materialized_series()).unwrap()
    }

    #[test]
    fn test_standardize_zero_mean_unit_std() {
        let mut df = df!["income" => [12_000i64, 45_000, 38_000, 91_000, 27_500]].unwrap();
        let params = ScalingParams::fit(
            df.column("income").unwrap().as_materialized_series(),
            ScalingMethod::Standardize,
        )
        .unwrap()
        .unwrap();
        params.apply(&mut df, "income").unwrap();

        let values = scaled(&df, "income");
        assert!(mean(&values).unwrap().abs() < 1e-9);
        assert!((sample_std(&values).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_normalize_unit_range() {
        let mut df = df!["age" => [Some(21.0), None, Some(65.0), Some(40.0)]].unwrap();
        let params = ScalingParams::fit(
            df.column("age").unwrap().as_materialized_series(),
            ScalingMethod::Normalize,
        )
        .unwrap()
        .unwrap();
        assert_eq!(params, ScalingParams::Normalize { min: 21.0, max: 65.0 });
        params.apply(&mut df, "age").unwrap();

        let values = scaled(&df, "age");
        assert_eq!(values.iter().copied().fold(f64::INFINITY, f64::min), 0.0);
        assert_eq!(values.iter().copied().fold(f64::NEG_INFINITY, f64::max), 1.0);
        assert_eq!(df.column("age").unwrap().null_count(), 1);
    }

    #[test]
    fn test_constant_column_maps_to_zero() {
        let mut df = df!["term" => [36.0, 36.0, 36.0]].unwrap();
        for method in [ScalingMethod::Standardize, ScalingMethod::Normalize] {
            let params = ScalingParams::fit(
                df.column("term").unwrap().as_materialized_series(),
                method,
            )
            .unwrap()
            .unwrap();
            assert!(params.is_constant());
            assert_eq!(params.scale(36.0), 0.0);
        }
        let params = ScalingParams::Normalize { min: 36.0, max: 36.0 };
        params.apply(&mut df, "term").unwrap();
        assert_eq!(scaled(&df, "term"), vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_fit_none_and_empty() {
        let series = Series::new("x".into(), &[1.0, 2.0]);
        assert_eq!(ScalingParams::fit(&series, ScalingMethod::None).unwrap(), None);

        let empty = Series::new("x".into(), &[Option::<f64>::None]);
        assert_eq!(
            ScalingParams::fit(&empty, ScalingMethod::Standardize).unwrap(),
            None
        );
    }

    #[test]
    fn test_params_json_shape() {
        let params = ScalingParams::Standardize { mean: 2.0, std: 0.5 };
        let json = serde_json::to_value(params).unwrap();
        assert_eq!(json["method"], "standardize");
        assert_eq!(json["std"], 0.5);
    }
}
