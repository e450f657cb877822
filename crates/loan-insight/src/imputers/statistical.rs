//! Statistical imputation methods.
//!
//! Provides median, mean, mode and constant imputation.

use polars::prelude::*;

use crate::config::{CategoricalImputation, NumericImputation};
use crate::error::Result;
use crate::profiler::statistics::{mean, quantile_sorted, sorted_copy};
use crate::utils::{fill_numeric_nulls, fill_string_nulls, finite_f64_values, string_mode};

/// Fill value for categorical columns under the constant strategy.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// What an imputation did to one column.
#[derive(Debug, Clone, PartialEq)]
pub struct Imputation {
    /// Strategy name (`median`, `mean`, `mode`, `constant`).
    pub method: &'static str,
    /// Fill value rendered as text.
    pub fill_value: String,
    pub filled: usize,
}

/// Statistical imputation methods for filling missing values.
pub struct StatisticalImputer;

impl StatisticalImputer {
    /// Fill nulls of a numeric column. The column becomes `Float64`.
    ///
    /// Returns `None` when there is nothing to fill or no value to fill with
    /// (all values missing).
    pub fn impute_numeric(
        df: &mut DataFrame,
        col_name: &str,
        strategy: NumericImputation,
    ) -> Result<Option<Imputation>> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let filled = series.null_count();
        if filled == 0 {
            return Ok(None);
        }

        let values = finite_f64_values(&series)?;
        let (method, fill_value) = match strategy {
            NumericImputation::Median => ("median", quantile_sorted(&sorted_copy(&values), 0.5)),
            NumericImputation::Mean => ("mean", mean(&values)),
        };
        let Some(fill_value) = fill_value else {
            return Ok(None);
        };

        df.replace(col_name, fill_numeric_nulls(&series, fill_value)?)?;
        Ok(Some(Imputation {
            method,
            fill_value: format!("{:.4}", fill_value),
            filled,
        }))
    }

    /// Fill nulls of a categorical column. The column becomes `String`.
    ///
    /// Under [`CategoricalImputation::Mode`] an all-missing column is left
    /// untouched.
    pub fn impute_categorical(
        df: &mut DataFrame,
        col_name: &str,
        strategy: CategoricalImputation,
    ) -> Result<Option<Imputation>> {
        let series = df.column(col_name)?.as_materialized_series().clone();
        let filled = series.null_count();
        if filled == 0 {
            return Ok(None);
        }

        let (method, fill_value) = match strategy {
            CategoricalImputation::Mode => ("mode", string_mode(&series)),
            CategoricalImputation::Constant => ("constant", Some(UNKNOWN_CATEGORY.to_string())),
        };
        let Some(fill_value) = fill_value else {
            return Ok(None);
        };

        df.replace(col_name, fill_string_nulls(&series, &fill_value)?)?;
        Ok(Some(Imputation {
            method,
            fill_value,
            filled,
        }))
    }
}
