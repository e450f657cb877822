//! Outlier handling module.
//!
//! Fences are `[Q1 - k*IQR, Q3 + k*IQR]` with linearly interpolated
//! quartiles. Values outside are clamped (`cap`) or their rows dropped
//! (`remove`).

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::OutlierStrategy;
use crate::error::Result;
use crate::profiler::statistics::{iqr_fences, sorted_copy};
use crate::utils::{finite_f64_values, optional_f64_values};

/// Fences and out-of-fence count of one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnOutliers {
    pub column: String,
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OutlierOutcome {
    /// Columns that had at least one value outside their fences.
    pub columns: Vec<ColumnOutliers>,
    pub rows_removed: usize,
}

/// Handles outlier detection and treatment.
pub struct OutlierHandler;

impl OutlierHandler {
    /// Fences of every column, computed on the table as given.
    ///
    /// Columns with no values are skipped.
    pub fn detect(df: &DataFrame, columns: &[String], multiplier: f64) -> Result<Vec<ColumnOutliers>> {
        let mut found = Vec::new();
        for name in columns {
            let values = finite_f64_values(df.column(name)?.as_materialized_series())?;
            let Some((lower, upper)) = iqr_fences(&sorted_copy(&values), multiplier) else {
                continue;
            };
            let count = values.iter().filter(|v| **v < lower || **v > upper).count();
            debug!(
                "Column '{}': fences [{:.4}, {:.4}], {} outliers",
                name, lower, upper, count
            );
            found.push(ColumnOutliers {
                column: name.clone(),
                lower,
                upper,
                count,
            });
        }
        Ok(found)
    }

    /// Apply `strategy` to the given numeric columns.
    pub fn handle_outliers(
        df: &mut DataFrame,
        columns: &[String],
        strategy: OutlierStrategy,
        multiplier: f64,
    ) -> Result<OutlierOutcome> {
        if strategy == OutlierStrategy::Keep {
            return Ok(OutlierOutcome::default());
        }

        let fences: Vec<ColumnOutliers> = Self::detect(df, columns, multiplier)?
            .into_iter()
            .filter(|c| c.count > 0)
            .collect();

        let mut outcome = OutlierOutcome::default();
        match strategy {
            OutlierStrategy::Cap => {
                for fence in &fences {
                    Self::cap_column(df, fence)?;
                }
            }
            OutlierStrategy::Remove => {
                outcome.rows_removed = Self::remove_rows(df, &fences)?;
            }
            OutlierStrategy::Keep => {}
        }
        outcome.columns = fences;
        Ok(outcome)
    }

    /// Clamp out-of-fence values to the nearest fence. The column becomes `Float64`.
    pub fn cap_column(df: &mut DataFrame, fence: &ColumnOutliers) -> Result<()> {
        let series = df.column(&fence.column)?.as_materialized_series();
        let float_series = series.cast(&DataType::Float64)?;
        let capped = float_series
            .f64()?
            .apply(|v| v.map(|val| val.clamp(fence.lower, fence.upper)));
        df.replace(&fence.column, capped.into_series())?;
        Ok(())
    }

    /// Drop rows with any value outside its column's fences. Nulls are kept.
    fn remove_rows(df: &mut DataFrame, fences: &[ColumnOutliers]) -> Result<usize> {
        if fences.is_empty() {
            return Ok(0);
        }
        let mut keep = vec![true; df.height()];
        for fence in fences {
            let values = optional_f64_values(df.column(&fence.column)?.as_materialized_series())?;
            for (flag, value) in keep.iter_mut().zip(values) {
                if let Some(v) = value
                    && (v < fence.lower || v > fence.upper)
                {
                    *flag = false;
                }
            }
        }

        let before = df.height();
        let mask = BooleanChunked::from_slice("mask".into(), &keep);
        *df = df.filter(&mask)?;
        Ok(before - df.height())
    }
}
