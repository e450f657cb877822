//! Shared utilities for the analysis pipeline.
//!
//! This module contains common helper functions used across multiple modules
//! to reduce code duplication and ensure consistency.

use polars::prelude::*;
use std::collections::HashMap;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType holds categories (strings, booleans, categoricals).
#[inline]
pub fn is_categorical_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::String | DataType::Boolean | DataType::Categorical(_, _) | DataType::Enum(_, _)
    )
}

/// Short dtype name used in reports (`Int64`, `Float64`, `String`, ...).
pub fn dtype_name(dtype: &DataType) -> String {
    match dtype {
        DataType::Categorical(_, _) => "Categorical".to_string(),
        DataType::Enum(_, _) => "Enum".to_string(),
        DataType::Datetime(_, _) => "Datetime".to_string(),
        other => format!("{:?}", other),
    }
}

// =============================================================================
// Value Extraction Utilities
// =============================================================================

/// Render a cell as plain text (strings without quotes, nulls as empty).
pub fn any_value_to_string(value: &AnyValue) -> String {
    match value {
        AnyValue::Null => String::new(),
        AnyValue::String(s) => (*s).to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        other => format!("{}", other),
    }
}

/// Values of a numeric series as `f64`, nulls preserved.
pub fn optional_f64_values(series: &Series) -> PolarsResult<Vec<Option<f64>>> {
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Non-null, finite values of a numeric series as `f64`.
pub fn finite_f64_values(series: &Series) -> PolarsResult<Vec<f64>> {
    Ok(optional_f64_values(series)?
        .into_iter()
        .flatten()
        .filter(|v| v.is_finite())
        .collect())
}

/// Values of any series as strings, nulls preserved.
///
/// Booleans and categoricals are rendered through a cast to `String`.
pub fn optional_string_values(series: &Series) -> PolarsResult<Vec<Option<String>>> {
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(str::to_string))
        .collect())
}

/// Frequency of each distinct non-null value, most frequent first.
///
/// Ties keep first-seen order so the result is deterministic.
pub fn value_counts(series: &Series) -> PolarsResult<Vec<(String, usize)>> {
    let values = optional_string_values(series)?;
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    for value in values.into_iter().flatten() {
        match counts.get_mut(&value) {
            Some(count) => *count += 1,
            None => {
                counts.insert(value.clone(), 1);
                order.push(value);
            }
        }
    }

    let mut result: Vec<(String, usize)> = order
        .into_iter()
        .map(|value| {
            let count = counts.get(&value).copied().unwrap_or(0);
            (value, count)
        })
        .collect();
    // stable sort keeps first-seen order among equal counts
    result.sort_by(|a, b| b.1.cmp(&a.1));
    Ok(result)
}

/// Distinct non-null values in order of first appearance.
pub fn distinct_in_order(series: &Series) -> PolarsResult<Vec<String>> {
    let mut seen = std::collections::HashSet::new();
    let mut ordered = Vec::new();
    for value in optional_string_values(series)?.into_iter().flatten() {
        if seen.insert(value.clone()) {
            ordered.push(value);
        }
    }
    Ok(ordered)
}

// =============================================================================
// Series Statistics Utilities
// =============================================================================

/// Calculate the mode (most frequent value) of a Series as a string.
///
/// Ties resolve to the value seen first.
pub fn string_mode(series: &Series) -> Option<String> {
    value_counts(series)
        .ok()
        .and_then(|counts| counts.into_iter().next())
        .map(|(value, _)| value)
}

// =============================================================================
// Series Transformation Utilities
// =============================================================================

/// Fill null values in a numeric Series with a specific value.
///
/// The result is always `Float64`.
pub fn fill_numeric_nulls(series: &Series, fill_value: f64) -> PolarsResult<Series> {
    let filled: Vec<f64> = optional_f64_values(series)?
        .into_iter()
        .map(|v| v.unwrap_or(fill_value))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

/// Fill null values in a Series with a specific string value.
///
/// The result is always `String`.
pub fn fill_string_nulls(series: &Series, fill_value: &str) -> PolarsResult<Series> {
    let filled: Vec<String> = optional_string_values(series)?
        .into_iter()
        .map(|v| v.unwrap_or_else(|| fill_value.to_string()))
        .collect();
    Ok(Series::new(series.name().clone(), filled))
}

// =============================================================================
// Naming Utilities
// =============================================================================

/// Make a column name safe for use inside a file name.
pub fn safe_file_stem(column: &str) -> String {
    column
        .chars()
        .map(|c| match c {
            '/' | '\\' | ' ' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            other => other,
        })
        .collect()
}

/// Truncate a string to `max_len` characters with an ellipsis.
pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

// =============================================================================
// Tests
// =============================================================================
