//! Column kind inference: identifier, numeric or categorical.

use once_cell::sync::Lazy;
use polars::prelude::*;
use regex::Regex;

use crate::types::ColumnKind;
use crate::utils::{is_categorical_dtype, is_numeric_dtype, optional_string_values};

/// Value patterns that make a unique string column an identifier.
static ID_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        Regex::new(r"^\d{5,}$").expect("Invalid regex: numeric ID"),
        Regex::new(r"^[A-Z]{2,}\d+$").expect("Invalid regex: code pattern"),
        Regex::new(r"^[A-Za-z]{0,6}[-_]?\d{3,}$").expect("Invalid regex: prefixed ID"),
        Regex::new(r"^[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12}$")
            .expect("Invalid regex: UUID"),
    ]
});

static ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]{6,}$").expect("Invalid regex: alphanumeric ID"));

/// Name tokens that mark an identifier column on their own.
const ID_NAME_TOKENS: [&str; 3] = ["id", "uuid", "guid"];

/// Fewer non-null values than this never count as an identifier by pattern.
pub const MIN_PATTERN_VALUES: usize = 10;

/// Whether the column name alone marks an identifier:
/// `id`, `applicant_id`, `loan-uuid`, `customerId`, `LoanID`.
pub(crate) fn is_identifier_name(col_name: &str) -> bool {
    let tokens = col_name
        .split(|c: char| c == '_' || c == '-' || c == ' ' || c == '.')
        .filter(|t| !t.is_empty());
    for token in tokens {
        if ID_NAME_TOKENS.contains(&token.to_lowercase().as_str()) {
            return true;
        }
        // camelCase suffix: lowercase letter followed by "Id" or "ID"
        if let Some(stem) = token.strip_suffix("Id").or_else(|| token.strip_suffix("ID"))
            && stem.chars().last().is_some_and(|c| c.is_ascii_lowercase())
        {
            return true;
        }
    }
    false
}

fn looks_like_id(value: &str) -> bool {
    if ID_PATTERNS.iter().any(|re| re.is_match(value)) {
        return true;
    }
    ALPHANUMERIC.is_match(value) && value.chars().any(|c| c.is_ascii_digit())
}

/// Whether a string column holds unique, ID-shaped values.
pub(crate) fn has_identifier_values(series: &Series) -> PolarsResult<bool> {
    if series.dtype() != &DataType::String {
        return Ok(false);
    }
    let values: Vec<String> = optional_string_values(series)?
        .into_iter()
        .flatten()
        .collect();
    if values.len() < MIN_PATTERN_VALUES {
        return Ok(false);
    }
    let unique = values
        .iter()
        .collect::<std::collections::HashSet<_>>()
        .len();
    if unique != values.len() {
        return Ok(false);
    }
    Ok(values.iter().all(|v| looks_like_id(v.trim())))
}

/// Logical kind of one column.
///
/// Returns `None` for dtypes the pipeline does not analyze (dates, lists).
pub(crate) fn infer_column_kind(
    series: &Series,
    id_column: Option<&str>,
) -> PolarsResult<Option<ColumnKind>> {
    let name = series.name().as_str();
    if id_column == Some(name) || is_identifier_name(name) {
        return Ok(Some(ColumnKind::Identifier));
    }
    if has_identifier_values(series)? {
        return Ok(Some(ColumnKind::Identifier));
    }

    let dtype = series.dtype();
    if is_numeric_dtype(dtype) {
        Ok(Some(ColumnKind::Numeric))
    } else if is_categorical_dtype(dtype) {
        Ok(Some(ColumnKind::Categorical))
    } else {
        Ok(None)
    }
}
