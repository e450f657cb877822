use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// Schema Types
// ============================================================================

/// Logical kind of a column, fixed once at load time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Integer or float feature.
    Numeric,
    /// String, boolean or categorical feature.
    Categorical,
    /// Row identifier; never imputed, scaled, encoded or analyzed.
    Identifier,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Identifier => "identifier",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub dtype: String,
    pub kind: ColumnKind,
}

/// Column set and kinds of a table, inferred once and reused by every stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSchema {
    pub columns: Vec<ColumnSchema>,
}

impl DatasetSchema {
    /// Kind of `name`, if the column is part of the schema.
    pub fn kind_of(&self, name: &str) -> Option<ColumnKind> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.kind)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name == name)
    }

    /// Names of all columns of `kind`, in table order.
    pub fn columns_of_kind(&self, kind: ColumnKind) -> Vec<String> {
        self.columns
            .iter()
            .filter(|c| c.kind == kind)
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns_of_kind(ColumnKind::Numeric)
    }

    pub fn categorical_columns(&self) -> Vec<String> {
        self.columns_of_kind(ColumnKind::Categorical)
    }

    pub fn identifier_columns(&self) -> Vec<String> {
        self.columns_of_kind(ColumnKind::Identifier)
    }
}

// ============================================================================
// Statistics
// ============================================================================

/// A statistic that may be undefined for degenerate input (all missing,
/// a single value, zero variance).
///
/// Serializes as a number or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Statistic {
    Defined(f64),
    Undefined,
}

impl Statistic {
    /// Wrap a value, mapping non-finite results to `Undefined`.
    pub fn from_value(value: f64) -> Self {
        if value.is_finite() {
            Self::Defined(value)
        } else {
            Self::Undefined
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Defined(v) => Some(*v),
            Self::Undefined => None,
        }
    }
}

impl From<Option<f64>> for Statistic {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Undefined, Self::from_value)
    }
}

/// Formats the number with the caller's precision, or `undefined`.
impl fmt::Display for Statistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Defined(v) => fmt::Display::fmt(v, f),
            Self::Undefined => f.pad("undefined"),
        }
    }
}

// ============================================================================
// Cleaning Summary Types
// ============================================================================

/// Record of what the cleaner did to a table.
///
/// Printed to the console after `clean` and optionally written as
/// `<output_name>_summary.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleaningSummary {
    /// Wall-clock time of the whole run.
    pub duration_ms: u64,

    /// Number of rows before cleaning.
    pub rows_before: usize,
    /// Number of rows after cleaning.
    pub rows_after: usize,
    /// Number of rows removed (duplicates and outlier rows).
    pub rows_removed: usize,

    /// Number of columns before cleaning.
    pub columns_before: usize,
    /// Number of columns after cleaning (one-hot encoding may add columns).
    pub columns_after: usize,

    /// Missing cells before cleaning.
    pub missing_before: usize,
    /// Missing cells after cleaning.
    pub missing_after: usize,

    /// Actions taken, in execution order.
    pub actions: Vec<CleaningAction>,

    /// One entry per column the cleaner touched.
    pub column_summaries: Vec<ColumnSummary>,

    /// Warnings and notes generated during cleaning.
    pub warnings: Vec<String>,
}

impl CleaningSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_action(&mut self, action: CleaningAction) {
        self.actions.push(action);
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Mutable access to the summary of `name`, creating it when absent.
    pub fn column_mut(&mut self, name: &str, dtype: &str) -> &mut ColumnSummary {
        let index = match self.column_summaries.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                self.column_summaries.push(ColumnSummary::new(name, dtype));
                self.column_summaries.len() - 1
            }
        };
        &mut self.column_summaries[index]
    }

    /// Share of input rows dropped, in percent.
    pub fn rows_removed_percentage(&self) -> f64 {
        if self.rows_before == 0 {
            0.0
        } else {
            (self.rows_removed as f64 / self.rows_before as f64) * 100.0
        }
    }
}

/// A single action taken during cleaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningAction {
    pub action_type: ActionType,
    /// Column name, or `"dataset"` for row-level steps.
    pub target: String,
    pub description: String,
    /// Additional details (e.g., fill value, fences).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl CleaningAction {
    pub fn new(
        action_type: ActionType,
        target: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            target: target.into(),
            description: description.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Types of actions the cleaner can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// A column was dropped for exceeding the missing-value threshold.
    ColumnRemoved,
    /// Nulls filled by a statistic or placeholder.
    ValueImputed,
    /// Exact duplicate rows dropped, first occurrence kept.
    DuplicatesRemoved,
    /// Out-of-fence values were clamped.
    OutliersCapped,
    /// Rows with out-of-fence values were dropped.
    OutlierRowsRemoved,
    /// A categorical column was label- or one-hot encoded.
    CategoriesEncoded,
    /// A numeric column was standardized or normalized.
    DataScaled,
}

impl ActionType {
    /// Title-case label used in console and markdown output.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::ColumnRemoved => "Column Removed",
            Self::ValueImputed => "Value Imputed",
            Self::DuplicatesRemoved => "Duplicates Removed",
            Self::OutliersCapped => "Outliers Capped",
            Self::OutlierRowsRemoved => "Outlier Rows Removed",
            Self::CategoriesEncoded => "Categories Encoded",
            Self::DataScaled => "Data Scaled",
        }
    }
}

/// What the cleaner did to one column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    /// Polars dtype of the input column.
    pub original_type: String,
    pub missing_before: usize,
    pub missing_after: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imputation_method: Option<String>,
    /// Number of out-of-fence values found.
    pub outliers_handled: usize,
    /// Encoding applied, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    /// Scaling applied, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scaling: Option<String>,
    pub was_removed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removal_reason: Option<String>,
}

impl ColumnSummary {
    pub fn new(name: impl Into<String>, original_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            original_type: original_type.into(),
            missing_before: 0,
            missing_after: 0,
            imputation_method: None,
            outliers_handled: 0,
            encoding: None,
            scaling: None,
            was_removed: false,
            removal_reason: None,
        }
    }

    pub fn mark_removed(&mut self, reason: impl Into<String>) {
        self.was_removed = true;
        self.removal_reason = Some(reason.into());
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_schema() -> DatasetSchema {
        DatasetSchema {
            columns: vec![
                ColumnSchema {
                    name: "applicant_id".to_string(),
                    dtype: "String".to_string(),
                    kind: ColumnKind::Identifier,
                },
                ColumnSchema {
                    name: "income".to_string(),
                    dtype: "Float64".to_string(),
                    kind: ColumnKind::Numeric,
                },
                ColumnSchema {
                    name: "gender".to_string(),
                    dtype: "String".to_string(),
                    kind: ColumnKind::Categorical,
                },
            ],
        }
    }

    #[test]
    fn test_schema_lookups() {
        let schema = sample_schema();
        assert_eq!(schema.kind_of("income"), Some(ColumnKind::Numeric));
        assert_eq!(schema.kind_of("missing"), None);
        assert_eq!(schema.numeric_columns(), vec!["income"]);
        assert_eq!(schema.categorical_columns(), vec!["gender"]);
        assert_eq!(schema.identifier_columns(), vec!["applicant_id"]);
        assert!(schema.contains("gender"));
    }

    #[test]
    fn test_statistic_display() {
        assert_eq!(format!("{:.2}", Statistic::Defined(1.23456)), "1.23");
        assert_eq!(format!("{:.2}", Statistic::Undefined), "undefined");
        assert_eq!(Statistic::from_value(f64::NAN), Statistic::Undefined);
        assert_eq!(Statistic::from(None), Statistic::Undefined);
    }

    #[test]
    fn test_statistic_serialization() {
        let json = serde_json::to_string(&vec![Statistic::Defined(2.5), Statistic::Undefined])
            .unwrap();
        assert_eq!(json, "[2.5,null]");
    }

    #[test]
    fn test_cleaning_summary_column_mut() {
        let mut summary = CleaningSummary::new();
        summary.column_mut("age", "Int64").missing_before = 3;
        summary.column_mut("age", "Int64").missing_after = 0;
        assert_eq!(summary.column_summaries.len(), 1);
        assert_eq!(summary.column_summaries[0].missing_before, 3);
    }

    #[test]
    fn test_cleaning_summary_percentages() {
        let mut summary = CleaningSummary::new();
        summary.rows_before = 200;
        summary.rows_removed = 10;
        assert!((summary.rows_removed_percentage() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_cleaning_action_with_details() {
        let action = CleaningAction::new(ActionType::ValueImputed, "income", "Filled 4 values")
            .with_details("median = 52000");
        assert_eq!(action.action_type, ActionType::ValueImputed);
        assert!(action.details.unwrap().contains("median"));
    }

    #[test]
    fn test_action_types_serialize() {
        let json = serde_json::to_string(&ActionType::OutlierRowsRemoved).unwrap();
        assert_eq!(json, "\"outlier_rows_removed\"");
        assert_eq!(ActionType::DataScaled.display_name(), "Data Scaled");
    }
}
