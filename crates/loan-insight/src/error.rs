//! Error types for the loan analysis pipeline.
//!
//! All library operations return [`AnalysisError`] through the [`Result`]
//! alias. Errors carry a stable code (see [`AnalysisError::error_code`]) and
//! serialize as `{code, message}` so they can be embedded in JSON summaries.

use serde::Serialize;
use serde::ser::SerializeStruct;
use std::path::PathBuf;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for the analysis pipeline.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// The input dataset does not exist.
    #[error("Dataset not found at '{}'. {hint}", path.display())]
    DatasetNotFound { path: PathBuf, hint: String },

    /// The table does not have the shape a stage requires
    /// (e.g. the bias target column is absent).
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// A named column is absent from the table.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Rejected config file or flag value.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// A label-encoded column received a category absent from the encoding map.
    #[error("Unknown category '{category}' in column '{column}'")]
    UnknownCategory { column: String, category: String },

    /// Chart rendering failed.
    #[error("Failed to render chart '{chart}': {reason}")]
    Chart { chart: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A record that the CSV reader rejects, including a field count that
    /// differs from the header.
    #[error("Malformed CSV: {0}")]
    Csv(#[from] csv::Error),

    /// An inner error prefixed with what was being attempted.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<AnalysisError>,
    },
}

impl AnalysisError {
    /// Wrap `self` under a context message; the code of the inner error is kept.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        AnalysisError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Build a [`AnalysisError::DatasetNotFound`] with the standard remediation hint.
    pub fn dataset_not_found(path: impl Into<PathBuf>) -> Self {
        AnalysisError::DatasetNotFound {
            path: path.into(),
            hint: "Check the --input path, or place the dataset at data/loan_approval.csv"
                .to_string(),
        }
    }

    /// Stable machine-readable code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::DatasetNotFound { .. } => "DATASET_NOT_FOUND",
            Self::SchemaMismatch(_) => "SCHEMA_MISMATCH",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::UnknownCategory { .. } => "UNKNOWN_CATEGORY",
            Self::Chart { .. } => "CHART_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::Csv(_) => "CSV_PARSE_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the error comes from user input (paths, flags, config) rather
    /// than from processing.
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::DatasetNotFound { .. }
            | Self::InvalidConfig(_)
            | Self::ColumnNotFound(_)
            | Self::Csv(_) => true,
            Self::WithContext { source, .. } => source.is_user_error(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for AnalysisError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AnalysisError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for analysis operations.
pub type Result<T> = std::result::Result<T, AnalysisError>;

/// `.context(...)` on library and Polars results.
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Polars(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, csv::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Csv(e).with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| AnalysisError::Io(e).with_context(context))
    }
}
