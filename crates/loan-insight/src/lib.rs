//! Loan Approval Dataset Analysis Library
//!
//! Assessment, distribution analysis, class-balance and bias analysis, and
//! cleaning for tabular loan-approval data, built on Polars.
//!
//! # Overview
//!
//! - **Assessment**: shape, types, missing values, duplicates, preview
//! - **Distributions**: descriptive statistics, normality tests, histogram
//!   and Q-Q charts, category frequencies
//! - **Bias**: class balance and per-group positive-rate deviations against a
//!   fixed threshold
//! - **Cleaning**: imputation, deduplication, IQR outlier handling, encoding
//!   and scaling, with persisted artifacts
//! - **Transform**: replay of the persisted encoding map and scaling
//!   parameters on new rows
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use loan_insight::{AnalysisConfig, DataCleaner, DataProfiler, load_dataset};
//!
//! let config = AnalysisConfig::builder()
//!     .input_path("data/loan_approval.csv")
//!     .output_dir("outputs")
//!     .id_column("loan_id")
//!     .build()?;
//!
//! let df = load_dataset(&config.input_path, config.separator_byte())?;
//! let schema = DataProfiler::infer_schema(&df, config.id_column.as_deref())?;
//!
//! let result = DataCleaner::new(&config).run(df, &schema)?;
//! println!("{} rows removed", result.summary.rows_removed);
//! ```
//!
//! # Bias analysis
//!
//! The bias check compares each group's positive-outcome rate with the
//! overall rate and flags differences above `bias_threshold` (default 0.15).
//! It is a descriptive heuristic, not a hypothesis test.
//!
//! ```rust,ignore
//! use loan_insight::{AnalysisConfig, BiasAnalyzer};
//!
//! let config = AnalysisConfig::builder()
//!     .target_column("loan_approval_status")
//!     .positive_label("Approved")
//!     .bias_features(["gender", "region"])
//!     .build()?;
//!
//! let report = BiasAnalyzer::new(&config).run(&df, &schema)?;
//! for entry in report.flagged_entries() {
//!     println!("{} = {}: {:.1} points", entry.feature, entry.group, entry.difference * 100.0);
//! }
//! ```

pub mod bias;
pub mod charts;
pub mod cleaner;
pub mod config;
pub mod distribution;
pub mod error;
pub mod imputers;
pub mod loader;
pub mod profiler;
pub mod reporting;
pub mod transform;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use bias::{BiasAnalyzer, BiasEntry, BiasReport, ClassBalance, FeatureBias};
pub use cleaner::{
    CategoricalEncoder, CleaningResult, ColumnEncoding, DataCleaner, EncodingMap, OutlierHandler,
    ScalingParams, ScalingParamsMap,
};
pub use config::{
    AnalysisConfig, AnalysisConfigBuilder, CategoricalImputation, ConfigValidationError,
    EncodingMethod, LabelOrder, NumericImputation, OutlierStrategy, ScalingMethod,
};
pub use distribution::{DistributionAnalyzer, DistributionReport, NumericDistribution};
pub use error::{AnalysisError, Result as AnalysisResult, ResultExt};
pub use imputers::StatisticalImputer;
pub use loader::{AssessmentReport, Assessor, load_dataset};
pub use profiler::{ColumnProfile, DataProfiler, NormalityTest, NormalityTestKind};
pub use reporting::ReportWriter;
pub use transform::TransformArtifacts;
pub use types::{
    ActionType, CleaningAction, CleaningSummary, ColumnKind, ColumnSummary, DatasetSchema,
    Statistic,
};
