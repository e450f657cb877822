//! Configuration types for the analysis pipeline.
//!
//! [`AnalysisConfig`] is shared by every stage. It can be built fluently with
//! [`AnalysisConfig::builder()`], loaded from a JSON file, or both (a file
//! provides the base and builder calls override individual fields).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Declares a configuration mode enum that parses from (and serializes to)
/// its kebab-case name, rejecting anything else with
/// [`ConfigValidationError::UnknownMode`].
macro_rules! mode_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident for $field:literal {
            $( $(#[$vmeta:meta])* $variant:ident => $text:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub enum $name {
            $( $(#[$vmeta])* $variant ),+
        }

        impl $name {
            /// Accepted spellings, in declaration order.
            pub const NAMES: &'static [&'static str] = &[$($text),+];

            /// Canonical name of this mode.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = ConfigValidationError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
                match normalized.as_str() {
                    $($text => Ok(Self::$variant),)+
                    _ => Err(ConfigValidationError::UnknownMode {
                        field: $field.to_string(),
                        value: s.to_string(),
                        expected: Self::NAMES.join("|"),
                    }),
                }
            }
        }

        impl TryFrom<String> for $name {
            type Error = ConfigValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$name> for String {
            fn from(mode: $name) -> String {
                mode.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

mode_enum! {
    /// Strategy for handling IQR outliers in numeric feature columns.
    pub enum OutlierStrategy for "outlier_strategy" {
        /// Clamp values to the nearest fence
        #[default]
        Cap => "cap",
        /// Drop rows with any out-of-fence value
        Remove => "remove",
        /// Leave values untouched
        Keep => "keep",
    }
}

mode_enum! {
    /// Strategy for imputing missing numeric values.
    pub enum NumericImputation for "numeric_imputation" {
        /// Median of non-null values
        #[default]
        Median => "median",
        /// Mean of non-null values
        Mean => "mean",
    }
}

mode_enum! {
    /// Strategy for imputing missing categorical values.
    pub enum CategoricalImputation for "categorical_imputation" {
        /// Most frequent value
        #[default]
        Mode => "mode",
        /// The constant "Unknown"
        Constant => "constant",
    }
}

mode_enum! {
    /// Categorical encoding method.
    pub enum EncodingMethod for "encoding_method" {
        /// Label-encode low-cardinality columns, one-hot the rest
        #[default]
        Auto => "auto",
        /// One integer per category
        Label => "label",
        /// One 0/1 indicator column per category
        OneHot => "one-hot",
        /// Leave categorical columns as strings
        None => "none",
    }
}

mode_enum! {
    /// Order in which label-encoding integers are assigned.
    pub enum LabelOrder for "label_order" {
        /// Order of first appearance in the table
        #[default]
        FirstSeen => "first-seen",
        /// Lexicographic order of the category strings
        Sorted => "sorted",
    }
}

mode_enum! {
    /// Numeric feature scaling method.
    pub enum ScalingMethod for "scaling_method" {
        /// `(x - mean) / std`, sample standard deviation
        #[default]
        Standardize => "standardize",
        /// `(x - min) / (max - min)`
        Normalize => "normalize",
        /// No scaling
        None => "none",
    }
}

/// Configuration shared by every pipeline stage.
///
/// Use [`AnalysisConfig::builder()`] for a validated configuration.
///
/// # Example
///
/// ```rust,ignore
/// use loan_insight::config::{AnalysisConfig, OutlierStrategy, ScalingMethod};
///
/// let config = AnalysisConfig::builder()
///     .output_dir("outputs")
///     .outlier_strategy(OutlierStrategy::Remove)
///     .scaling_method(ScalingMethod::Normalize)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Delimited input file.
    /// Default: "data/loan_approval.csv"
    pub input_path: PathBuf,

    /// Directory receiving charts, reports and cleaned tables.
    /// Default: "outputs"
    pub output_dir: PathBuf,

    /// Base name (without extension) of the cleaned table and its side files.
    /// Default: "loan_approval_cleaned"
    pub output_name: String,

    /// Field separator of the input file.
    /// Default: ','
    pub separator: char,

    /// Column to treat as an identifier regardless of its name or content.
    /// Default: None
    pub id_column: Option<String>,

    /// Target column for the bias analysis.
    /// Default: "loan_approval_status"
    pub target_column: String,

    /// Target value counted as the positive outcome.
    /// Default: "Approved"
    pub positive_label: String,

    /// Flag a group when |group rate - overall rate| exceeds this (0.0 - 1.0).
    /// Default: 0.15
    pub bias_threshold: f64,

    /// Categorical features analyzed for bias.
    /// If None, every categorical non-identifier column except the target.
    /// Default: None
    pub bias_features: Option<Vec<String>>,

    /// Render a group-rate chart for every feature, not only flagged ones.
    /// Default: false
    pub chart_all_features: bool,

    /// Whether to render PNG charts at all.
    /// Default: true
    pub render_charts: bool,

    /// Significance level for normality tests (0.0 - 1.0).
    /// Default: 0.05
    pub significance_level: f64,

    /// Number of histogram bins for distribution charts.
    /// Default: 30
    pub histogram_bins: usize,

    /// Whether the cleaner imputes missing values.
    /// Default: true
    pub handle_missing: bool,

    /// Numeric imputation strategy.
    /// Default: Median
    pub numeric_imputation: NumericImputation,

    /// Categorical imputation strategy.
    /// Default: Mode
    pub categorical_imputation: CategoricalImputation,

    /// Drop columns whose missing fraction exceeds this (0.0 - 1.0).
    /// Default: None (never drop)
    pub missing_column_threshold: Option<f64>,

    /// Whether to remove exact duplicate rows.
    /// Default: true
    pub remove_duplicates: bool,

    /// Outlier handling strategy.
    /// Default: Cap
    pub outlier_strategy: OutlierStrategy,

    /// IQR multiplier used for the fences.
    /// Default: 1.5
    pub iqr_multiplier: f64,

    /// Categorical encoding method.
    /// Default: Auto
    pub encoding_method: EncodingMethod,

    /// Label assignment order for label encoding.
    /// Default: FirstSeen
    pub label_order: LabelOrder,

    /// Under `Auto` encoding, columns with at most this many categories are
    /// label-encoded and the rest one-hot encoded.
    /// Default: 10
    pub max_label_categories: usize,

    /// Numeric scaling method.
    /// Default: Standardize
    pub scaling_method: ScalingMethod,

    /// Write `<output_name>_summary.json` next to the cleaned table.
    /// Default: true
    pub write_summary: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("data/loan_approval.csv"),
            output_dir: PathBuf::from("outputs"),
            output_name: "loan_approval_cleaned".to_string(),
            separator: ',',
            id_column: None,
            target_column: "loan_approval_status".to_string(),
            positive_label: "Approved".to_string(),
            bias_threshold: 0.15,
            bias_features: None,
            chart_all_features: false,
            render_charts: true,
            significance_level: 0.05,
            histogram_bins: 30,
            handle_missing: true,
            numeric_imputation: NumericImputation::default(),
            categorical_imputation: CategoricalImputation::default(),
            missing_column_threshold: None,
            remove_duplicates: true,
            outlier_strategy: OutlierStrategy::default(),
            iqr_multiplier: 1.5,
            encoding_method: EncodingMethod::default(),
            label_order: LabelOrder::default(),
            max_label_categories: 10,
            scaling_method: ScalingMethod::default(),
            write_summary: true,
        }
    }
}

impl AnalysisConfig {
    /// Create a new configuration builder starting from the defaults.
    pub fn builder() -> AnalysisConfigBuilder {
        AnalysisConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take their
    /// default values; the result is validated.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::AnalysisError::Io(e)
                .with_context(format!("Reading config file '{}'", path.display()))
        })?;
        let config: AnalysisConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Separator as the byte expected by the CSV reader.
    pub fn separator_byte(&self) -> u8 {
        // validate() guarantees an ASCII separator
        self.separator as u8
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("bias_threshold", self.bias_threshold),
            ("significance_level", self.significance_level),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidThreshold {
                    field: field.to_string(),
                    value,
                });
            }
        }

        if let Some(threshold) = self.missing_column_threshold
            && !(0.0..=1.0).contains(&threshold)
        {
            return Err(ConfigValidationError::InvalidThreshold {
                field: "missing_column_threshold".to_string(),
                value: threshold,
            });
        }

        if self.histogram_bins == 0 {
            return Err(ConfigValidationError::InvalidHistogramBins(
                self.histogram_bins,
            ));
        }

        if !(self.iqr_multiplier > 0.0 && self.iqr_multiplier.is_finite()) {
            return Err(ConfigValidationError::InvalidIqrMultiplier(
                self.iqr_multiplier,
            ));
        }

        if !self.separator.is_ascii() || self.separator == '\n' || self.separator == '"' {
            return Err(ConfigValidationError::InvalidSeparator(self.separator));
        }

        if self.target_column.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("target_column"));
        }

        if self.output_name.trim().is_empty() {
            return Err(ConfigValidationError::EmptyField("output_name"));
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid threshold for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidThreshold { field: String, value: f64 },

    #[error("Invalid histogram bin count: {0} (must be at least 1)")]
    InvalidHistogramBins(usize),

    #[error("Invalid IQR multiplier: {0} (must be a positive number)")]
    InvalidIqrMultiplier(f64),

    #[error("Invalid separator {0:?} (must be a single ASCII character other than newline or quote)")]
    InvalidSeparator(char),

    #[error("'{0}' must not be empty")]
    EmptyField(&'static str),

    #[error("Unknown {field} '{value}' (expected one of: {expected})")]
    UnknownMode {
        field: String,
        value: String,
        expected: String,
    },
}

/// Builder for [`AnalysisConfig`] with fluent API.
///
/// Starts from [`AnalysisConfig::default()`] or, via `From`, from an existing
/// configuration (e.g. one loaded from JSON) so that individual fields can be
/// overridden before validation.
#[derive(Debug, Default)]
pub struct AnalysisConfigBuilder {
    config: AnalysisConfig,
}

impl From<AnalysisConfig> for AnalysisConfigBuilder {
    fn from(config: AnalysisConfig) -> Self {
        Self { config }
    }
}

impl AnalysisConfigBuilder {
    /// Set the input file path.
    pub fn input_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input_path = path.into();
        self
    }

    /// Set the output directory for charts, reports and cleaned data.
    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = path.into();
        self
    }

    /// Set the base name of the cleaned table (without extension).
    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.config.output_name = name.into();
        self
    }

    /// Set the input field separator.
    pub fn separator(mut self, separator: char) -> Self {
        self.config.separator = separator;
        self
    }

    /// Force a column to be treated as an identifier.
    pub fn id_column(mut self, column: impl Into<String>) -> Self {
        self.config.id_column = Some(column.into());
        self
    }

    /// Set the bias target column.
    pub fn target_column(mut self, column: impl Into<String>) -> Self {
        self.config.target_column = column.into();
        self
    }

    /// Set the target value counted as the positive outcome.
    pub fn positive_label(mut self, label: impl Into<String>) -> Self {
        self.config.positive_label = label.into();
        self
    }

    /// Set the bias flagging threshold.
    ///
    /// # Arguments
    /// * `threshold` - Value between 0.0 and 1.0 (e.g., 0.15 = 15 percentage points)
    pub fn bias_threshold(mut self, threshold: f64) -> Self {
        self.config.bias_threshold = threshold;
        self
    }

    /// Restrict the bias analysis to these features.
    pub fn bias_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.bias_features = Some(features.into_iter().map(Into::into).collect());
        self
    }

    /// Render group-rate charts for every feature.
    pub fn chart_all_features(mut self, all: bool) -> Self {
        self.config.chart_all_features = all;
        self
    }

    /// Enable or disable PNG chart rendering.
    pub fn render_charts(mut self, render: bool) -> Self {
        self.config.render_charts = render;
        self
    }

    /// Set the normality-test significance level.
    pub fn significance_level(mut self, alpha: f64) -> Self {
        self.config.significance_level = alpha;
        self
    }

    /// Set the number of histogram bins.
    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.config.histogram_bins = bins;
        self
    }

    /// Enable or disable missing-value imputation.
    pub fn handle_missing(mut self, handle: bool) -> Self {
        self.config.handle_missing = handle;
        self
    }

    /// Set the numeric imputation strategy.
    pub fn numeric_imputation(mut self, strategy: NumericImputation) -> Self {
        self.config.numeric_imputation = strategy;
        self
    }

    /// Set the categorical imputation strategy.
    pub fn categorical_imputation(mut self, strategy: CategoricalImputation) -> Self {
        self.config.categorical_imputation = strategy;
        self
    }

    /// Drop columns with a missing fraction above `threshold`.
    pub fn missing_column_threshold(mut self, threshold: f64) -> Self {
        self.config.missing_column_threshold = Some(threshold);
        self
    }

    /// Enable or disable duplicate row removal.
    pub fn remove_duplicates(mut self, remove: bool) -> Self {
        self.config.remove_duplicates = remove;
        self
    }

    /// Set the outlier strategy.
    pub fn outlier_strategy(mut self, strategy: OutlierStrategy) -> Self {
        self.config.outlier_strategy = strategy;
        self
    }

    /// Set the IQR fence multiplier.
    pub fn iqr_multiplier(mut self, multiplier: f64) -> Self {
        self.config.iqr_multiplier = multiplier;
        self
    }

    /// Set the categorical encoding method.
    pub fn encoding_method(mut self, method: EncodingMethod) -> Self {
        self.config.encoding_method = method;
        self
    }

    /// Set the label assignment order.
    pub fn label_order(mut self, order: LabelOrder) -> Self {
        self.config.label_order = order;
        self
    }

    /// Set the label/one-hot cut-over used by `Auto` encoding.
    pub fn max_label_categories(mut self, max: usize) -> Self {
        self.config.max_label_categories = max;
        self
    }

    /// Set the scaling method.
    pub fn scaling_method(mut self, method: ScalingMethod) -> Self {
        self.config.scaling_method = method;
        self
    }

    /// Enable or disable writing the JSON cleaning summary.
    pub fn write_summary(mut self, write: bool) -> Self {
        self.config.write_summary = write;
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `AnalysisConfig` or an error if validation fails.
    pub fn build(self) -> Result<AnalysisConfig, ConfigValidationError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
