//! Cleaning pipeline.
//!
//! [`DataCleaner`] runs five stages in a fixed order, each toggled by
//! [`AnalysisConfig`]:
//!
//! 1. missing values (optional column drop, then imputation)
//! 2. duplicate rows
//! 3. outliers on numeric feature columns
//! 4. categorical encoding
//! 5. scaling of the numeric feature columns from stage 3
//!
//! Identifier columns pass through untouched.

pub mod encoding;
pub mod outliers;
pub mod scaling;

pub use encoding::{CategoricalEncoder, ColumnEncoding, EncodingMap};
pub use outliers::{ColumnOutliers, OutlierHandler, OutlierOutcome};
pub use scaling::{ScalingParams, ScalingParamsMap};

use polars::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{AnalysisConfig, EncodingMethod, OutlierStrategy, ScalingMethod};
use crate::error::Result;
use crate::imputers::StatisticalImputer;
use crate::loader::count_duplicates;
use crate::reporting::ReportWriter;
use crate::types::{ActionType, CleaningAction, CleaningSummary, DatasetSchema};
use crate::utils::dtype_name;

/// Everything the cleaner produced.
#[derive(Debug, Clone)]
pub struct CleaningResult {
    pub data: DataFrame,
    pub encoding_map: EncodingMap,
    pub scaling_params: ScalingParamsMap,
    pub summary: CleaningSummary,
    /// Files written by [`DataCleaner::run`]; empty after [`DataCleaner::clean`].
    pub written_files: Vec<PathBuf>,
}

/// Runs the cleaning stages for one configuration.
pub struct DataCleaner<'a> {
    config: &'a AnalysisConfig,
}

static_assertions::assert_impl_all!(DataCleaner<'static>: Send, Sync);
static_assertions::assert_impl_all!(CleaningResult: Send);

impl<'a> DataCleaner<'a> {
    pub fn new(config: &'a AnalysisConfig) -> Self {
        Self { config }
    }

    /// Clean `df` and write the cleaned table, encoding map, scaling
    /// parameters and (optionally) the summary into the output directory.
    pub fn run(&self, df: DataFrame, schema: &DatasetSchema) -> Result<CleaningResult> {
        let mut result = self.clean(df, schema)?;
        let writer = ReportWriter::new(&self.config.output_dir);
        let name = &self.config.output_name;

        let mut files = vec![
            writer.write_csv(
                &format!("{}.csv", name),
                &mut result.data,
                self.config.separator_byte(),
            )?,
            writer.write_json(&format!("{}_encoding_map.json", name), &result.encoding_map)?,
            writer.write_json(
                &format!("{}_scaling_params.json", name),
                &result.scaling_params,
            )?,
        ];
        if self.config.write_summary {
            files.push(writer.write_json(&format!("{}_summary.json", name), &result.summary)?);
        }
        result.written_files = files;
        Ok(result)
    }

    /// Run every enabled stage in memory.
    pub fn clean(&self, mut df: DataFrame, schema: &DatasetSchema) -> Result<CleaningResult> {
        let start = Instant::now();
        let mut summary = CleaningSummary::new();
        summary.rows_before = df.height();
        summary.columns_before = df.width();
        summary.missing_before = total_nulls(&df);

        for column in df.get_columns() {
            let col_summary = summary.column_mut(column.name(), &dtype_name(column.dtype()));
            col_summary.missing_before = column.null_count();
        }

        let features = self.numeric_features(&df, schema);

        info!("Step 1: Handling missing values...");
        self.handle_missing(&mut df, schema, &mut summary)?;

        info!("Step 2: Removing duplicate rows...");
        self.remove_duplicates(&mut df, &mut summary)?;

        info!("Step 3: Handling outliers...");
        // columns dropped in step 1 are no longer features
        let features: Vec<String> = features
            .into_iter()
            .filter(|c| df.get_column_index(c).is_some())
            .collect();
        self.handle_outliers(&mut df, &features, &mut summary)?;

        info!("Step 4: Encoding categorical columns...");
        let encoding_map = self.encode(&mut df, schema, &mut summary)?;

        info!("Step 5: Scaling numeric features...");
        let scaling_params = self.scale(&mut df, &features, &mut summary)?;

        for col_summary in summary.column_summaries.iter_mut() {
            col_summary.missing_after = df
                .column(&col_summary.name)
                .map(|c| c.null_count())
                .unwrap_or(0);
        }
        summary.rows_after = df.height();
        summary.columns_after = df.width();
        summary.rows_removed = summary.rows_before - summary.rows_after;
        summary.missing_after = total_nulls(&df);
        summary.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Cleaning completed: {} -> {} rows, {} -> {} columns",
            summary.rows_before, summary.rows_after, summary.columns_before, summary.columns_after
        );

        Ok(CleaningResult {
            data: df,
            encoding_map,
            scaling_params,
            summary,
            written_files: Vec::new(),
        })
    }

    /// Numeric columns that are neither identifier nor target.
    fn numeric_features(&self, df: &DataFrame, schema: &DatasetSchema) -> Vec<String> {
        schema
            .numeric_columns()
            .into_iter()
            .filter(|c| *c != self.config.target_column)
            .filter(|c| df.get_column_index(c).is_some())
            .collect()
    }

    fn handle_missing(
        &self,
        df: &mut DataFrame,
        schema: &DatasetSchema,
        summary: &mut CleaningSummary,
    ) -> Result<()> {
        if let Some(threshold) = self.config.missing_column_threshold {
            self.drop_sparse_columns(df, schema, threshold, summary)?;
        }

        if !self.config.handle_missing {
            debug!("Missing-value imputation disabled");
            return Ok(());
        }

        for name in schema.numeric_columns() {
            if df.get_column_index(&name).is_none() {
                continue;
            }
            match StatisticalImputer::impute_numeric(df, &name, self.config.numeric_imputation)? {
                Some(imputation) => {
                    debug!(
                        "Imputed {} values in '{}' with {} {}",
                        imputation.filled, name, imputation.method, imputation.fill_value
                    );
                    summary.add_action(
                        CleaningAction::new(
                            ActionType::ValueImputed,
                            &name,
                            format!("Filled {} missing values", imputation.filled),
                        )
                        .with_details(format!("{} = {}", imputation.method, imputation.fill_value)),
                    );
                    summary.column_mut(&name, "numeric").imputation_method =
                        Some(imputation.method.to_string());
                }
                None if df.column(&name)?.null_count() > 0 => {
                    warn!("Column '{}' has no values to impute from", name);
                    summary.add_warning(format!(
                        "Column '{}' is entirely missing and was not imputed",
                        name
                    ));
                }
                None => {}
            }
        }

        for name in schema.categorical_columns() {
            if df.get_column_index(&name).is_none() {
                continue;
            }
            let strategy = self.config.categorical_imputation;
            match StatisticalImputer::impute_categorical(df, &name, strategy)? {
                Some(imputation) => {
                    debug!(
                        "Imputed {} values in '{}' with '{}'",
                        imputation.filled, name, imputation.fill_value
                    );
                    summary.add_action(
                        CleaningAction::new(
                            ActionType::ValueImputed,
                            &name,
                            format!("Filled {} missing values", imputation.filled),
                        )
                        .with_details(format!("{} = '{}'", imputation.method, imputation.fill_value)),
                    );
                    summary.column_mut(&name, "categorical").imputation_method =
                        Some(imputation.method.to_string());
                }
                None if df.column(&name)?.null_count() > 0 => {
                    warn!("Column '{}' has no mode to impute with", name);
                    summary.add_warning(format!(
                        "Column '{}' is entirely missing and was not imputed",
                        name
                    ));
                }
                None => {}
            }
        }
        Ok(())
    }

    /// Drop columns whose missing fraction exceeds `threshold`. The target
    /// and identifier columns are always kept.
    fn drop_sparse_columns(
        &self,
        df: &mut DataFrame,
        schema: &DatasetSchema,
        threshold: f64,
        summary: &mut CleaningSummary,
    ) -> Result<()> {
        let height = df.height();
        if height == 0 {
            return Ok(());
        }
        let identifiers = schema.identifier_columns();
        let sparse: Vec<(String, f64)> = df
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), c.null_count() as f64 / height as f64))
            .filter(|(name, fraction)| {
                *fraction > threshold
                    && *name != self.config.target_column
                    && !identifiers.contains(name)
            })
            .collect();

        for (name, fraction) in sparse {
            df.drop_in_place(&name)?;
            let reason = format!(
                "{:.1}% missing exceeds threshold of {:.1}%",
                fraction * 100.0,
                threshold * 100.0
            );
            info!("Dropped column '{}': {}", name, reason);
            summary.add_action(CleaningAction::new(
                ActionType::ColumnRemoved,
                &name,
                reason.clone(),
            ));
            summary.column_mut(&name, "unknown").mark_removed(reason);
        }
        Ok(())
    }

    fn remove_duplicates(&self, df: &mut DataFrame, summary: &mut CleaningSummary) -> Result<()> {
        if !self.config.remove_duplicates {
            debug!("Duplicate removal disabled");
            return Ok(());
        }
        let duplicates = count_duplicates(df)?;
        if duplicates == 0 {
            debug!("No duplicate rows found");
            return Ok(());
        }

        *df = df.unique_stable(None, UniqueKeepStrategy::First, None)?;
        info!("Removed {} duplicate rows", duplicates);
        summary.add_action(CleaningAction::new(
            ActionType::DuplicatesRemoved,
            "dataset",
            format!("Removed {} exact duplicate rows (first occurrence kept)", duplicates),
        ));
        Ok(())
    }

    fn handle_outliers(
        &self,
        df: &mut DataFrame,
        features: &[String],
        summary: &mut CleaningSummary,
    ) -> Result<()> {
        let strategy = self.config.outlier_strategy;
        if strategy == OutlierStrategy::Keep {
            debug!("Outlier handling disabled");
            return Ok(());
        }

        let outcome =
            OutlierHandler::handle_outliers(df, features, strategy, self.config.iqr_multiplier)?;
        for fence in &outcome.columns {
            let details = format!("fences [{:.4}, {:.4}]", fence.lower, fence.upper);
            let action = match strategy {
                OutlierStrategy::Cap => CleaningAction::new(
                    ActionType::OutliersCapped,
                    &fence.column,
                    format!("Capped {} out-of-fence values", fence.count),
                ),
                _ => CleaningAction::new(
                    ActionType::OutlierRowsRemoved,
                    &fence.column,
                    format!("{} out-of-fence values", fence.count),
                ),
            };
            summary.add_action(action.with_details(details));
            summary.column_mut(&fence.column, "numeric").outliers_handled = fence.count;
        }
        if outcome.rows_removed > 0 {
            info!("Removed {} rows containing outliers", outcome.rows_removed);
            summary.add_action(CleaningAction::new(
                ActionType::OutlierRowsRemoved,
                "dataset",
                format!("Removed {} rows containing outliers", outcome.rows_removed),
            ));
        }
        Ok(())
    }

    fn encode(
        &self,
        df: &mut DataFrame,
        schema: &DatasetSchema,
        summary: &mut CleaningSummary,
    ) -> Result<EncodingMap> {
        let mut encoding_map = EncodingMap::new();
        if self.config.encoding_method == EncodingMethod::None {
            debug!("Categorical encoding disabled");
            return Ok(encoding_map);
        }

        for name in schema.categorical_columns() {
            if df.get_column_index(&name).is_none() {
                continue;
            }
            let series = df.column(&name)?.as_materialized_series().clone();
            let Some(encoding) = CategoricalEncoder::fit(
                &series,
                self.config.encoding_method,
                self.config.label_order,
                self.config.max_label_categories,
            )?
            else {
                continue;
            };

            let nulls = series.null_count();
            if nulls > 0 && matches!(encoding, ColumnEncoding::OneHot { .. }) {
                let note = format!(
                    "'{}' has {} missing values; those rows get no one-hot indicator set",
                    name, nulls
                );
                warn!("{}", note);
                summary.add_warning(note);
            }

            CategoricalEncoder::apply(df, &name, &encoding)?;
            debug!(
                "Encoded '{}' ({}, {} categories)",
                name,
                encoding.method_name(),
                encoding.category_count()
            );
            summary.add_action(CleaningAction::new(
                ActionType::CategoriesEncoded,
                &name,
                format!(
                    "{} encoding of {} categories",
                    encoding.method_name(),
                    encoding.category_count()
                ),
            ));
            summary.column_mut(&name, "categorical").encoding =
                Some(encoding.method_name().to_string());
            encoding_map.insert(name, encoding);
        }
        Ok(encoding_map)
    }

    fn scale(
        &self,
        df: &mut DataFrame,
        features: &[String],
        summary: &mut CleaningSummary,
    ) -> Result<ScalingParamsMap> {
        let mut params_map = ScalingParamsMap::new();
        if self.config.scaling_method == ScalingMethod::None {
            debug!("Scaling disabled");
            return Ok(params_map);
        }

        for name in features {
            let series = df.column(name)?.as_materialized_series().clone();
            let Some(params) = ScalingParams::fit(&series, self.config.scaling_method)? else {
                warn!("Column '{}' has no values to scale", name);
                summary.add_warning(format!("Column '{}' has no values and was not scaled", name));
                continue;
            };
            if params.is_constant() {
                warn!("Column '{}' is constant; scaled values set to 0.0", name);
                summary.add_warning(format!(
                    "Column '{}' is constant; scaled values set to 0.0",
                    name
                ));
            }

            params.apply(df, name)?;
            summary.add_action(CleaningAction::new(
                ActionType::DataScaled,
                name,
                format!("Applied {}", params.method_name()),
            ));
            summary.column_mut(name, "numeric").scaling = Some(params.method_name().to_string());
            params_map.insert(name.clone(), params);
        }
        Ok(params_map)
    }
}

fn total_nulls(df: &DataFrame) -> usize {
    df.get_columns().iter().map(|c| c.null_count()).sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profiler::DataProfiler;
    use crate::profiler::statistics::{mean, sample_std};
    use crate::utils::finite_f64_values;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn sample_df() -> DataFrame {
        df![
            "loan_id" => ["L001", "L002", "L003", "L004", "L005", "L006", "L004"],
            "income" => [Some(40_000.0), None, Some(52_000.0), Some(61_000.0), Some(48_000.0), Some(900_000.0), Some(61_000.0)],
            "region" => [Some("Urban"), Some("Rural"), None, Some("Urban"), Some("Suburban"), Some("Urban"), Some("Urban")],
            "loan_approval_status" => ["Approved", "Rejected", "Approved", "Approved", "Rejected", "Approved", "Approved"],
        ]
        .unwrap()
    }

    fn config(dir: &TempDir) -> AnalysisConfig {
        AnalysisConfig::builder()
            .output_dir(dir.path())
            .id_column("loan_id")
            .render_charts(false)
            .build()
            .unwrap()
    }

    fn clean(config: &AnalysisConfig, df: DataFrame) -> CleaningResult {
        let schema = DataProfiler::infer_schema(&df, config.id_column.as_deref()).unwrap();
        DataCleaner::new(config).clean(df, &schema).unwrap()
    }

    #[test]
    fn test_clean_default_pipeline() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let result = clean(&config, sample_df());

        assert_eq!(result.summary.rows_before, 7);
        assert_eq!(result.summary.rows_after, 6);
        assert_eq!(result.data.column("income").unwrap().null_count(), 0);
        // identifiers untouched
        assert_eq!(result.data.column("loan_id").unwrap().dtype(), &DataType::String);
        // region and target are label-encoded
        assert!(result.encoding_map.contains_key("region"));
        assert!(result.encoding_map.contains_key("loan_approval_status"));
        assert!(result.scaling_params.contains_key("income"));

        let income = finite_f64_values(
            result.data.column("income").unwrap().as_materialized_series(),
        )
        .unwrap();
        assert!(mean(&income).unwrap().abs() < 1e-9);
        assert!((sample_std(&income).unwrap() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_clean_keeps_everything_when_disabled() {
        let dir = TempDir::new().unwrap();
        let config = AnalysisConfig::builder()
            .output_dir(dir.path())
            .id_column("loan_id")
            .handle_missing(false)
            .remove_duplicates(false)
            .outlier_strategy(OutlierStrategy::Keep)
            .encoding_method(EncodingMethod::None)
            .scaling_method(ScalingMethod::None)
            .build()
            .unwrap();
        let input = sample_df();
        let result = clean(&config, input.clone());

        assert!(result.data.equals_missing(&input));
        assert!(result.summary.actions.is_empty());
        assert!(result.encoding_map.is_empty());
    }

    #[test]
    fn test_clean_remove_outliers_never_grows() {
        let dir = TempDir::new().unwrap();
        let config = AnalysisConfig::builder()
            .output_dir(dir.path())
            .id_column("loan_id")
            .outlier_strategy(OutlierStrategy::Remove)
            .scaling_method(ScalingMethod::None)
            .build()
            .unwrap();
        let result = clean(&config, sample_df());

        assert!(result.data.height() <= 7);
        let income = finite_f64_values(
            result.data.column("income").unwrap().as_materialized_series(),
        )
        .unwrap();
        assert!(!income.contains(&900_000.0));
    }

    #[test]
    fn test_missing_column_threshold_spares_target() {
        let dir = TempDir::new().unwrap();
        let config = AnalysisConfig::builder()
            .output_dir(dir.path())
            .missing_column_threshold(0.5)
            .scaling_method(ScalingMethod::None)
            .encoding_method(EncodingMethod::None)
            .build()
            .unwrap();
        let df = df![
            "notes" => [None, None, None, Some("x")],
            "age" => [30i64, 41, 52, 63],
            "loan_approval_status" => [None, None, None, Some("Approved")],
        ]
        .unwrap();
        let result = clean(&config, df);

        assert!(result.data.column("notes").is_err());
        assert!(result.data.column("loan_approval_status").is_ok());
        let notes = result
            .summary
            .column_summaries
            .iter()
            .find(|c| c.name == "notes")
            .unwrap();
        assert!(notes.was_removed);
    }

    #[test]
    fn test_one_hot_with_unimputed_nulls_warns() {
        let dir = TempDir::new().unwrap();
        let config = AnalysisConfig::builder()
            .output_dir(dir.path())
            .id_column("loan_id")
            .render_charts(false)
            .handle_missing(false)
            .encoding_method(EncodingMethod::OneHot)
            .build()
            .unwrap();
        let result = clean(&config, sample_df());

        assert!(
            result
                .summary
                .warnings
                .iter()
                .any(|w| w.contains("'region' has 1 missing values"))
        );

        let set_per_row: Vec<i32> = (0..result.data.height())
            .map(|row| {
                ["region_Urban", "region_Rural", "region_Suburban"]
                    .iter()
                    .map(|c| {
                        result.data.column(c).unwrap().get(row).unwrap().try_extract::<i32>().unwrap()
                    })
                    .sum()
            })
            .collect();
        assert_eq!(set_per_row, vec![1, 1, 0, 1, 1, 1]);
    }

    #[test]
    fn test_constant_column_warns() {
        let dir = TempDir::new().unwrap();
        let config = AnalysisConfig::builder()
            .output_dir(dir.path())
            .build()
            .unwrap();
        let df = df![
            "term" => [36i64, 36, 36],
            "age" => [30i64, 40, 50],
            "loan_approval_status" => ["Approved", "Rejected", "Approved"],
        ]
        .unwrap();
        let result = clean(&config, df);
        assert!(result.summary.warnings.iter().any(|w| w.contains("'term' is constant")));
    }

    #[test]
    fn test_run_writes_artifacts() {
        let dir = TempDir::new().unwrap();
        let config = config(&dir);
        let df = sample_df();
        let schema = DataProfiler::infer_schema(&df, Some("loan_id")).unwrap();
        let result = DataCleaner::new(&config).run(df, &schema).unwrap();

        assert_eq!(result.written_files.len(), 4);
        for suffix in [
            ".csv",
            "_encoding_map.json",
            "_scaling_params.json",
            "_summary.json",
        ] {
            let path = dir.path().join(format!("{}{}", config.output_name, suffix));
            assert!(path.exists(), "missing {}", path.display());
        }
    }
}
