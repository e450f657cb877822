//! Replay of persisted cleaning artifacts on new rows.
//!
//! The cleaner writes `<output_name>_encoding_map.json` and
//! `<output_name>_scaling_params.json`; [`TransformArtifacts`] reads them back
//! and applies the same encodings and scaling to another table with the
//! original column layout. New rows usually carry no outcome yet, so an
//! absent target column is skipped with a warning.

use polars::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::cleaner::{CategoricalEncoder, EncodingMap, ScalingParamsMap};
use crate::error::{AnalysisError, Result, ResultExt};

/// Fitted encodings and scaling parameters of one cleaning run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransformArtifacts {
    pub encoding_map: EncodingMap,
    pub scaling_params: ScalingParamsMap,
    /// Column allowed to be absent from the table being transformed.
    pub target_column: Option<String>,
}

static_assertions::assert_impl_all!(TransformArtifacts: Send, Sync);

impl TransformArtifacts {
    pub fn new(encoding_map: EncodingMap, scaling_params: ScalingParamsMap) -> Self {
        Self {
            encoding_map,
            scaling_params,
            target_column: None,
        }
    }

    pub fn with_target_column(mut self, target: impl Into<String>) -> Self {
        self.target_column = Some(target.into());
        self
    }

    /// Read both artifact files.
    pub fn load(encoding_path: impl AsRef<Path>, scaling_path: impl AsRef<Path>) -> Result<Self> {
        let encoding_path = encoding_path.as_ref();
        let scaling_path = scaling_path.as_ref();

        let encoding_map: EncodingMap = serde_json::from_str(
            &fs::read_to_string(encoding_path)
                .context(format!("Reading encoding map '{}'", encoding_path.display()))?,
        )?;
        let scaling_params: ScalingParamsMap = serde_json::from_str(
            &fs::read_to_string(scaling_path)
                .context(format!("Reading scaling parameters '{}'", scaling_path.display()))?,
        )?;

        info!(
            "Loaded {} encodings and {} scaling parameters",
            encoding_map.len(),
            scaling_params.len()
        );
        Ok(Self::new(encoding_map, scaling_params))
    }

    /// Scale, then encode. Every column named in the artifacts must exist in
    /// `df`, except the target column, which is skipped when absent.
    pub fn apply(&self, mut df: DataFrame) -> Result<DataFrame> {
        let is_target = |name: &str| self.target_column.as_deref() == Some(name);
        let missing: Vec<&str> = self
            .scaling_params
            .keys()
            .chain(self.encoding_map.keys())
            .map(String::as_str)
            .filter(|name| df.get_column_index(name).is_none() && !is_target(name))
            .collect();
        if !missing.is_empty() {
            return Err(AnalysisError::SchemaMismatch(format!(
                "columns required by the artifacts are absent: {}",
                missing.join(", ")
            )));
        }

        let present = |name: &str| {
            let found = df.get_column_index(name).is_some();
            if !found {
                warn!("Target column '{}' not in the table; its artifacts are skipped", name);
            }
            found
        };
        let scaled: Vec<&String> = self.scaling_params.keys().filter(|n| present(n)).collect();
        let encoded: Vec<&String> = self.encoding_map.keys().filter(|n| present(n)).collect();

        for name in scaled {
            let params = &self.scaling_params[name];
            params.apply(&mut df, name)?;
            debug!("Scaled '{}' ({})", name, params.method_name());
        }
        for name in encoded {
            let encoding = &self.encoding_map[name];
            CategoricalEncoder::apply(&mut df, name, encoding)
                .context(format!("Encoding column '{}'", name))?;
            debug!("Encoded '{}' ({})", name, encoding.method_name());
        }
        Ok(df)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cleaner::{ColumnEncoding, ScalingParams};
    use crate::reporting::ReportWriter;
    use pretty_assertions::assert_eq;
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn artifacts() -> TransformArtifacts {
        TransformArtifacts::new(
            BTreeMap::from([
                (
                    "region".to_string(),
                    ColumnEncoding::OneHot {
                        categories: vec!["Urban".to_string(), "Rural".to_string()],
                        columns: vec!["region_Urban".to_string(), "region_Rural".to_string()],
                    },
                ),
                (
                    "employment".to_string(),
                    ColumnEncoding::Label {
                        mapping: BTreeMap::from([
                            ("Salaried".to_string(), 0),
                            ("Self-employed".to_string(), 1),
                        ]),
                    },
                ),
            ]),
            BTreeMap::from([(
                "income".to_string(),
                ScalingParams::Standardize {
                    mean: 50_000.0,
                    std: 10_000.0,
                },
            )]),
        )
    }

    #[test]
    fn test_load_round_trips_written_files() {
        let dir = TempDir::new().unwrap();
        let writer = ReportWriter::new(dir.path());
        let expected = artifacts();
        let enc = writer.write_json("enc.json", &expected.encoding_map).unwrap();
        let scl = writer.write_json("scl.json", &expected.scaling_params).unwrap();

        assert_eq!(TransformArtifacts::load(enc, scl).unwrap(), expected);
    }

    #[test]
    fn test_apply_scales_and_encodes() {
        let df = df![
            "income" => [60_000.0, 40_000.0],
            "region" => ["Rural", "Coastal"],
            "employment" => ["Self-employed", "Salaried"],
        ]
        .unwrap();
        let out = artifacts().apply(df).unwrap();

        let income: Vec<Option<f64>> = out
            .column("income")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(income, vec![Some(1.0), Some(-1.0)]);

        // unseen one-hot category is an all-zero row
        let urban = out.column("region_Urban").unwrap();
        let rural = out.column("region_Rural").unwrap();
        assert_eq!(rural.get(0).unwrap().try_extract::<i32>().unwrap(), 1);
        assert_eq!(urban.get(1).unwrap().try_extract::<i32>().unwrap(), 0);
        assert_eq!(rural.get(1).unwrap().try_extract::<i32>().unwrap(), 0);
    }

    #[test]
    fn test_apply_unknown_label_category() {
        let df = df![
            "income" => [60_000.0],
            "region" => ["Urban"],
            "employment" => ["Retired"],
        ]
        .unwrap();
        let err = artifacts().apply(df).unwrap_err();
        assert_eq!(err.error_code(), "UNKNOWN_CATEGORY");
    }

    #[test]
    fn test_apply_missing_column() {
        let df = df!["income" => [60_000.0]].unwrap();
        let err = artifacts().apply(df).unwrap_err();
        assert!(matches!(err, AnalysisError::SchemaMismatch(_)));
    }

    #[test]
    fn test_apply_skips_absent_target() {
        let df = df![
            "income" => [50_000.0],
            "region" => ["Urban"],
        ]
        .unwrap();
        let out = artifacts()
            .with_target_column("employment")
            .apply(df)
            .unwrap();

        assert_eq!(
            out.get_column_names(),
            vec!["income", "region_Urban", "region_Rural"]
        );
    }

    #[test]
    fn test_absent_non_target_column_still_fails() {
        let df = df!["income" => [50_000.0], "employment" => ["Salaried"]].unwrap();
        let err = artifacts()
            .with_target_column("employment")
            .apply(df)
            .unwrap_err();
        assert!(err.to_string().contains("region"));
    }
}
