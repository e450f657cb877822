//! Categorical encoding: label (category -> integer) and one-hot
//! (one 0/1 indicator column per category).
//!
//! Encodings are fitted once by the cleaner, persisted as JSON and replayed
//! on new rows by [`crate::transform`].

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::config::{EncodingMethod, LabelOrder};
use crate::error::{AnalysisError, Result};
use crate::utils::{distinct_in_order, optional_string_values};

/// Encoding of one column, as stored in `<output_name>_encoding_map.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum ColumnEncoding {
    Label {
        mapping: BTreeMap<String, u32>,
    },
    OneHot {
        categories: Vec<String>,
        columns: Vec<String>,
    },
}

/// Encodings keyed by original column name.
pub type EncodingMap = BTreeMap<String, ColumnEncoding>;

impl ColumnEncoding {
    pub fn method_name(&self) -> &'static str {
        match self {
            Self::Label { .. } => "label",
            Self::OneHot { .. } => "one_hot",
        }
    }

    /// Number of distinct categories covered.
    pub fn category_count(&self) -> usize {
        match self {
            Self::Label { mapping } => mapping.len(),
            Self::OneHot { categories, .. } => categories.len(),
        }
    }
}

/// Name of the indicator column for `category` of `column`.
pub fn indicator_name(column: &str, category: &str) -> String {
    format!("{}_{}", column, category)
}

/// Fits and applies categorical encodings.
pub struct CategoricalEncoder;

impl CategoricalEncoder {
    /// Choose and fit an encoding for `series`.
    ///
    /// `auto` label-encodes up to `max_label_categories` distinct values and
    /// one-hot encodes above that. Returns `None` for [`EncodingMethod::None`].
    pub fn fit(
        series: &Series,
        method: EncodingMethod,
        order: LabelOrder,
        max_label_categories: usize,
    ) -> Result<Option<ColumnEncoding>> {
        let mut categories = distinct_in_order(series)?;
        if order == LabelOrder::Sorted {
            categories.sort();
        }

        let one_hot = match method {
            EncodingMethod::None => return Ok(None),
            EncodingMethod::Label => false,
            EncodingMethod::OneHot => true,
            EncodingMethod::Auto => categories.len() > max_label_categories,
        };

        let name = series.name().as_str();
        let encoding = if one_hot {
            ColumnEncoding::OneHot {
                columns: categories.iter().map(|c| indicator_name(name, c)).collect(),
                categories,
            }
        } else {
            ColumnEncoding::Label {
                mapping: categories
                    .into_iter()
                    .enumerate()
                    .map(|(idx, category)| (category, idx as u32))
                    .collect(),
            }
        };
        Ok(Some(encoding))
    }

    /// Replace `column` in `df` according to `encoding`.
    ///
    /// Label encoding fails on a category absent from the mapping; nulls stay
    /// null. One-hot encoding maps unseen categories and nulls to all zeros,
    /// so a row carries exactly one set indicator only when its value was
    /// seen at fit time. Indicator columns take the original column's
    /// position.
    pub fn apply(df: &mut DataFrame, column: &str, encoding: &ColumnEncoding) -> Result<()> {
        let series = df.column(column)?.as_materialized_series();
        let values = optional_string_values(series)?;

        match encoding {
            ColumnEncoding::Label { mapping } => {
                let encoded = values
                    .iter()
                    .map(|value| match value {
                        None => Ok(None),
                        Some(v) => mapping.get(v).copied().map(Some).ok_or_else(|| {
                            AnalysisError::UnknownCategory {
                                column: column.to_string(),
                                category: v.clone(),
                            }
                        }),
                    })
                    .collect::<Result<Vec<Option<u32>>>>()?;
                df.replace(column, Series::new(column.into(), encoded))?;
            }
            ColumnEncoding::OneHot {
                categories,
                columns,
            } => {
                let position = df
                    .get_column_index(column)
                    .ok_or_else(|| AnalysisError::ColumnNotFound(column.to_string()))?;
                df.drop_in_place(column)?;
                for (offset, (category, name)) in categories.iter().zip(columns).enumerate() {
                    let indicator: Vec<i32> = values
                        .iter()
                        .map(|v| i32::from(v.as_deref() == Some(category.as_str())))
                        .collect();
                    df.insert_column(position + offset, Series::new(name.as_str().into(), indicator))?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn region() -> Series {
        Series::new("region".into(), &["Urban", "Rural", "Urban", "Suburban"])
    }

    // ==================== fit tests ====================

    #[test]
    fn test_fit_label_first_seen() {
        let encoding =
            CategoricalEncoder::fit(&region(), EncodingMethod::Label, LabelOrder::FirstSeen, 10)
                .unwrap()
                .unwrap();
        let ColumnEncoding::Label { mapping } = encoding else {
            panic!("expected label encoding");
        };
        assert_eq!(mapping["Urban"], 0);
        assert_eq!(mapping["Rural"], 1);
        assert_eq!(mapping["Suburban"], 2);
    }

    #[test]
    fn test_fit_label_sorted() {
        let encoding =
            CategoricalEncoder::fit(&region(), EncodingMethod::Label, LabelOrder::Sorted, 10)
                .unwrap()
                .unwrap();
        let ColumnEncoding::Label { mapping } = encoding else {
            panic!("expected label encoding");
        };
        assert_eq!(mapping["Rural"], 0);
        assert_eq!(mapping["Suburban"], 1);
        assert_eq!(mapping["Urban"], 2);
    }

    #[test]
    fn test_fit_auto_switches_to_one_hot() {
        let auto_small =
            CategoricalEncoder::fit(&region(), EncodingMethod::Auto, LabelOrder::FirstSeen, 10)
                .unwrap()
                .unwrap();
        assert_eq!(auto_small.method_name(), "label");

        let auto_large =
            CategoricalEncoder::fit(&region(), EncodingMethod::Auto, LabelOrder::FirstSeen, 2)
                .unwrap()
                .unwrap();
        assert_eq!(auto_large.method_name(), "one_hot");
    }

    #[test]
    fn test_fit_none() {
        let encoding =
            CategoricalEncoder::fit(&region(), EncodingMethod::None, LabelOrder::FirstSeen, 10)
                .unwrap();
        assert_eq!(encoding, None);
    }

    // ==================== apply tests ====================

    #[test]
    fn test_label_encoding_is_bijection() {
        let mut df = df!["region" => ["Urban", "Rural", "Urban", "Suburban"]].unwrap();
        let encoding = CategoricalEncoder::fit(
            df.column("region").unwrap().as_materialized_series(),
            EncodingMethod::Label,
            LabelOrder::FirstSeen,
            10,
        )
        .unwrap()
        .unwrap();
        CategoricalEncoder::apply(&mut df, "region", &encoding).unwrap();

        let codes: Vec<Option<u32>> = df
            .column("region")
            .unwrap()
            .as_materialized_series()
            .u32()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(codes, vec![Some(0), Some(1), Some(0), Some(2)]);

        let ColumnEncoding::Label { mapping } = encoding else {
            panic!("expected label encoding");
        };
        let mut seen: Vec<u32> = mapping.values().copied().collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), mapping.len());
    }

    #[test]
    fn test_label_encoding_unknown_category() {
        let mut df = df!["region" => ["Urban", "Coastal"]].unwrap();
        let encoding = ColumnEncoding::Label {
            mapping: BTreeMap::from([("Urban".to_string(), 0)]),
        };
        let err = CategoricalEncoder::apply(&mut df, "region", &encoding).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::UnknownCategory { ref category, .. } if category == "Coastal"
        ));
    }

    #[test]
    fn test_one_hot_one_indicator_per_row() {
        let mut df = df![
            "income" => [1.0, 2.0, 3.0, 4.0],
            "region" => ["Urban", "Rural", "Urban", "Suburban"],
            "age" => [30i64, 40, 50, 60],
        ]
        .unwrap();
        let encoding = CategoricalEncoder::fit(
            df.column("region").unwrap().as_materialized_series(),
            EncodingMethod::OneHot,
            LabelOrder::FirstSeen,
            10,
        )
        .unwrap()
        .unwrap();
        CategoricalEncoder::apply(&mut df, "region", &encoding).unwrap();

        let names: Vec<String> = df.get_column_names().iter().map(|n| n.to_string()).collect();
        assert_eq!(
            names,
            vec!["income", "region_Urban", "region_Rural", "region_Suburban", "age"]
        );
        for row in 0..df.height() {
            let total: i32 = ["region_Urban", "region_Rural", "region_Suburban"]
                .iter()
                .map(|c| {
                    df.column(c)
                        .unwrap()
                        .get(row)
                        .unwrap()
                        .try_extract::<i32>()
                        .unwrap()
                })
                .sum();
            assert_eq!(total, 1);
        }
    }

    #[test]
    fn test_one_hot_unseen_category_is_all_zero() {
        let mut df = df!["region" => ["Coastal"]].unwrap();
        let encoding = ColumnEncoding::OneHot {
            categories: vec!["Urban".to_string(), "Rural".to_string()],
            columns: vec!["region_Urban".to_string(), "region_Rural".to_string()],
        };
        CategoricalEncoder::apply(&mut df, "region", &encoding).unwrap();
        assert_eq!(df.width(), 2);
        assert_eq!(
            df.column("region_Urban").unwrap().get(0).unwrap().try_extract::<i32>().unwrap(),
            0
        );
    }

    #[test]
    fn test_encoding_json_shape() {
        let encoding = ColumnEncoding::Label {
            mapping: BTreeMap::from([("No".to_string(), 1), ("Yes".to_string(), 0)]),
        };
        let json = serde_json::to_value(&encoding).unwrap();
        assert_eq!(json["method"], "label");
        assert_eq!(json["mapping"]["Yes"], 0);

        let one_hot: ColumnEncoding = serde_json::from_str(
            r#"{"method":"one_hot","categories":["a"],"columns":["c_a"]}"#,
        )
        .unwrap();
        assert_eq!(one_hot.category_count(), 1);
    }
}
