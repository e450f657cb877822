//! Imputation module for handling missing values.
//!
//! Numeric columns are filled with their median or mean, categorical
//! columns with their mode or a constant.

mod statistical;

pub use statistical::{Imputation, StatisticalImputer, UNKNOWN_CATEGORY};
