//! Dataset loading and initial assessment.

mod assessor;

use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{AnalysisError, Result, ResultExt};

pub(crate) use assessor::count_duplicates;
pub use assessor::{AssessmentReport, Assessor, CategoricalSummary, ColumnOverview};

/// Read a delimited file with a header row into a table.
///
/// A missing file is reported as [`AnalysisError::DatasetNotFound`]; a row
/// that does not parse, or whose field count differs from the header, fails
/// the whole load.
pub fn load_dataset(path: impl AsRef<Path>, separator: u8) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(AnalysisError::dataset_not_found(path));
    }
    let records = check_record_lengths(path, separator)?;
    debug!("{} records share the header's field count", records);

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .with_parse_options(
            CsvParseOptions::default()
                .with_separator(separator)
                .with_quote_char(Some(b'"')),
        )
        .try_into_reader_with_file_path(Some(PathBuf::from(path)))
        .context(format!("Failed to open '{}'", path.display()))?
        .finish()
        .context(format!("Failed to parse '{}'", path.display()))?;

    info!(
        "Loaded {} rows x {} columns from {}",
        df.height(),
        df.width(),
        path.display()
    );
    Ok(df)
}

/// Polars pads short rows with nulls, so field counts are checked up front.
fn check_record_lengths(path: &Path, separator: u8) -> Result<usize> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(separator)
        .quote(b'"')
        .flexible(false)
        .from_path(path)
        .context(format!("Failed to open '{}'", path.display()))?;

    let mut records = 0;
    for record in reader.byte_records() {
        record.context(format!("Failed to parse '{}'", path.display()))?;
        records += 1;
    }
    Ok(records)
}
