//! Report generation module.
//!
//! [`ReportWriter`] owns the output directory and writes every artifact
//! the pipeline produces: markdown reports, JSON side files and the cleaned
//! CSV. The markdown content itself lives in [`markdown`].

pub mod markdown;

use polars::prelude::*;
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, ResultExt};

/// Writes pipeline artifacts into one output directory.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    output_dir: PathBuf,
}

impl ReportWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn prepare(&self, file_name: &str) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir).context(format!(
            "Failed to create output directory '{}'",
            self.output_dir.display()
        ))?;
        Ok(self.output_dir.join(file_name))
    }

    /// Write a text file (markdown reports).
    pub fn write_text(&self, file_name: &str, content: &str) -> Result<PathBuf> {
        let path = self.prepare(file_name)?;
        fs::write(&path, content).context(format!("Failed to write '{}'", path.display()))?;
        info!("Report saved: {}", path.display());
        Ok(path)
    }

    /// Write a value as pretty-printed JSON.
    pub fn write_json<T: Serialize + ?Sized>(&self, file_name: &str, value: &T) -> Result<PathBuf> {
        let path = self.prepare(file_name)?;
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json).context(format!("Failed to write '{}'", path.display()))?;
        info!("JSON saved: {}", path.display());
        Ok(path)
    }

    /// Write a table as CSV with a header row.
    pub fn write_csv(&self, file_name: &str, df: &mut DataFrame, separator: u8) -> Result<PathBuf> {
        let path = self.prepare(file_name)?;
        let mut file =
            File::create(&path).context(format!("Failed to create '{}'", path.display()))?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .with_separator(separator)
            .with_quote_char(b'"')
            .finish(df)
            .context(format!("Failed to write '{}'", path.display()))?;
        info!("Dataset saved: {}", path.display());
        Ok(path)
    }
}
