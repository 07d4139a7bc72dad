//! Output Writer
//! Persists the transformed dataset and the cleaning report.

use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use thiserror::Error;

use crate::data::schema::OUTPUT_COLUMNS;
use crate::data::CleanReport;

#[derive(Error, Debug)]
pub enum WriterError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Writes the pipeline's persisted artifacts, overwriting prior versions.
pub struct OutputWriter;

impl OutputWriter {
    /// Serialize the transformed frame to a single CSV with the fixed
    /// column order. This is the sole persisted dataset artifact.
    pub fn write_transformed(df: &DataFrame, path: &Path) -> Result<(), WriterError> {
        let mut ordered = df.select(OUTPUT_COLUMNS)?;

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = File::create(path)?;
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut ordered)?;
        Ok(())
    }

    /// Persist the drop/imputation counts next to the dataset.
    pub fn write_report(report: &CleanReport, path: &Path) -> Result<(), WriterError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, report)?;
        Ok(())
    }
}
