//! CSV Data Loader Module
//! Handles loading of the EM-DAT export and auxiliary datasets using Polars.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("Failed to load CSV: {0}")]
    CsvError(#[from] PolarsError),
    #[error("Input file not found: {0}")]
    MissingFile(PathBuf),
}

/// Reads input CSVs from a fixed data directory.
pub struct DataLoader {
    data_dir: PathBuf,
}

impl DataLoader {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Load a CSV file from the data directory.
    ///
    /// A missing file is fatal; malformed cells are tolerated here and
    /// handled row-by-row in the transformer.
    pub fn load_csv(&self, file_name: &str) -> Result<DataFrame, LoaderError> {
        let path = self.data_dir.join(file_name);
        if !path.is_file() {
            return Err(LoaderError::MissingFile(path));
        }

        // Use lazy evaluation for memory efficiency, then collect
        let df = LazyCsvReader::new(&path)
            .with_infer_schema_length(Some(10000))
            .with_ignore_errors(true)
            .finish()?
            .collect()?;

        Ok(df)
    }

    /// Load an auxiliary CSV if a file name was configured.
    pub fn load_optional_csv(
        &self,
        file_name: Option<&str>,
    ) -> Result<Option<DataFrame>, LoaderError> {
        match file_name {
            Some(name) => self.load_csv(name).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_file_is_reported_before_processing() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DataLoader::new(dir.path());

        let err = loader.load_csv("emdat.csv").unwrap_err();
        assert!(matches!(err, LoaderError::MissingFile(_)));
    }

    #[test]
    fn loads_csv_from_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("emdat.csv")).unwrap();
        writeln!(file, "Country,Start_Year,Total_Deaths").unwrap();
        writeln!(file, "Austria,1999,12").unwrap();
        writeln!(file, "Japan,2011,15894").unwrap();

        let loader = DataLoader::new(dir.path());
        let df = loader.load_csv("emdat.csv").unwrap();
        assert_eq!(df.height(), 2);
        assert_eq!(df.width(), 3);
    }

    #[test]
    fn optional_csv_defaults_to_none() {
        let dir = tempfile::tempdir().unwrap();
        let loader = DataLoader::new(dir.path());
        assert!(loader.load_optional_csv(None).unwrap().is_none());
    }
}
