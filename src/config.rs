//! Pipeline Configuration
//! CLI arguments and upfront input validation.

use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Input file not found: {0}")]
    MissingInput(PathBuf),
}

/// EM-DAT Disaster Data Analysis & Chart Generator
#[derive(Parser, Debug, Clone)]
#[command(name = "emdat-trends", version)]
pub struct PipelineConfig {
    /// Directory containing the input datasets
    #[arg(long, default_value = "data")]
    pub data_dir: PathBuf,

    /// EM-DAT CSV export file name, within the data directory
    #[arg(long, default_value = "emdat.csv")]
    pub emdat_file: String,

    /// Optional country/year population table (Country, Year, Population)
    #[arg(long)]
    pub population_file: Option<String>,

    /// Optional yearly temperature anomaly table (Year, Anomaly)
    #[arg(long)]
    pub temperature_file: Option<String>,

    /// Output path for the transformed dataset
    #[arg(long, default_value = "emdat_transformed.csv")]
    pub output: PathBuf,

    /// Directory for rendered charts
    #[arg(long, default_value = "charts")]
    pub charts_dir: PathBuf,

    /// How many countries to show in the country breakdown chart
    #[arg(long, default_value_t = 15)]
    pub top_countries: usize,

    /// Skip chart rendering
    #[arg(long)]
    pub no_charts: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl PipelineConfig {
    /// Check that every configured input exists. Missing inputs are fatal
    /// before any processing begins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut inputs = vec![self.emdat_file.as_str()];
        if let Some(name) = &self.population_file {
            inputs.push(name);
        }
        if let Some(name) = &self.temperature_file {
            inputs.push(name);
        }

        for name in inputs {
            let path = self.data_dir.join(name);
            if !path.is_file() {
                return Err(ConfigError::MissingInput(path));
            }
        }
        Ok(())
    }

    /// Path of the JSON cleaning report, derived from the output path.
    pub fn report_path(&self) -> PathBuf {
        self.output.with_file_name("transform_report.json")
    }
}
