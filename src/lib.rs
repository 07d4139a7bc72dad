//! EM-DAT Disaster Data Analysis & Chart Generator
//!
//! A batch pipeline over the EM-DAT natural-disaster dataset: load the raw
//! export, clean it into a canonical schema, aggregate along year/country/
//! type dimensions, compute trend and warming-correlation statistics, render
//! static charts, and persist `emdat_transformed.csv`.

pub mod aggregate;
pub mod charts;
pub mod config;
pub mod data;
pub mod logger;
pub mod output;
pub mod stats;

pub use aggregate::{AggregateRow, Aggregator, Dimension};
pub use charts::ChartPlotter;
pub use config::PipelineConfig;
pub use data::{DataLoader, DataTransformer};
pub use output::OutputWriter;
pub use stats::TrendCalculator;
