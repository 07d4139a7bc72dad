//! Data module - CSV loading, schema, and cleaning

mod loader;
pub mod schema;
mod transformer;

pub use loader::{DataLoader, LoaderError};
pub use transformer::{CleanReport, DataTransformer, TransformError, TransformOutput};
