//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `linear`: JSON logistic model artifact with exact attribution
//! - `parquet`: demo dataset reader
//! - `sanitize`: PII filtering for logs

pub mod linear;
pub mod parquet;
pub mod sanitize;

pub use self::linear::{LinearModel, LoadError};
pub use self::parquet::{DatasetError, ParquetDataset, DEFAULT_ID_COLUMN};
