//! Stratum engine - pipeline stages
//!
//! - Data ingestion: download, database mirror, stratified train/test split
//! - Data validation: artifact checks, schema conformance, drift report
//! - Two-sample statistical tests backing the drift report

pub mod ingestion;
pub mod stats;
pub mod validation;

pub use ingestion::{DataIngestion, Downloader, DownloadError, RawDataFile, SplitError, SplitOptions};
pub use validation::{DataValidation, DriftDetector, SchemaCheck};
