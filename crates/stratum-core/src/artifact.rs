//! Stage artifacts: the contract between pipeline stages
//!
//! A successful artifact is only constructed after every file it references
//! has been checked to exist and be non-empty.

use crate::config::DatabaseConfig;
use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::{Path, PathBuf};

/// Fail unless `path` is an existing, non-empty regular file
pub fn ensure_non_empty_file(operation: &'static str, path: &Path) -> Result<(), PipelineError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() && meta.len() > 0 => Ok(()),
        Ok(meta) if meta.is_file() => Err(PipelineError::missing_artifact(
            operation,
            format!("file {} is empty", path.display()),
        )),
        Ok(_) => Err(PipelineError::missing_artifact(
            operation,
            format!("{} is not a regular file", path.display()),
        )),
        Err(e) => Err(PipelineError::missing_artifact(
            operation,
            format!("file {} is not present: {}", path.display(), e),
        )),
    }
}

/// Hex SHA-256 of a file's contents
pub fn file_sha256(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Outcome of a completed ingestion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataIngestionArtifact {
    pub train_file_path: PathBuf,
    pub test_file_path: PathBuf,
    pub is_ingested: bool,
    pub message: String,

    /// Raw file the partitions were cut from
    pub raw_file_path: PathBuf,

    /// Hex SHA-256 of the raw file
    pub raw_sha256: String,

    pub train_rows: usize,
    pub test_rows: usize,
}

impl DataIngestionArtifact {
    /// Build a successful artifact after checking both partitions on disk
    pub fn completed(
        train_file_path: PathBuf,
        test_file_path: PathBuf,
        raw_file_path: PathBuf,
        train_rows: usize,
        test_rows: usize,
    ) -> Result<Self, PipelineError> {
        const OP: &str = "data_ingestion_artifact";
        ensure_non_empty_file(OP, &train_file_path)?;
        ensure_non_empty_file(OP, &test_file_path)?;
        ensure_non_empty_file(OP, &raw_file_path)?;

        let raw_sha256 = file_sha256(&raw_file_path).map_err(|e| PipelineError::file_read(OP, e))?;

        Ok(Self {
            train_file_path,
            test_file_path,
            is_ingested: true,
            message: "Data ingestion completed successfully.".to_string(),
            raw_file_path,
            raw_sha256,
            train_rows,
            test_rows,
        })
    }
}

/// Outcome of mirroring the raw file into the relational store
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseArtifact {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub database: String,
    pub table: String,
    pub rows_inserted: usize,
}

impl DatabaseArtifact {
    pub fn from_config(config: &DatabaseConfig, rows_inserted: usize) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            username: config.username.clone(),
            database: config.database.clone(),
            table: config.table.clone(),
            rows_inserted,
        }
    }
}

impl std::fmt::Debug for DatabaseArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "DatabaseArtifact({}@{}:{}/{}.{}, rows_inserted={})",
            self.username, self.host, self.port, self.database, self.table, self.rows_inserted
        )
    }
}

/// Outcome of a completed validation run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataValidationArtifact {
    pub schema_file_path: PathBuf,
    pub report_file_path: PathBuf,
    pub report_page_file_path: PathBuf,
    pub is_validated: bool,
    pub message: String,

    /// Result of the four schema checks
    pub schema_valid: bool,

    /// Whether the drift report flagged the dataset
    pub dataset_drift: bool,
}

impl DataValidationArtifact {
    /// Build a successful artifact after checking every referenced file
    pub fn completed(
        schema_file_path: PathBuf,
        report_file_path: PathBuf,
        report_page_file_path: PathBuf,
        schema_valid: bool,
        dataset_drift: bool,
    ) -> Result<Self, PipelineError> {
        const OP: &str = "data_validation_artifact";
        ensure_non_empty_file(OP, &schema_file_path)?;
        ensure_non_empty_file(OP, &report_file_path)?;
        ensure_non_empty_file(OP, &report_page_file_path)?;

        let message = match (schema_valid, dataset_drift) {
            (true, false) => "Data Validation performed successfully.".to_string(),
            (false, false) => "Data Validation performed; schema checks failed.".to_string(),
            (true, true) => "Data Validation performed; dataset drift detected.".to_string(),
            (false, true) => {
                "Data Validation performed; schema checks failed and dataset drift detected.".to_string()
            }
        };

        Ok(Self {
            schema_file_path,
            report_file_path,
            report_page_file_path,
            is_validated: true,
            message,
            schema_valid,
            dataset_drift,
        })
    }
}
