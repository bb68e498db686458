//! Configuration schema (stratum.toml)
//!
//! The file-level [`PipelineConfig`] resolves into the immutable per-run
//! stage configs ([`DataIngestionConfig`], [`DataValidationConfig`]) that the
//! engine consumes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Timestamp format used for run directories and log files
pub const TIME_STAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Current local time formatted as a run stamp
pub fn current_time_stamp() -> String {
    chrono::Local::now().format(TIME_STAMP_FORMAT).to_string()
}

/// Artifact root settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSettings {
    /// Root directory for all per-run artifacts
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifact")
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            artifact_dir: default_artifact_dir(),
        }
    }
}

/// `[data_ingestion]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionSettings {
    /// Remote dataset location (plain HTTP or a cloud-drive share link)
    pub dataset_download_url: String,

    #[serde(default = "default_raw_data_dir")]
    pub raw_data_dir: String,

    #[serde(default = "default_ingested_dir")]
    pub ingested_dir: String,

    #[serde(default = "default_train_dir")]
    pub ingested_train_dir: String,

    #[serde(default = "default_test_dir")]
    pub ingested_test_dir: String,
}

fn default_raw_data_dir() -> String {
    "raw_data".to_string()
}

fn default_ingested_dir() -> String {
    "ingested_data".to_string()
}

fn default_train_dir() -> String {
    "train".to_string()
}

fn default_test_dir() -> String {
    "test".to_string()
}

/// `[data_validation]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationSettings {
    #[serde(default = "default_schema_file_path")]
    pub schema_file_path: PathBuf,

    #[serde(default = "default_report_file_name")]
    pub report_file_name: String,

    #[serde(default = "default_report_page_file_name")]
    pub report_page_file_name: String,

    /// Fail the run when the schema is invalid or the dataset drifted
    #[serde(default)]
    pub strict_mode: bool,

    /// p-value below which a feature counts as drifted
    #[serde(default = "default_drift_threshold")]
    pub drift_threshold: f64,
}

fn default_schema_file_path() -> PathBuf {
    PathBuf::from("config/schema.yaml")
}

fn default_report_file_name() -> String {
    "report.json".to_string()
}

fn default_report_page_file_name() -> String {
    "report.html".to_string()
}

fn default_drift_threshold() -> f64 {
    0.05
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            schema_file_path: default_schema_file_path(),
            report_file_name: default_report_file_name(),
            report_page_file_name: default_report_page_file_name(),
            strict_mode: false,
            drift_threshold: default_drift_threshold(),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_dir")]
    pub dir: PathBuf,

    /// Default filter directive (overridden by RUST_LOG)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            level: default_log_level(),
        }
    }
}

/// `[server]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_addr")]
    pub addr: String,
}

fn default_addr() -> String {
    "127.0.0.1:5000".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { addr: default_addr() }
    }
}

/// Relational store connection settings
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    pub username: String,

    #[serde(default, skip_serializing)]
    pub password: String,

    pub database: String,

    #[serde(default = "default_table")]
    pub table: String,

    /// Connect over TLS
    #[serde(default)]
    pub tls: bool,
}

fn default_port() -> u16 {
    5432
}

fn default_table() -> String {
    "insurance".to_string()
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("table", &self.table)
            .field("tls", &self.tls)
            .finish()
    }
}

/// Immutable ingestion config for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DataIngestionConfig {
    pub dataset_download_url: String,
    pub raw_data_dir: PathBuf,
    pub ingested_train_dir: PathBuf,
    pub ingested_test_dir: PathBuf,
}

/// Immutable validation config for one run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataValidationConfig {
    pub schema_file_path: PathBuf,
    pub report_file_path: PathBuf,
    pub report_page_file_path: PathBuf,
    pub strict_mode: bool,
    pub drift_threshold: f64,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub pipeline: PipelineSettings,

    pub data_ingestion: IngestionSettings,

    #[serde(default)]
    pub data_validation: ValidationSettings,

    /// Optional mirror target; ingestion skips the mirror stage without it
    #[serde(default)]
    pub database: Option<DatabaseConfig>,

    #[serde(default)]
    pub logging: LoggingSettings,

    #[serde(default)]
    pub server: ServerSettings,

    /// Project root path (for resolving relative paths)
    #[serde(skip)]
    pub project_root: PathBuf,
}

impl PipelineConfig {
    /// Load config from TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(format!("{}: {}", path.display(), e)))?;

        let mut config = Self::from_toml(&contents)?;

        // Set project root to parent of config file
        if let Some(parent) = path.parent() {
            config.project_root = parent.to_path_buf();
        }

        Ok(config)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let config: PipelineConfig =
            toml::from_str(toml).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.data_ingestion.dataset_download_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "data_ingestion.dataset_download_url must not be empty".to_string(),
            ));
        }
        let threshold = self.data_validation.drift_threshold;
        if !(threshold > 0.0 && threshold < 1.0) {
            return Err(ConfigError::InvalidValue(format!(
                "data_validation.drift_threshold must be in (0, 1), got {}",
                threshold
            )));
        }
        Ok(())
    }

    /// Apply `STRATUM_*` environment overrides using the process environment
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// Database keys only take effect when a `[database]` section exists or
    /// `STRATUM_DB_HOST` is set.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("STRATUM_DATASET_URL") {
            self.data_ingestion.dataset_download_url = url;
        }

        if self.database.is_none() {
            if let Some(host) = lookup("STRATUM_DB_HOST") {
                self.database = Some(DatabaseConfig {
                    host,
                    port: default_port(),
                    username: String::new(),
                    password: String::new(),
                    database: String::new(),
                    table: default_table(),
                    tls: false,
                });
            }
        }

        if let Some(db) = self.database.as_mut() {
            if let Some(host) = lookup("STRATUM_DB_HOST") {
                db.host = host;
            }
            if let Some(port) = lookup("STRATUM_DB_PORT") {
                db.port = port.parse().map_err(|_| {
                    ConfigError::InvalidValue(format!("STRATUM_DB_PORT is not a port: {}", port))
                })?;
            }
            if let Some(user) = lookup("STRATUM_DB_USER") {
                db.username = user;
            }
            if let Some(password) = lookup("STRATUM_DB_PASSWORD") {
                db.password = password;
            }
            if let Some(name) = lookup("STRATUM_DB_NAME") {
                db.database = name;
            }
        }

        Ok(())
    }

    /// Resolve a possibly relative path against the project root
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }

    fn stage_dir(&self, stage: &str, stamp: &str) -> PathBuf {
        self.resolve(&self.pipeline.artifact_dir).join(stage).join(stamp)
    }

    /// Ingestion config rooted at `<artifact_dir>/data_ingestion/<stamp>`
    pub fn data_ingestion_config(&self, stamp: &str) -> DataIngestionConfig {
        let settings = &self.data_ingestion;
        let root = self.stage_dir("data_ingestion", stamp);
        let ingested = root.join(&settings.ingested_dir);

        DataIngestionConfig {
            dataset_download_url: settings.dataset_download_url.clone(),
            raw_data_dir: root.join(&settings.raw_data_dir),
            ingested_train_dir: ingested.join(&settings.ingested_train_dir),
            ingested_test_dir: ingested.join(&settings.ingested_test_dir),
        }
    }

    /// Validation config rooted at `<artifact_dir>/data_validation/<stamp>`
    pub fn data_validation_config(&self, stamp: &str) -> DataValidationConfig {
        let settings = &self.data_validation;
        let root = self.stage_dir("data_validation", stamp);

        DataValidationConfig {
            schema_file_path: self.resolve(&settings.schema_file_path),
            report_file_path: root.join(&settings.report_file_name),
            report_page_file_path: root.join(&settings.report_page_file_name),
            strict_mode: settings.strict_mode,
            drift_threshold: settings.drift_threshold,
        }
    }

    /// Log directory resolved against the project root
    pub fn log_dir(&self) -> PathBuf {
        self.resolve(&self.logging.dir)
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
