//! Pipeline error taxonomy
//!
//! Every failure carries the operation that raised it plus the underlying
//! cause. Errors are returned, never retried or swallowed.

use std::fmt;

/// Boxed cause carried by every pipeline error
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error category, stable across releases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Download,
    Database,
    Split,
    FileRead,
    MissingArtifact,
    Schema,
    Drift,
    Config,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Download => "DownloadError",
            Self::Database => "DatabaseError",
            Self::Split => "SplitError",
            Self::FileRead => "FileReadError",
            Self::MissingArtifact => "MissingArtifactError",
            Self::Schema => "SchemaError",
            Self::Drift => "DriftError",
            Self::Config => "ConfigError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error raised by any pipeline stage
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("DownloadError in `{operation}`: {source}")]
    Download {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("DatabaseError in `{operation}`: {source}")]
    Database {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("SplitError in `{operation}`: {source}")]
    Split {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("FileReadError in `{operation}`: {source}")]
    FileRead {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("MissingArtifactError in `{operation}`: {source}")]
    MissingArtifact {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("SchemaError in `{operation}`: {source}")]
    Schema {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("DriftError in `{operation}`: {source}")]
    Drift {
        operation: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("ConfigError in `{operation}`: {source}")]
    Config {
        operation: &'static str,
        #[source]
        source: BoxError,
    },
}

impl PipelineError {
    pub fn download(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Download { operation, source: source.into() }
    }

    pub fn database(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Database { operation, source: source.into() }
    }

    pub fn split(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Split { operation, source: source.into() }
    }

    pub fn file_read(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::FileRead { operation, source: source.into() }
    }

    pub fn missing_artifact(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::MissingArtifact { operation, source: source.into() }
    }

    pub fn schema(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Schema { operation, source: source.into() }
    }

    pub fn drift(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Drift { operation, source: source.into() }
    }

    pub fn config(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Config { operation, source: source.into() }
    }

    /// Error category
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Download { .. } => ErrorKind::Download,
            Self::Database { .. } => ErrorKind::Database,
            Self::Split { .. } => ErrorKind::Split,
            Self::FileRead { .. } => ErrorKind::FileRead,
            Self::MissingArtifact { .. } => ErrorKind::MissingArtifact,
            Self::Schema { .. } => ErrorKind::Schema,
            Self::Drift { .. } => ErrorKind::Drift,
            Self::Config { .. } => ErrorKind::Config,
        }
    }

    /// Operation that raised the error
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Download { operation, .. }
            | Self::Database { operation, .. }
            | Self::Split { operation, .. }
            | Self::FileRead { operation, .. }
            | Self::MissingArtifact { operation, .. }
            | Self::Schema { operation, .. }
            | Self::Drift { operation, .. }
            | Self::Config { operation, .. } => operation,
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
