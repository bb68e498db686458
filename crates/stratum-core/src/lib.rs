//! Stratum Core
//!
//! Leaf value types shared by every pipeline stage: configuration, stage
//! artifacts, errors, the declared dataset schema, the in-memory frame and
//! the versioned drift report format.

pub mod artifact;
pub mod config;
pub mod diagnostic;
pub mod error;
pub mod frame;
pub mod report;
pub mod schema;
pub mod stage;

pub use artifact::{DataIngestionArtifact, DataValidationArtifact, DatabaseArtifact};
pub use config::{
    ConfigError, DataIngestionConfig, DataValidationConfig, DatabaseConfig, PipelineConfig,
};
pub use diagnostic::{Diagnostic, DiagnosticCode, Location, Severity};
pub use error::{ErrorKind, PipelineError};
pub use frame::{Frame, FrameError, NumericColumn};
pub use report::{DriftReport, FeatureDrift, FeatureType, HistogramBin, ReportVersion, StatTest};
pub use schema::{DatasetSchema, SchemaError};
pub use stage::{RunState, Stage, StageTracker};
