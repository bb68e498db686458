//! Drift report schema (stable v1)
//!
//! This schema is STABLE and VERSIONED.
//! Breaking changes require a new version.

use crate::diagnostic::{Diagnostic, DiagnosticCode, Location, Severity};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Share of drifted features at which the dataset as a whole is flagged
pub const DATASET_DRIFT_SHARE: f64 = 0.5;

/// Report schema version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportVersion {
    /// Major version (breaking changes)
    pub major: u32,

    /// Minor version (backward-compatible additions)
    pub minor: u32,
}

impl ReportVersion {
    /// Current report schema version
    pub const CURRENT: ReportVersion = ReportVersion { major: 1, minor: 0 };
}

impl std::fmt::Display for ReportVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// How a feature was compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureType {
    Numerical,
    Categorical,
}

/// Statistical test applied to a feature
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatTest {
    /// Two-sample Kolmogorov-Smirnov
    Ks,

    /// Chi-square goodness of fit against reference proportions
    ChiSquare,
}

impl std::fmt::Display for StatTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ks => write!(f, "K-S p_value"),
            Self::ChiSquare => write!(f, "chi-square p_value"),
        }
    }
}

/// One histogram bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramBin {
    pub label: String,
    pub count: usize,
}

/// Drift result for a single feature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDrift {
    pub name: String,
    pub feature_type: FeatureType,
    pub stattest: StatTest,

    /// Test statistic; `None` when unbounded (category unseen in reference)
    pub statistic: Option<f64>,

    pub p_value: f64,
    pub drift_detected: bool,
    pub reference_histogram: Vec<HistogramBin>,
    pub current_histogram: Vec<HistogramBin>,
}

/// Summary statistics for a report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftSummary {
    pub n_features: usize,
    pub n_drifted_features: usize,
    pub share_drifted_features: f64,
    pub dataset_drift: bool,

    /// p-value threshold used per feature
    pub threshold: f64,
}

/// Drift report (report.json v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    /// Schema version
    pub version: ReportVersion,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    /// Rows in the reference (train) partition
    pub reference_rows: usize,

    /// Rows in the current (test) partition
    pub current_rows: usize,

    pub summary: DriftSummary,

    pub features: Vec<FeatureDrift>,

    /// One diagnostic per drifted feature, plus one for dataset drift
    pub diagnostics: Vec<Diagnostic>,
}

impl DriftReport {
    /// Build a report from per-feature results
    pub fn from_features(
        features: Vec<FeatureDrift>,
        threshold: f64,
        reference_rows: usize,
        current_rows: usize,
        current_file: Option<&str>,
    ) -> Self {
        let n_features = features.len();
        let n_drifted_features = features.iter().filter(|f| f.drift_detected).count();
        let share_drifted_features = if n_features > 0 {
            n_drifted_features as f64 / n_features as f64
        } else {
            0.0
        };
        let dataset_drift = n_features > 0 && share_drifted_features >= DATASET_DRIFT_SHARE;

        let mut diagnostics: Vec<Diagnostic> = features
            .iter()
            .filter(|f| f.drift_detected)
            .map(|f| {
                let mut diag = Diagnostic::new(
                    DiagnosticCode::DriftFeatureDrifted,
                    Severity::Warn,
                    format!("Feature '{}' drifted ({} = {:.4})", f.name, f.stattest, f.p_value),
                )
                .with_comparison(format!(">= {}", threshold), format!("{:.6}", f.p_value));
                if let Some(file) = current_file {
                    diag = diag.with_location(Location::new(file).with_column(f.name.clone()));
                }
                diag
            })
            .collect();

        if dataset_drift {
            diagnostics.push(Diagnostic::new(
                DiagnosticCode::DriftDatasetDrifted,
                Severity::Error,
                format!(
                    "Dataset drift detected: {} of {} features drifted",
                    n_drifted_features, n_features
                ),
            ));
        }

        Self {
            version: ReportVersion::CURRENT,
            timestamp: chrono::Utc::now().to_rfc3339(),
            reference_rows,
            current_rows,
            summary: DriftSummary {
                n_features,
                n_drifted_features,
                share_drifted_features,
                dataset_drift,
                threshold,
            },
            features,
            diagnostics,
        }
    }

    /// Whether enough features drifted to flag the dataset
    pub fn has_dataset_drift(&self) -> bool {
        self.summary.dataset_drift
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureDrift> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Serialize to JSON with six-space indentation
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"      ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        self.serialize(&mut ser)?;
        // serde_json only ever emits UTF-8
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Save to file, creating parent directories
    pub fn save_to_file(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = self
            .to_json()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
    }

    /// Load a saved report
    pub fn from_file(path: &Path) -> Result<Self, std::io::Error> {
        let contents = std::fs::read_to_string(path)?;
        serde_json::from_str(&contents).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
