//! Diagnostic codes produced by the validation checks
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename a code or reuse its name - they end up in saved reports.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Schema checks (1xxx)
    /// Train and test partitions have a different number of columns
    SchemaColumnCountMismatch,

    /// A partition column is not declared in the schema
    SchemaUndeclaredColumn,

    /// A column is present in one partition only
    SchemaColumnNotShared,

    /// A categorical value is outside its declared domain
    SchemaDomainViolation,

    // Drift checks (2xxx)
    /// Feature distribution differs between train and test
    DriftFeatureDrifted,

    /// Enough features drifted to flag the whole dataset
    DriftDatasetDrifted,

    /// Blank or non-finite numeric cells were left out of a drift test
    DriftMissingValues,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SchemaColumnCountMismatch => "SCHEMA_COLUMN_COUNT_MISMATCH",
            Self::SchemaUndeclaredColumn => "SCHEMA_UNDECLARED_COLUMN",
            Self::SchemaColumnNotShared => "SCHEMA_COLUMN_NOT_SHARED",
            Self::SchemaDomainViolation => "SCHEMA_DOMAIN_VIOLATION",
            Self::DriftFeatureDrifted => "DRIFT_FEATURE_DRIFTED",
            Self::DriftDatasetDrifted => "DRIFT_DATASET_DRIFTED",
            Self::DriftMissingValues => "DRIFT_MISSING_VALUES",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - fails the run in strict mode
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Where a finding was observed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File the finding refers to
    pub file: String,

    /// Optional column name
    pub column: Option<String>,

    /// Optional 1-indexed data row (header excluded)
    pub row: Option<usize>,
}

impl Location {
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            column: None,
            row: None,
        }
    }

    pub fn with_column(mut self, column: impl Into<String>) -> Self {
        self.column = Some(column.into());
        self
    }

    pub fn with_row(mut self, row: usize) -> Self {
        self.row = Some(row);
        self
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Location (best-effort)
    pub location: Option<Location>,

    /// Expected value (for comparison diagnostics)
    pub expected: Option<String>,

    /// Actual value (for comparison diagnostics)
    pub actual: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            expected: None,
            actual: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set expected/actual values
    pub fn with_comparison(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostic_code_stability() {
        assert_eq!(DiagnosticCode::SchemaDomainViolation.as_str(), "SCHEMA_DOMAIN_VIOLATION");
        assert_eq!(DiagnosticCode::DriftFeatureDrifted.as_str(), "DRIFT_FEATURE_DRIFTED");
    }

    #[test]
    fn serde_names_match_stable_strings() {
        let json = serde_json::to_string(&DiagnosticCode::SchemaColumnNotShared).unwrap();
        assert_eq!(json, format!("\"{}\"", DiagnosticCode::SchemaColumnNotShared.as_str()));
    }

    #[test]
    fn diagnostic_serialization() {
        let diag = Diagnostic::new(
            DiagnosticCode::SchemaDomainViolation,
            Severity::Error,
            "value 'unknown' not allowed in 'region'",
        )
        .with_location(Location::new("train/insurance.csv").with_column("region").with_row(7));

        let json = serde_json::to_string(&diag).unwrap();
        assert!(json.contains("SCHEMA_DOMAIN_VIOLATION"));
        assert!(json.contains("\"row\":7"));
    }
}
