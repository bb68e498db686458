//! Declared dataset schema (schema.yaml)
//!
//! Read-only reference data: column names with their declared types, and the
//! allowed values of each categorical column.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

/// Declared schema for the train/test partitions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSchema {
    /// Column name -> declared type (e.g. `int`, `float`, `category`)
    pub columns: BTreeMap<String, String>,

    /// Column name -> allowed categorical values
    #[serde(default, deserialize_with = "deserialize_domain")]
    pub domain_value: BTreeMap<String, BTreeSet<String>>,

    #[serde(default)]
    pub numerical_columns: Vec<String>,

    #[serde(default)]
    pub categorical_columns: Vec<String>,

    #[serde(default)]
    pub target_column: Option<String>,
}

impl DatasetSchema {
    /// Load a schema from a YAML file
    pub fn from_file(path: &Path) -> Result<Self, SchemaError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| SchemaError::IoError(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml(&contents)
    }

    /// Parse a schema from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self, SchemaError> {
        serde_yaml::from_str(yaml).map_err(|e| SchemaError::ParseError(e.to_string()))
    }

    /// Whether a column is declared in the `columns` mapping
    pub fn declares_column(&self, name: &str) -> bool {
        self.columns.contains_key(name)
    }

    /// Allowed values for a categorical column, if it has a domain
    pub fn domain_for(&self, column: &str) -> Option<&BTreeSet<String>> {
        self.domain_value.get(column)
    }

    /// Whether the schema explicitly marks a column as categorical
    pub fn is_categorical(&self, column: &str) -> Option<bool> {
        if self.categorical_columns.iter().any(|c| c == column) {
            Some(true)
        } else if self.numerical_columns.iter().any(|c| c == column) {
            Some(false)
        } else if self.domain_value.contains_key(column) {
            Some(true)
        } else {
            None
        }
    }
}

/// Domain values may be written as strings, numbers or booleans; they are
/// compared against CSV text, so every scalar is normalized to a string.
fn deserialize_domain<'de, D>(deserializer: D) -> Result<BTreeMap<String, BTreeSet<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let raw: BTreeMap<String, Vec<serde_yaml::Value>> = BTreeMap::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(column, values)| {
            let values = values
                .into_iter()
                .map(|value| match value {
                    serde_yaml::Value::String(s) => Ok(s),
                    serde_yaml::Value::Number(n) => Ok(n.to_string()),
                    serde_yaml::Value::Bool(b) => Ok(b.to_string()),
                    other => Err(D::Error::custom(format!(
                        "domain value for '{}' must be a scalar, got {:?}",
                        column, other
                    ))),
                })
                .collect::<Result<BTreeSet<_>, _>>()?;
            Ok((column, values))
        })
        .collect()
}

/// Schema file error types
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}
