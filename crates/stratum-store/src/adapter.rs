//! Record sink trait for mirroring the raw dataset into a relational store

use crate::record::InsuranceRecord;
use std::fmt;

/// Identifies a table in a relational store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    /// Database name
    pub database: String,

    /// Table name
    pub table: String,
}

impl TableRef {
    /// Create a table reference, rejecting names that are not plain identifiers
    pub fn new(database: impl Into<String>, table: impl Into<String>) -> Result<Self, StoreError> {
        let database = database.into();
        let table = table.into();
        validate_identifier(&database)?;
        validate_identifier(&table)?;
        Ok(Self { database, table })
    }

    /// Get fully qualified name
    pub fn fqn(&self) -> String {
        format!("{}.{}", self.database, self.table)
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fqn())
    }
}

/// Database and table names are spliced into DDL, so only plain identifiers are accepted
///
/// Case is kept: sinks quote the name, so `Insurance` and `insurance` are different tables.
pub fn validate_identifier(name: &str) -> Result<(), StoreError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                && name.len() <= 63
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidIdentifier(name.to_string()))
    }
}

/// Errors that can occur when writing to a store
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Connection failed: {0}")]
    ConnectionError(String),

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Query failed: {0}")]
    QueryError(String),

    #[error("Invalid record at row {row}: {message}")]
    InvalidRecord { row: usize, message: String },

    #[error("Invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Trait for relational stores the raw dataset is mirrored into
///
/// A sink is already connected to its target database; constructors are
/// responsible for creating that database when it does not exist.
#[async_trait::async_trait]
pub trait RecordSink: Send + Sync {
    /// Get the sink name (e.g., "PostgreSQL")
    fn name(&self) -> &'static str;

    /// Create the insurance table if it is absent. Must be idempotent.
    async fn ensure_table(&self, table: &TableRef) -> Result<(), StoreError>;

    /// Names of the tables visible in the connected database
    async fn list_tables(&self) -> Result<Vec<String>, StoreError>;

    /// Insert a single record
    async fn insert(&self, table: &TableRef, record: &InsuranceRecord) -> Result<(), StoreError>;

    /// Number of rows currently stored in `table`
    async fn count_rows(&self, table: &TableRef) -> Result<u64, StoreError>;

    /// Test the connection to the store
    async fn test_connection(&self) -> Result<(), StoreError>;
}
