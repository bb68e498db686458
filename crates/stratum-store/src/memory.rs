//! In-memory record sink for testing
//!
//! This sink stores records in memory, allowing tests to exercise the mirror
//! stage without a real database. It also counts DDL calls and can simulate
//! connection and insert failures.

use crate::adapter::{RecordSink, StoreError, TableRef};
use crate::record::InsuranceRecord;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

/// A stored row with its generated key
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRow {
    pub id: i64,
    pub record: InsuranceRecord,
}

/// In-memory record sink
///
/// # Example
///
/// ```rust,ignore
/// use stratum_store::{MemorySink, RecordSink, TableRef};
///
/// let sink = MemorySink::new();
/// let table = TableRef::new("insurance_db", "insurance")?;
/// sink.ensure_table(&table).await?;
/// assert_eq!(sink.count_rows(&table).await?, 0);
/// ```
#[derive(Clone)]
pub struct MemorySink {
    /// Rows keyed by table name
    tables: Arc<RwLock<HashMap<String, Vec<StoredRow>>>>,

    /// Number of `ensure_table` calls seen
    ddl_calls: Arc<AtomicUsize>,

    /// Whether to simulate connection failures
    fail_connection: bool,

    /// Fail every insert after this many have succeeded
    fail_inserts_after: Option<usize>,

    /// Tables that are created but never reported by `list_tables`
    hidden_tables: Vec<String>,

    /// Simulated latency in milliseconds
    latency_ms: u64,

    /// Custom sink name
    sink_name: &'static str,
}

impl MemorySink {
    /// Create a new, empty memory sink
    pub fn new() -> Self {
        Self {
            tables: Arc::new(RwLock::new(HashMap::new())),
            ddl_calls: Arc::new(AtomicUsize::new(0)),
            fail_connection: false,
            fail_inserts_after: None,
            hidden_tables: Vec::new(),
            latency_ms: 0,
            sink_name: "Memory",
        }
    }

    /// Simulate an unreachable store
    pub fn with_connection_failure(mut self) -> Self {
        self.fail_connection = true;
        self
    }

    /// Fail every insert once `count` rows have been stored
    pub fn with_insert_failure_after(mut self, count: usize) -> Self {
        self.fail_inserts_after = Some(count);
        self
    }

    /// Leave `table` out of the table listing
    pub fn with_hidden_table(mut self, table: impl Into<String>) -> Self {
        self.hidden_tables.push(table.into());
        self
    }

    /// Set simulated latency for each operation
    pub fn with_latency(mut self, latency_ms: u64) -> Self {
        self.latency_ms = latency_ms;
        self
    }

    /// Set a custom sink name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.sink_name = name;
        self
    }

    /// Rows stored in `table`, in insertion order
    pub async fn rows(&self, table: &str) -> Vec<StoredRow> {
        self.tables.read().await.get(table).cloned().unwrap_or_default()
    }

    /// How many times `ensure_table` was called
    pub fn ddl_calls(&self) -> usize {
        self.ddl_calls.load(Ordering::SeqCst)
    }

    async fn simulate_latency(&self) {
        if self.latency_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.latency_ms)).await;
        }
    }

    fn check_connection(&self) -> Result<(), StoreError> {
        if self.fail_connection {
            Err(StoreError::ConnectionError(
                "Simulated connection failure".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

impl Default for MemorySink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RecordSink for MemorySink {
    fn name(&self) -> &'static str {
        self.sink_name
    }

    async fn ensure_table(&self, table: &TableRef) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.check_connection()?;
        self.ddl_calls.fetch_add(1, Ordering::SeqCst);
        self.tables
            .write()
            .await
            .entry(table.table.clone())
            .or_default();
        Ok(())
    }

    async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        self.simulate_latency().await;
        self.check_connection()?;
        let mut names: Vec<String> = self
            .tables
            .read()
            .await
            .keys()
            .filter(|name| !self.hidden_tables.contains(name))
            .cloned()
            .collect();
        names.sort();
        Ok(names)
    }

    async fn insert(&self, table: &TableRef, record: &InsuranceRecord) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.check_connection()?;

        let mut tables = self.tables.write().await;
        let rows = tables
            .get_mut(&table.table)
            .ok_or_else(|| StoreError::TableNotFound(table.fqn()))?;

        if let Some(limit) = self.fail_inserts_after {
            if rows.len() >= limit {
                return Err(StoreError::QueryError(format!(
                    "Simulated insert failure after {} rows",
                    limit
                )));
            }
        }

        let id = rows.len() as i64 + 1;
        rows.push(StoredRow {
            id,
            record: record.clone(),
        });
        Ok(())
    }

    async fn count_rows(&self, table: &TableRef) -> Result<u64, StoreError> {
        self.simulate_latency().await;
        self.check_connection()?;
        self.tables
            .read()
            .await
            .get(&table.table)
            .map(|rows| rows.len() as u64)
            .ok_or_else(|| StoreError::TableNotFound(table.fqn()))
    }

    async fn test_connection(&self) -> Result<(), StoreError> {
        self.simulate_latency().await;
        self.check_connection()
    }
}
