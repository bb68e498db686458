//! Relational store sinks for mirroring the raw dataset
//!
//! The mirror stage writes every raw row into a relational table through the
//! [`RecordSink`] trait.
//!
//! ## Features
//!
//! - `postgres` - PostgreSQL support (plain or TLS connections)
//!
//! Without the feature, [`PostgresSink::connect`] returns a configuration
//! error and only [`MemorySink`] is usable.
//!
//! ## Example
//!
//! ```rust,ignore
//! use stratum_store::{InsuranceRecord, PostgresSink, RecordSink, TableRef};
//!
//! let sink = PostgresSink::connect(&db_config).await?;
//! let table = TableRef::new(&db_config.database, &db_config.table)?;
//! sink.ensure_table(&table).await?;
//! for record in InsuranceRecord::from_frame(&frame)? {
//!     sink.insert(&table, &record).await?;
//! }
//! ```

pub mod adapter;
pub mod memory;
pub mod postgres;
pub mod record;

pub use adapter::{validate_identifier, RecordSink, StoreError, TableRef};
pub use memory::{MemorySink, StoredRow};
pub use postgres::PostgresSink;
pub use record::{InsuranceRecord, INSURANCE_COLUMNS};
