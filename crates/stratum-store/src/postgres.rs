//! PostgreSQL record sink
//!
//! Mirrors the raw insurance dataset into a PostgreSQL table. On connect the
//! sink first opens the `postgres` maintenance database, creates the target
//! database if `pg_database` does not list it, and then reconnects to it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let sink = PostgresSink::connect(&config).await?;
//! let table = TableRef::new(&config.database, &config.table)?;
//! sink.ensure_table(&table).await?;
//! ```
//!
//! TLS is used when `DatabaseConfig::tls` is set.

use crate::adapter::{validate_identifier, RecordSink, StoreError, TableRef};
use crate::record::InsuranceRecord;
use stratum_core::DatabaseConfig;

#[cfg(feature = "postgres")]
use tokio_postgres::{Client, Config as PgConfig, NoTls};

#[cfg(feature = "postgres")]
use postgres_native_tls::MakeTlsConnector;

#[cfg(feature = "postgres")]
use native_tls::TlsConnector;

/// Database opened to check for and create the target database
#[cfg(feature = "postgres")]
const MAINTENANCE_DATABASE: &str = "postgres";

#[cfg(not(feature = "postgres"))]
const NOT_COMPILED: &str =
    "PostgreSQL support not compiled. Rebuild with: cargo build --features postgres";

/// PostgreSQL record sink
pub struct PostgresSink {
    /// PostgreSQL client (only available with postgres feature)
    #[cfg(feature = "postgres")]
    client: Client,

    /// Connection host
    host: String,

    /// Connection port
    port: u16,

    /// Database name
    database: String,
}

impl PostgresSink {
    /// Connect to the configured database, creating it when absent
    #[cfg(feature = "postgres")]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        validate_identifier(&config.database)?;

        let admin = open_client(config, MAINTENANCE_DATABASE).await?;
        let exists = admin
            .query_opt("SELECT 1 FROM pg_database WHERE datname = $1", &[&config.database])
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?
            .is_some();

        if exists {
            tracing::debug!(database = %config.database, "database already exists");
        } else {
            tracing::info!(database = %config.database, "creating database");
            admin
                .batch_execute(&format!("CREATE DATABASE {}", quoted(&config.database)))
                .await
                .map_err(|e| StoreError::QueryError(format!(
                    "Failed to create database {}: {}",
                    config.database, e
                )))?;
        }
        drop(admin);

        let client = open_client(config, &config.database).await?;
        tracing::info!(
            host = %config.host,
            port = config.port,
            database = %config.database,
            "connected to PostgreSQL"
        );

        Ok(Self {
            client,
            host: config.host.clone(),
            port: config.port,
            database: config.database.clone(),
        })
    }

    /// Create sink without postgres feature (returns error)
    #[cfg(not(feature = "postgres"))]
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        validate_identifier(&config.database)?;
        Err(StoreError::ConfigError(NOT_COMPILED.to_string()))
    }

    /// Get connection host
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Get connection port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Get database name
    pub fn database(&self) -> &str {
        &self.database
    }
}

/// Open a client to `dbname` and drive its connection on a background task
#[cfg(feature = "postgres")]
async fn open_client(config: &DatabaseConfig, dbname: &str) -> Result<Client, StoreError> {
    let mut pg = PgConfig::new();
    pg.host(&config.host)
        .port(config.port)
        .user(&config.username)
        .password(&config.password)
        .dbname(dbname);

    let target = format!("{}:{}/{}", config.host, config.port, dbname);

    if config.tls {
        let connector = TlsConnector::builder()
            .build()
            .map_err(|e| StoreError::ConfigError(format!("Failed to create TLS connector: {}", e)))?;

        let (client, connection) = pg
            .connect(MakeTlsConnector::new(connector))
            .await
            .map_err(|e| StoreError::ConnectionError(format!(
                "Failed to connect to PostgreSQL at {} with TLS: {}",
                target, e
            )))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target = %target, error = %e, "PostgreSQL TLS connection error");
            }
        });
        Ok(client)
    } else {
        let (client, connection) = pg
            .connect(NoTls)
            .await
            .map_err(|e| StoreError::ConnectionError(format!(
                "Failed to connect to PostgreSQL at {}: {}",
                target, e
            )))?;

        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::error!(target = %target, error = %e, "PostgreSQL connection error");
            }
        });
        Ok(client)
    }
}

/// Quote a validated identifier so PostgreSQL keeps its case
fn quoted(name: &str) -> String {
    format!("\"{}\"", name)
}

/// DDL for the insurance table
pub fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         id SERIAL PRIMARY KEY, \
         age INTEGER NOT NULL, \
         sex TEXT NOT NULL, \
         bmi DOUBLE PRECISION NOT NULL, \
         children INTEGER NOT NULL, \
         smoker TEXT NOT NULL, \
         region TEXT NOT NULL, \
         expenses DOUBLE PRECISION NOT NULL)",
        quoted(table)
    )
}

/// Parameterized insert for one insurance record
pub fn insert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {} (age, sex, bmi, children, smoker, region, expenses) \
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
        quoted(table)
    )
}

pub fn count_sql(table: &str) -> String {
    format!("SELECT COUNT(*) FROM {}", quoted(table))
}

#[async_trait::async_trait]
impl RecordSink for PostgresSink {
    fn name(&self) -> &'static str {
        "PostgreSQL"
    }

    #[cfg(feature = "postgres")]
    async fn ensure_table(&self, table: &TableRef) -> Result<(), StoreError> {
        self.client
            .batch_execute(&create_table_sql(&table.table))
            .await
            .map_err(|e| StoreError::QueryError(format!(
                "Failed to create table {}: {}",
                table.fqn(),
                e
            )))
    }

    #[cfg(not(feature = "postgres"))]
    async fn ensure_table(&self, _table: &TableRef) -> Result<(), StoreError> {
        Err(StoreError::ConfigError(NOT_COMPILED.to_string()))
    }

    #[cfg(feature = "postgres")]
    async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        let rows = self
            .client
            .query(
                "SELECT table_name::text FROM information_schema.tables \
                 WHERE table_schema = 'public' ORDER BY table_name",
                &[],
            )
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;

        Ok(rows.iter().map(|row| row.get::<_, String>(0)).collect())
    }

    #[cfg(not(feature = "postgres"))]
    async fn list_tables(&self) -> Result<Vec<String>, StoreError> {
        Err(StoreError::ConfigError(NOT_COMPILED.to_string()))
    }

    #[cfg(feature = "postgres")]
    async fn insert(&self, table: &TableRef, record: &InsuranceRecord) -> Result<(), StoreError> {
        self.client
            .execute(
                &insert_sql(&table.table),
                &[
                    &record.age,
                    &record.sex,
                    &record.bmi,
                    &record.children,
                    &record.smoker,
                    &record.region,
                    &record.expenses,
                ],
            )
            .await
            .map(|_| ())
            .map_err(|e| {
                let err_str = e.to_string();
                if err_str.contains("does not exist") {
                    StoreError::TableNotFound(table.fqn())
                } else {
                    StoreError::QueryError(err_str)
                }
            })
    }

    #[cfg(not(feature = "postgres"))]
    async fn insert(&self, _table: &TableRef, _record: &InsuranceRecord) -> Result<(), StoreError> {
        Err(StoreError::ConfigError(NOT_COMPILED.to_string()))
    }

    #[cfg(feature = "postgres")]
    async fn count_rows(&self, table: &TableRef) -> Result<u64, StoreError> {
        let row = self
            .client
            .query_one(&count_sql(&table.table), &[])
            .await
            .map_err(|e| StoreError::QueryError(e.to_string()))?;
        let count: i64 = row.get(0);
        Ok(count.max(0) as u64)
    }

    #[cfg(not(feature = "postgres"))]
    async fn count_rows(&self, _table: &TableRef) -> Result<u64, StoreError> {
        Err(StoreError::ConfigError(NOT_COMPILED.to_string()))
    }

    #[cfg(feature = "postgres")]
    async fn test_connection(&self) -> Result<(), StoreError> {
        self.client
            .simple_query("SELECT 1")
            .await
            .map(|_| ())
            .map_err(|e| StoreError::ConnectionError(format!(
                "Connection test failed for {}:{}/{}: {}",
                self.host, self.port, self.database, e
            )))
    }

    #[cfg(not(feature = "postgres"))]
    async fn test_connection(&self) -> Result<(), StoreError> {
        Err(StoreError::ConfigError(NOT_COMPILED.to_string()))
    }
}
