//! Mirror the raw dataset into a relational table

use super::split::RawDataFile;
use stratum_core::{DatabaseArtifact, DatabaseConfig, Frame, PipelineError};
use stratum_store::{InsuranceRecord, PostgresSink, RecordSink, TableRef};

/// Open the configured PostgreSQL database, creating it when absent
pub async fn connect_postgres(config: &DatabaseConfig) -> Result<PostgresSink, PipelineError> {
    PostgresSink::connect(config)
        .await
        .map_err(|e| PipelineError::database("connect_database", e))
}

/// Insert every row of `raw` into the configured table, one row at a time
///
/// All rows are coerced to the table's column types first; one bad value
/// fails the operation before anything is written. Re-running appends.
pub async fn mirror_to_database(
    raw: &RawDataFile,
    config: &DatabaseConfig,
    sink: &dyn RecordSink,
) -> Result<DatabaseArtifact, PipelineError> {
    const OP: &str = "mirror_to_database";

    let frame = Frame::read_csv(raw.path()).map_err(|e| PipelineError::file_read(OP, e))?;
    let records = InsuranceRecord::from_frame(&frame).map_err(|e| PipelineError::database(OP, e))?;

    let table = TableRef::new(&config.database, &config.table).map_err(|e| PipelineError::database(OP, e))?;
    sink.ensure_table(&table)
        .await
        .map_err(|e| PipelineError::database(OP, e))?;

    let tables = sink.list_tables().await.map_err(|e| PipelineError::database(OP, e))?;
    if !tables.contains(&table.table) {
        tracing::warn!(
            sink = sink.name(),
            table = %table,
            "table missing from listing after creation, nothing inserted"
        );
        return Ok(DatabaseArtifact::from_config(config, 0));
    }

    tracing::info!(sink = sink.name(), table = %table, rows = records.len(), "inserting rows");
    for record in &records {
        sink.insert(&table, record)
            .await
            .map_err(|e| PipelineError::database(OP, e))?;
    }

    let artifact = DatabaseArtifact::from_config(config, records.len());
    tracing::info!(artifact = ?artifact, "database mirror completed");
    Ok(artifact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::ErrorKind;
    use stratum_store::MemorySink;

    const RAW: &str = "age,sex,bmi,children,smoker,region,expenses\n\
                       19,female,27.9,0,yes,southwest,16884.92\n\
                       18,male,33.8,1,no,southeast,1725.55\n";

    fn config() -> DatabaseConfig {
        DatabaseConfig {
            host: "localhost".into(),
            port: 5432,
            username: "etl".into(),
            password: "secret".into(),
            database: "insurance_db".into(),
            table: "insurance".into(),
            tls: false,
        }
    }

    fn raw_file(dir: &tempfile::TempDir, body: &str) -> RawDataFile {
        let path = dir.path().join("insurance.csv");
        std::fs::write(&path, body).unwrap();
        RawDataFile::new(path)
    }

    #[tokio::test]
    async fn test_mirror_inserts_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new();

        let artifact = mirror_to_database(&raw_file(&dir, RAW), &config(), &sink).await.unwrap();

        assert_eq!(artifact.rows_inserted, 2);
        assert_eq!(artifact.table, "insurance");
        assert_eq!(sink.rows("insurance").await[1].record.region, "southeast");
    }

    #[tokio::test]
    async fn test_mixed_case_table_name() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new();
        let mut config = config();
        config.table = "Insurance".into();

        let artifact = mirror_to_database(&raw_file(&dir, RAW), &config, &sink).await.unwrap();

        assert_eq!(artifact.rows_inserted, 2);
        assert_eq!(artifact.table, "Insurance");
        assert_eq!(sink.rows("Insurance").await.len(), 2);
    }

    #[tokio::test]
    async fn test_bad_row_inserts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new();
        let body = format!("{}20,male,abc,0,no,northwest,100.0\n", RAW);

        let err = mirror_to_database(&raw_file(&dir, &body), &config(), &sink)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Database);
        assert_eq!(err.operation(), "mirror_to_database");
        assert!(sink.rows("insurance").await.is_empty());
    }

    #[tokio::test]
    async fn test_unlisted_table_inserts_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new().with_hidden_table("insurance");

        let artifact = mirror_to_database(&raw_file(&dir, RAW), &config(), &sink).await.unwrap();
        assert_eq!(artifact.rows_inserted, 0);
        assert!(sink.rows("insurance").await.is_empty());
    }

    #[tokio::test]
    async fn test_connection_failure_is_database_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = MemorySink::new().with_connection_failure();

        let err = mirror_to_database(&raw_file(&dir, RAW), &config(), &sink)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Database);
    }

    #[tokio::test]
    async fn test_connect_postgres_wraps_store_error() {
        let mut config = config();
        config.database = "bad name".into();
        let err = connect_postgres(&config).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::Database);
        assert_eq!(err.operation(), "connect_database");
    }
}
