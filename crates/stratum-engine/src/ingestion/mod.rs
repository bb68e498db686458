//! Data ingestion: download, optional database mirror, stratified split
//!
//! ```rust,ignore
//! let mut ingestion = DataIngestion::new(config.data_ingestion_config(&stamp));
//! let artifact = ingestion.run().await?;
//! ```

pub mod download;
pub mod mirror;
pub mod split;

pub use download::{DownloadError, Downloader};
pub use mirror::{connect_postgres, mirror_to_database};
pub use split::{RawDataFile, SplitError, SplitOptions};

use std::path::PathBuf;
use stratum_core::{
    DataIngestionArtifact, DataIngestionConfig, DatabaseArtifact, DatabaseConfig, PipelineError,
    RunState, Stage, StageTracker,
};
use stratum_store::RecordSink;

const COMPONENT: &str = "data_ingestion";

/// Where the raw file of a run comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSource {
    /// Fetch `dataset_download_url`
    Download,

    /// Copy the single file found in a local directory
    Directory(PathBuf),
}

/// Database the raw file is mirrored into
pub struct MirrorTarget {
    pub config: DatabaseConfig,
    pub sink: Box<dyn RecordSink>,
}

/// One ingestion run
pub struct DataIngestion {
    config: DataIngestionConfig,
    source: RawSource,
    downloader: Downloader,
    mirror: Option<MirrorTarget>,
    tracker: Option<StageTracker>,
    database_artifact: Option<DatabaseArtifact>,
}

impl DataIngestion {
    pub fn new(config: DataIngestionConfig) -> Self {
        tracing::info!(config = ?config, "data ingestion configured");
        Self {
            config,
            source: RawSource::Download,
            downloader: Downloader::new(),
            mirror: None,
            tracker: None,
            database_artifact: None,
        }
    }

    /// Take the raw file from a local directory instead of downloading it
    pub fn with_local_source(mut self, dir: impl Into<PathBuf>) -> Self {
        self.source = RawSource::Directory(dir.into());
        self
    }

    pub fn with_downloader(mut self, downloader: Downloader) -> Self {
        self.downloader = downloader;
        self
    }

    /// Mirror the raw file into `sink` before splitting
    pub fn with_mirror(mut self, config: DatabaseConfig, sink: Box<dyn RecordSink>) -> Self {
        self.mirror = Some(MirrorTarget { config, sink });
        self
    }

    pub fn config(&self) -> &DataIngestionConfig {
        &self.config
    }

    /// Current run state
    pub fn state(&self) -> RunState {
        self.tracker
            .as_ref()
            .map(StageTracker::state)
            .unwrap_or(RunState::Initialized)
    }

    /// States visited by the last run
    pub fn history(&self) -> &[RunState] {
        self.tracker.as_ref().map(StageTracker::history).unwrap_or(&[])
    }

    /// Artifact of the mirror stage, if it ran
    pub fn database_artifact(&self) -> Option<&DatabaseArtifact> {
        self.database_artifact.as_ref()
    }

    /// Fetch the raw dataset into `raw_data_dir`
    pub async fn download(&self) -> Result<RawDataFile, PipelineError> {
        let path = self
            .downloader
            .download(&self.config.dataset_download_url, &self.config.raw_data_dir)
            .await
            .map_err(|e| PipelineError::download("download", e))?;
        Ok(RawDataFile::new(path))
    }

    /// Copy the single file of `dir` into `raw_data_dir`
    pub fn adopt_local(&self, dir: &std::path::Path) -> Result<RawDataFile, PipelineError> {
        const OP: &str = "adopt_local_raw_file";

        let source = RawDataFile::discover(dir).map_err(|e| PipelineError::split(OP, e))?;
        let file_name = source.file_name().map_err(|e| PipelineError::split(OP, e))?;

        std::fs::create_dir_all(&self.config.raw_data_dir)
            .map_err(|e| PipelineError::download(OP, e))?;
        let destination = self.config.raw_data_dir.join(file_name);
        std::fs::copy(source.path(), &destination).map_err(|e| PipelineError::download(OP, e))?;

        tracing::info!(
            from = %source.path().display(),
            to = %destination.display(),
            "using local raw data file"
        );
        Ok(RawDataFile::new(destination))
    }

    /// Split the raw file into train and test partitions
    pub fn split(&self, raw: &RawDataFile) -> Result<DataIngestionArtifact, PipelineError> {
        let output = split::split_raw_file(
            raw,
            &self.config.ingested_train_dir,
            &self.config.ingested_test_dir,
            &SplitOptions::default(),
        )
        .map_err(|e| PipelineError::split("split", e))?;

        let artifact = DataIngestionArtifact::completed(
            output.train_file_path,
            output.test_file_path,
            raw.path().to_path_buf(),
            output.train_rows,
            output.test_rows,
        )?;

        tracing::info!(artifact = ?artifact, "data ingestion artifact created");
        Ok(artifact)
    }

    /// Acquire the raw file, mirror it when configured, then split
    pub async fn run(&mut self) -> Result<DataIngestionArtifact, PipelineError> {
        let mut tracker = StageTracker::new(COMPONENT);
        let result = self.run_stages(&mut tracker).await;
        self.tracker = Some(tracker);
        result
    }

    async fn run_stages(&mut self, tracker: &mut StageTracker) -> Result<DataIngestionArtifact, PipelineError> {
        tracker.enter(Stage::Download);
        let raw = match &self.source {
            RawSource::Download => self.download().await,
            RawSource::Directory(dir) => self.adopt_local(dir),
        };
        let raw = tracker.record(raw)?;

        if let Some(target) = &self.mirror {
            tracker.enter(Stage::Mirror);
            let result = mirror_to_database(&raw, &target.config, target.sink.as_ref()).await;
            self.database_artifact = Some(tracker.record(result)?);
        } else {
            tracing::info!("no database configured, mirror skipped");
        }

        let artifact = tracker.run(Stage::Split, || self.split(&raw))?;
        tracker.complete();
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stratum_core::ErrorKind;
    use stratum_store::MemorySink;

    fn config(root: &std::path::Path) -> DataIngestionConfig {
        DataIngestionConfig {
            dataset_download_url: "http://127.0.0.1:9/insurance.csv".to_string(),
            raw_data_dir: root.join("raw_data"),
            ingested_train_dir: root.join("ingested_data/train"),
            ingested_test_dir: root.join("ingested_data/test"),
        }
    }

    fn write_source(dir: &std::path::Path, rows: usize) {
        std::fs::create_dir_all(dir).unwrap();
        let mut csv = String::from("age,sex,bmi,children,smoker,region,expenses\n");
        for i in 0..rows {
            csv.push_str(&format!(
                "{},{},{:.1},{},no,northeast,{:.2}\n",
                18 + i % 40,
                if i % 2 == 0 { "male" } else { "female" },
                20.0 + (i % 15) as f64,
                i % 4,
                0.5 + (i % 5) as f64 * 1.5
            ));
        }
        std::fs::write(dir.join("insurance.csv"), csv).unwrap();
    }

    #[tokio::test]
    async fn test_run_from_local_source_with_mirror() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        write_source(&source, 50);
        let sink = MemorySink::new();
        let db = DatabaseConfig {
            host: "localhost".into(),
            port: 5432,
            username: "etl".into(),
            password: String::new(),
            database: "insurance_db".into(),
            table: "insurance".into(),
            tls: false,
        };

        let mut ingestion = DataIngestion::new(config(&dir.path().join("run")))
            .with_local_source(&source)
            .with_mirror(db, Box::new(sink.clone()));
        let artifact = ingestion.run().await.unwrap();

        assert!(artifact.is_ingested);
        assert_eq!(artifact.train_rows + artifact.test_rows, 50);
        assert_eq!(artifact.test_rows, 10);
        assert_eq!(ingestion.database_artifact().unwrap().rows_inserted, 50);
        assert_eq!(sink.rows("insurance").await.len(), 50);
        assert_eq!(ingestion.state(), RunState::Completed);
        assert_eq!(
            ingestion.history(),
            &[
                RunState::Initialized,
                RunState::Running(Stage::Download),
                RunState::Running(Stage::Mirror),
                RunState::Running(Stage::Split),
                RunState::Completed,
            ]
        );
    }

    #[tokio::test]
    async fn test_mirror_failure_aborts_split() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("source");
        write_source(&source, 20);
        let run_dir = dir.path().join("run");
        let db = DatabaseConfig {
            host: "localhost".into(),
            port: 5432,
            username: "etl".into(),
            password: String::new(),
            database: "insurance_db".into(),
            table: "insurance".into(),
            tls: false,
        };

        let mut ingestion = DataIngestion::new(config(&run_dir))
            .with_local_source(&source)
            .with_mirror(db, Box::new(MemorySink::new().with_connection_failure()));
        let err = ingestion.run().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Database);
        assert_eq!(ingestion.state(), RunState::Failed(Stage::Mirror));
        assert!(!run_dir.join("ingested_data").exists());
    }

    #[tokio::test]
    async fn test_download_failure_is_download_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(dir.path());
        cfg.dataset_download_url = "https://example.com/".to_string();

        let mut ingestion = DataIngestion::new(cfg);
        let err = ingestion.run().await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Download);
        assert_eq!(ingestion.state(), RunState::Failed(Stage::Download));
    }

    #[tokio::test]
    async fn test_empty_local_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("empty");
        std::fs::create_dir_all(&source).unwrap();

        let mut ingestion = DataIngestion::new(config(dir.path())).with_local_source(&source);
        let err = ingestion.run().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Split);
    }
}
