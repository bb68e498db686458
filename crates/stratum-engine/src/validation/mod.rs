//! Data validation: artifact presence, schema conformance, drift report
//!
//! The train partition is the reference distribution, the test partition the
//! current one.

pub mod dashboard;
pub mod drift_detector;
pub mod schema_check;

pub use dashboard::{render_dashboard, save_dashboard};
pub use drift_detector::{DriftDetector, NUMERIC_BINS};
pub use schema_check::SchemaCheck;

use std::path::{Path, PathBuf};
use stratum_core::artifact::ensure_non_empty_file;
use stratum_core::{
    DataIngestionArtifact, DataValidationArtifact, DataValidationConfig, DatasetSchema, DriftReport,
    Frame, PipelineError, RunState, Stage, StageTracker,
};

const COMPONENT: &str = "data_validation";

/// One validation run over a train/test pair
pub struct DataValidation {
    config: DataValidationConfig,
    train_file_path: PathBuf,
    test_file_path: PathBuf,
    tracker: Option<StageTracker>,
    schema_check: Option<SchemaCheck>,
}

impl DataValidation {
    /// Validate the partitions produced by an ingestion run
    pub fn new(config: DataValidationConfig, ingestion_artifact: &DataIngestionArtifact) -> Self {
        Self::for_files(
            config,
            ingestion_artifact.train_file_path.clone(),
            ingestion_artifact.test_file_path.clone(),
        )
    }

    /// Validate an arbitrary train/test pair
    pub fn for_files(config: DataValidationConfig, train: impl Into<PathBuf>, test: impl Into<PathBuf>) -> Self {
        tracing::info!(config = ?config, "data validation configured");
        Self {
            config,
            train_file_path: train.into(),
            test_file_path: test.into(),
            tracker: None,
            schema_check: None,
        }
    }

    pub fn config(&self) -> &DataValidationConfig {
        &self.config
    }

    pub fn state(&self) -> RunState {
        self.tracker
            .as_ref()
            .map(StageTracker::state)
            .unwrap_or(RunState::Initialized)
    }

    pub fn history(&self) -> &[RunState] {
        self.tracker.as_ref().map(StageTracker::history).unwrap_or(&[])
    }

    /// Schema check of the last run, if it got that far
    pub fn schema_check(&self) -> Option<&SchemaCheck> {
        self.schema_check.as_ref()
    }

    /// Both partitions exist and are non-empty
    pub fn check_files_exist(&self) -> Result<bool, PipelineError> {
        const OP: &str = "check_files_exist";
        ensure_non_empty_file(OP, &self.train_file_path)?;
        ensure_non_empty_file(OP, &self.test_file_path)?;
        Ok(true)
    }

    pub fn load_train_test(&self) -> Result<(Frame, Frame), PipelineError> {
        const OP: &str = "load_train_test";
        let train = Frame::read_csv(&self.train_file_path).map_err(|e| PipelineError::file_read(OP, e))?;
        let test = Frame::read_csv(&self.test_file_path).map_err(|e| PipelineError::file_read(OP, e))?;
        tracing::debug!(train_rows = train.len(), test_rows = test.len(), "partitions loaded");
        Ok((train, test))
    }

    pub fn load_schema(&self) -> Result<DatasetSchema, PipelineError> {
        DatasetSchema::from_file(&self.config.schema_file_path).map_err(|e| PipelineError::schema("load_schema", e))
    }

    /// Run the four schema checks; violations are recorded, not raised
    pub fn validate_schema(&self, schema: &DatasetSchema, train: &Frame, test: &Frame) -> SchemaCheck {
        let check = SchemaCheck::compare(
            schema,
            train,
            test,
            &display(&self.train_file_path),
            &display(&self.test_file_path),
        );
        tracing::info!(
            column_count_match = check.column_count_match,
            columns_declared = check.columns_declared,
            train_domain_valid = check.train_domain_valid,
            test_domain_valid = check.test_domain_valid,
            "schema validation finished"
        );
        check
    }

    /// Compare train against test and write the JSON report
    pub fn compute_drift_report(
        &self,
        schema: &DatasetSchema,
        train: &Frame,
        test: &Frame,
    ) -> Result<DriftReport, PipelineError> {
        const OP: &str = "compute_drift_report";

        let detector = DriftDetector::new(self.config.drift_threshold);
        let report = detector.detect(train, test, schema, Some(&display(&self.test_file_path)))?;
        report
            .save_to_file(&self.config.report_file_path)
            .map_err(|e| PipelineError::drift(OP, e))?;

        tracing::info!(
            path = %self.config.report_file_path.display(),
            drifted = report.summary.n_drifted_features,
            features = report.summary.n_features,
            dataset_drift = report.summary.dataset_drift,
            "drift report written"
        );
        Ok(report)
    }

    /// Render the HTML page for a report
    pub fn save_drift_dashboard(&self, report: &DriftReport) -> Result<(), PipelineError> {
        let path = &self.config.report_page_file_path;
        save_dashboard(report, &display(&self.train_file_path), &display(&self.test_file_path), path)
            .map_err(|e| PipelineError::drift("save_drift_dashboard", e))?;
        tracing::info!(path = %path.display(), "drift dashboard written");
        Ok(())
    }

    /// Exists check, schema check, then drift report and dashboard
    pub fn run(&mut self) -> Result<DataValidationArtifact, PipelineError> {
        let mut tracker = StageTracker::new(COMPONENT);
        let result = self.run_stages(&mut tracker);
        self.tracker = Some(tracker);
        result
    }

    fn run_stages(&mut self, tracker: &mut StageTracker) -> Result<DataValidationArtifact, PipelineError> {
        tracker.run(Stage::ExistsCheck, || self.check_files_exist())?;

        tracker.enter(Stage::SchemaCheck);
        let loaded = self
            .load_schema()
            .and_then(|schema| self.load_train_test().map(|(train, test)| (schema, train, test)));
        let (schema, train, test) = tracker.record(loaded)?;

        let check = self.validate_schema(&schema, &train, &test);
        let schema_valid = check.is_valid();
        self.schema_check = Some(check);
        if self.config.strict_mode && !schema_valid {
            let violations = self.schema_check.as_ref().map(SchemaCheck::violation_count).unwrap_or(0);
            tracker.record::<(), _>(Err(PipelineError::schema(
                "validate_schema",
                format!("train/test pair does not conform to the schema ({} domain violations)", violations),
            )))?;
        }

        let report = tracker.run(Stage::DriftReport, || {
            let report = self.compute_drift_report(&schema, &train, &test)?;
            self.save_drift_dashboard(&report)?;
            Ok::<_, PipelineError>(report)
        })?;
        let dataset_drift = report.has_dataset_drift();
        if self.config.strict_mode && dataset_drift {
            tracker.record::<(), _>(Err(PipelineError::drift(
                "compute_drift_report",
                format!(
                    "{} of {} features drifted",
                    report.summary.n_drifted_features, report.summary.n_features
                ),
            )))?;
        }

        let artifact = tracker.record(DataValidationArtifact::completed(
            self.config.schema_file_path.clone(),
            self.config.report_file_path.clone(),
            self.config.report_page_file_path.clone(),
            schema_valid,
            dataset_drift,
        ))?;
        tracing::info!(artifact = ?artifact, "data validation artifact created");

        tracker.complete();
        Ok(artifact)
    }
}

fn display(path: &Path) -> String {
    path.display().to_string()
}
