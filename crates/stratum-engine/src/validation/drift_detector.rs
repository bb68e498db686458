//! Distribution drift between the train (reference) and test (current) partitions
//!
//! Numeric features are compared with a two-sample Kolmogorov-Smirnov test,
//! categorical features with a chi-square test against reference proportions.
//! A feature drifts when its p-value falls below the threshold. Blank and
//! non-finite numeric cells are left out of the test and reported as
//! warnings.

use crate::stats::{self, TestResult};
use stratum_core::{
    DatasetSchema, Diagnostic, DiagnosticCode, DriftReport, FeatureDrift, FeatureType, Frame,
    HistogramBin, Location, PipelineError, Severity, StatTest,
};

/// Number of equal-width bins in numeric histograms
pub const NUMERIC_BINS: usize = 10;

/// Compares feature distributions of two frames
#[derive(Debug, Clone, Copy)]
pub struct DriftDetector {
    threshold: f64,
}

impl DriftDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Compare every column shared by `reference` and `current`
    ///
    /// The schema's `target_column`, if any, is not treated as a feature.
    pub fn detect(
        &self,
        reference: &Frame,
        current: &Frame,
        schema: &DatasetSchema,
        current_file: Option<&str>,
    ) -> Result<DriftReport, PipelineError> {
        const OP: &str = "compute_drift_report";

        let mut features = Vec::new();
        let mut missing = Vec::new();
        for column in reference.columns() {
            if !current.has_column(column) || schema.target_column.as_deref() == Some(column.as_str()) {
                continue;
            }

            let feature_type = match schema.is_categorical(column) {
                Some(true) => FeatureType::Categorical,
                Some(false) => FeatureType::Numerical,
                None if reference.is_numeric_column(column) && current.is_numeric_column(column) => {
                    FeatureType::Numerical
                }
                None => FeatureType::Categorical,
            };

            let drift = match feature_type {
                FeatureType::Numerical => {
                    let ref_values = reference
                        .numeric_values(column)
                        .map_err(|e| PipelineError::drift(OP, e))?;
                    let cur_values = current
                        .numeric_values(column)
                        .map_err(|e| PipelineError::drift(OP, e))?;
                    if ref_values.missing + cur_values.missing > 0 {
                        tracing::warn!(
                            feature = %column,
                            reference_missing = ref_values.missing,
                            current_missing = cur_values.missing,
                            "missing numeric cells skipped"
                        );
                        missing.push(missing_values(column, ref_values.missing, cur_values.missing, current_file));
                    }
                    self.numeric_feature(column, &ref_values.values, &cur_values.values)
                }
                FeatureType::Categorical => {
                    let ref_values = reference.column(column).map_err(|e| PipelineError::drift(OP, e))?;
                    let cur_values = current.column(column).map_err(|e| PipelineError::drift(OP, e))?;
                    self.categorical_feature(column, &ref_values, &cur_values)
                }
            };

            tracing::debug!(
                feature = %drift.name,
                stattest = %drift.stattest,
                p_value = drift.p_value,
                drift_detected = drift.drift_detected,
                "feature compared"
            );
            features.push(drift);
        }

        let mut report = DriftReport::from_features(
            features,
            self.threshold,
            reference.len(),
            current.len(),
            current_file,
        );
        report.diagnostics.extend(missing);

        tracing::info!(
            n_features = report.summary.n_features,
            n_drifted = report.summary.n_drifted_features,
            dataset_drift = report.summary.dataset_drift,
            "drift report computed"
        );

        Ok(report)
    }

    fn numeric_feature(&self, name: &str, reference: &[f64], current: &[f64]) -> FeatureDrift {
        let result = stats::ks_two_sample(reference, current);
        let (reference_histogram, current_histogram) = numeric_histograms(reference, current);
        self.feature(name, FeatureType::Numerical, StatTest::Ks, result, reference_histogram, current_histogram)
    }

    fn categorical_feature(&self, name: &str, reference: &[&str], current: &[&str]) -> FeatureDrift {
        let result = stats::chi_square_two_sample(reference, current);
        let (reference_histogram, current_histogram) = categorical_histograms(reference, current);
        self.feature(
            name,
            FeatureType::Categorical,
            StatTest::ChiSquare,
            result,
            reference_histogram,
            current_histogram,
        )
    }

    fn feature(
        &self,
        name: &str,
        feature_type: FeatureType,
        stattest: StatTest,
        result: TestResult,
        reference_histogram: Vec<HistogramBin>,
        current_histogram: Vec<HistogramBin>,
    ) -> FeatureDrift {
        FeatureDrift {
            name: name.to_string(),
            feature_type,
            stattest,
            statistic: result.statistic.filter(|s| s.is_finite()),
            p_value: result.p_value,
            drift_detected: result.p_value < self.threshold,
            reference_histogram,
            current_histogram,
        }
    }
}

impl Default for DriftDetector {
    fn default() -> Self {
        Self::new(0.05)
    }
}

fn missing_values(column: &str, reference: usize, current: usize, current_file: Option<&str>) -> Diagnostic {
    let mut diag = Diagnostic::new(
        DiagnosticCode::DriftMissingValues,
        Severity::Warn,
        format!(
            "Feature '{}' has missing values ({} in reference, {} in current); they were left out of the test",
            column, reference, current
        ),
    );
    if let Some(file) = current_file {
        diag = diag.with_location(Location::new(file).with_column(column));
    }
    diag
}

/// Equal-width histograms over the combined range of both samples
fn numeric_histograms(reference: &[f64], current: &[f64]) -> (Vec<HistogramBin>, Vec<HistogramBin>) {
    let all = reference.iter().chain(current);
    let min = all.clone().copied().fold(f64::INFINITY, f64::min);
    let max = all.copied().fold(f64::NEG_INFINITY, f64::max);

    if !min.is_finite() || !max.is_finite() {
        return (Vec::new(), Vec::new());
    }

    let bins = if max > min { NUMERIC_BINS } else { 1 };
    let width = if max > min { (max - min) / bins as f64 } else { 1.0 };

    let histogram = |values: &[f64]| {
        let mut counts = vec![0usize; bins];
        for v in values {
            let idx = (((v - min) / width) as usize).min(bins - 1);
            counts[idx] += 1;
        }
        counts
            .into_iter()
            .enumerate()
            .map(|(i, count)| HistogramBin {
                label: format!(
                    "{:.2}-{:.2}",
                    min + i as f64 * width,
                    if bins == 1 { max } else { min + (i + 1) as f64 * width }
                ),
                count,
            })
            .collect::<Vec<_>>()
    };

    (histogram(reference), histogram(current))
}

/// Value counts over the union of categories, reference categories first
fn categorical_histograms(reference: &[&str], current: &[&str]) -> (Vec<HistogramBin>, Vec<HistogramBin>) {
    let ref_counts = stats::value_counts(reference);
    let cur_counts = stats::value_counts(current);

    let mut categories: Vec<&str> = ref_counts.iter().map(|(k, _)| *k).collect();
    for (k, _) in &cur_counts {
        if !categories.contains(k) {
            categories.push(*k);
        }
    }

    let histogram = |counts: &[(&str, usize)]| {
        categories
            .iter()
            .map(|category| HistogramBin {
                label: category.to_string(),
                count: counts
                    .iter()
                    .find(|(k, _)| k == category)
                    .map(|(_, c)| *c)
                    .unwrap_or(0),
            })
            .collect::<Vec<_>>()
    };

    (histogram(&ref_counts), histogram(&cur_counts))
}
