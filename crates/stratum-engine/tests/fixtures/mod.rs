//! Test fixtures for pipeline integration tests

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use stratum_core::{DataIngestionConfig, DataValidationConfig};

pub const HEADER: &str = "age,sex,bmi,children,smoker,region,expenses";

pub const SCHEMA: &str = r#"
columns:
  age: int
  sex: category
  bmi: float
  children: int
  smoker: category
  region: category
  expenses: float
numerical_columns: [age, bmi, children]
categorical_columns: [sex, smoker, region]
target_column: expenses
domain_value:
  sex: [female, male]
  smoker: ["yes", "no"]
  region: [northeast, northwest, southeast, southwest]
"#;

const REGIONS: [&str; 4] = ["northeast", "northwest", "southeast", "southwest"];

/// Insurance-shaped CSV whose expenses cover all five split buckets
pub fn insurance_csv(rows: usize) -> String {
    let mut csv = String::from(HEADER);
    csv.push('\n');
    for i in 0..rows {
        csv.push_str(&format!(
            "{},{},{:.1},{},{},{},{:.2}\n",
            18 + (i * 7) % 47,
            if i % 3 == 0 { "female" } else { "male" },
            18.0 + ((i * 13) % 200) as f64 / 10.0,
            i % 5,
            if i % 4 == 0 { "yes" } else { "no" },
            REGIONS[i % 4],
            0.5 + (i % 5) as f64 * 1.5 + (i % 7) as f64 * 0.01,
        ));
    }
    csv
}

/// Write `insurance.csv` with `rows` rows into `dir`
pub fn write_raw(dir: &Path, rows: usize) -> PathBuf {
    std::fs::create_dir_all(dir).unwrap();
    let path = dir.join("insurance.csv");
    std::fs::write(&path, insurance_csv(rows)).unwrap();
    path
}

pub fn ingestion_config(root: &Path, url: &str) -> DataIngestionConfig {
    DataIngestionConfig {
        dataset_download_url: url.to_string(),
        raw_data_dir: root.join("data_ingestion/raw_data"),
        ingested_train_dir: root.join("data_ingestion/ingested_data/train"),
        ingested_test_dir: root.join("data_ingestion/ingested_data/test"),
    }
}

/// Validation config with the fixture schema written under `root`
pub fn validation_config(root: &Path, strict_mode: bool) -> DataValidationConfig {
    let schema_file_path = root.join("config/schema.yaml");
    std::fs::create_dir_all(root.join("config")).unwrap();
    std::fs::write(&schema_file_path, SCHEMA).unwrap();

    DataValidationConfig {
        schema_file_path,
        report_file_path: root.join("data_validation/report.json"),
        report_page_file_path: root.join("data_validation/report.html"),
        strict_mode,
        drift_threshold: 0.05,
    }
}
