//! Schema checks for a train/test pair against the declared dataset schema
//!
//! Four independent checks are computed and ANDed:
//! - both partitions have the same number of columns
//! - both partitions have the same column set and every column is declared
//! - every categorical value in train is inside its declared domain
//! - every categorical value in test is inside its declared domain
//!
//! Domain violations are logged and recorded but never abort the check.

use std::collections::HashSet;
use stratum_core::{DatasetSchema, Diagnostic, DiagnosticCode, Frame, Location, Severity};

/// Result of checking a train/test pair against a schema
#[derive(Debug, Clone)]
pub struct SchemaCheck {
    /// Train and test have the same number of columns
    pub column_count_match: bool,

    /// Column sets are identical and every column is declared
    pub columns_declared: bool,

    /// No train value falls outside its declared domain
    pub train_domain_valid: bool,

    /// No test value falls outside its declared domain
    pub test_domain_valid: bool,

    /// Diagnostics produced by the comparison
    pub diagnostics: Vec<Diagnostic>,
}

impl SchemaCheck {
    /// Run all four checks
    pub fn compare(
        schema: &DatasetSchema,
        train: &Frame,
        test: &Frame,
        train_file: &str,
        test_file: &str,
    ) -> Self {
        let mut diagnostics = Vec::new();

        let column_count_match = train.column_count() == test.column_count();
        if !column_count_match {
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::SchemaColumnCountMismatch,
                    Severity::Error,
                    format!(
                        "Train has {} columns but test has {}",
                        train.column_count(),
                        test.column_count()
                    ),
                )
                .with_location(Location::new(test_file))
                .with_comparison(train.column_count().to_string(), test.column_count().to_string()),
            );
        }

        let columns_declared = check_columns(schema, train, test, train_file, test_file, &mut diagnostics);
        let train_domain_valid = check_domain(schema, train, train_file, &mut diagnostics);
        let test_domain_valid = check_domain(schema, test, test_file, &mut diagnostics);

        Self {
            column_count_match,
            columns_declared,
            train_domain_valid,
            test_domain_valid,
            diagnostics,
        }
    }

    /// All four checks passed
    pub fn is_valid(&self) -> bool {
        self.column_count_match && self.columns_declared && self.train_domain_valid && self.test_domain_valid
    }

    /// Check if the comparison produced any errors
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    /// Get count of domain violations
    pub fn violation_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.code == DiagnosticCode::SchemaDomainViolation)
            .count()
    }
}

fn check_columns(
    schema: &DatasetSchema,
    train: &Frame,
    test: &Frame,
    train_file: &str,
    test_file: &str,
    diagnostics: &mut Vec<Diagnostic>,
) -> bool {
    let mut valid = true;
    let test_columns: HashSet<&str> = test.columns().iter().map(String::as_str).collect();
    let train_columns: HashSet<&str> = train.columns().iter().map(String::as_str).collect();

    for column in train.columns() {
        if !test_columns.contains(column.as_str()) {
            valid = false;
            diagnostics.push(not_shared(column, "train", train_file));
        } else if !schema.declares_column(column) {
            valid = false;
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::SchemaUndeclaredColumn,
                    Severity::Error,
                    format!("Column '{}' is not declared in the schema", column),
                )
                .with_location(Location::new(train_file).with_column(column.clone())),
            );
        }
    }

    for column in test.columns() {
        if !train_columns.contains(column.as_str()) {
            valid = false;
            diagnostics.push(not_shared(column, "test", test_file));
        }
    }

    valid
}

fn not_shared(column: &str, partition: &str, file: &str) -> Diagnostic {
    Diagnostic::new(
        DiagnosticCode::SchemaColumnNotShared,
        Severity::Error,
        format!("Column '{}' is only present in the {} partition", column, partition),
    )
    .with_location(Location::new(file).with_column(column))
}

/// Check every domain-constrained column present in `frame`
fn check_domain(schema: &DatasetSchema, frame: &Frame, file: &str, diagnostics: &mut Vec<Diagnostic>) -> bool {
    let mut valid = true;

    for (column, allowed) in &schema.domain_value {
        let Some(idx) = frame.column_index(column) else {
            tracing::debug!(column = %column, file, "domain column absent, skipped");
            continue;
        };

        let mut reported = HashSet::new();
        for (row_no, row) in frame.rows().iter().enumerate() {
            let value = row[idx].as_str();
            if allowed.contains(value) || !reported.insert(value) {
                continue;
            }

            valid = false;
            tracing::warn!(
                column = %column,
                value,
                file,
                "value not in declared domain"
            );
            diagnostics.push(
                Diagnostic::new(
                    DiagnosticCode::SchemaDomainViolation,
                    Severity::Warn,
                    format!("Value '{}' is not allowed in column '{}'", value, column),
                )
                .with_location(Location::new(file).with_column(column.clone()).with_row(row_no + 1))
                .with_comparison(
                    allowed.iter().cloned().collect::<Vec<_>>().join("|"),
                    value,
                ),
            );
        }
    }

    valid
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEMA: &str = r#"
columns:
  age: int
  sex: category
  smoker: category
  expenses: float
domain_value:
  sex: [female, male]
  smoker: ["yes", "no"]
"#;

    fn frame(csv: &str) -> Frame {
        Frame::from_reader(csv.as_bytes()).unwrap()
    }

    fn schema() -> DatasetSchema {
        DatasetSchema::from_yaml(SCHEMA).unwrap()
    }

    const TRAIN: &str = "age,sex,smoker,expenses\n19,female,yes,16884.92\n18,male,no,1725.55\n";
    const TEST: &str = "age,sex,smoker,expenses\n28,male,no,4449.46\n";

    #[test]
    fn test_valid_pair() {
        let check = SchemaCheck::compare(&schema(), &frame(TRAIN), &frame(TEST), "train.csv", "test.csv");
        assert!(check.is_valid());
        assert!(check.diagnostics.is_empty());
    }

    #[test]
    fn test_extra_column_in_test() {
        let test = frame("age,sex,smoker,expenses,notes\n28,male,no,4449.46,x\n");
        let check = SchemaCheck::compare(&schema(), &frame(TRAIN), &test, "train.csv", "test.csv");

        assert!(!check.column_count_match);
        assert!(!check.columns_declared);
        assert!(check.train_domain_valid);
        assert!(check.test_domain_valid);
        assert!(!check.is_valid());
        assert!(check
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::SchemaColumnNotShared));
    }

    #[test]
    fn test_same_count_but_different_columns() {
        let test = frame("age,sex,smoker,region\n28,male,no,northwest\n");
        let check = SchemaCheck::compare(&schema(), &frame(TRAIN), &test, "train.csv", "test.csv");
        assert!(check.column_count_match);
        assert!(!check.columns_declared);
        assert!(!check.is_valid());
    }

    #[test]
    fn test_undeclared_shared_column() {
        let train = frame("age,region\n19,southwest\n");
        let test = frame("age,region\n28,northwest\n");
        let check = SchemaCheck::compare(&schema(), &train, &test, "train.csv", "test.csv");
        assert!(!check.columns_declared);
        assert_eq!(check.diagnostics[0].code, DiagnosticCode::SchemaUndeclaredColumn);
    }

    #[test]
    fn test_domain_violation_only_flags_its_partition() {
        let test = frame("age,sex,smoker,expenses\n28,male,maybe,4449.46\n30,male,maybe,1.0\n");
        let check = SchemaCheck::compare(&schema(), &frame(TRAIN), &test, "train.csv", "test.csv");

        assert!(check.train_domain_valid);
        assert!(!check.test_domain_valid);
        assert!(check.column_count_match && check.columns_declared);
        assert!(!check.is_valid());
        // repeated offending value is reported once
        assert_eq!(check.violation_count(), 1);

        let diag = &check.diagnostics[0];
        let location = diag.location.as_ref().unwrap();
        assert_eq!(location.file, "test.csv");
        assert_eq!(location.column.as_deref(), Some("smoker"));
        assert_eq!(location.row, Some(1));
    }

    #[test]
    fn test_domain_violation_in_train() {
        let train = frame("age,sex,smoker,expenses\n19,unknown,yes,1.0\n");
        let check = SchemaCheck::compare(&schema(), &train, &frame(TEST), "train.csv", "test.csv");
        assert!(!check.train_domain_valid);
        assert!(check.test_domain_valid);
        assert!(!check.has_errors());
    }

    #[test]
    fn test_domain_column_absent_is_skipped() {
        let train = frame("age,expenses\n19,1.0\n");
        let test = frame("age,expenses\n20,2.0\n");
        let check = SchemaCheck::compare(&schema(), &train, &test, "train.csv", "test.csv");
        assert!(check.is_valid());
    }
}
