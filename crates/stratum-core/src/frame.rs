//! In-memory tabular data and its CSV codec
//!
//! Cells are kept as the exact text read from disk, so a frame written back
//! out reproduces the original values byte for byte.

use std::io::{Read, Write};
use std::path::Path;

/// Errors raised while reading, writing or querying a frame
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("file has no header row")]
    MissingHeader,

    #[error("row {row} has {found} fields, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("column '{0}' not found")]
    MissingColumn(String),

    #[error("column '{column}' row {row}: '{value}' is not a number")]
    NotNumeric {
        column: String,
        row: usize,
        value: String,
    },
}

/// Parsed numeric column, see [`Frame::numeric_values`]
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NumericColumn {
    pub values: Vec<f64>,
    /// Blank or non-finite cells
    pub missing: usize,
}

/// A header plus string rows
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Frame {
    /// Build a frame, checking every row matches the header width
    pub fn new(columns: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, FrameError> {
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(FrameError::RaggedRow {
                    row: idx,
                    expected: columns.len(),
                    found: row.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    /// Read a comma-delimited file with a header row
    pub fn read_csv(path: &Path) -> Result<Self, FrameError> {
        let file = std::fs::File::open(path).map_err(|source| FrameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_reader(file)
    }

    /// Parse CSV from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, FrameError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

        let columns: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        if columns.is_empty() || columns.iter().all(|c| c.is_empty()) {
            return Err(FrameError::MissingHeader);
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }

        Self::new(columns, rows)
    }

    /// Write the frame as CSV, header first, without an index column
    pub fn write_csv(&self, path: &Path) -> Result<(), FrameError> {
        let file = std::fs::File::create(path).map_err(|source| FrameError::Io {
            path: path.display().to_string(),
            source,
        })?;
        self.to_writer(file)
    }

    /// Serialize CSV into any writer
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<(), FrameError> {
        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&self.columns)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(|source| FrameError::Io {
            path: "<writer>".to_string(),
            source,
        })?;
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// All values of one column, in row order
    pub fn column(&self, name: &str) -> Result<Vec<&str>, FrameError> {
        let idx = self
            .column_index(name)
            .ok_or_else(|| FrameError::MissingColumn(name.to_string()))?;
        Ok(self.rows.iter().map(|row| row[idx].as_str()).collect())
    }

    /// Parse a column as floating point numbers
    pub fn numeric_column(&self, name: &str) -> Result<Vec<f64>, FrameError> {
        self.column(name)?
            .into_iter()
            .enumerate()
            .map(|(row, value)| {
                value.trim().parse::<f64>().map_err(|_| FrameError::NotNumeric {
                    column: name.to_string(),
                    row,
                    value: value.to_string(),
                })
            })
            .collect()
    }

    /// Finite values of a column, skipping missing cells
    ///
    /// Blank cells and non-finite numbers (`NaN`, `inf`) count as missing.
    /// Any other text is an error.
    pub fn numeric_values(&self, name: &str) -> Result<NumericColumn, FrameError> {
        let mut column = NumericColumn::default();
        for (row, value) in self.column(name)?.into_iter().enumerate() {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                column.missing += 1;
                continue;
            }
            match trimmed.parse::<f64>() {
                Ok(v) if v.is_finite() => column.values.push(v),
                Ok(_) => column.missing += 1,
                Err(_) => {
                    return Err(FrameError::NotNumeric {
                        column: name.to_string(),
                        row,
                        value: value.to_string(),
                    })
                }
            }
        }
        Ok(column)
    }

    /// Whether the column holds at least one number and no other text
    pub fn is_numeric_column(&self, name: &str) -> bool {
        matches!(self.numeric_values(name), Ok(column) if !column.values.is_empty())
    }

    /// Append a column; `values` must have one entry per row
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<String>) -> Result<(), FrameError> {
        if values.len() != self.rows.len() {
            return Err(FrameError::RaggedRow {
                row: self.rows.len().min(values.len()),
                expected: self.rows.len(),
                found: values.len(),
            });
        }
        self.columns.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Remove a column, returning whether it existed
    pub fn drop_column(&mut self, name: &str) -> bool {
        match self.column_index(name) {
            Some(idx) => {
                self.columns.remove(idx);
                for row in &mut self.rows {
                    row.remove(idx);
                }
                true
            }
            None => false,
        }
    }

    /// New frame holding the given rows, in the given order
    pub fn take_rows(&self, indices: &[usize]) -> Frame {
        Frame {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "age,sex,bmi,expenses\n19,female,27.9,16884.92\n18,male,33.8,1725.55\n28,male,33.0,4449.46\n";

    #[test]
    fn parse_and_query() {
        let frame = Frame::from_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(frame.columns(), &["age", "sex", "bmi", "expenses"]);
        assert_eq!(frame.len(), 3);
        assert_eq!(frame.numeric_column("bmi").unwrap(), vec![27.9, 33.8, 33.0]);
        assert!(frame.is_numeric_column("expenses"));
        assert!(!frame.is_numeric_column("sex"));
    }

    #[test]
    fn write_preserves_text() {
        let frame = Frame::from_reader(SAMPLE.as_bytes()).unwrap();
        let mut out = Vec::new();
        frame.to_writer(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), SAMPLE);
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let result = Frame::from_reader("a,b\n1,2\n3\n".as_bytes());
        assert!(matches!(result, Err(FrameError::Csv(_))));
    }

    #[test]
    fn empty_input_has_no_header() {
        let result = Frame::from_reader("".as_bytes());
        assert!(matches!(result, Err(FrameError::MissingHeader)));
    }

    #[test]
    fn missing_and_non_numeric_columns() {
        let frame = Frame::from_reader(SAMPLE.as_bytes()).unwrap();
        assert!(matches!(frame.column("region"), Err(FrameError::MissingColumn(_))));
        match frame.numeric_column("sex") {
            Err(FrameError::NotNumeric { row, value, .. }) => {
                assert_eq!(row, 0);
                assert_eq!(value, "female");
            }
            other => panic!("expected NotNumeric, got {:?}", other),
        }
    }

    #[test]
    fn numeric_values_skip_missing_cells() {
        let frame = Frame::from_reader("age,bmi\n19,27.9\n18,\n28,NaN\n30, 31.5 \n".as_bytes()).unwrap();

        let bmi = frame.numeric_values("bmi").unwrap();
        assert_eq!(bmi.values, vec![27.9, 31.5]);
        assert_eq!(bmi.missing, 2);
        assert!(frame.is_numeric_column("bmi"));
        assert!(frame.numeric_column("bmi").is_err());

        let blank = Frame::from_reader("bmi\n\n \n".as_bytes()).unwrap();
        assert!(!blank.is_numeric_column("bmi"));
    }

    #[test]
    fn push_drop_and_take() {
        let mut frame = Frame::from_reader(SAMPLE.as_bytes()).unwrap();
        frame
            .push_column("bucket", vec!["5".into(), "5".into(), "5".into()])
            .unwrap();
        assert_eq!(frame.column_count(), 5);

        let subset = frame.take_rows(&[2, 0]);
        assert_eq!(subset.column("age").unwrap(), vec!["28", "19"]);

        assert!(frame.drop_column("bucket"));
        assert!(!frame.drop_column("bucket"));
        assert_eq!(frame.columns(), &["age", "sex", "bmi", "expenses"]);
    }
}
