//! Typed insurance records and their coercion from raw CSV rows

use crate::adapter::StoreError;
use serde::{Deserialize, Serialize};
use stratum_core::Frame;

/// Columns of the insurance table, in insertion order
pub const INSURANCE_COLUMNS: [&str; 7] =
    ["age", "sex", "bmi", "children", "smoker", "region", "expenses"];

/// One row of the insurance dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsuranceRecord {
    pub age: i32,
    pub sex: String,
    pub bmi: f64,
    pub children: i32,
    pub smoker: String,
    pub region: String,
    pub expenses: f64,
}

impl InsuranceRecord {
    /// Coerce every row of `frame` into a record
    ///
    /// All rows are checked before any is returned so that a bad value never
    /// leaves a partially mirrored table behind.
    pub fn from_frame(frame: &Frame) -> Result<Vec<Self>, StoreError> {
        let mut idx = [0usize; 7];
        for (slot, column) in idx.iter_mut().zip(INSURANCE_COLUMNS) {
            *slot = frame.column_index(column).ok_or_else(|| StoreError::InvalidRecord {
                row: 0,
                message: format!("missing column '{}'", column),
            })?;
        }

        frame
            .rows()
            .iter()
            .enumerate()
            .map(|(i, row)| {
                let row_no = i + 1;
                Ok(Self {
                    age: parse_int(&row[idx[0]], "age", row_no)?,
                    sex: row[idx[1]].clone(),
                    bmi: parse_float(&row[idx[2]], "bmi", row_no)?,
                    children: parse_int(&row[idx[3]], "children", row_no)?,
                    smoker: row[idx[4]].clone(),
                    region: row[idx[5]].clone(),
                    expenses: parse_float(&row[idx[6]], "expenses", row_no)?,
                })
            })
            .collect()
    }
}

fn parse_float(value: &str, column: &str, row: usize) -> Result<f64, StoreError> {
    value
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| StoreError::InvalidRecord {
            row,
            message: format!("'{}' is not a number in column '{}'", value, column),
        })
}

// Integer columns written as "3.0" by other tools are accepted
fn parse_int(value: &str, column: &str, row: usize) -> Result<i32, StoreError> {
    let trimmed = value.trim();
    if let Ok(v) = trimmed.parse::<i32>() {
        return Ok(v);
    }
    match trimmed.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v >= i32::MIN as f64 && v <= i32::MAX as f64 => Ok(v as i32),
        _ => Err(StoreError::InvalidRecord {
            row,
            message: format!("'{}' is not an integer in column '{}'", value, column),
        }),
    }
}
