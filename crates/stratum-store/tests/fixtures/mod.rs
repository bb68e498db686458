//! Test fixtures for record sink integration tests
//!
//! Small insurance datasets shaped like the real download: seven columns,
//! integer ages and children, float bmi and expenses.

use stratum_core::Frame;

/// Header of the insurance dataset
pub const HEADER: &str = "age,sex,bmi,children,smoker,region,expenses";

/// Five well-formed rows
pub fn five_rows() -> Frame {
    csv(&[
        "19,female,27.9,0,yes,southwest,16884.92",
        "18,male,33.8,1,no,southeast,1725.55",
        "28,male,33.0,3,no,southeast,4449.46",
        "33,male,22.7,0,no,northwest,21984.47",
        "32,male,28.9,0,no,northwest,3866.86",
    ])
}

/// Three rows where the last one carries a non-numeric age
pub fn bad_last_row() -> Frame {
    csv(&[
        "46,female,33.4,1,no,southeast,8240.59",
        "37,female,27.7,3,no,northwest,7281.51",
        "unknown,male,29.8,2,no,northwest,6406.41",
    ])
}

/// Build a frame from data lines
pub fn csv(lines: &[&str]) -> Frame {
    let mut text = String::from(HEADER);
    for line in lines {
        text.push('\n');
        text.push_str(line);
    }
    text.push('\n');
    Frame::from_reader(text.as_bytes()).expect("fixture csv is well-formed")
}
