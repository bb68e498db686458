//! Stratified train/test split of the raw dataset
//!
//! The continuous target is bucketed into right-closed bins, each bucket is
//! split proportionally, and both partitions are written without the bucket
//! column under the raw file's base name.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use stratum_core::{Frame, FrameError};

/// Parameters of the stratified split
#[derive(Debug, Clone, PartialEq)]
pub struct SplitOptions {
    /// Continuous column the buckets are derived from
    pub target_column: String,

    /// Name of the temporary bucket column
    pub category_column: String,

    /// Bin edges; bucket `i` is `(edges[i-1], edges[i]]`, labeled from 1
    pub bin_edges: Vec<f64>,

    /// Fraction of rows assigned to test
    pub test_size: f64,

    pub seed: u64,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            target_column: "expenses".to_string(),
            category_column: "expenses_category".to_string(),
            bin_edges: vec![0.0, 1.5, 3.0, 4.5, 6.0, f64::INFINITY],
            test_size: 0.2,
            seed: 42,
        }
    }
}

/// Split failures
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    #[error("cannot read raw data: {0}")]
    Frame(#[from] FrameError),

    #[error("target column '{0}' is missing")]
    MissingTarget(String),

    #[error("raw data already has a column named '{0}'")]
    CategoryColumnExists(String),

    #[error("row {row}: target value '{value}' is outside the bins")]
    OutOfBins { row: usize, value: String },

    #[error("bucket {label} has only 1 member; every bucket needs at least 2")]
    SingletonClass { label: usize },

    #[error("{rows} rows cannot be split into {classes} buckets (train {train}, test {test})")]
    TooFewRows {
        rows: usize,
        classes: usize,
        train: usize,
        test: usize,
    },

    #[error("no raw data file in {0}")]
    NoRawFile(String),

    #[error("expected exactly one raw data file in {dir}, found {count}")]
    AmbiguousRawFile { dir: String, count: usize },

    #[error("raw data path {0} has no file name")]
    NoFileName(String),

    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl SplitError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Explicit handle to the one raw data file of a run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDataFile {
    path: PathBuf,
}

impl RawDataFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Find the single regular file in `dir`
    pub fn discover(dir: &Path) -> Result<Self, SplitError> {
        let entries = std::fs::read_dir(dir).map_err(|e| SplitError::io(dir, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SplitError::io(dir, e))?;
            let file_type = entry.file_type().map_err(|e| SplitError::io(&entry.path(), e))?;
            if file_type.is_file() {
                files.push(entry.path());
            }
        }

        match files.len() {
            0 => Err(SplitError::NoRawFile(dir.display().to_string())),
            1 => Ok(Self { path: files.remove(0) }),
            count => Err(SplitError::AmbiguousRawFile {
                dir: dir.display().to_string(),
                count,
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Base name used for the train and test files
    pub fn file_name(&self) -> Result<&std::ffi::OsStr, SplitError> {
        self.path
            .file_name()
            .ok_or_else(|| SplitError::NoFileName(self.path.display().to_string()))
    }
}

/// Result of splitting one raw file
#[derive(Debug, Clone)]
pub struct SplitOutput {
    pub train_file_path: PathBuf,
    pub test_file_path: PathBuf,
    pub train_rows: usize,
    pub test_rows: usize,
}

/// Bucket label (1-based) of `value` in right-closed bins
pub fn bucket(value: f64, edges: &[f64]) -> Option<usize> {
    edges
        .windows(2)
        .position(|w| value > w[0] && value <= w[1])
        .map(|i| i + 1)
}

/// Split `raw` into train and test files under the given directories
pub fn split_raw_file(
    raw: &RawDataFile,
    train_dir: &Path,
    test_dir: &Path,
    options: &SplitOptions,
) -> Result<SplitOutput, SplitError> {
    let mut frame = Frame::read_csv(raw.path())?;
    let file_name = raw.file_name()?;

    if frame.has_column(&options.category_column) {
        return Err(SplitError::CategoryColumnExists(options.category_column.clone()));
    }

    let labels = bucket_labels(&frame, options)?;
    frame.push_column(
        options.category_column.clone(),
        labels.iter().map(usize::to_string).collect(),
    )?;

    let (train_idx, test_idx) = stratified_split(&labels, options.test_size, options.seed)?;

    let mut train = frame.take_rows(&train_idx);
    let mut test = frame.take_rows(&test_idx);
    train.drop_column(&options.category_column);
    test.drop_column(&options.category_column);

    std::fs::create_dir_all(train_dir).map_err(|e| SplitError::io(train_dir, e))?;
    std::fs::create_dir_all(test_dir).map_err(|e| SplitError::io(test_dir, e))?;

    let train_file_path = train_dir.join(file_name);
    let test_file_path = test_dir.join(file_name);

    tracing::info!(path = %train_file_path.display(), rows = train.len(), "writing train partition");
    train.write_csv(&train_file_path)?;
    tracing::info!(path = %test_file_path.display(), rows = test.len(), "writing test partition");
    test.write_csv(&test_file_path)?;

    Ok(SplitOutput {
        train_file_path,
        test_file_path,
        train_rows: train.len(),
        test_rows: test.len(),
    })
}

fn bucket_labels(frame: &Frame, options: &SplitOptions) -> Result<Vec<usize>, SplitError> {
    let values = frame
        .column(&options.target_column)
        .map_err(|_| SplitError::MissingTarget(options.target_column.clone()))?;

    values
        .into_iter()
        .enumerate()
        .map(|(i, raw)| {
            raw.trim()
                .parse::<f64>()
                .ok()
                .and_then(|v| bucket(v, &options.bin_edges))
                .ok_or_else(|| SplitError::OutOfBins {
                    row: i + 1,
                    value: raw.to_string(),
                })
        })
        .collect()
}

/// One stratified shuffle split of row indices
///
/// `n_test = ceil(test_size * n)`. Each bucket gets `floor(count * n_test / n)`
/// test rows, the leftover test slots go to the buckets with the largest
/// remainders (ties broken by label order), and the rest of each bucket goes
/// to train. Both returned index lists are shuffled.
pub fn stratified_split(
    labels: &[usize],
    test_size: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), SplitError> {
    let n = labels.len();
    let n_test = (test_size * n as f64).ceil() as usize;
    let n_train = n.saturating_sub(n_test);

    let mut classes: BTreeMap<usize, Vec<usize>> = BTreeMap::new();
    for (idx, label) in labels.iter().enumerate() {
        classes.entry(*label).or_default().push(idx);
    }

    if let Some((label, _)) = classes.iter().find(|(_, members)| members.len() < 2) {
        return Err(SplitError::SingletonClass { label: *label });
    }
    // every class needs a row on each side, and neither side may be empty
    let min_rows = classes.len().max(1);
    if n_train < min_rows || n_test < min_rows {
        return Err(SplitError::TooFewRows {
            rows: n,
            classes: classes.len(),
            train: n_train,
            test: n_test,
        });
    }

    let mut test_counts: Vec<usize> = classes
        .values()
        .map(|members| members.len() * n_test / n)
        .collect();
    let mut leftover = n_test - test_counts.iter().sum::<usize>();

    let mut by_remainder: Vec<(usize, usize)> = classes
        .values()
        .enumerate()
        .map(|(i, members)| (i, (members.len() * n_test) % n))
        .collect();
    by_remainder.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (i, _) in by_remainder {
        if leftover == 0 {
            break;
        }
        test_counts[i] += 1;
        leftover -= 1;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);

    for (members, n_test_i) in classes.into_values().zip(test_counts) {
        let mut members = members;
        members.shuffle(&mut rng);
        let n_train_i = members.len() - n_test_i;
        train.extend_from_slice(&members[..n_train_i]);
        test.extend_from_slice(&members[n_train_i..]);
    }

    train.shuffle(&mut rng);
    test.shuffle(&mut rng);

    Ok((train, test))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_bucket_edges_are_right_closed() {
        let edges = SplitOptions::default().bin_edges;
        assert_eq!(bucket(0.0, &edges), None);
        assert_eq!(bucket(0.1, &edges), Some(1));
        assert_eq!(bucket(1.5, &edges), Some(1));
        assert_eq!(bucket(1.6, &edges), Some(2));
        assert_eq!(bucket(6.0, &edges), Some(4));
        assert_eq!(bucket(16884.92, &edges), Some(5));
        assert_eq!(bucket(-3.0, &edges), None);
    }

    #[test]
    fn test_split_sizes() {
        let labels: Vec<usize> = (0..1000).map(|i| i % 5 + 1).collect();
        let (train, test) = stratified_split(&labels, 0.2, 42).unwrap();
        assert_eq!(train.len(), 800);
        assert_eq!(test.len(), 200);

        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..1000).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_preserves_proportions() {
        // 60% label 1, 30% label 2, 10% label 3
        let labels: Vec<usize> = (0..100)
            .map(|i| if i < 60 { 1 } else if i < 90 { 2 } else { 3 })
            .collect();
        let (_, test) = stratified_split(&labels, 0.2, 42).unwrap();
        let count = |label: usize| test.iter().filter(|&&i| labels[i] == label).count();
        assert_eq!((count(1), count(2), count(3)), (12, 6, 2));
    }

    #[test]
    fn test_largest_remainder_allocation() {
        // 7 rows, n_test = 2; classes of 4 and 3 give exact shares 8/7 and 6/7
        let labels = vec![1, 1, 1, 1, 2, 2, 2];
        let (train, test) = stratified_split(&labels, 0.2, 42).unwrap();
        assert_eq!(test.len(), 2);
        assert_eq!(train.len(), 5);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 1).count(), 1);
        assert_eq!(test.iter().filter(|&&i| labels[i] == 2).count(), 1);
    }

    #[test]
    fn test_split_is_deterministic() {
        let labels: Vec<usize> = (0..250).map(|i| i % 3 + 1).collect();
        let first = stratified_split(&labels, 0.2, 42).unwrap();
        let second = stratified_split(&labels, 0.2, 42).unwrap();
        assert_eq!(first, second);

        let other_seed = stratified_split(&labels, 0.2, 7).unwrap();
        assert_ne!(first, other_seed);
    }

    #[test]
    fn test_singleton_class_fails() {
        let labels = vec![1, 1, 1, 1, 2];
        assert!(matches!(
            stratified_split(&labels, 0.2, 42),
            Err(SplitError::SingletonClass { label: 2 })
        ));
    }

    #[test]
    fn test_too_few_rows() {
        let labels = vec![1, 1, 2, 2, 3, 3];
        assert!(matches!(
            stratified_split(&labels, 0.2, 42),
            Err(SplitError::TooFewRows { classes: 3, .. })
        ));
    }

    #[test]
    fn test_empty_side_fails() {
        assert!(matches!(
            stratified_split(&[], 0.2, 42),
            Err(SplitError::TooFewRows { rows: 0, train: 0, test: 0, .. })
        ));
        assert!(matches!(
            stratified_split(&[5; 10], 0.0, 42),
            Err(SplitError::TooFewRows { rows: 10, test: 0, .. })
        ));
    }

    #[test]
    fn test_header_only_raw_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insurance.csv");
        std::fs::write(&path, "age,sex,bmi,children,smoker,region,expenses\n").unwrap();

        let result = split_raw_file(
            &RawDataFile::new(path),
            &dir.path().join("train"),
            &dir.path().join("test"),
            &SplitOptions::default(),
        );
        assert!(matches!(result, Err(SplitError::TooFewRows { rows: 0, .. })));
        assert!(!dir.path().join("train").exists());
    }

    #[test]
    fn test_single_class_is_allowed() {
        let labels = vec![5; 10];
        let (train, test) = stratified_split(&labels, 0.2, 42).unwrap();
        assert_eq!((train.len(), test.len()), (8, 2));
    }

    #[test]
    fn test_discover_requires_exactly_one_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(RawDataFile::discover(dir.path()), Err(SplitError::NoRawFile(_))));

        std::fs::write(dir.path().join("insurance.csv"), "a\n1\n").unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        let raw = RawDataFile::discover(dir.path()).unwrap();
        assert_eq!(raw.file_name().unwrap(), "insurance.csv");

        std::fs::write(dir.path().join("other.csv"), "a\n2\n").unwrap();
        assert!(matches!(
            RawDataFile::discover(dir.path()),
            Err(SplitError::AmbiguousRawFile { count: 2, .. })
        ));
    }

    #[test]
    fn test_split_raw_file_rejects_missing_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insurance.csv");
        std::fs::write(&path, "age,sex\n19,female\n").unwrap();

        let result = split_raw_file(
            &RawDataFile::new(&path),
            &dir.path().join("train"),
            &dir.path().join("test"),
            &SplitOptions::default(),
        );
        assert!(matches!(result, Err(SplitError::MissingTarget(_))));
    }

    #[test]
    fn test_split_raw_file_rejects_out_of_bin_target() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("insurance.csv");
        std::fs::write(&path, "age,expenses\n19,2.0\n20,0\n").unwrap();

        let result = split_raw_file(
            &RawDataFile::new(&path),
            &dir.path().join("train"),
            &dir.path().join("test"),
            &SplitOptions::default(),
        );
        assert!(matches!(result, Err(SplitError::OutOfBins { row: 2, .. })));
    }
}
