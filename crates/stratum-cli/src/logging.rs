//! Subscriber setup: stderr plus a per-run log file

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// File name of the log for a run started at `stamp`
pub fn log_file_name(stamp: &str) -> String {
    format!("log_{}.log", stamp)
}

/// Install the global subscriber
///
/// `RUST_LOG` wins over `level`. The returned guard flushes the file writer
/// on drop and must outlive the run.
pub fn init(log_dir: &Path, stamp: &str, level: &str) -> Result<WorkerGuard> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("cannot create log directory {}", log_dir.display()))?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(format!("log_{}", stamp))
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("cannot open log file in {}", log_dir.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{}'", level))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .try_init()
        .context("logging already initialized")?;

    Ok(guard)
}
