use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use stratum_core::config::current_time_stamp;
use stratum_core::{
    DataIngestionArtifact, DataValidationArtifact, DatabaseArtifact, DriftReport, PipelineConfig, Severity,
};
use stratum_engine::ingestion::connect_postgres;
use stratum_engine::{DataIngestion, DataValidation, SchemaCheck};

mod logging;
mod server;

const DEFAULT_CONFIG: &str = "stratum.toml";

/// Stratum - insurance dataset ingestion and validation pipeline
#[derive(Parser)]
#[command(name = "stratum")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: stratum.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, mirror and split the raw dataset
    Ingest {
        /// Use the single file in this directory instead of downloading
        #[arg(long)]
        raw_dir: Option<PathBuf>,

        /// Skip the database mirror even if [database] is configured
        #[arg(long)]
        no_mirror: bool,
    },

    /// Validate an existing train/test pair
    Validate {
        /// Train (reference) partition
        #[arg(long)]
        train: PathBuf,

        /// Test (current) partition
        #[arg(long)]
        test: PathBuf,

        /// Fail on schema violations or dataset drift
        #[arg(long)]
        strict: bool,
    },

    /// Ingest, then validate the fresh partitions
    Run {
        /// Fail on schema violations or dataset drift
        #[arg(long)]
        strict: bool,

        /// Skip the database mirror even if [database] is configured
        #[arg(long)]
        no_mirror: bool,

        /// Use the single file in this directory instead of downloading
        #[arg(long)]
        raw_dir: Option<PathBuf>,
    },

    /// Serve the liveness endpoint
    Serve {
        /// Listen address (default: [server] addr)
        #[arg(long)]
        addr: Option<String>,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Ok(path) = dotenvy::dotenv() {
        if cli.verbose {
            eprintln!("{} {}", "Loaded environment from".cyan(), path.display());
        }
    }

    let mut config = load_config(cli.config.as_deref())?;
    config
        .apply_env_overrides()
        .context("invalid STRATUM_* environment override")?;

    let stamp = current_time_stamp();
    let level = if cli.verbose { "debug" } else { config.logging.level.as_str() };
    let log_dir = config.log_dir();
    let _guard = logging::init(&log_dir, &stamp, level)?;
    if cli.verbose {
        eprintln!(
            "{} {}",
            "Logging to".cyan(),
            log_dir.join(logging::log_file_name(&stamp)).display()
        );
    }

    match cli.command {
        Commands::Ingest { raw_dir, no_mirror } => {
            ingest_command(&config, &stamp, raw_dir, no_mirror).await.map(|_| ())
        }
        Commands::Validate { train, test, strict } => {
            validate_command(&config, &stamp, &train, &test, strict)
        }
        Commands::Run {
            strict,
            no_mirror,
            raw_dir,
        } => {
            let ingested = ingest_command(&config, &stamp, raw_dir, no_mirror).await?;
            validate_command(
                &config,
                &stamp,
                &ingested.train_file_path,
                &ingested.test_file_path,
                strict,
            )
        }
        Commands::Serve { addr } => {
            let addr = addr.unwrap_or_else(|| config.server.addr.clone());
            println!("{} http://{}", "Serving on".cyan(), addr);
            server::serve(&addr).await
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG));
    if !path.exists() {
        anyhow::bail!(
            "Config file not found at {}. Pass --config or create {}.",
            path.display(),
            DEFAULT_CONFIG
        );
    }
    PipelineConfig::from_file(path).with_context(|| format!("failed to load {}", path.display()))
}

/// Ingest command - download (or adopt), mirror and split
async fn ingest_command(
    config: &PipelineConfig,
    stamp: &str,
    raw_dir: Option<PathBuf>,
    no_mirror: bool,
) -> Result<DataIngestionArtifact> {
    let mut ingestion = DataIngestion::new(config.data_ingestion_config(stamp));
    if let Some(dir) = raw_dir {
        ingestion = ingestion.with_local_source(dir);
    }

    match (&config.database, no_mirror) {
        (Some(db), false) => {
            let sink = connect_postgres(db)
                .await
                .context("cannot open the mirror database; pass --no-mirror to skip it")?;
            ingestion = ingestion.with_mirror(db.clone(), Box::new(sink));
        }
        (Some(_), true) => tracing::info!("database mirror disabled by --no-mirror"),
        (None, _) => {}
    }

    let artifact = ingestion.run().await.context("data ingestion failed")?;
    print_ingestion_summary(&artifact, ingestion.database_artifact());
    Ok(artifact)
}

/// Validate command - schema checks and drift report over a train/test pair
fn validate_command(config: &PipelineConfig, stamp: &str, train: &Path, test: &Path, strict: bool) -> Result<()> {
    let mut validation_config = config.data_validation_config(stamp);
    validation_config.strict_mode |= strict;

    let mut validation = DataValidation::for_files(validation_config, train, test);
    let result = validation.run();

    if let Some(check) = validation.schema_check() {
        print_schema_summary(check);
    }
    let artifact = result.context("data validation failed")?;

    let report = DriftReport::from_file(&artifact.report_file_path)
        .with_context(|| format!("cannot read {}", artifact.report_file_path.display()))?;
    print_validation_summary(&artifact, &report);
    Ok(())
}

fn banner(title: &str) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", title.bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();
}

fn print_ingestion_summary(artifact: &DataIngestionArtifact, database: Option<&DatabaseArtifact>) {
    banner("Data Ingestion");

    println!("Raw file:   {}", artifact.raw_file_path.display());
    println!("SHA-256:    {}", artifact.raw_sha256);
    println!("Train file: {} ({} rows)", artifact.train_file_path.display(), artifact.train_rows);
    println!("Test file:  {} ({} rows)", artifact.test_file_path.display(), artifact.test_rows);

    if let Some(db) = database {
        let rows = if db.rows_inserted > 0 {
            db.rows_inserted.to_string().green()
        } else {
            db.rows_inserted.to_string().yellow()
        };
        println!("Mirrored:   {} rows into {}.{}", rows, db.database, db.table);
    }

    println!();
    println!("{}", format!("✓ {}", artifact.message).green().bold());
    println!("{}", "=".repeat(60).bright_blue());
}

fn print_schema_summary(check: &SchemaCheck) {
    banner("Schema Validation");

    let mark = |ok: bool| if ok { "✓".green() } else { "✗".red().bold() };
    println!("  {} column count matches", mark(check.column_count_match));
    println!("  {} columns shared and declared", mark(check.columns_declared));
    println!("  {} train values within domain", mark(check.train_domain_valid));
    println!("  {} test values within domain", mark(check.test_domain_valid));
    println!();

    if check.diagnostics.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
        return;
    }

    println!("{}", "Diagnostics:".bold());
    for diag in &check.diagnostics {
        let severity_str = match diag.severity {
            Severity::Error => "ERROR".red().bold(),
            Severity::Warn => "WARN".yellow().bold(),
            Severity::Info => "INFO".cyan(),
        };

        println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

        if let Some(loc) = &diag.location {
            print!("    at {}", loc.file);
            if let Some(row) = loc.row {
                print!(":{}", row);
            }
            println!();
        }
        if let Some(exp) = &diag.expected {
            println!("    Expected: {}", exp);
        }
        if let Some(act) = &diag.actual {
            println!("    Actual:   {}", act);
        }
    }
}

fn print_validation_summary(artifact: &DataValidationArtifact, report: &DriftReport) {
    banner("Data Drift");

    let summary = &report.summary;
    println!("Reference rows: {}", report.reference_rows);
    println!("Current rows:   {}", report.current_rows);
    println!();

    println!("{}", "Summary:".bold());
    println!("  Features: {}", summary.n_features);
    if summary.n_drifted_features > 0 {
        println!(
            "  Drifted:  {}",
            summary.n_drifted_features.to_string().yellow().bold()
        );
    } else {
        println!("  Drifted:  {}", summary.n_drifted_features.to_string().green());
    }
    println!("  p-value threshold: {}", summary.threshold);
    println!();

    for feature in report.features.iter().filter(|f| f.drift_detected) {
        println!(
            "  {} {} ({}, p = {:.4})",
            "DRIFT".yellow().bold(),
            feature.name,
            feature.stattest,
            feature.p_value
        );
    }

    println!("Report:    {}", artifact.report_file_path.display());
    println!("Dashboard: {}", artifact.report_page_file_path.display());
    println!();

    let message = format!("✓ {}", artifact.message);
    if artifact.schema_valid && !artifact.dataset_drift {
        println!("{}", message.green().bold());
    } else {
        println!("{}", message.yellow().bold());
    }
    println!("{}", "=".repeat(60).bright_blue());
}
