//! Store CLI - Command-line interface for Synheart Store
//!
//! Commands:
//! - ingest: Normalize an ingestion document and write it to the store
//! - query: Run a tiered metrics query
//! - tier: Show which tier serves a time range
//! - metrics: List metric types stored for a user
//! - normalize: Print canonical records without storing them
//! - doctor: Diagnose configuration and store connectivity

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use synheart_store::config::{ConfigError, ConfigOverrides};
use synheart_store::schema::{parse_timestamp, IngestionDocument};
use synheart_store::service::{available_metrics, query_metrics};
use synheart_store::{
    BatchIngestor, ComputeError, ErrorClass, MetricNormalizer, MetricStore, MetricsQuery,
    PipelineError, SqliteStore, StoreConfig, StoreError, StoreProcessor, PRODUCER_NAME,
    STORE_VERSION,
};

/// Store - Wearable time-series ingestion and tiered queries
#[derive(Parser)]
#[command(name = "store")]
#[command(author = "Synheart AI Inc")]
#[command(version = STORE_VERSION)]
#[command(about = "Ingest wearable exports and query them by resolution tier", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Database URL (overrides config and DATABASE_URL)
    #[arg(long, global = true)]
    database: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Normalize an ingestion document and write it to the store
    Ingest {
        /// Input file path (use - for stdin); defaults to the configured data file
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Records per transaction
        #[arg(long)]
        batch_size: Option<usize>,
    },

    /// Run a tiered metrics query
    Query {
        #[arg(long)]
        user_id: String,

        #[arg(long)]
        metric_type: String,

        /// Range start (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,

        /// Range end (YYYY-MM-DD)
        #[arg(long)]
        end_date: String,

        #[arg(long, default_value = "1000")]
        limit: u32,
    },

    /// Show which tier serves a time range
    Tier {
        /// Range start (RFC 3339)
        #[arg(long)]
        start: String,

        /// Range end (RFC 3339)
        #[arg(long)]
        end: String,
    },

    /// List metric types stored for a user
    Metrics {
        #[arg(long)]
        user_id: String,
    },

    /// Print canonical records as NDJSON without storing them
    Normalize {
        /// Input file path (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Diagnose configuration and store connectivity
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&CliError::from(e)).unwrap_or_else(|_| "Unknown error".to_string()));
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &StoreConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_filter.clone()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

async fn run(cli: Cli) -> Result<(), StoreCliError> {
    let batch_size = match &cli.command {
        Commands::Ingest { batch_size, .. } => *batch_size,
        _ => None,
    };
    let config = StoreConfig::load(
        cli.config.as_deref(),
        ConfigOverrides {
            database_url: cli.database.clone(),
            batch_size,
            data_file: None,
        },
    )?;
    init_logging(&config);

    match cli.command {
        Commands::Ingest { input, .. } => {
            let input = input.unwrap_or_else(|| config.data_file.clone());
            cmd_ingest(&config, &input).await
        }
        Commands::Query {
            user_id,
            metric_type,
            start_date,
            end_date,
            limit,
        } => {
            let query = MetricsQuery {
                user_id,
                metric_type,
                start_date,
                end_date,
                limit,
            };
            cmd_query(&config, &query).await
        }
        Commands::Tier { start, end } => cmd_tier(&start, &end),
        Commands::Metrics { user_id } => cmd_metrics(&config, &user_id).await,
        Commands::Normalize { input } => cmd_normalize(&input),
        Commands::Doctor { json } => cmd_doctor(&config, json).await,
    }
}

fn read_input(input: &Path) -> Result<String, StoreCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

async fn open_store(config: &StoreConfig) -> Result<SqliteStore, StoreError> {
    SqliteStore::connect(&config.database_url, config.acquire_timeout()).await
}

async fn cmd_ingest(config: &StoreConfig, input: &Path) -> Result<(), StoreCliError> {
    let raw_json = read_input(input)?;
    let store = open_store(config).await?;

    let processor = StoreProcessor::with_ingestor(BatchIngestor::new(config.batch_size)?);
    let report = processor.ingest_json(&store, &raw_json).await;
    store.close().await;

    println!("{}", serde_json::to_string_pretty(&report?)?);
    Ok(())
}

async fn cmd_query(config: &StoreConfig, query: &MetricsQuery) -> Result<(), StoreCliError> {
    let store = open_store(config).await?;
    let response = query_metrics(&store, query).await;
    store.close().await;

    println!("{}", serde_json::to_string_pretty(&response?)?);
    Ok(())
}

async fn cmd_metrics(config: &StoreConfig, user_id: &str) -> Result<(), StoreCliError> {
    let store = open_store(config).await?;
    let metrics = available_metrics(&store, user_id).await;
    store.close().await;

    println!("{}", serde_json::to_string_pretty(&metrics?)?);
    Ok(())
}

fn cmd_tier(start: &str, end: &str) -> Result<(), StoreCliError> {
    let start = parse_instant("start", start)?;
    let end = parse_instant("end", end)?;
    let tier = synheart_store::select_tier(start, end);

    let output = serde_json::json!({
        "tier": tier,
        "source": tier.source(),
        "span_seconds": (end - start).num_seconds(),
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn parse_instant(name: &str, raw: &str) -> Result<DateTime<Utc>, StoreCliError> {
    parse_timestamp(raw).ok_or_else(|| {
        StoreCliError::Store(StoreError::Validation(format!(
            "{} must be an RFC 3339 timestamp, got `{}`",
            name, raw
        )))
    })
}

fn cmd_normalize(input: &Path) -> Result<(), StoreCliError> {
    let raw_json = read_input(input)?;
    let document = IngestionDocument::from_json(&raw_json)?;
    let outcome = MetricNormalizer::new().normalize(&document);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for record in &outcome.records {
        writeln!(out, "{}", serde_json::to_string(record)?)?;
    }
    out.flush()?;

    tracing::info!(
        records = outcome.records.len(),
        skipped = outcome.skipped,
        section_failures = outcome.section_failures.len(),
        "normalization finished"
    );
    Ok(())
}

async fn cmd_doctor(config: &StoreConfig, json: bool) -> Result<(), StoreCliError> {
    let mut checks: Vec<DoctorCheck> = Vec::new();

    checks.push(DoctorCheck {
        name: "store_version".to_string(),
        status: CheckStatus::Ok,
        message: format!("Store version {}", STORE_VERSION),
    });

    checks.push(DoctorCheck {
        name: "batch_size".to_string(),
        status: CheckStatus::Ok,
        message: format!("{} records per transaction", config.batch_size),
    });

    if config.data_file.exists() {
        checks.push(DoctorCheck {
            name: "data_file".to_string(),
            status: CheckStatus::Ok,
            message: format!("{} is readable", config.data_file.display()),
        });
    } else {
        checks.push(DoctorCheck {
            name: "data_file".to_string(),
            status: CheckStatus::Warning,
            message: format!("{} does not exist", config.data_file.display()),
        });
    }

    let database_check = match open_store(config).await {
        Ok(store) => {
            let check = match store.ping().await {
                Ok(()) => DoctorCheck {
                    name: "database".to_string(),
                    status: CheckStatus::Ok,
                    message: format!("Connected to {}", config.database_url),
                },
                Err(e) => DoctorCheck {
                    name: "database".to_string(),
                    status: CheckStatus::Error,
                    message: e.to_string(),
                },
            };
            store.close().await;
            check
        }
        Err(e) => DoctorCheck {
            name: "database".to_string(),
            status: CheckStatus::Error,
            message: e.to_string(),
        },
    };
    checks.push(database_check);

    let report = DoctorReport {
        producer: PRODUCER_NAME.to_string(),
        version: STORE_VERSION.to_string(),
        checks,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Store Doctor Report");
        println!("===================");
        println!("Producer: {}", report.producer);
        println!("Version:  {}", report.version);
        println!("\nChecks:");

        for check in &report.checks {
            let status_icon = match check.status {
                CheckStatus::Ok => "[OK]",
                CheckStatus::Warning => "[WARN]",
                CheckStatus::Error => "[ERR]",
            };
            println!("  {} {}: {}", status_icon, check.name, check.message);
        }
    }

    let has_errors = report.checks.iter().any(|c| matches!(c.status, CheckStatus::Error));
    if has_errors {
        Err(StoreCliError::DoctorFailed)
    } else {
        Ok(())
    }
}

// Error types

#[derive(Debug)]
enum StoreCliError {
    Io(io::Error),
    Parse(ComputeError),
    Json(serde_json::Error),
    Config(ConfigError),
    Store(StoreError),
    DoctorFailed,
}

impl From<io::Error> for StoreCliError {
    fn from(e: io::Error) -> Self {
        StoreCliError::Io(e)
    }
}

impl From<ComputeError> for StoreCliError {
    fn from(e: ComputeError) -> Self {
        StoreCliError::Parse(e)
    }
}

impl From<serde_json::Error> for StoreCliError {
    fn from(e: serde_json::Error) -> Self {
        StoreCliError::Json(e)
    }
}

impl From<ConfigError> for StoreCliError {
    fn from(e: ConfigError) -> Self {
        StoreCliError::Config(e)
    }
}

impl From<StoreError> for StoreCliError {
    fn from(e: StoreError) -> Self {
        StoreCliError::Store(e)
    }
}

impl From<PipelineError> for StoreCliError {
    fn from(e: PipelineError) -> Self {
        match e {
            PipelineError::Compute(e) => StoreCliError::Parse(e),
            PipelineError::Store(e) => StoreCliError::Store(e),
        }
    }
}

#[derive(serde::Serialize)]
struct CliError {
    code: String,
    message: String,
    hint: Option<String>,
}

impl From<StoreCliError> for CliError {
    fn from(e: StoreCliError) -> Self {
        match e {
            StoreCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            StoreCliError::Parse(e) => CliError {
                code: "PARSE_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Ensure input is a JSON object with modality sections".to_string()),
            },
            StoreCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check JSON syntax".to_string()),
            },
            StoreCliError::Config(e) => CliError {
                code: "CONFIG_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check the config file and environment overrides".to_string()),
            },
            StoreCliError::Store(e) => {
                let (code, hint) = match e.class() {
                    ErrorClass::ClientError => ("VALIDATION_ERROR", "Check query parameters"),
                    ErrorClass::ServiceUnavailable => {
                        ("STORE_UNAVAILABLE", "Run 'store doctor' to check connectivity")
                    }
                    ErrorClass::Internal => ("STORE_ERROR", "Inspect logs with RUST_LOG=debug"),
                };
                CliError {
                    code: code.to_string(),
                    message: e.to_string(),
                    hint: Some(hint.to_string()),
                }
            }
            StoreCliError::DoctorFailed => CliError {
                code: "DOCTOR_FAILED".to_string(),
                message: "One or more health checks failed".to_string(),
                hint: Some("Review the doctor report for details".to_string()),
            },
        }
    }
}

// Report types

#[derive(serde::Serialize)]
struct DoctorReport {
    producer: String,
    version: String,
    checks: Vec<DoctorCheck>,
}

#[derive(serde::Serialize)]
struct DoctorCheck {
    name: String,
    status: CheckStatus,
    message: String,
}

#[derive(serde::Serialize)]
enum CheckStatus {
    Ok,
    Warning,
    Error,
}
