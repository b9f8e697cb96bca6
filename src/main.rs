use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tokio::io::AsyncReadExt;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use catalog_ingest::{
    config::Config,
    database::SqlConnectionFactory,
    models::{ObjectLocation, RunStatus},
    sources::ObjectStoreSource,
    trigger::{handle_event, process_object, StorageEvent},
};

#[derive(Parser)]
#[command(name = "catalog-ingest")]
#[command(version)]
#[command(about = "Load a delimited product catalog export into the product table")]
#[command(long_about = None)]
struct Cli {
    /// Configuration file path (TOML); the environment is used when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Storage event JSON file, or '-' to read it from stdin
    #[arg(short, long, value_name = "FILE", conflicts_with_all = ["bucket", "key"])]
    event: Option<String>,

    /// Bucket holding the export (used together with --key)
    #[arg(short, long, requires = "key")]
    bucket: Option<String>,

    /// Object key of the export
    #[arg(short, long, requires = "bucket")]
    key: Option<String>,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_filter = format!("catalog_ingest={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting catalog-ingest v{}", env!("CARGO_PKG_VERSION"));

    let status = match run(cli).await {
        Ok(status) => status,
        Err(e) => {
            error!("{:#}", e);
            RunStatus::Failure
        }
    };

    println!("{status}");
    if status == RunStatus::Failure {
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<RunStatus> {
    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };
    info!(
        "Configuration resolved: delimiter {:?}, {} columns, table {}",
        config.ingestion.delimiter, config.ingestion.expected_columns, config.database.table
    );

    let source = ObjectStoreSource::from_config(config.storage.clone());
    let connections = SqlConnectionFactory;

    let outcome = match (cli.event, cli.bucket, cli.key) {
        (Some(event_path), _, _) => {
            let raw = read_event(&event_path).await?;
            let event = StorageEvent::from_json(&raw)?;
            handle_event(&event, &config, &source, &connections).await
        }
        (None, Some(bucket), Some(key)) => {
            let location = ObjectLocation::new(bucket, key);
            process_object(&location, &config, &source, &connections).await
        }
        _ => anyhow::bail!("either --event or --bucket with --key is required"),
    };

    Ok(outcome.status)
}

async fn read_event(path: &str) -> Result<String> {
    if path == "-" {
        let mut raw = String::new();
        tokio::io::stdin()
            .read_to_string(&mut raw)
            .await
            .context("Failed to read event from stdin")?;
        Ok(raw)
    } else {
        tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read event file {path}"))
    }
}
