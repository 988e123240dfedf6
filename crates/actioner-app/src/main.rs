//! Actioner binary - composition root.
//!
//! 1. Load configuration from TOML
//! 2. Open the action event database
//! 3. Build the action context (registry, dispatcher, recorder, intake loop)
//! 4. Process one batch of queued messages from a file or stdin
//! 5. Print the batch acknowledgement as JSON on stdout

mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::io::AsyncReadExt;

use actioner_core::config::ActionerConfig;
use actioner_engine::{ActionerContext, ContextCell, TransportBatch};
use actioner_storage::Database;

use cli::CliArgs;

async fn read_batch(args: &CliArgs) -> std::io::Result<String> {
    match args.input_file() {
        Some(path) => tokio::fs::read_to_string(path).await,
        None => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            Ok(buf)
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config is read before tracing starts so its log level can apply.
    let config_file = args.resolve_config_path();
    let config_result = ActionerConfig::load_or_default(&config_file);
    let config_level = match &config_result {
        Ok(config) => config.general.log_level.as_str(),
        Err(_) => "info",
    };

    let log_level = args.resolve_log_level(config_level);
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting actioner v{}", env!("CARGO_PKG_VERSION"));
    // An unusable config aborts before any message is read or acknowledged.
    let config = match config_result {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(path = %config_file.display(), error = %e, "Invalid configuration");
            return Err(e.into());
        }
    };
    tracing::info!(path = %config_file.display(), "Configuration ready");

    // Storage.
    let db_path = args.resolve_db_path(&config.storage.db_path);
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    // Context.
    let cell = ContextCell::new();
    let context = cell.get_or_try_init(|| ActionerContext::initialize(&config, db))?;
    tracing::info!(labels = ?context.registry().labels(), "Action registry ready");

    // Batch.
    let raw = read_batch(&args).await?;
    let messages = TransportBatch::from_json(&raw)?.into_messages();
    let report = context.intake().process_batch(&messages).await;

    let response = report.response(config.intake.ack_mode);
    println!("{}", serde_json::to_string(&response)?);

    if report.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}
