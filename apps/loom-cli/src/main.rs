//! # Loom CLI Entry Point
//!
//! ## Startup Sequence
//! 1. Parse arguments
//! 2. Load configuration (`LOOM_*` environment variables)
//! 3. Initialize tracing (logging) on stderr
//! 4. Connect to database & run migrations
//! 5. Run the subcommand and print its JSON on stdout
//!
//! ## Exit Codes
//! - `0` success
//! - `1` bad input, I/O or configuration
//! - `2` the ledger rejected the operation (error JSON on stderr)

mod args;
mod commands;

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use args::Cli;
use commands::Failure;
use loom_ledger::{LedgerConfig, LedgerService};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match LedgerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("configuration error: {}", e);
            return ExitCode::from(1);
        }
    };
    if let Some(path) = cli.database.clone() {
        config.database_path = path;
    }

    init_tracing(&config.log_level);

    info!(
        database = %config.database_path.display(),
        max_connections = config.max_connections,
        "Configuration loaded"
    );

    let ledger = match LedgerService::connect(&config).await {
        Ok(ledger) => ledger,
        Err(e) => {
            error!(error = %e, "Failed to open database");
            report_ledger_error(&e);
            return ExitCode::from(2);
        }
    };

    let outcome = commands::run(&ledger, cli.command).await;
    ledger.database().close().await;

    match outcome {
        Ok(out) => {
            println!("{}", out);
            ExitCode::SUCCESS
        }
        Err(Failure::Ledger(e)) => {
            report_ledger_error(&e);
            ExitCode::from(2)
        }
        Err(Failure::Other(e)) => {
            eprintln!("error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins; otherwise the configured level, with sqlx kept quiet.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},sqlx=warn", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn report_ledger_error(err: &loom_ledger::LedgerError) {
    match serde_json::to_string(err) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{}", err),
    }
}
