//! Main Entrypoint for the EVERYTHING Day Simulation
//!
//! This binary is responsible for:
//! 1. Loading configuration from the environment.
//! 2. Initializing logging.
//! 3. Resolving the simulated date and data directory.
//! 4. Running one simulated day and reporting the outcome.

use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use everything_service::{RunOptions, config::Config, run};
use std::path::PathBuf;
use tracing::{error, info};

/// Simulate a day in the user's life with the EVERYTHING assistant.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Day to simulate (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    date: Option<NaiveDate>,
    /// Directory holding `user_data/` and `device_data/`. Overrides DATA_DIR.
    #[arg(long)]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
        .init();

    // --- 3. Resolve Run Options ---
    // The only place wall-clock time is consulted.
    let options = RunOptions {
        date: cli.date.unwrap_or_else(|| Local::now().date_naive()),
        data_dir: cli.data_dir.unwrap_or_else(|| config.data_dir.clone()),
    };
    info!(
        date = %options.date,
        data_dir = %options.data_dir.display(),
        user = %config.user_name,
        "Configuration loaded. Starting simulation..."
    );

    // --- 4. Run ---
    match run(&config, &options).await {
        Ok(summary) => {
            info!(
                ticks = summary.ticks,
                tasks = summary.tasks_completed,
                steps = summary.steps,
                "Simulation finished."
            );
            Ok(())
        }
        Err(e) => {
            error!(error = ?e, "An error occurred");
            Err(e)
        }
    }
}
