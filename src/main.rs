//! # Job Harvest
//!
//! Command-line entry point: loads configuration, opens the job store and
//! runs a fetch, a refresh or a run-log listing.
//!
//! ## Usage
//!
//! ```sh
//! job_harvest --config harvest.yaml fetch
//! ```
//!
//! Ctrl-C cancels the active run at its next page or job boundary; whatever
//! was gathered up to then is still stored and reported.

use clap::Parser;
use job_harvest::error::CoordinatorError;
use job_harvest::store::{JobStore, SqliteJobStore};
use job_harvest::transport::HttpFetcher;
use job_harvest::{Config, Coordinator, Pipeline};
use std::error::Error;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::{Cli, Command};

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("job_harvest starting up");

    let args = Cli::parse();
    debug!(?args.config, ?args.command, "Parsed CLI arguments");

    // --- Config & storage ---
    let mut config = Config::load(args.config.as_deref())?;
    if let Some(database) = args.database {
        config.database = database;
    }
    if let Command::Refresh { limit: Some(limit), .. } = args.command {
        config.refresh_limit = limit;
    }

    let store = Arc::new(SqliteJobStore::connect(&config.database).await?);
    info!(path = %config.database, "Opened job store");

    if let Command::Runs { limit } = args.command {
        for run in store.recent_runs(limit).await? {
            println!("{}", serde_json::to_string(&run)?);
        }
        return Ok(());
    }

    let fetcher = Arc::new(HttpFetcher::from_config(&config)?);
    let pipeline = Pipeline::new(config, fetcher, store)?;
    let coordinator = Coordinator::new(pipeline);

    // --- Ctrl-C cancels the active run ---
    let on_signal = coordinator.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; stopping at the next boundary");
            on_signal.cancel();
        }
    });

    match args.command {
        Command::Fetch => {
            let reports = coordinator.spawn_fetch()?.await.map_err(CoordinatorError::from)??;
            let errors: usize = reports.iter().map(|r| r.errors.len()).sum();
            for report in &reports {
                for message in &report.errors {
                    error!(source = %report.source, %message, "Run error");
                }
            }
            info!(
                sources = reports.len(),
                found = reports.iter().map(|r| r.found).sum::<usize>(),
                new = reports.iter().map(|r| r.new).sum::<usize>(),
                errors,
                "Fetch complete"
            );
            println!("{}", serde_json::to_string_pretty(&reports)?);
        }
        Command::Refresh { source, .. } => {
            let report = coordinator.spawn_refresh(source)?.await.map_err(CoordinatorError::from)??;
            for message in &report.errors {
                error!(%message, "Refresh error");
            }
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Command::Runs { .. } => {}
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
