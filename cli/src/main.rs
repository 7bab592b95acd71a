//! calsync - reconcile two calendar stores.
//!
//! Reads both stores from snapshot files, runs the configured strategy over
//! every known identifier and writes the stores back. The run report is
//! printed to stdout as JSON; diagnostics go to stderr.

mod config;
mod error;
mod storage;

use crate::config::Config;
use crate::error::Result;
use calsync_engine::{Driver, SyncReport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calsync=info,calsync_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let report = match run() {
        Ok(report) => report,
        Err(err) => {
            tracing::error!("{}", err);
            return Err(err.into());
        }
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run() -> Result<SyncReport> {
    let config = Config::from_env()?;
    tracing::info!(
        "Syncing {} <-> {} with '{}'",
        config.store_a.display(),
        config.store_b.display(),
        config.strategy
    );

    let store_a = storage::load_store(&config.store_a)?;
    let store_b = storage::load_store(&config.store_b)?;

    let mut driver = Driver::with_strategy(store_a, store_b, config.strategy);
    let report = driver.run_all(config.dry_run);

    if config.dry_run {
        tracing::info!("Dry run, stores left untouched");
        return Ok(report);
    }

    let (store_a, store_b) = driver.into_stores();
    storage::save_pair(&config.store_a, &store_a, &config.store_b, &store_b)?;

    Ok(report)
}
