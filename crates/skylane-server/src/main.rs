//! Skylane daemon: admission bookkeeping and conflict monitoring loops
//! over the shared SQLite store.

mod config;
mod loops;

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use skylane_control::{AdmissionController, ConflictScanner, ScannerConfig};
use skylane_store::SqliteStore;

use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    init_tracing(&config);

    tracing::info!("Starting skylane daemon...");

    let store = Arc::new(SqliteStore::connect(&config.db_path, 5).await?);
    tracing::info!("Store ready at {}", config.db_path);

    let controller = Arc::new(AdmissionController::new(store.clone()));
    let scanner = Arc::new(ConflictScanner::with_config(
        store.clone(),
        ScannerConfig {
            safe_distance_m: config.safe_distance_m,
            dedupe_open_pairs: true,
        },
    ));

    let (shutdown_tx, _) = broadcast::channel(1);

    tokio::spawn(loops::scan_loop::run_scan_loop(
        scanner,
        config.scan_interval_secs,
        shutdown_tx.subscribe(),
    ));
    tokio::spawn(loops::permit_expiry_loop::run_permit_expiry_loop(
        controller,
        config.expiry_sweep_secs,
        shutdown_tx.subscribe(),
    ));
    tokio::spawn(loops::device_offline_loop::run_device_offline_loop(
        store,
        config.device_timeout_secs,
        shutdown_tx.subscribe(),
    ));

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());

    Ok(())
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}
