//! Periodic fleet-wide conflict scan.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::interval;

use skylane_control::{suggest_action, ConflictScanner};
use skylane_store::Store;

pub async fn run_scan_loop<S: Store + 'static>(
    scanner: Arc<ConflictScanner<S>>,
    interval_secs: u64,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Conflict scan loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                match scanner.scan_all().await {
                    Ok(conflicts) => {
                        for conflict in conflicts {
                            let action = suggest_action(conflict.severity);
                            tracing::info!(
                                "Suggested {} for conflict {}: {}",
                                action.action_type,
                                conflict.id,
                                action.directives.join(", ")
                            );
                        }
                    }
                    Err(err) => {
                        tracing::error!("Conflict scan failed: {}", err);
                    }
                }
            }
        }
    }
}
