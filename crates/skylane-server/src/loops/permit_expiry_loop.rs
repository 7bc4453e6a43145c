//! Permit expiry sweep.
//!
//! Moves pending and approved permits whose window has passed to expired so
//! they stop occupying capacity.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::interval;

use skylane_control::AdmissionController;
use skylane_store::Store;

pub async fn run_permit_expiry_loop<S: Store + 'static>(
    controller: Arc<AdmissionController<S>>,
    interval_secs: u64,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = interval(Duration::from_secs(interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Permit expiry loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                match controller.expire_overdue(Utc::now()).await {
                    Ok(expired) => {
                        for permit in expired {
                            tracing::info!(
                                "Expired permit {} for airspace {}",
                                permit.id,
                                permit.airspace_id
                            );
                        }
                    }
                    Err(err) => {
                        tracing::warn!("Permit expiry sweep failed: {}", err);
                    }
                }
            }
        }
    }
}
