//! Stale device detection.
//!
//! Devices that stop reporting get flipped to offline so the conflict scan
//! does not keep pairing against their last known position.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::interval;

use skylane_core::models::DeviceStatus;
use skylane_store::{Store, StoreError};

pub async fn run_device_offline_loop<S: Store + 'static>(
    store: Arc<S>,
    timeout_secs: i64,
    mut shutdown: broadcast::Receiver<()>,
) {
    let sweep_secs = (timeout_secs / 2).max(1) as u64;
    let mut ticker = interval(Duration::from_secs(sweep_secs));

    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::info!("Device offline loop shutting down");
                break;
            }
            _ = ticker.tick() => {
                if let Err(err) = sweep(store.as_ref(), timeout_secs).await {
                    tracing::warn!("Device offline sweep failed: {}", err);
                }
            }
        }
    }
}

async fn sweep<S: Store>(store: &S, timeout_secs: i64) -> Result<(), StoreError> {
    let cutoff = Utc::now() - chrono::Duration::seconds(timeout_secs);
    for device in store.list_online_devices().await? {
        if device.last_update <= cutoff {
            store
                .update_device_status(&device.id, DeviceStatus::Offline)
                .await?;
            tracing::info!(
                "Device {} marked offline (last update {})",
                device.id,
                device.last_update
            );
        }
    }
    Ok(())
}
