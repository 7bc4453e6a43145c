//! Demo data: one corridor airspace, a flight task, and a four-drone fleet.
//!
//! Two of the seeded drones sit about twenty meters apart so a scan right
//! after seeding has something to find.

use std::sync::Arc;

use anyhow::Result;
use rand::Rng;

use skylane_control::AdmissionController;
use skylane_core::models::{Device, DeviceStatus};
use skylane_core::spatial::{meters_to_lat, meters_to_lon};
use skylane_store::{SqliteStore, Store};

const BASE_LAT: f64 = 39.9042;
const BASE_LON: f64 = 116.4074;

pub async fn run(store: Arc<SqliteStore>) -> Result<()> {
    let controller = AdmissionController::new(store.clone());

    let airspace = controller
        .create_airspace(
            "Chaoyang demo corridor",
            Some("Seeded demo volume"),
            0.0,
            120.0,
            3,
        )
        .await?;
    let task = controller
        .create_flight_task("Seeded survey run", None)
        .await?;
    println!("Created airspace {} and task {}", airspace.id, task.id);

    let mut rng = rand::rng();
    let north_jitter: f64 = rng.random_range(-5.0..5.0);
    let east_jitter: f64 = rng.random_range(-5.0..5.0);

    let devices = [
        Device::new("SKY-001", "Phantom 4 Pro", BASE_LAT, BASE_LON, 50.0),
        Device::new(
            "SKY-002",
            "Mavic 3",
            BASE_LAT + meters_to_lat(1_000.0 + north_jitter, BASE_LAT),
            BASE_LON + meters_to_lon(1_000.0 + east_jitter, BASE_LAT),
            60.0,
        ),
        Device::new(
            "SKY-003",
            "Mini 3 Pro",
            BASE_LAT + meters_to_lat(400.0, BASE_LAT),
            BASE_LON,
            0.0,
        )
        .with_status(DeviceStatus::Maintenance),
        Device::new(
            "SKY-004",
            "Air 2S",
            BASE_LAT + meters_to_lat(20.0, BASE_LAT),
            BASE_LON,
            55.0,
        ),
    ];
    for device in &devices {
        store.upsert_device(device).await?;
        println!("Device {} ({}) {}", device.id, device.name, device.status);
    }

    println!("SKY-001 and SKY-004 sit about 20m apart; run `skylane scan` to see the conflict.");
    Ok(())
}
