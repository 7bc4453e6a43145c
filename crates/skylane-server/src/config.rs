//! Daemon configuration from environment.

use std::env;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub scan_interval_secs: u64,
    pub safe_distance_m: f64,
    pub device_timeout_secs: i64,
    pub expiry_sweep_secs: u64,
    pub json_logs: bool,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            db_path: env::var("SKYLANE_DB").unwrap_or_else(|_| "skylane.db".to_string()),
            scan_interval_secs: env::var("SKYLANE_SCAN_INTERVAL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(5),
            safe_distance_m: env::var("SKYLANE_SAFE_DISTANCE_M")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(50.0),
            device_timeout_secs: env::var("SKYLANE_DEVICE_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            expiry_sweep_secs: env::var("SKYLANE_EXPIRY_SWEEP_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(60),
            json_logs: env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false),
        }
    }
}
