//! Background loops run by the daemon.

pub mod device_offline_loop;
pub mod permit_expiry_loop;
pub mod scan_loop;
