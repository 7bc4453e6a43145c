//! Async store port consumed by the admission and scanning services.
//!
//! The services hold no long-lived entity state of their own; everything is
//! fetched per operation through this trait. Implementations must surface
//! backend failures as explicit `StoreError` values, never panic, and never
//! substitute defaults for records they cannot decode.

use async_trait::async_trait;
use skylane_core::models::{
    Airspace, AirspaceStatus, Device, DeviceStatus, FlightConflict, FlightPermit, FlightTask,
    PermitStatus, ResolutionAction, ResolutionStatus,
};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying backend failure (connection, SQL, I/O).
    #[error("store backend failure: {0}")]
    Backend(String),
    /// A persisted record could not be decoded into a domain type.
    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },
}

impl StoreError {
    pub fn corrupt(id: &str, reason: impl fmt::Display) -> Self {
        Self::Corrupt {
            id: id.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Persistence port for airspaces, tasks, permits, devices and conflicts.
///
/// List operations return records ordered by id so callers see a stable
/// sequence regardless of backend. Update operations return `false` when no
/// record matched the id.
#[async_trait]
pub trait Store: Send + Sync {
    // Airspaces
    async fn create_airspace(&self, airspace: &Airspace) -> Result<(), StoreError>;
    async fn airspace(&self, id: &str) -> Result<Option<Airspace>, StoreError>;
    async fn list_airspaces(&self) -> Result<Vec<Airspace>, StoreError>;
    /// Set the status and restriction reason; `None` clears the reason.
    /// Bumps the record's updated-at timestamp.
    async fn update_airspace_status(
        &self,
        id: &str,
        status: AirspaceStatus,
        restriction_reason: Option<&str>,
    ) -> Result<bool, StoreError>;
    /// Rewrite the advisory occupancy gauge.
    async fn update_airspace_flight_count(
        &self,
        id: &str,
        current_flights: u32,
    ) -> Result<bool, StoreError>;

    // Flight tasks
    async fn create_flight_task(&self, task: &FlightTask) -> Result<(), StoreError>;
    async fn flight_task(&self, id: &str) -> Result<Option<FlightTask>, StoreError>;
    async fn list_flight_tasks(&self) -> Result<Vec<FlightTask>, StoreError>;

    // Flight permits
    async fn create_permit(&self, permit: &FlightPermit) -> Result<(), StoreError>;
    async fn permit(&self, id: &str) -> Result<Option<FlightPermit>, StoreError>;
    async fn permits_for_airspace(&self, airspace_id: &str)
        -> Result<Vec<FlightPermit>, StoreError>;
    async fn list_permits(&self) -> Result<Vec<FlightPermit>, StoreError>;
    /// Transition a permit. Approver and remarks are only written when given;
    /// a move to Approved or Rejected stamps the decision timestamp.
    async fn update_permit_status(
        &self,
        id: &str,
        status: PermitStatus,
        approver_id: Option<&str>,
        remarks: Option<&str>,
    ) -> Result<bool, StoreError>;

    // Devices (position feed)
    async fn upsert_device(&self, device: &Device) -> Result<(), StoreError>;
    async fn device(&self, id: &str) -> Result<Option<Device>, StoreError>;
    async fn list_devices(&self) -> Result<Vec<Device>, StoreError>;
    async fn list_online_devices(&self) -> Result<Vec<Device>, StoreError>;
    async fn update_device_status(
        &self,
        id: &str,
        status: DeviceStatus,
    ) -> Result<bool, StoreError>;

    // Flight conflicts
    async fn create_conflict(&self, conflict: &FlightConflict) -> Result<(), StoreError>;
    async fn conflict(&self, id: &str) -> Result<Option<FlightConflict>, StoreError>;
    async fn list_conflicts(&self) -> Result<Vec<FlightConflict>, StoreError>;
    async fn unresolved_conflicts(&self) -> Result<Vec<FlightConflict>, StoreError>;
    /// Close out a conflict; stamps the resolved-at timestamp.
    async fn update_conflict_resolution(
        &self,
        id: &str,
        status: ResolutionStatus,
        action: Option<&ResolutionAction>,
    ) -> Result<bool, StoreError>;
}
