//! In-memory store over concurrent maps. Intended for tests and demos.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;

use skylane_core::models::{
    Airspace, AirspaceStatus, Device, DeviceStatus, FlightConflict, FlightPermit, FlightTask,
    PermitStatus, ResolutionAction, ResolutionStatus,
};

use crate::ports::{Store, StoreError};

/// Thread-safe in-memory store. Cloning yields a handle to the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    airspaces: Arc<DashMap<String, Airspace>>,
    tasks: Arc<DashMap<String, FlightTask>>,
    permits: Arc<DashMap<String, FlightPermit>>,
    devices: Arc<DashMap<String, Device>>,
    conflicts: Arc<DashMap<String, FlightConflict>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted_by_id<T>(mut items: Vec<T>, id: impl Fn(&T) -> String) -> Vec<T> {
    items.sort_by_key(id);
    items
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_airspace(&self, airspace: &Airspace) -> Result<(), StoreError> {
        self.airspaces
            .insert(airspace.id.clone(), airspace.clone());
        Ok(())
    }

    async fn airspace(&self, id: &str) -> Result<Option<Airspace>, StoreError> {
        Ok(self.airspaces.get(id).map(|r| r.value().clone()))
    }

    async fn list_airspaces(&self) -> Result<Vec<Airspace>, StoreError> {
        let items = self.airspaces.iter().map(|r| r.value().clone()).collect();
        Ok(sorted_by_id(items, |a: &Airspace| a.id.clone()))
    }

    async fn update_airspace_status(
        &self,
        id: &str,
        status: AirspaceStatus,
        restriction_reason: Option<&str>,
    ) -> Result<bool, StoreError> {
        match self.airspaces.get_mut(id) {
            Some(mut entry) => {
                entry.status = status;
                entry.restriction_reason = restriction_reason.map(|r| r.to_string());
                entry.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_airspace_flight_count(
        &self,
        id: &str,
        current_flights: u32,
    ) -> Result<bool, StoreError> {
        match self.airspaces.get_mut(id) {
            Some(mut entry) => {
                entry.current_flights = current_flights;
                entry.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_flight_task(&self, task: &FlightTask) -> Result<(), StoreError> {
        self.tasks.insert(task.id.clone(), task.clone());
        Ok(())
    }

    async fn flight_task(&self, id: &str) -> Result<Option<FlightTask>, StoreError> {
        Ok(self.tasks.get(id).map(|r| r.value().clone()))
    }

    async fn list_flight_tasks(&self) -> Result<Vec<FlightTask>, StoreError> {
        let items = self.tasks.iter().map(|r| r.value().clone()).collect();
        Ok(sorted_by_id(items, |t: &FlightTask| t.id.clone()))
    }

    async fn create_permit(&self, permit: &FlightPermit) -> Result<(), StoreError> {
        self.permits.insert(permit.id.clone(), permit.clone());
        Ok(())
    }

    async fn permit(&self, id: &str) -> Result<Option<FlightPermit>, StoreError> {
        Ok(self.permits.get(id).map(|r| r.value().clone()))
    }

    async fn permits_for_airspace(
        &self,
        airspace_id: &str,
    ) -> Result<Vec<FlightPermit>, StoreError> {
        let items = self
            .permits
            .iter()
            .filter(|r| r.value().airspace_id == airspace_id)
            .map(|r| r.value().clone())
            .collect();
        Ok(sorted_by_id(items, |p: &FlightPermit| p.id.clone()))
    }

    async fn list_permits(&self) -> Result<Vec<FlightPermit>, StoreError> {
        let items = self.permits.iter().map(|r| r.value().clone()).collect();
        Ok(sorted_by_id(items, |p: &FlightPermit| p.id.clone()))
    }

    async fn update_permit_status(
        &self,
        id: &str,
        status: PermitStatus,
        approver_id: Option<&str>,
        remarks: Option<&str>,
    ) -> Result<bool, StoreError> {
        match self.permits.get_mut(id) {
            Some(mut entry) => {
                entry.status = status;
                if let Some(approver) = approver_id {
                    entry.approver_id = Some(approver.to_string());
                }
                if let Some(remarks) = remarks {
                    entry.remarks = remarks.to_string();
                }
                if matches!(status, PermitStatus::Approved | PermitStatus::Rejected) {
                    entry.approval_time = Some(Utc::now());
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn upsert_device(&self, device: &Device) -> Result<(), StoreError> {
        self.devices.insert(device.id.clone(), device.clone());
        Ok(())
    }

    async fn device(&self, id: &str) -> Result<Option<Device>, StoreError> {
        Ok(self.devices.get(id).map(|r| r.value().clone()))
    }

    async fn list_devices(&self) -> Result<Vec<Device>, StoreError> {
        let items = self.devices.iter().map(|r| r.value().clone()).collect();
        Ok(sorted_by_id(items, |d: &Device| d.id.clone()))
    }

    async fn list_online_devices(&self) -> Result<Vec<Device>, StoreError> {
        let items = self
            .devices
            .iter()
            .filter(|r| r.value().status == DeviceStatus::Online)
            .map(|r| r.value().clone())
            .collect();
        Ok(sorted_by_id(items, |d: &Device| d.id.clone()))
    }

    async fn update_device_status(
        &self,
        id: &str,
        status: DeviceStatus,
    ) -> Result<bool, StoreError> {
        match self.devices.get_mut(id) {
            Some(mut entry) => {
                entry.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn create_conflict(&self, conflict: &FlightConflict) -> Result<(), StoreError> {
        self.conflicts.insert(conflict.id.clone(), conflict.clone());
        Ok(())
    }

    async fn conflict(&self, id: &str) -> Result<Option<FlightConflict>, StoreError> {
        Ok(self.conflicts.get(id).map(|r| r.value().clone()))
    }

    async fn list_conflicts(&self) -> Result<Vec<FlightConflict>, StoreError> {
        let items = self.conflicts.iter().map(|r| r.value().clone()).collect();
        Ok(sorted_by_id(items, |c: &FlightConflict| c.id.clone()))
    }

    async fn unresolved_conflicts(&self) -> Result<Vec<FlightConflict>, StoreError> {
        let items = self
            .conflicts
            .iter()
            .filter(|r| r.value().resolution_status == ResolutionStatus::Pending)
            .map(|r| r.value().clone())
            .collect();
        Ok(sorted_by_id(items, |c: &FlightConflict| c.id.clone()))
    }

    async fn update_conflict_resolution(
        &self,
        id: &str,
        status: ResolutionStatus,
        action: Option<&ResolutionAction>,
    ) -> Result<bool, StoreError> {
        match self.conflicts.get_mut(id) {
            Some(mut entry) => {
                entry.resolution_status = status;
                entry.resolution_action = action.cloned();
                entry.resolved_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use skylane_core::models::TaskStatus;

    fn permit(id: &str, airspace_id: &str) -> FlightPermit {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
        FlightPermit {
            id: id.to_string(),
            flight_task_id: "FT0000000001".to_string(),
            airspace_id: airspace_id.to_string(),
            applicant_id: "op-1".to_string(),
            approver_id: None,
            status: PermitStatus::Pending,
            start_time: start,
            end_time: start + chrono::Duration::hours(1),
            application_time: start,
            approval_time: None,
            remarks: String::new(),
        }
    }

    #[tokio::test]
    async fn permit_decision_stamps_time_and_approver() {
        let store = MemoryStore::new();
        store.create_permit(&permit("FP1", "AS1")).await.unwrap();

        let updated = store
            .update_permit_status("FP1", PermitStatus::Approved, Some("admin"), Some("ok"))
            .await
            .unwrap();
        assert!(updated);

        let stored = store.permit("FP1").await.unwrap().unwrap();
        assert_eq!(stored.status, PermitStatus::Approved);
        assert_eq!(stored.approver_id.as_deref(), Some("admin"));
        assert_eq!(stored.remarks, "ok");
        assert!(stored.approval_time.is_some());
    }

    #[tokio::test]
    async fn expiry_does_not_stamp_decision_time() {
        let store = MemoryStore::new();
        store.create_permit(&permit("FP1", "AS1")).await.unwrap();

        store
            .update_permit_status("FP1", PermitStatus::Expired, None, None)
            .await
            .unwrap();
        let stored = store.permit("FP1").await.unwrap().unwrap();
        assert_eq!(stored.status, PermitStatus::Expired);
        assert!(stored.approval_time.is_none());
    }

    #[tokio::test]
    async fn permits_for_airspace_filters_and_sorts() {
        let store = MemoryStore::new();
        store.create_permit(&permit("FP2", "AS1")).await.unwrap();
        store.create_permit(&permit("FP1", "AS1")).await.unwrap();
        store.create_permit(&permit("FP3", "AS2")).await.unwrap();

        let permits = store.permits_for_airspace("AS1").await.unwrap();
        let ids: Vec<_> = permits.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["FP1", "FP2"]);
    }

    #[tokio::test]
    async fn online_filter_excludes_other_statuses() {
        let store = MemoryStore::new();
        store
            .upsert_device(&Device::new("D1", "alpha", 39.9, 116.4, 50.0))
            .await
            .unwrap();
        store
            .upsert_device(
                &Device::new("D2", "bravo", 39.9, 116.4, 50.0)
                    .with_status(DeviceStatus::Maintenance),
            )
            .await
            .unwrap();

        let online = store.list_online_devices().await.unwrap();
        assert_eq!(online.len(), 1);
        assert_eq!(online[0].id, "D1");

        store
            .update_device_status("D1", DeviceStatus::Offline)
            .await
            .unwrap();
        assert!(store.list_online_devices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_ids_update_nothing() {
        let store = MemoryStore::new();
        assert!(!store
            .update_permit_status("FP404", PermitStatus::Approved, None, None)
            .await
            .unwrap());
        assert!(!store
            .update_device_status("D404", DeviceStatus::Offline)
            .await
            .unwrap());
        assert!(store.flight_task("FT404").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn task_round_trip() {
        let store = MemoryStore::new();
        let task = FlightTask {
            id: "FT1".to_string(),
            name: "survey".to_string(),
            description: None,
            status: TaskStatus::Pending,
            created_at: Utc::now(),
        };
        store.create_flight_task(&task).await.unwrap();
        let stored = store.flight_task("FT1").await.unwrap().unwrap();
        assert_eq!(stored.name, "survey");
    }
}
