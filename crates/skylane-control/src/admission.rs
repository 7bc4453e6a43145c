//! Airspace admission control.
//!
//! Capacity decisions recompute the count of approved permits overlapping
//! the requested window from stored permits on every check. The
//! `current_flights` gauge on the airspace record is advisory output,
//! refreshed after each decision, never an input to a decision.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::Mutex;

use skylane_core::ids::IdGenerator;
use skylane_core::models::{
    Airspace, AirspaceStatus, FlightPermit, FlightTask, PermitStatus, TaskStatus,
};
use skylane_store::Store;

use crate::error::{ControlError, Result};

/// Permit admission service over a shared store.
///
/// All permit state transitions for one airspace serialize on a
/// per-airspace async mutex, so a capacity check and the approval it
/// guards form one atomic step.
pub struct AdmissionController<S> {
    store: Arc<S>,
    ids: IdGenerator,
    airspace_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl<S: Store> AdmissionController<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            ids: IdGenerator::new(),
            airspace_locks: DashMap::new(),
        }
    }

    fn airspace_lock(&self, airspace_id: &str) -> Arc<Mutex<()>> {
        self.airspace_locks
            .entry(airspace_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn permit_or_not_found(&self, id: &str) -> Result<FlightPermit> {
        self.store
            .permit(id)
            .await?
            .ok_or_else(|| ControlError::NotFound {
                kind: "permit",
                id: id.to_string(),
            })
    }

    async fn airspace_or_not_found(&self, id: &str) -> Result<Airspace> {
        self.store
            .airspace(id)
            .await?
            .ok_or_else(|| ControlError::NotFound {
                kind: "airspace",
                id: id.to_string(),
            })
    }

    /// Recompute the advisory `current_flights` gauge from approved permits.
    async fn refresh_flight_count(&self, airspace_id: &str) -> Result<()> {
        let permits = self.store.permits_for_airspace(airspace_id).await?;
        let approved = permits
            .iter()
            .filter(|p| p.status == PermitStatus::Approved)
            .count() as u32;
        self.store
            .update_airspace_flight_count(airspace_id, approved)
            .await?;
        Ok(())
    }

    // ========== Airspaces ==========

    /// Register a new airspace volume. Starts out active with no flights.
    pub async fn create_airspace(
        &self,
        name: &str,
        description: Option<&str>,
        min_altitude_m: f64,
        max_altitude_m: f64,
        capacity: u32,
    ) -> Result<Airspace> {
        if capacity < 1 {
            return Err(ControlError::InvalidAirspace(
                "capacity must be at least 1".to_string(),
            ));
        }
        if min_altitude_m >= max_altitude_m {
            return Err(ControlError::InvalidAirspace(format!(
                "altitude floor {min_altitude_m} must be below ceiling {max_altitude_m}"
            )));
        }
        let now = Utc::now();
        let airspace = Airspace {
            id: self.ids.airspace_id(),
            name: name.to_string(),
            description: description.map(str::to_string),
            min_altitude_m,
            max_altitude_m,
            capacity,
            current_flights: 0,
            status: AirspaceStatus::Active,
            restriction_reason: None,
            created_at: now,
            updated_at: now,
        };
        self.store.create_airspace(&airspace).await?;
        tracing::info!("Registered airspace {} ({})", airspace.id, airspace.name);
        Ok(airspace)
    }

    async fn set_airspace_status(
        &self,
        id: &str,
        status: AirspaceStatus,
        reason: Option<&str>,
    ) -> Result<Airspace> {
        let lock = self.airspace_lock(id);
        let _guard = lock.lock().await;
        let updated = self.store.update_airspace_status(id, status, reason).await?;
        if !updated {
            return Err(ControlError::NotFound {
                kind: "airspace",
                id: id.to_string(),
            });
        }
        tracing::info!("Airspace {} is now {}", id, status);
        self.airspace_or_not_found(id).await
    }

    /// Restrict an airspace; pending applications start failing immediately.
    pub async fn restrict_airspace(&self, id: &str, reason: &str) -> Result<Airspace> {
        self.set_airspace_status(id, AirspaceStatus::Restricted, Some(reason))
            .await
    }

    /// Reopen an airspace and clear any restriction reason.
    pub async fn activate_airspace(&self, id: &str) -> Result<Airspace> {
        self.set_airspace_status(id, AirspaceStatus::Active, None)
            .await
    }

    pub async fn close_airspace(&self, id: &str) -> Result<Airspace> {
        self.set_airspace_status(id, AirspaceStatus::Closed, None)
            .await
    }

    // ========== Flight tasks ==========

    pub async fn create_flight_task(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<FlightTask> {
        let task = FlightTask {
            id: self.ids.task_id(),
            name: name.to_string(),
            description: description.map(str::to_string),
            status: TaskStatus::default(),
            created_at: Utc::now(),
        };
        self.store.create_flight_task(&task).await?;
        Ok(task)
    }

    // ========== Capacity queries ==========

    /// Count approved permits whose window overlaps `[start, end)`.
    ///
    /// Windows that merely touch at an endpoint count as overlapping; a
    /// handover at the boundary still has both flights in the volume.
    pub async fn count_overlapping_approved(
        &self,
        airspace_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u32> {
        let permits = self.store.permits_for_airspace(airspace_id).await?;
        Ok(permits
            .iter()
            .filter(|p| p.status == PermitStatus::Approved && p.window_overlaps(start, end))
            .count() as u32)
    }

    /// Whether the airspace could admit one more flight in the window.
    ///
    /// Unknown or non-active airspaces and invalid windows all report
    /// unavailable rather than erroring.
    pub async fn is_available(
        &self,
        airspace_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<bool> {
        if start >= end {
            return Ok(false);
        }
        let Some(airspace) = self.store.airspace(airspace_id).await? else {
            return Ok(false);
        };
        if airspace.status != AirspaceStatus::Active {
            return Ok(false);
        }
        let usage = self
            .count_overlapping_approved(airspace_id, start, end)
            .await?;
        Ok(usage < airspace.capacity)
    }

    // ========== Permit lifecycle ==========

    /// File a permit application for a flight task in an airspace window.
    ///
    /// The capacity check here is advisory: it turns away windows that
    /// already cannot fit, but the binding check happens at approval time.
    pub async fn apply_for_permit(
        &self,
        flight_task_id: &str,
        airspace_id: &str,
        applicant_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        remarks: &str,
    ) -> Result<FlightPermit> {
        if start >= end {
            return Err(ControlError::InvalidWindow { start, end });
        }
        if self.store.flight_task(flight_task_id).await?.is_none() {
            return Err(ControlError::UnknownFlightTask(flight_task_id.to_string()));
        }
        let airspace = self.airspace_or_not_found(airspace_id).await?;
        if airspace.status != AirspaceStatus::Active {
            return Err(ControlError::AirspaceUnavailable {
                id: airspace.id,
                status: airspace.status,
            });
        }
        let usage = self
            .count_overlapping_approved(airspace_id, start, end)
            .await?;
        if usage >= airspace.capacity {
            return Err(ControlError::CapacityExceeded {
                id: airspace.id,
                capacity: airspace.capacity,
            });
        }

        let permit = FlightPermit {
            id: self.ids.permit_id(),
            flight_task_id: flight_task_id.to_string(),
            airspace_id: airspace_id.to_string(),
            applicant_id: applicant_id.to_string(),
            approver_id: None,
            status: PermitStatus::Pending,
            start_time: start,
            end_time: end,
            application_time: Utc::now(),
            approval_time: None,
            remarks: remarks.to_string(),
        };
        self.store.create_permit(&permit).await?;
        tracing::debug!(
            "Permit {} filed for airspace {} ({} overlapping approved)",
            permit.id,
            airspace_id,
            usage
        );
        Ok(permit)
    }

    /// Approve a pending permit if the airspace still has room.
    ///
    /// Runs the capacity check and the status write under the airspace
    /// lock, so two concurrent approvals cannot both slip past a
    /// nearly-full volume.
    pub async fn approve(
        &self,
        permit_id: &str,
        approver_id: &str,
        remarks: Option<&str>,
    ) -> Result<FlightPermit> {
        let permit = self.permit_or_not_found(permit_id).await?;
        if permit.status != PermitStatus::Pending {
            return Err(ControlError::AlreadyDecided {
                id: permit.id,
                status: permit.status,
            });
        }

        let lock = self.airspace_lock(&permit.airspace_id);
        let _guard = lock.lock().await;

        // Re-read now that we hold the lock; the permit may have been
        // decided while we waited.
        let permit = self.permit_or_not_found(permit_id).await?;
        if permit.status != PermitStatus::Pending {
            return Err(ControlError::AlreadyDecided {
                id: permit.id,
                status: permit.status,
            });
        }
        let airspace = self.airspace_or_not_found(&permit.airspace_id).await?;
        if airspace.status != AirspaceStatus::Active {
            return Err(ControlError::AirspaceUnavailable {
                id: airspace.id,
                status: airspace.status,
            });
        }
        let usage = self
            .count_overlapping_approved(&airspace.id, permit.start_time, permit.end_time)
            .await?;
        if usage >= airspace.capacity {
            return Err(ControlError::CapacityExceeded {
                id: airspace.id,
                capacity: airspace.capacity,
            });
        }

        self.store
            .update_permit_status(permit_id, PermitStatus::Approved, Some(approver_id), remarks)
            .await?;
        self.refresh_flight_count(&airspace.id).await?;
        tracing::info!(
            "Approved permit {} for airspace {} ({}/{} in window)",
            permit_id,
            airspace.id,
            usage + 1,
            airspace.capacity
        );
        self.permit_or_not_found(permit_id).await
    }

    /// Reject a pending permit. Capacity is unaffected.
    pub async fn reject(
        &self,
        permit_id: &str,
        approver_id: &str,
        remarks: Option<&str>,
    ) -> Result<FlightPermit> {
        let permit = self.permit_or_not_found(permit_id).await?;
        if permit.status != PermitStatus::Pending {
            return Err(ControlError::AlreadyDecided {
                id: permit.id,
                status: permit.status,
            });
        }

        let lock = self.airspace_lock(&permit.airspace_id);
        let _guard = lock.lock().await;

        let permit = self.permit_or_not_found(permit_id).await?;
        if permit.status != PermitStatus::Pending {
            return Err(ControlError::AlreadyDecided {
                id: permit.id,
                status: permit.status,
            });
        }
        self.store
            .update_permit_status(permit_id, PermitStatus::Rejected, Some(approver_id), remarks)
            .await?;
        tracing::info!("Rejected permit {} for airspace {}", permit_id, permit.airspace_id);
        self.permit_or_not_found(permit_id).await
    }

    /// Withdraw a pending or approved permit.
    ///
    /// Cancellation lands in the rejected state with remarks "Cancelled";
    /// there is no separate cancelled state, so reporting cannot tell an
    /// operator withdrawal from an approver denial except by remarks.
    pub async fn cancel(&self, permit_id: &str) -> Result<FlightPermit> {
        let permit = self.permit_or_not_found(permit_id).await?;
        let lock = self.airspace_lock(&permit.airspace_id);
        let _guard = lock.lock().await;

        let permit = self.permit_or_not_found(permit_id).await?;
        if !matches!(
            permit.status,
            PermitStatus::Pending | PermitStatus::Approved
        ) {
            return Err(ControlError::AlreadyDecided {
                id: permit.id,
                status: permit.status,
            });
        }
        let was_approved = permit.status == PermitStatus::Approved;
        self.store
            .update_permit_status(permit_id, PermitStatus::Rejected, None, Some("Cancelled"))
            .await?;
        if was_approved {
            self.refresh_flight_count(&permit.airspace_id).await?;
        }
        tracing::info!("Cancelled permit {} for airspace {}", permit_id, permit.airspace_id);
        self.permit_or_not_found(permit_id).await
    }

    /// Expire pending and approved permits whose window has fully passed.
    ///
    /// Returns the permits that were transitioned. Expiry does not touch
    /// the decision timestamp or remarks.
    pub async fn expire_overdue(&self, now: DateTime<Utc>) -> Result<Vec<FlightPermit>> {
        let permits = self.store.list_permits().await?;
        let mut by_airspace: std::collections::BTreeMap<String, Vec<FlightPermit>> =
            std::collections::BTreeMap::new();
        for permit in permits {
            let live = matches!(
                permit.status,
                PermitStatus::Pending | PermitStatus::Approved
            );
            if live && permit.end_time < now {
                by_airspace
                    .entry(permit.airspace_id.clone())
                    .or_default()
                    .push(permit);
            }
        }

        let mut expired = Vec::new();
        for (airspace_id, candidates) in by_airspace {
            let lock = self.airspace_lock(&airspace_id);
            let _guard = lock.lock().await;
            let mut released_capacity = false;
            for candidate in candidates {
                // Re-read under the lock; the permit may have been decided
                // or cancelled since the sweep collected it.
                let Some(current) = self.store.permit(&candidate.id).await? else {
                    continue;
                };
                let live = matches!(
                    current.status,
                    PermitStatus::Pending | PermitStatus::Approved
                );
                if !live || current.end_time >= now {
                    continue;
                }
                self.store
                    .update_permit_status(&current.id, PermitStatus::Expired, None, None)
                    .await?;
                if current.status == PermitStatus::Approved {
                    released_capacity = true;
                }
                if let Some(updated) = self.store.permit(&current.id).await? {
                    expired.push(updated);
                }
            }
            if released_capacity {
                self.refresh_flight_count(&airspace_id).await?;
            }
        }
        if !expired.is_empty() {
            tracing::info!("Expired {} overdue permit(s)", expired.len());
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use skylane_store::MemoryStore;

    fn harness() -> (Arc<MemoryStore>, AdmissionController<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let controller = AdmissionController::new(store.clone());
        (store, controller)
    }

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap() + chrono::Duration::minutes(minutes)
    }

    async fn seed(
        controller: &AdmissionController<MemoryStore>,
        capacity: u32,
    ) -> (Airspace, FlightTask) {
        let airspace = controller
            .create_airspace("test volume", None, 0.0, 120.0, capacity)
            .await
            .unwrap();
        let task = controller
            .create_flight_task("survey", None)
            .await
            .unwrap();
        (airspace, task)
    }

    #[tokio::test]
    async fn apply_creates_pending_permit() {
        let (_, controller) = harness();
        let (airspace, task) = seed(&controller, 2).await;

        let permit = controller
            .apply_for_permit(&task.id, &airspace.id, "op-1", t(0), t(60), "first flight")
            .await
            .unwrap();
        assert!(permit.id.starts_with("FP"));
        assert_eq!(permit.status, PermitStatus::Pending);
        assert_eq!(permit.applicant_id, "op-1");
        assert_eq!(permit.remarks, "first flight");
        assert!(permit.approver_id.is_none());
        assert!(permit.approval_time.is_none());
    }

    #[tokio::test]
    async fn apply_rejects_bad_windows_and_unknown_references() {
        let (_, controller) = harness();
        let (airspace, task) = seed(&controller, 2).await;

        let err = controller
            .apply_for_permit(&task.id, &airspace.id, "op-1", t(60), t(0), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::InvalidWindow { .. }), "got {err}");

        let err = controller
            .apply_for_permit(&task.id, &airspace.id, "op-1", t(0), t(0), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::InvalidWindow { .. }), "got {err}");

        let err = controller
            .apply_for_permit("FT4040404040", &airspace.id, "op-1", t(0), t(60), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::UnknownFlightTask(_)), "got {err}");

        let err = controller
            .apply_for_permit(&task.id, "AS404404", "op-1", t(0), t(60), "")
            .await
            .unwrap_err();
        assert!(
            matches!(err, ControlError::NotFound { kind: "airspace", .. }),
            "got {err}"
        );
    }

    #[tokio::test]
    async fn restricted_airspace_turns_applications_away() {
        let (_, controller) = harness();
        let (airspace, task) = seed(&controller, 2).await;

        let restricted = controller
            .restrict_airspace(&airspace.id, "air show")
            .await
            .unwrap();
        assert_eq!(restricted.status, AirspaceStatus::Restricted);
        assert_eq!(restricted.restriction_reason.as_deref(), Some("air show"));

        let err = controller
            .apply_for_permit(&task.id, &airspace.id, "op-1", t(0), t(60), "")
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                ControlError::AirspaceUnavailable {
                    status: AirspaceStatus::Restricted,
                    ..
                }
            ),
            "got {err}"
        );
        assert!(!controller
            .is_available(&airspace.id, t(0), t(60))
            .await
            .unwrap());

        let reopened = controller.activate_airspace(&airspace.id).await.unwrap();
        assert_eq!(reopened.status, AirspaceStatus::Active);
        assert!(reopened.restriction_reason.is_none());
        assert!(controller
            .is_available(&airspace.id, t(0), t(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn overlap_count_is_recomputed_per_window() {
        let (_, controller) = harness();
        let (airspace, task) = seed(&controller, 3).await;

        for (start, end) in [(t(0), t(10)), (t(10), t(20))] {
            let permit = controller
                .apply_for_permit(&task.id, &airspace.id, "op-1", start, end, "")
                .await
                .unwrap();
            controller.approve(&permit.id, "admin", None).await.unwrap();
        }

        // A query inside the first window sees one flight; a query spanning
        // the handover sees both.
        assert_eq!(
            controller
                .count_overlapping_approved(&airspace.id, t(2), t(9))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            controller
                .count_overlapping_approved(&airspace.id, t(5), t(15))
                .await
                .unwrap(),
            2
        );
        // Touching an endpoint still counts as overlap.
        assert_eq!(
            controller
                .count_overlapping_approved(&airspace.id, t(20), t(30))
                .await
                .unwrap(),
            1
        );
        assert_eq!(
            controller
                .count_overlapping_approved(&airspace.id, t(21), t(30))
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn capacity_blocks_overlapping_approval() {
        let (_, controller) = harness();
        let (airspace, task) = seed(&controller, 1).await;

        let first = controller
            .apply_for_permit(&task.id, &airspace.id, "op-1", t(0), t(60), "")
            .await
            .unwrap();
        let second = controller
            .apply_for_permit(&task.id, &airspace.id, "op-2", t(30), t(90), "")
            .await
            .unwrap();

        controller.approve(&first.id, "admin", None).await.unwrap();
        let err = controller
            .approve(&second.id, "admin", None)
            .await
            .unwrap_err();
        assert!(
            matches!(err, ControlError::CapacityExceeded { capacity: 1, .. }),
            "got {err}"
        );

        // A window that only touches the approved one still collides.
        let err = controller
            .apply_for_permit(&task.id, &airspace.id, "op-3", t(60), t(120), "")
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::CapacityExceeded { .. }), "got {err}");

        // One minute clear of the boundary is admissible.
        let third = controller
            .apply_for_permit(&task.id, &airspace.id, "op-3", t(61), t(120), "")
            .await
            .unwrap();
        controller.approve(&third.id, "admin", None).await.unwrap();
    }

    #[tokio::test]
    async fn approve_stamps_decision_and_refreshes_gauge() {
        let (store, controller) = harness();
        let (airspace, task) = seed(&controller, 2).await;

        let permit = controller
            .apply_for_permit(&task.id, &airspace.id, "op-1", t(0), t(60), "")
            .await
            .unwrap();
        let approved = controller
            .approve(&permit.id, "admin", Some("cleared"))
            .await
            .unwrap();
        assert_eq!(approved.status, PermitStatus::Approved);
        assert_eq!(approved.approver_id.as_deref(), Some("admin"));
        assert_eq!(approved.remarks, "cleared");
        assert!(approved.approval_time.is_some());

        let refreshed = store.airspace(&airspace.id).await.unwrap().unwrap();
        assert_eq!(refreshed.current_flights, 1);

        let err = controller
            .approve(&permit.id, "admin", None)
            .await
            .unwrap_err();
        assert!(
            matches!(
                err,
                ControlError::AlreadyDecided {
                    status: PermitStatus::Approved,
                    ..
                }
            ),
            "got {err}"
        );
    }

    #[tokio::test]
    async fn reject_leaves_capacity_untouched() {
        let (store, controller) = harness();
        let (airspace, task) = seed(&controller, 1).await;

        let permit = controller
            .apply_for_permit(&task.id, &airspace.id, "op-1", t(0), t(60), "")
            .await
            .unwrap();
        let rejected = controller
            .reject(&permit.id, "admin", Some("weather"))
            .await
            .unwrap();
        assert_eq!(rejected.status, PermitStatus::Rejected);
        assert_eq!(rejected.remarks, "weather");
        assert!(rejected.approval_time.is_some());

        let refreshed = store.airspace(&airspace.id).await.unwrap().unwrap();
        assert_eq!(refreshed.current_flights, 0);
        assert!(controller
            .is_available(&airspace.id, t(0), t(60))
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn cancel_approved_releases_capacity() {
        let (store, controller) = harness();
        let (airspace, task) = seed(&controller, 1).await;

        let permit = controller
            .apply_for_permit(&task.id, &airspace.id, "op-1", t(0), t(60), "")
            .await
            .unwrap();
        controller.approve(&permit.id, "admin", None).await.unwrap();
        assert!(!controller
            .is_available(&airspace.id, t(0), t(60))
            .await
            .unwrap());

        let cancelled = controller.cancel(&permit.id).await.unwrap();
        assert_eq!(cancelled.status, PermitStatus::Rejected);
        assert_eq!(cancelled.remarks, "Cancelled");

        let refreshed = store.airspace(&airspace.id).await.unwrap().unwrap();
        assert_eq!(refreshed.current_flights, 0);
        assert!(controller
            .is_available(&airspace.id, t(0), t(60))
            .await
            .unwrap());

        // Cancellation is terminal; a second cancel reports the decided state.
        let err = controller.cancel(&permit.id).await.unwrap_err();
        assert!(
            matches!(
                err,
                ControlError::AlreadyDecided {
                    status: PermitStatus::Rejected,
                    ..
                }
            ),
            "got {err}"
        );
    }

    #[tokio::test]
    async fn concurrent_approvals_respect_capacity() {
        let (store, controller) = harness();
        let (airspace, task) = seed(&controller, 1).await;

        let a = controller
            .apply_for_permit(&task.id, &airspace.id, "op-1", t(0), t(60), "")
            .await
            .unwrap();
        let b = controller
            .apply_for_permit(&task.id, &airspace.id, "op-2", t(0), t(60), "")
            .await
            .unwrap();

        let (ra, rb) = tokio::join!(
            controller.approve(&a.id, "admin", None),
            controller.approve(&b.id, "admin", None)
        );
        assert!(
            ra.is_ok() != rb.is_ok(),
            "exactly one approval must win: {ra:?} / {rb:?}"
        );

        let refreshed = store.airspace(&airspace.id).await.unwrap().unwrap();
        assert_eq!(refreshed.current_flights, 1);
    }

    #[tokio::test]
    async fn expire_overdue_releases_capacity_and_keeps_stamps() {
        let (store, controller) = harness();
        let (airspace, task) = seed(&controller, 1).await;

        let pending = controller
            .apply_for_permit(&task.id, &airspace.id, "op-1", t(0), t(30), "")
            .await
            .unwrap();
        let approved = controller
            .apply_for_permit(&task.id, &airspace.id, "op-2", t(40), t(60), "")
            .await
            .unwrap();
        controller
            .approve(&approved.id, "admin", None)
            .await
            .unwrap();

        // At the pending permit's end instant, nothing is strictly past yet.
        let expired = controller.expire_overdue(t(30)).await.unwrap();
        assert!(expired.is_empty());

        let expired = controller.expire_overdue(t(45)).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, pending.id);
        assert_eq!(expired[0].status, PermitStatus::Expired);
        assert!(expired[0].approval_time.is_none());

        let expired = controller.expire_overdue(t(90)).await.unwrap();
        assert_eq!(expired.len(), 1);
        assert_eq!(expired[0].id, approved.id);
        assert_eq!(expired[0].status, PermitStatus::Expired);
        assert!(expired[0].approval_time.is_some());

        let refreshed = store.airspace(&airspace.id).await.unwrap().unwrap();
        assert_eq!(refreshed.current_flights, 0);

        assert!(controller.expire_overdue(t(90)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn create_airspace_validates_definition() {
        let (_, controller) = harness();

        let err = controller
            .create_airspace("bad", None, 0.0, 120.0, 0)
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::InvalidAirspace(_)), "got {err}");

        let err = controller
            .create_airspace("bad", None, 120.0, 120.0, 2)
            .await
            .unwrap_err();
        assert!(matches!(err, ControlError::InvalidAirspace(_)), "got {err}");
    }
}
