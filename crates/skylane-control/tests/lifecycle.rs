//! End-to-end exercise of permit admission and conflict detection.
//!
//! Runs the full story on the in-memory store, then checks that admission
//! state survives a close-and-reopen of the SQLite store.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};

use skylane_control::{
    suggest_action, AdmissionController, ConflictScanner, ControlError, ResolutionOutcome,
};
use skylane_core::models::{Device, PermitStatus, ResolutionStatus};
use skylane_store::{MemoryStore, SqliteStore, Store};

fn t(minutes: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, 9, 0, 0).unwrap() + Duration::minutes(minutes)
}

#[tokio::test]
async fn permit_and_conflict_lifecycle() {
    let store = Arc::new(MemoryStore::default());
    let controller = AdmissionController::new(store.clone());
    let scanner = ConflictScanner::new(store.clone());

    // One-slot corridor and a task to fly in it.
    let airspace = controller
        .create_airspace("river corridor", Some("low-altitude survey lane"), 0.0, 120.0, 1)
        .await
        .unwrap();
    let task = controller
        .create_flight_task("bridge inspection", None)
        .await
        .unwrap();

    let permit = controller
        .apply_for_permit(&task.id, &airspace.id, "op-1", t(0), t(60), "")
        .await
        .unwrap();
    let approved = controller.approve(&permit.id, "admin", None).await.unwrap();
    assert_eq!(approved.status, PermitStatus::Approved);

    // The slot is taken for any overlapping window.
    assert!(!controller
        .is_available(&airspace.id, t(30), t(90))
        .await
        .unwrap());
    let err = controller
        .apply_for_permit(&task.id, &airspace.id, "op-2", t(30), t(90), "")
        .await
        .unwrap_err();
    assert!(matches!(err, ControlError::CapacityExceeded { .. }), "got {err}");

    // Two drones working the corridor drift too close.
    store
        .upsert_device(&Device::new("SKY-001", "alpha", 39.9042, 116.4074, 50.0))
        .await
        .unwrap();
    store
        .upsert_device(&Device::new("SKY-002", "bravo", 39.9043, 116.4074, 50.0))
        .await
        .unwrap();
    let conflicts = scanner.scan_all().await.unwrap();
    assert_eq!(conflicts.len(), 1);

    // Close it out with the recommended action for its severity.
    let action = suggest_action(conflicts[0].severity);
    let resolved = scanner
        .resolve(&conflicts[0].id, ResolutionOutcome::Resolved, Some(action))
        .await
        .unwrap();
    assert_eq!(resolved.resolution_status, ResolutionStatus::Resolved);
    assert!(store.unresolved_conflicts().await.unwrap().is_empty());

    // Cancelling the approved flight frees the slot again.
    let cancelled = controller.cancel(&permit.id).await.unwrap();
    assert_eq!(cancelled.status, PermitStatus::Rejected);
    assert_eq!(cancelled.remarks, "Cancelled");
    assert!(controller
        .is_available(&airspace.id, t(30), t(90))
        .await
        .unwrap());

    let replacement = controller
        .apply_for_permit(&task.id, &airspace.id, "op-2", t(30), t(90), "")
        .await
        .unwrap();
    controller
        .approve(&replacement.id, "admin", None)
        .await
        .unwrap();
}

#[tokio::test]
async fn approved_state_survives_store_reopen() {
    let path = std::env::temp_dir().join(format!("skylane-lifecycle-{}.db", std::process::id()));
    let path_str = path.to_str().unwrap().to_string();
    let _ = std::fs::remove_file(&path);

    let airspace_id;
    let permit_id;
    {
        let store = Arc::new(SqliteStore::connect(&path_str, 1).await.unwrap());
        let controller = AdmissionController::new(store.clone());
        let airspace = controller
            .create_airspace("persistent volume", None, 0.0, 120.0, 2)
            .await
            .unwrap();
        let task = controller
            .create_flight_task("night survey", None)
            .await
            .unwrap();
        let permit = controller
            .apply_for_permit(&task.id, &airspace.id, "op-1", t(0), t(60), "")
            .await
            .unwrap();
        controller
            .approve(&permit.id, "admin", Some("cleared"))
            .await
            .unwrap();
        airspace_id = airspace.id;
        permit_id = permit.id;
        store.pool().close().await;
    }

    let store = Arc::new(SqliteStore::connect(&path_str, 1).await.unwrap());
    let controller = AdmissionController::new(store.clone());

    let permit = store.permit(&permit_id).await.unwrap().unwrap();
    assert_eq!(permit.status, PermitStatus::Approved);
    assert_eq!(permit.approver_id.as_deref(), Some("admin"));
    assert_eq!(permit.remarks, "cleared");
    assert!(permit.approval_time.is_some());

    assert_eq!(
        controller
            .count_overlapping_approved(&airspace_id, t(30), t(90))
            .await
            .unwrap(),
        1
    );
    let refreshed = store.airspace(&airspace_id).await.unwrap().unwrap();
    assert_eq!(refreshed.current_flights, 1);

    store.pool().close().await;
    let _ = std::fs::remove_file(&path);
}
