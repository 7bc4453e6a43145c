//! Pairwise proximity scanning over online devices.
//!
//! A conflict exists when two online devices are closer than the safe
//! distance on the ground track. Altitude is not part of the separation
//! check.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;

use skylane_core::ids::IdGenerator;
use skylane_core::models::{
    ActionKind, ConflictSeverity, Device, DeviceStatus, FlightConflict, ResolutionAction,
    ResolutionStatus,
};
use skylane_core::spatial::haversine_distance;
use skylane_store::Store;

use crate::error::{ControlError, Result};

/// Grade a separation distance against the safe distance.
///
/// Distances at or beyond the safe distance never come out of a scan; they
/// grade `Low` so the classifier is total.
pub fn classify_severity(distance_m: f64, safe_distance_m: f64) -> ConflictSeverity {
    if distance_m < safe_distance_m / 3.0 {
        ConflictSeverity::Critical
    } else if distance_m < 2.0 * safe_distance_m / 3.0 {
        ConflictSeverity::High
    } else if distance_m < safe_distance_m {
        ConflictSeverity::Medium
    } else {
        ConflictSeverity::Low
    }
}

/// Suggested handling for a conflict of the given severity.
pub fn suggest_action(severity: ConflictSeverity) -> ResolutionAction {
    match severity {
        ConflictSeverity::Critical => ResolutionAction {
            action_type: ActionKind::ImmediateSeparation,
            directives: vec![
                "hold_position_10s".to_string(),
                "adjust_altitude_10m".to_string(),
            ],
        },
        ConflictSeverity::High => ResolutionAction {
            action_type: ActionKind::RouteAdjustment,
            directives: vec![
                "reduce_speed_20pct".to_string(),
                "change_heading_30deg".to_string(),
            ],
        },
        ConflictSeverity::Medium => ResolutionAction {
            action_type: ActionKind::Monitoring,
            directives: vec![
                "continue_monitoring".to_string(),
                "maintain_course".to_string(),
            ],
        },
        ConflictSeverity::Low => ResolutionAction {
            action_type: ActionKind::Informational,
            directives: vec!["notify_pilots".to_string(), "log_conflict".to_string()],
        },
    }
}

/// Operator verdict on a conflict record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    Resolved,
    Ignored,
}

impl From<ResolutionOutcome> for ResolutionStatus {
    fn from(outcome: ResolutionOutcome) -> Self {
        match outcome {
            ResolutionOutcome::Resolved => ResolutionStatus::Resolved,
            ResolutionOutcome::Ignored => ResolutionStatus::Ignored,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub safe_distance_m: f64,
    /// Skip pairs that already have an unresolved conflict on record.
    pub dedupe_open_pairs: bool,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            safe_distance_m: 50.0,
            dedupe_open_pairs: true,
        }
    }
}

/// Proximity conflict detection service over a shared store.
pub struct ConflictScanner<S> {
    store: Arc<S>,
    config: ScannerConfig,
    ids: IdGenerator,
}

impl<S: Store> ConflictScanner<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_config(store, ScannerConfig::default())
    }

    pub fn with_config(store: Arc<S>, config: ScannerConfig) -> Self {
        Self {
            store,
            config,
            ids: IdGenerator::new(),
        }
    }

    pub fn safe_distance_m(&self) -> f64 {
        self.config.safe_distance_m
    }

    async fn open_pairs(&self) -> Result<HashSet<(String, String)>> {
        if !self.config.dedupe_open_pairs {
            return Ok(HashSet::new());
        }
        let open = self.store.unresolved_conflicts().await?;
        Ok(open
            .into_iter()
            .map(|c| (c.device1_id, c.device2_id))
            .collect())
    }

    async fn check_pair(
        &self,
        a: &Device,
        b: &Device,
        open_pairs: &HashSet<(String, String)>,
    ) -> Result<Option<FlightConflict>> {
        let distance_m = haversine_distance(a.lat, a.lon, b.lat, b.lon);
        // A NaN separation from bad position data is not a conflict.
        if distance_m.is_nan() || distance_m >= self.config.safe_distance_m {
            return Ok(None);
        }
        // Order the pair by id so the same two devices always record the
        // same key regardless of scan order.
        let (first, second) = if a.id <= b.id { (a, b) } else { (b, a) };
        if open_pairs.contains(&(first.id.clone(), second.id.clone())) {
            return Ok(None);
        }

        let now = Utc::now();
        let severity = classify_severity(distance_m, self.config.safe_distance_m);
        let conflict = FlightConflict {
            id: self.ids.conflict_id(),
            device1_id: first.id.clone(),
            device2_id: second.id.clone(),
            detected_at: now,
            distance_m,
            severity,
            resolution_status: ResolutionStatus::Pending,
            resolution_action: None,
            resolved_at: None,
            created_at: now,
        };
        self.store.create_conflict(&conflict).await?;
        tracing::warn!(
            "[{}] Conflict between {} and {}: {:.1}m separation",
            severity,
            conflict.device1_id,
            conflict.device2_id,
            distance_m
        );
        Ok(Some(conflict))
    }

    /// Sweep every online device pair and record new conflicts.
    pub async fn scan_all(&self) -> Result<Vec<FlightConflict>> {
        let devices = self.store.list_online_devices().await?;
        let open_pairs = self.open_pairs().await?;
        let mut found = Vec::new();
        for i in 0..devices.len() {
            for j in (i + 1)..devices.len() {
                if let Some(conflict) =
                    self.check_pair(&devices[i], &devices[j], &open_pairs).await?
                {
                    found.push(conflict);
                }
            }
        }
        Ok(found)
    }

    /// Check one device against the rest of the online fleet.
    ///
    /// Unknown devices are an error; a known device that is not online
    /// scans clean.
    pub async fn scan_for_device(&self, device_id: &str) -> Result<Vec<FlightConflict>> {
        let Some(device) = self.store.device(device_id).await? else {
            return Err(ControlError::NotFound {
                kind: "device",
                id: device_id.to_string(),
            });
        };
        if device.status != DeviceStatus::Online {
            return Ok(Vec::new());
        }
        let others = self.store.list_online_devices().await?;
        let open_pairs = self.open_pairs().await?;
        let mut found = Vec::new();
        for other in others.iter().filter(|d| d.id != device.id) {
            if let Some(conflict) = self.check_pair(&device, other, &open_pairs).await? {
                found.push(conflict);
            }
        }
        Ok(found)
    }

    /// Record the operator's verdict on a conflict.
    pub async fn resolve(
        &self,
        conflict_id: &str,
        outcome: ResolutionOutcome,
        action: Option<ResolutionAction>,
    ) -> Result<FlightConflict> {
        let conflict = self.conflict_or_not_found(conflict_id).await?;
        if conflict.resolution_status != ResolutionStatus::Pending {
            return Err(ControlError::AlreadyResolved {
                id: conflict.id,
                status: conflict.resolution_status,
            });
        }
        self.store
            .update_conflict_resolution(conflict_id, outcome.into(), action.as_ref())
            .await?;
        tracing::info!(
            "Conflict {} marked {}",
            conflict_id,
            ResolutionStatus::from(outcome)
        );
        self.conflict_or_not_found(conflict_id).await
    }

    async fn conflict_or_not_found(&self, id: &str) -> Result<FlightConflict> {
        self.store
            .conflict(id)
            .await?
            .ok_or_else(|| ControlError::NotFound {
                kind: "conflict",
                id: id.to_string(),
            })
    }
}
