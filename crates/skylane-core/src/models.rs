//! Core data models for the skylane airspace system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Returned when a status string does not name any known variant.
///
/// Stored records carry statuses as text; an unknown value means the record
/// is corrupt, never a silent fallback to a default variant.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown {kind} value: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

// ========== AIRSPACE ==========

/// A capacity-bounded volume that flights must be admitted into.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Airspace {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    /// Floor of the altitude band in meters
    pub min_altitude_m: f64,
    /// Ceiling of the altitude band in meters
    pub max_altitude_m: f64,
    /// Maximum simultaneous approved occupants
    pub capacity: u32,
    /// Advisory gauge of currently approved permits; admission decisions
    /// recompute from permit records instead of trusting this value
    pub current_flights: u32,
    pub status: AirspaceStatus,
    /// Present only while the airspace is Restricted
    pub restriction_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AirspaceStatus {
    /// Admitting new permits
    Active,
    /// Temporarily refusing new permits
    Restricted,
    /// Permanently refusing new permits
    Closed,
}

impl fmt::Display for AirspaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AirspaceStatus::Active => "active",
            AirspaceStatus::Restricted => "restricted",
            AirspaceStatus::Closed => "closed",
        };
        f.write_str(s)
    }
}

impl FromStr for AirspaceStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(AirspaceStatus::Active),
            "restricted" => Ok(AirspaceStatus::Restricted),
            "closed" => Ok(AirspaceStatus::Closed),
            other => Err(ParseEnumError::new("airspace status", other)),
        }
    }
}

// ========== FLIGHT TASKS ==========

/// A planned flight operation that permits are applied against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightTask {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Approved,
    /// Currently flying
    InProgress,
    Completed,
    Cancelled,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Approved => "approved",
            TaskStatus::InProgress => "inprogress",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

impl FromStr for TaskStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "approved" => Ok(TaskStatus::Approved),
            "inprogress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(ParseEnumError::new("task status", other)),
        }
    }
}

// ========== FLIGHT PERMITS ==========

/// A time-windowed admission request/grant against one airspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightPermit {
    pub id: String,
    pub flight_task_id: String,
    pub airspace_id: String,
    pub applicant_id: String,
    pub approver_id: Option<String>,
    pub status: PermitStatus,
    /// Requested window start (inclusive)
    pub start_time: DateTime<Utc>,
    /// Requested window end
    pub end_time: DateTime<Utc>,
    pub application_time: DateTime<Utc>,
    /// Stamped when the permit is approved or rejected
    pub approval_time: Option<DateTime<Utc>>,
    pub remarks: String,
}

impl FlightPermit {
    /// Window overlap test used for occupancy counting.
    ///
    /// Strict `<` on both sides, so windows that merely touch at an endpoint
    /// still count as overlapping.
    pub fn window_overlaps(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        !(self.end_time < start || end < self.start_time)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermitStatus {
    /// Awaiting a decision
    Pending,
    /// Counted toward airspace occupancy
    Approved,
    /// Refused, or cancelled (remarks carry "Cancelled")
    Rejected,
    /// Window fully passed before completion; set by the expiry sweep
    Expired,
}

impl fmt::Display for PermitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PermitStatus::Pending => "pending",
            PermitStatus::Approved => "approved",
            PermitStatus::Rejected => "rejected",
            PermitStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

impl FromStr for PermitStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PermitStatus::Pending),
            "approved" => Ok(PermitStatus::Approved),
            "rejected" => Ok(PermitStatus::Rejected),
            "expired" => Ok(PermitStatus::Expired),
            other => Err(ParseEnumError::new("permit status", other)),
        }
    }
}

// ========== DEVICES ==========

/// Last-known position and liveness of a tracked device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    pub id: String,
    pub name: String,
    pub status: DeviceStatus,
    pub lat: f64,
    pub lon: f64,
    pub altitude_m: f64,
    pub last_update: DateTime<Utc>,
}

impl Device {
    /// Create an online device at a position, stamped now.
    pub fn new(id: impl Into<String>, name: impl Into<String>, lat: f64, lon: f64, altitude_m: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: DeviceStatus::Online,
            lat,
            lon,
            altitude_m,
            last_update: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: DeviceStatus) -> Self {
        self.status = status;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    /// Reporting positions; participates in proximity scans
    Online,
    /// Not reporting; excluded from scans
    Offline,
    Maintenance,
    Retired,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceStatus::Online => "online",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Maintenance => "maintenance",
            DeviceStatus::Retired => "retired",
        };
        f.write_str(s)
    }
}

impl FromStr for DeviceStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "online" => Ok(DeviceStatus::Online),
            "offline" => Ok(DeviceStatus::Offline),
            "maintenance" => Ok(DeviceStatus::Maintenance),
            "retired" => Ok(DeviceStatus::Retired),
            other => Err(ParseEnumError::new("device status", other)),
        }
    }
}

// ========== FLIGHT CONFLICTS ==========

/// A detected unsafe-proximity event between two devices.
///
/// The device pair is stored in lexicographic order so the same pair always
/// produces the same row shape regardless of scan order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightConflict {
    pub id: String,
    pub device1_id: String,
    pub device2_id: String,
    pub detected_at: DateTime<Utc>,
    /// Separation at detection time, meters
    pub distance_m: f64,
    /// Pure function of distance at detection time; never recomputed
    pub severity: ConflictSeverity,
    pub resolution_status: ResolutionStatus,
    pub resolution_action: Option<ResolutionAction>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    /// Only reachable from non-distance assessments; the distance classifier
    /// never stores it because scans gate on the safe distance first
    Low,
    Medium,
    High,
    /// Immediate separation violation
    Critical,
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConflictSeverity::Low => "low",
            ConflictSeverity::Medium => "medium",
            ConflictSeverity::High => "high",
            ConflictSeverity::Critical => "critical",
        };
        f.write_str(s)
    }
}

impl FromStr for ConflictSeverity {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(ConflictSeverity::Low),
            "medium" => Ok(ConflictSeverity::Medium),
            "high" => Ok(ConflictSeverity::High),
            "critical" => Ok(ConflictSeverity::Critical),
            other => Err(ParseEnumError::new("conflict severity", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStatus {
    /// Open, awaiting an operator or automated disposition
    Pending,
    Resolved,
    /// Closed without action
    Ignored,
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionStatus::Pending => "pending",
            ResolutionStatus::Resolved => "resolved",
            ResolutionStatus::Ignored => "ignored",
        };
        f.write_str(s)
    }
}

impl FromStr for ResolutionStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ResolutionStatus::Pending),
            "resolved" => Ok(ResolutionStatus::Resolved),
            "ignored" => Ok(ResolutionStatus::Ignored),
            other => Err(ParseEnumError::new("resolution status", other)),
        }
    }
}

/// A canned set of directives attached to a conflict when it is closed out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionAction {
    pub action_type: ActionKind,
    /// Ordered directive strings, most urgent first
    pub directives: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    ImmediateSeparation,
    RouteAdjustment,
    Monitoring,
    Informational,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ActionKind::ImmediateSeparation => "immediate_separation",
            ActionKind::RouteAdjustment => "route_adjustment",
            ActionKind::Monitoring => "monitoring",
            ActionKind::Informational => "informational",
        };
        f.write_str(s)
    }
}

impl FromStr for ActionKind {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate_separation" => Ok(ActionKind::ImmediateSeparation),
            "route_adjustment" => Ok(ActionKind::RouteAdjustment),
            "monitoring" => Ok(ActionKind::Monitoring),
            "informational" => Ok(ActionKind::Informational),
            other => Err(ParseEnumError::new("action kind", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 8, minute, 0).unwrap()
    }

    fn permit(start_min: u32, end_min: u32) -> FlightPermit {
        FlightPermit {
            id: "FP0000000001".to_string(),
            flight_task_id: "FT0000000001".to_string(),
            airspace_id: "AS000001".to_string(),
            applicant_id: "op-1".to_string(),
            approver_id: None,
            status: PermitStatus::Pending,
            start_time: t(start_min),
            end_time: t(end_min),
            application_time: t(0),
            approval_time: None,
            remarks: String::new(),
        }
    }

    #[test]
    fn window_overlap_basic() {
        let p = permit(10, 20);
        assert!(p.window_overlaps(t(15), t(25)));
        assert!(p.window_overlaps(t(5), t(12)));
        assert!(p.window_overlaps(t(12), t(18)));
        assert!(!p.window_overlaps(t(21), t(30)));
        assert!(!p.window_overlaps(t(0), t(9)));
    }

    #[test]
    fn window_overlap_touching_endpoints_count() {
        // The strict-< predicate treats touching windows as overlapping.
        let p = permit(10, 20);
        assert!(p.window_overlaps(t(20), t(30)));
        assert!(p.window_overlaps(t(0), t(10)));
    }

    #[test]
    fn status_round_trips() {
        for status in [
            PermitStatus::Pending,
            PermitStatus::Approved,
            PermitStatus::Rejected,
            PermitStatus::Expired,
        ] {
            assert_eq!(status.to_string().parse::<PermitStatus>().unwrap(), status);
        }
        for status in [
            AirspaceStatus::Active,
            AirspaceStatus::Restricted,
            AirspaceStatus::Closed,
        ] {
            assert_eq!(status.to_string().parse::<AirspaceStatus>().unwrap(), status);
        }
        for severity in [
            ConflictSeverity::Low,
            ConflictSeverity::Medium,
            ConflictSeverity::High,
            ConflictSeverity::Critical,
        ] {
            assert_eq!(
                severity.to_string().parse::<ConflictSeverity>().unwrap(),
                severity
            );
        }
    }

    #[test]
    fn unknown_status_is_an_error() {
        let err = "bogus".parse::<PermitStatus>().unwrap_err();
        assert_eq!(err.kind, "permit status");
        assert!("".parse::<DeviceStatus>().is_err());
        assert!("CRITICAL".parse::<ConflictSeverity>().is_err());
    }

    #[test]
    fn display_matches_serde_representation() {
        let json = serde_json::to_string(&PermitStatus::Approved).unwrap();
        assert_eq!(json, format!("\"{}\"", PermitStatus::Approved));
        let json = serde_json::to_string(&ActionKind::ImmediateSeparation).unwrap();
        assert_eq!(json, format!("\"{}\"", ActionKind::ImmediateSeparation));
    }
}
