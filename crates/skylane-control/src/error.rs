//! Error surface of the control services.

use chrono::{DateTime, Utc};
use thiserror::Error;

use skylane_core::models::{AirspaceStatus, PermitStatus, ResolutionStatus};
use skylane_store::StoreError;

pub type Result<T> = std::result::Result<T, ControlError>;

/// Failures reported by admission control and conflict detection.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Requested window has end at or before start.
    #[error("invalid time window: start {start} must be before end {end}")]
    InvalidWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    /// Approving this permit would exceed the airspace capacity.
    #[error("airspace {id} is at capacity ({capacity} concurrent flights)")]
    CapacityExceeded { id: String, capacity: u32 },

    /// Airspace is restricted or closed and accepts no new flights.
    #[error("airspace {id} is {status} and not accepting flights")]
    AirspaceUnavailable { id: String, status: AirspaceStatus },

    /// Permit has already left the pending state.
    #[error("permit {id} was already decided: {status}")]
    AlreadyDecided { id: String, status: PermitStatus },

    /// Permit application references a flight task that does not exist.
    #[error("unknown flight task: {0}")]
    UnknownFlightTask(String),

    /// Conflict record has already been resolved or ignored.
    #[error("conflict {id} was already {status}")]
    AlreadyResolved { id: String, status: ResolutionStatus },

    /// Airspace definition fails validation.
    #[error("invalid airspace definition: {0}")]
    InvalidAirspace(String),

    /// Underlying store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
