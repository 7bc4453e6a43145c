//! Control services: permit admission over airspace capacity and pairwise
//! conflict detection for the live fleet.

pub mod admission;
pub mod error;
pub mod scanner;

pub use admission::AdmissionController;
pub use error::{ControlError, Result};
pub use scanner::{
    classify_severity, suggest_action, ConflictScanner, ResolutionOutcome, ScannerConfig,
};
