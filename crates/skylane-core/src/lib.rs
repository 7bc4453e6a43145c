pub mod ids;
pub mod models;
pub mod spatial;

pub use ids::IdGenerator;
pub use models::{
    ActionKind, Airspace, AirspaceStatus, ConflictSeverity, Device, DeviceStatus, FlightConflict,
    FlightPermit, FlightTask, ParseEnumError, PermitStatus, ResolutionAction, ResolutionStatus,
    TaskStatus,
};
pub use spatial::haversine_distance;
