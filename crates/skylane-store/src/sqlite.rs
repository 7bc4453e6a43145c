//! SQLite-backed store implementation.
//!
//! Entities are stored with RFC 3339 text timestamps and lowercase status
//! strings; the conflict resolution action is a JSON payload in a TEXT
//! column. Decoding failures surface as `StoreError::Corrupt` rather than
//! falling back to default variants.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use skylane_core::models::{
    Airspace, AirspaceStatus, Device, DeviceStatus, FlightConflict, FlightPermit, FlightTask,
    PermitStatus, ResolutionAction, ResolutionStatus,
};

use crate::db;
use crate::ports::{Store, StoreError};

/// Store implementation over a SQLite connection pool.
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open the database at `db_path` (creating it if needed), apply the
    /// schema, and wrap the pool.
    pub async fn connect(db_path: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = db::open_pool(db_path, max_connections).await?;
        Ok(Self { pool })
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

fn parse_ts(id: &str, raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::corrupt(id, format!("bad timestamp {raw:?}: {e}")))
}

fn parse_opt_ts(id: &str, raw: Option<&str>) -> Result<Option<DateTime<Utc>>, StoreError> {
    raw.map(|r| parse_ts(id, r)).transpose()
}

// Internal row types for SQLx

#[derive(sqlx::FromRow)]
struct AirspaceRow {
    id: String,
    name: String,
    description: Option<String>,
    min_altitude_m: f64,
    max_altitude_m: f64,
    capacity: i64,
    current_flights: i64,
    status: String,
    restriction_reason: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<AirspaceRow> for Airspace {
    type Error = StoreError;

    fn try_from(row: AirspaceRow) -> Result<Self, StoreError> {
        let status = row
            .status
            .parse::<AirspaceStatus>()
            .map_err(|e| StoreError::corrupt(&row.id, e))?;
        let created_at = parse_ts(&row.id, &row.created_at)?;
        let updated_at = parse_ts(&row.id, &row.updated_at)?;
        Ok(Airspace {
            id: row.id,
            name: row.name,
            description: row.description,
            min_altitude_m: row.min_altitude_m,
            max_altitude_m: row.max_altitude_m,
            capacity: row.capacity.max(0) as u32,
            current_flights: row.current_flights.max(0) as u32,
            status,
            restriction_reason: row.restriction_reason,
            created_at,
            updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TaskRow {
    id: String,
    name: String,
    description: Option<String>,
    status: String,
    created_at: String,
}

impl TryFrom<TaskRow> for FlightTask {
    type Error = StoreError;

    fn try_from(row: TaskRow) -> Result<Self, StoreError> {
        let status = row
            .status
            .parse()
            .map_err(|e| StoreError::corrupt(&row.id, e))?;
        let created_at = parse_ts(&row.id, &row.created_at)?;
        Ok(FlightTask {
            id: row.id,
            name: row.name,
            description: row.description,
            status,
            created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct PermitRow {
    id: String,
    flight_task_id: String,
    airspace_id: String,
    applicant_id: String,
    approver_id: Option<String>,
    status: String,
    start_time: String,
    end_time: String,
    application_time: String,
    approval_time: Option<String>,
    remarks: String,
}

impl TryFrom<PermitRow> for FlightPermit {
    type Error = StoreError;

    fn try_from(row: PermitRow) -> Result<Self, StoreError> {
        let status = row
            .status
            .parse::<PermitStatus>()
            .map_err(|e| StoreError::corrupt(&row.id, e))?;
        let start_time = parse_ts(&row.id, &row.start_time)?;
        let end_time = parse_ts(&row.id, &row.end_time)?;
        let application_time = parse_ts(&row.id, &row.application_time)?;
        let approval_time = parse_opt_ts(&row.id, row.approval_time.as_deref())?;
        Ok(FlightPermit {
            id: row.id,
            flight_task_id: row.flight_task_id,
            airspace_id: row.airspace_id,
            applicant_id: row.applicant_id,
            approver_id: row.approver_id,
            status,
            start_time,
            end_time,
            application_time,
            approval_time,
            remarks: row.remarks,
        })
    }
}

#[derive(sqlx::FromRow)]
struct DeviceRow {
    id: String,
    name: String,
    status: String,
    lat: f64,
    lon: f64,
    altitude_m: f64,
    last_update: String,
}

impl TryFrom<DeviceRow> for Device {
    type Error = StoreError;

    fn try_from(row: DeviceRow) -> Result<Self, StoreError> {
        let status = row
            .status
            .parse::<DeviceStatus>()
            .map_err(|e| StoreError::corrupt(&row.id, e))?;
        let last_update = parse_ts(&row.id, &row.last_update)?;
        Ok(Device {
            id: row.id,
            name: row.name,
            status,
            lat: row.lat,
            lon: row.lon,
            altitude_m: row.altitude_m,
            last_update,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ConflictRow {
    id: String,
    device1_id: String,
    device2_id: String,
    detected_at: String,
    distance_m: f64,
    severity: String,
    resolution_status: String,
    resolution_action: Option<String>,
    resolved_at: Option<String>,
    created_at: String,
}

impl TryFrom<ConflictRow> for FlightConflict {
    type Error = StoreError;

    fn try_from(row: ConflictRow) -> Result<Self, StoreError> {
        let severity = row
            .severity
            .parse()
            .map_err(|e| StoreError::corrupt(&row.id, e))?;
        let resolution_status = row
            .resolution_status
            .parse()
            .map_err(|e| StoreError::corrupt(&row.id, e))?;
        let resolution_action = match row.resolution_action {
            Some(raw) => Some(
                serde_json::from_str::<ResolutionAction>(&raw)
                    .map_err(|e| StoreError::corrupt(&row.id, format!("bad action payload: {e}")))?,
            ),
            None => None,
        };
        let detected_at = parse_ts(&row.id, &row.detected_at)?;
        let resolved_at = parse_opt_ts(&row.id, row.resolved_at.as_deref())?;
        let created_at = parse_ts(&row.id, &row.created_at)?;
        Ok(FlightConflict {
            id: row.id,
            device1_id: row.device1_id,
            device2_id: row.device2_id,
            detected_at,
            distance_m: row.distance_m,
            severity,
            resolution_status,
            resolution_action,
            resolved_at,
            created_at,
        })
    }
}

const PERMIT_COLUMNS: &str = "id, flight_task_id, airspace_id, applicant_id, approver_id, \
                              status, start_time, end_time, application_time, approval_time, remarks";
const CONFLICT_COLUMNS: &str = "id, device1_id, device2_id, detected_at, distance_m, severity, \
                                resolution_status, resolution_action, resolved_at, created_at";

#[async_trait]
impl Store for SqliteStore {
    async fn create_airspace(&self, airspace: &Airspace) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO airspaces (id, name, description, min_altitude_m, max_altitude_m, \
             capacity, current_flights, status, restriction_reason, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&airspace.id)
        .bind(&airspace.name)
        .bind(&airspace.description)
        .bind(airspace.min_altitude_m)
        .bind(airspace.max_altitude_m)
        .bind(airspace.capacity as i64)
        .bind(airspace.current_flights as i64)
        .bind(airspace.status.to_string())
        .bind(&airspace.restriction_reason)
        .bind(airspace.created_at.to_rfc3339())
        .bind(airspace.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn airspace(&self, id: &str) -> Result<Option<Airspace>, StoreError> {
        let row = sqlx::query_as::<_, AirspaceRow>(
            "SELECT id, name, description, min_altitude_m, max_altitude_m, capacity, \
             current_flights, status, restriction_reason, created_at, updated_at \
             FROM airspaces WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Airspace::try_from).transpose()
    }

    async fn list_airspaces(&self) -> Result<Vec<Airspace>, StoreError> {
        let rows = sqlx::query_as::<_, AirspaceRow>(
            "SELECT id, name, description, min_altitude_m, max_altitude_m, capacity, \
             current_flights, status, restriction_reason, created_at, updated_at \
             FROM airspaces ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Airspace::try_from).collect()
    }

    async fn update_airspace_status(
        &self,
        id: &str,
        status: AirspaceStatus,
        restriction_reason: Option<&str>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE airspaces SET status = ?1, restriction_reason = ?2, updated_at = ?3 \
             WHERE id = ?4",
        )
        .bind(status.to_string())
        .bind(restriction_reason)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_airspace_flight_count(
        &self,
        id: &str,
        current_flights: u32,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE airspaces SET current_flights = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(current_flights as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_flight_task(&self, task: &FlightTask) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO flight_tasks (id, name, description, status, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&task.id)
        .bind(&task.name)
        .bind(&task.description)
        .bind(task.status.to_string())
        .bind(task.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn flight_task(&self, id: &str) -> Result<Option<FlightTask>, StoreError> {
        let row = sqlx::query_as::<_, TaskRow>(
            "SELECT id, name, description, status, created_at FROM flight_tasks WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(FlightTask::try_from).transpose()
    }

    async fn list_flight_tasks(&self) -> Result<Vec<FlightTask>, StoreError> {
        let rows = sqlx::query_as::<_, TaskRow>(
            "SELECT id, name, description, status, created_at FROM flight_tasks ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(FlightTask::try_from).collect()
    }

    async fn create_permit(&self, permit: &FlightPermit) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO flight_permits (id, flight_task_id, airspace_id, applicant_id, \
             approver_id, status, start_time, end_time, application_time, approval_time, remarks) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(&permit.id)
        .bind(&permit.flight_task_id)
        .bind(&permit.airspace_id)
        .bind(&permit.applicant_id)
        .bind(&permit.approver_id)
        .bind(permit.status.to_string())
        .bind(permit.start_time.to_rfc3339())
        .bind(permit.end_time.to_rfc3339())
        .bind(permit.application_time.to_rfc3339())
        .bind(permit.approval_time.map(|t| t.to_rfc3339()))
        .bind(&permit.remarks)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn permit(&self, id: &str) -> Result<Option<FlightPermit>, StoreError> {
        let row = sqlx::query_as::<_, PermitRow>(&format!(
            "SELECT {PERMIT_COLUMNS} FROM flight_permits WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(FlightPermit::try_from).transpose()
    }

    async fn permits_for_airspace(
        &self,
        airspace_id: &str,
    ) -> Result<Vec<FlightPermit>, StoreError> {
        let rows = sqlx::query_as::<_, PermitRow>(&format!(
            "SELECT {PERMIT_COLUMNS} FROM flight_permits WHERE airspace_id = ?1 ORDER BY id"
        ))
        .bind(airspace_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(FlightPermit::try_from).collect()
    }

    async fn list_permits(&self) -> Result<Vec<FlightPermit>, StoreError> {
        let rows = sqlx::query_as::<_, PermitRow>(&format!(
            "SELECT {PERMIT_COLUMNS} FROM flight_permits ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(FlightPermit::try_from).collect()
    }

    async fn update_permit_status(
        &self,
        id: &str,
        status: PermitStatus,
        approver_id: Option<&str>,
        remarks: Option<&str>,
    ) -> Result<bool, StoreError> {
        // Approval/rejection is the decision point; expiry keeps the original
        // decision timestamp.
        let decided = matches!(status, PermitStatus::Approved | PermitStatus::Rejected);
        let result = if decided {
            sqlx::query(
                "UPDATE flight_permits SET status = ?1, \
                 approver_id = COALESCE(?2, approver_id), \
                 remarks = COALESCE(?3, remarks), approval_time = ?4 WHERE id = ?5",
            )
            .bind(status.to_string())
            .bind(approver_id)
            .bind(remarks)
            .bind(Utc::now().to_rfc3339())
            .bind(id)
            .execute(&self.pool)
            .await?
        } else {
            sqlx::query(
                "UPDATE flight_permits SET status = ?1, \
                 approver_id = COALESCE(?2, approver_id), \
                 remarks = COALESCE(?3, remarks) WHERE id = ?4",
            )
            .bind(status.to_string())
            .bind(approver_id)
            .bind(remarks)
            .bind(id)
            .execute(&self.pool)
            .await?
        };
        Ok(result.rows_affected() > 0)
    }

    async fn upsert_device(&self, device: &Device) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO devices (id, name, status, lat, lon, altitude_m, last_update) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
             ON CONFLICT(id) DO UPDATE SET \
             name = ?2, status = ?3, lat = ?4, lon = ?5, altitude_m = ?6, last_update = ?7",
        )
        .bind(&device.id)
        .bind(&device.name)
        .bind(device.status.to_string())
        .bind(device.lat)
        .bind(device.lon)
        .bind(device.altitude_m)
        .bind(device.last_update.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn device(&self, id: &str) -> Result<Option<Device>, StoreError> {
        let row = sqlx::query_as::<_, DeviceRow>(
            "SELECT id, name, status, lat, lon, altitude_m, last_update \
             FROM devices WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(Device::try_from).transpose()
    }

    async fn list_devices(&self) -> Result<Vec<Device>, StoreError> {
        let rows = sqlx::query_as::<_, DeviceRow>(
            "SELECT id, name, status, lat, lon, altitude_m, last_update \
             FROM devices ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Device::try_from).collect()
    }

    async fn list_online_devices(&self) -> Result<Vec<Device>, StoreError> {
        let rows = sqlx::query_as::<_, DeviceRow>(
            "SELECT id, name, status, lat, lon, altitude_m, last_update \
             FROM devices WHERE status = 'online' ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Device::try_from).collect()
    }

    async fn update_device_status(
        &self,
        id: &str,
        status: DeviceStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE devices SET status = ?1 WHERE id = ?2")
            .bind(status.to_string())
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn create_conflict(&self, conflict: &FlightConflict) -> Result<(), StoreError> {
        let action_json = match &conflict.resolution_action {
            Some(action) => {
                Some(serde_json::to_string(action).map_err(|e| StoreError::Backend(e.to_string()))?)
            }
            None => None,
        };
        sqlx::query(
            "INSERT INTO flight_conflicts (id, device1_id, device2_id, detected_at, distance_m, \
             severity, resolution_status, resolution_action, resolved_at, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        )
        .bind(&conflict.id)
        .bind(&conflict.device1_id)
        .bind(&conflict.device2_id)
        .bind(conflict.detected_at.to_rfc3339())
        .bind(conflict.distance_m)
        .bind(conflict.severity.to_string())
        .bind(conflict.resolution_status.to_string())
        .bind(action_json)
        .bind(conflict.resolved_at.map(|t| t.to_rfc3339()))
        .bind(conflict.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn conflict(&self, id: &str) -> Result<Option<FlightConflict>, StoreError> {
        let row = sqlx::query_as::<_, ConflictRow>(&format!(
            "SELECT {CONFLICT_COLUMNS} FROM flight_conflicts WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(FlightConflict::try_from).transpose()
    }

    async fn list_conflicts(&self) -> Result<Vec<FlightConflict>, StoreError> {
        let rows = sqlx::query_as::<_, ConflictRow>(&format!(
            "SELECT {CONFLICT_COLUMNS} FROM flight_conflicts ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(FlightConflict::try_from).collect()
    }

    async fn unresolved_conflicts(&self) -> Result<Vec<FlightConflict>, StoreError> {
        let rows = sqlx::query_as::<_, ConflictRow>(&format!(
            "SELECT {CONFLICT_COLUMNS} FROM flight_conflicts \
             WHERE resolution_status = 'pending' ORDER BY id"
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(FlightConflict::try_from).collect()
    }

    async fn update_conflict_resolution(
        &self,
        id: &str,
        status: ResolutionStatus,
        action: Option<&ResolutionAction>,
    ) -> Result<bool, StoreError> {
        let action_json = match action {
            Some(action) => {
                Some(serde_json::to_string(action).map_err(|e| StoreError::Backend(e.to_string()))?)
            }
            None => None,
        };
        let result = sqlx::query(
            "UPDATE flight_conflicts SET resolution_status = ?1, resolution_action = ?2, \
             resolved_at = ?3 WHERE id = ?4",
        )
        .bind(status.to_string())
        .bind(action_json)
        .bind(Utc::now().to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
