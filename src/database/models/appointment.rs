use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Appointment {
    pub id: Uuid,
    pub elder_id: Uuid,
    pub name: String,
    pub details: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Appointment enriched with the calling caregiver's own response and the
/// team-wide accept/decline tallies. `my_response` is NULL while pending.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AppointmentWithResponse {
    pub id: Uuid,
    pub elder_id: Uuid,
    pub name: String,
    pub details: Option<String>,
    pub location: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub my_response: Option<String>,
    pub accepted_count: i64,
    pub declined_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
