//! Appointment scheduling and attendance.
//!
//! Reads return [`AppointmentWithResponse`]: the row plus the viewing
//! caregiver's own response and team-wide accept/decline tallies. A caregiver
//! with no response row is pending.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::{Appointment, AppointmentWithResponse};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::schema::{CreateAppointmentRequest, UpdateAppointmentRequest};

pub const STATUS_ACCEPTED: &str = "accepted";
pub const STATUS_DECLINED: &str = "declined";

// $1 is always the viewing caregiver.
const WITH_RESPONSE_SELECT: &str = "
    SELECT a.id, a.elder_id, a.name, a.details, a.location, a.starts_at, a.ends_at,
           a.created_by, a.created_at, a.updated_at,
           r.status AS my_response,
           (SELECT COUNT(*) FROM appointment_responses t
             WHERE t.appointment_id = a.id AND t.status = 'accepted') AS accepted_count,
           (SELECT COUNT(*) FROM appointment_responses t
             WHERE t.appointment_id = a.id AND t.status = 'declined') AS declined_count
      FROM appointments a
      LEFT JOIN appointment_responses r
        ON r.appointment_id = a.id AND r.caregiver_id = $1";

pub struct ScheduleService {
    pool: PgPool,
}

impl ScheduleService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    pub async fn create(
        &self,
        elder_id: Uuid,
        created_by: Uuid,
        request: &CreateAppointmentRequest,
    ) -> Result<Appointment, ApiError> {
        let appointment = sqlx::query_as(
            "INSERT INTO appointments (elder_id, name, details, location, starts_at, ends_at, created_by)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(elder_id)
        .bind(&request.name)
        .bind(&request.details)
        .bind(&request.location)
        .bind(request.starts_at)
        .bind(request.ends_at)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;
        Ok(appointment)
    }

    /// Bare row fetch, used to resolve the owning elder before the membership
    /// guard runs.
    pub async fn get(&self, appointment_id: Uuid) -> Result<Appointment, ApiError> {
        let appointment: Option<Appointment> =
            sqlx::query_as("SELECT * FROM appointments WHERE id = $1")
                .bind(appointment_id)
                .fetch_optional(&self.pool)
                .await?;
        appointment.ok_or_else(|| ApiError::not_found("Appointment not found"))
    }

    pub async fn get_with_response(
        &self,
        viewer: Uuid,
        appointment_id: Uuid,
    ) -> Result<AppointmentWithResponse, ApiError> {
        let sql = format!("{WITH_RESPONSE_SELECT} WHERE a.id = $2");
        let appointment: Option<AppointmentWithResponse> = sqlx::query_as(&sql)
            .bind(viewer)
            .bind(appointment_id)
            .fetch_optional(&self.pool)
            .await?;
        appointment.ok_or_else(|| ApiError::not_found("Appointment not found"))
    }

    /// Appointments of one elder, optionally bounded by start time, ascending.
    pub async fn for_elder(
        &self,
        viewer: Uuid,
        elder_id: Uuid,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<AppointmentWithResponse>, ApiError> {
        let sql = format!(
            "{WITH_RESPONSE_SELECT}
             WHERE a.elder_id = $2
               AND ($3::timestamptz IS NULL OR a.starts_at >= $3)
               AND ($4::timestamptz IS NULL OR a.starts_at <= $4)
             ORDER BY a.starts_at ASC"
        );
        let appointments = sqlx::query_as(&sql)
            .bind(viewer)
            .bind(elder_id)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;
        Ok(appointments)
    }

    /// The next appointments across every care team the caregiver belongs to.
    /// Strictly future, soonest first, capped at ten rows.
    pub async fn upcoming_for_caregiver(
        &self,
        caregiver_id: Uuid,
    ) -> Result<Vec<AppointmentWithResponse>, ApiError> {
        let sql = format!(
            "{WITH_RESPONSE_SELECT}
             JOIN caregiver_elder ce ON ce.elder_id = a.elder_id AND ce.caregiver_id = $1
             WHERE a.starts_at > now()
             ORDER BY a.starts_at ASC
             LIMIT 10"
        );
        let appointments = sqlx::query_as(&sql)
            .bind(caregiver_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(appointments)
    }

    /// Partial update. When only one end of the window moves, the new bound is
    /// checked against the stored one so the span stays positive.
    pub async fn update(
        &self,
        appointment_id: Uuid,
        request: &UpdateAppointmentRequest,
    ) -> Result<Appointment, ApiError> {
        let current = self.get(appointment_id).await?;
        let starts_at = request.starts_at.unwrap_or(current.starts_at);
        let ends_at = request.ends_at.unwrap_or(current.ends_at);

        if ends_at <= starts_at {
            let mut errors = HashMap::new();
            errors.insert("ends_at".to_string(), "Must be after starts_at".to_string());
            return Err(ApiError::validation_error("Validation failed", Some(errors)));
        }

        let appointment = sqlx::query_as(
            "UPDATE appointments SET
                name = COALESCE($2, name),
                details = COALESCE($3, details),
                location = COALESCE($4, location),
                starts_at = $5,
                ends_at = $6,
                updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(appointment_id)
        .bind(&request.name)
        .bind(&request.details)
        .bind(&request.location)
        .bind(starts_at)
        .bind(ends_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(appointment)
    }

    pub async fn delete(&self, appointment_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(appointment_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Record or replace the caregiver's response. Re-posting overwrites the
    /// previous status, so flipping accept to decline is one call.
    pub async fn respond(
        &self,
        appointment_id: Uuid,
        caregiver_id: Uuid,
        status: &str,
    ) -> Result<AppointmentWithResponse, ApiError> {
        sqlx::query(
            "INSERT INTO appointment_responses (appointment_id, caregiver_id, status)
             VALUES ($1, $2, $3)
             ON CONFLICT (appointment_id, caregiver_id)
             DO UPDATE SET status = EXCLUDED.status, responded_at = now()",
        )
        .bind(appointment_id)
        .bind(caregiver_id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        self.get_with_response(caregiver_id, appointment_id).await
    }
}
