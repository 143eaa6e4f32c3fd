//! Appointment endpoints: scheduling, attendance, and calendar import.

use axum::{
    extract::{Path, Query},
    http::{header, HeaderMap},
    response::Json,
    Extension,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

use crate::database::models::{Appointment, AppointmentWithResponse};
use crate::error::ApiError;
use crate::handlers::parse_body;
use crate::middleware::{ApiResponse, ApiResult, AuthCaregiver};
use crate::schema::{CreateAppointmentRequest, ImportIcsRequest, UpdateAppointmentRequest};
use crate::services::ics_import::ImportSummary;
use crate::services::schedule::{STATUS_ACCEPTED, STATUS_DECLINED};
use crate::services::{CareTeamService, IcsImportService, ScheduleService};

/// Optional listing window. Kept as raw strings so a bad timestamp comes back
/// in the standard validation envelope instead of an extractor rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
}

impl RangeQuery {
    fn bound(
        errors: &mut HashMap<String, String>,
        field: &str,
        raw: Option<&str>,
    ) -> Option<DateTime<Utc>> {
        let raw = raw?.trim();
        if raw.is_empty() {
            return None;
        }
        match raw.parse::<DateTime<Utc>>() {
            Ok(ts) => Some(ts),
            Err(_) => {
                errors.insert(
                    field.to_string(),
                    "Must be an RFC 3339 timestamp".to_string(),
                );
                None
            }
        }
    }

    pub fn resolve(&self) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ApiError> {
        let mut errors = HashMap::new();
        let from = Self::bound(&mut errors, "from", self.from.as_deref());
        let to = Self::bound(&mut errors, "to", self.to.as_deref());
        if errors.is_empty() {
            Ok((from, to))
        } else {
            Err(ApiError::validation_error("Validation failed", Some(errors)))
        }
    }
}

/// POST /api/elders/:elder_id/appointments
pub async fn create(
    Extension(auth): Extension<AuthCaregiver>,
    Path(elder_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> ApiResult<Appointment> {
    let request = parse_body::<CreateAppointmentRequest>(payload)?.sanitized();
    request.validate()?;

    CareTeamService::new()
        .await?
        .require_member(auth.caregiver_id, elder_id)
        .await?;

    let appointment = ScheduleService::new()
        .await?
        .create(elder_id, auth.caregiver_id, &request)
        .await?;

    tracing::info!(appointment_id = %appointment.id, %elder_id, "appointment created");
    Ok(ApiResponse::created(appointment))
}

/// GET /api/elders/:elder_id/appointments?from=&to=
pub async fn list_for_elder(
    Extension(auth): Extension<AuthCaregiver>,
    Path(elder_id): Path<Uuid>,
    Query(range): Query<RangeQuery>,
) -> ApiResult<Vec<AppointmentWithResponse>> {
    let (from, to) = range.resolve()?;

    CareTeamService::new()
        .await?
        .require_member(auth.caregiver_id, elder_id)
        .await?;

    let appointments = ScheduleService::new()
        .await?
        .for_elder(auth.caregiver_id, elder_id, from, to)
        .await?;
    Ok(ApiResponse::success(appointments))
}

/// GET /api/appointments/:id
pub async fn get(
    Extension(auth): Extension<AuthCaregiver>,
    Path(appointment_id): Path<Uuid>,
) -> ApiResult<AppointmentWithResponse> {
    let schedule = ScheduleService::new().await?;
    let appointment = schedule.get(appointment_id).await?;

    CareTeamService::new()
        .await?
        .require_member(auth.caregiver_id, appointment.elder_id)
        .await?;

    let appointment = schedule
        .get_with_response(auth.caregiver_id, appointment_id)
        .await?;
    Ok(ApiResponse::success(appointment))
}

/// PUT /api/appointments/:id
///
/// Any care-team member may edit, not just the creator; teams share the
/// schedule.
pub async fn update(
    Extension(auth): Extension<AuthCaregiver>,
    Path(appointment_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> ApiResult<Appointment> {
    let request = parse_body::<UpdateAppointmentRequest>(payload)?.sanitized();
    request.validate()?;

    let schedule = ScheduleService::new().await?;
    let appointment = schedule.get(appointment_id).await?;

    CareTeamService::new()
        .await?
        .require_member(auth.caregiver_id, appointment.elder_id)
        .await?;

    let appointment = schedule.update(appointment_id, &request).await?;
    Ok(ApiResponse::success(appointment))
}

/// DELETE /api/appointments/:id
pub async fn delete(
    Extension(auth): Extension<AuthCaregiver>,
    Path(appointment_id): Path<Uuid>,
) -> ApiResult<()> {
    let schedule = ScheduleService::new().await?;
    let appointment = schedule.get(appointment_id).await?;

    CareTeamService::new()
        .await?
        .require_member(auth.caregiver_id, appointment.elder_id)
        .await?;

    schedule.delete(appointment_id).await?;
    tracing::info!(%appointment_id, "appointment deleted");
    Ok(ApiResponse::<()>::no_content())
}

/// POST /api/appointments/:id/accept
pub async fn accept(
    Extension(auth): Extension<AuthCaregiver>,
    Path(appointment_id): Path<Uuid>,
) -> ApiResult<AppointmentWithResponse> {
    respond(auth, appointment_id, STATUS_ACCEPTED).await
}

/// POST /api/appointments/:id/decline
pub async fn decline(
    Extension(auth): Extension<AuthCaregiver>,
    Path(appointment_id): Path<Uuid>,
) -> ApiResult<AppointmentWithResponse> {
    respond(auth, appointment_id, STATUS_DECLINED).await
}

async fn respond(
    auth: AuthCaregiver,
    appointment_id: Uuid,
    status: &str,
) -> ApiResult<AppointmentWithResponse> {
    let schedule = ScheduleService::new().await?;
    let appointment = schedule.get(appointment_id).await?;

    CareTeamService::new()
        .await?
        .require_member(auth.caregiver_id, appointment.elder_id)
        .await?;

    let appointment = schedule
        .respond(appointment_id, auth.caregiver_id, status)
        .await?;
    Ok(ApiResponse::success(appointment))
}

/// POST /api/elders/:elder_id/appointments/import
///
/// Accepts either JSON `{"url": ...}` pointing at a remote feed, or the ICS
/// document itself as the request body.
pub async fn import(
    Extension(auth): Extension<AuthCaregiver>,
    Path(elder_id): Path<Uuid>,
    headers: HeaderMap,
    body: String,
) -> ApiResult<ImportSummary> {
    CareTeamService::new()
        .await?
        .require_member(auth.caregiver_id, elder_id)
        .await?;

    let importer = IcsImportService::new().await?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let summary = if content_type.starts_with("application/json") {
        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ApiError::invalid_json(format!("Invalid JSON: {}", e)))?;
        let request = parse_body::<ImportIcsRequest>(value)?;
        request.validate()?;
        let url = request.url.as_deref().unwrap_or_default();
        importer
            .import_url(elder_id, auth.caregiver_id, url.trim())
            .await?
    } else {
        if body.trim().is_empty() {
            return Err(ApiError::bad_request(
                "Request body must contain an ICS calendar",
            ));
        }
        importer
            .import_text(elder_id, auth.caregiver_id, &body)
            .await?
    };

    tracing::info!(
        %elder_id,
        imported = summary.imported,
        skipped = summary.skipped,
        "calendar import finished"
    );
    Ok(ApiResponse::success(summary))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_query_parses_rfc3339_bounds() {
        let range = RangeQuery {
            from: Some("2026-03-01T00:00:00Z".to_string()),
            to: None,
        };
        let (from, to) = range.resolve().unwrap();
        assert!(from.is_some());
        assert!(to.is_none());
    }

    #[test]
    fn test_range_query_rejects_garbage() {
        let range = RangeQuery {
            from: Some("next tuesday".to_string()),
            to: Some("2026-03-01T00:00:00Z".to_string()),
        };
        let err = range.resolve().unwrap_err();
        match err {
            ApiError::ValidationError {
                field_errors: Some(map),
                ..
            } => {
                assert!(map.contains_key("from"));
                assert!(!map.contains_key("to"));
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_range_query_treats_blank_as_absent() {
        let range = RangeQuery {
            from: Some("  ".to_string()),
            to: None,
        };
        let (from, to) = range.resolve().unwrap();
        assert!(from.is_none());
        assert!(to.is_none());
    }
}
