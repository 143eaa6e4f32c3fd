//! Elder CRUD and care-team roster.

use axum::{extract::Path, response::Json, Extension};
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::{CareTeamMember, Elder};
use crate::handlers::parse_body;
use crate::middleware::{ApiResponse, ApiResult, AuthCaregiver};
use crate::schema::{CreateElderRequest, UpdateElderRequest};
use crate::services::CareTeamService;

/// POST /api/elders
pub async fn create(
    Extension(auth): Extension<AuthCaregiver>,
    Json(payload): Json<Value>,
) -> ApiResult<Elder> {
    let request = parse_body::<CreateElderRequest>(payload)?.sanitized();
    request.validate()?;

    let service = CareTeamService::new().await?;
    let elder = service.create_elder(auth.caregiver_id, &request).await?;

    tracing::info!(elder_id = %elder.id, caregiver_id = %auth.caregiver_id, "elder created");
    Ok(ApiResponse::created(elder))
}

/// GET /api/elders
pub async fn list(Extension(auth): Extension<AuthCaregiver>) -> ApiResult<Vec<Elder>> {
    let service = CareTeamService::new().await?;
    let elders = service.elders_for(auth.caregiver_id).await?;
    Ok(ApiResponse::success(elders))
}

/// GET /api/elders/:elder_id
pub async fn get(
    Extension(auth): Extension<AuthCaregiver>,
    Path(elder_id): Path<Uuid>,
) -> ApiResult<Elder> {
    let service = CareTeamService::new().await?;
    service.require_member(auth.caregiver_id, elder_id).await?;

    let elder = service.get_elder(elder_id).await?;
    Ok(ApiResponse::success(elder))
}

/// PUT /api/elders/:elder_id
pub async fn update(
    Extension(auth): Extension<AuthCaregiver>,
    Path(elder_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> ApiResult<Elder> {
    let request = parse_body::<UpdateElderRequest>(payload)?.sanitized();
    request.validate()?;

    let service = CareTeamService::new().await?;
    service.require_member(auth.caregiver_id, elder_id).await?;

    let elder = service.update_elder(elder_id, &request).await?;
    Ok(ApiResponse::success(elder))
}

/// DELETE /api/elders/:elder_id
pub async fn delete(
    Extension(auth): Extension<AuthCaregiver>,
    Path(elder_id): Path<Uuid>,
) -> ApiResult<()> {
    let service = CareTeamService::new().await?;
    service.require_member(auth.caregiver_id, elder_id).await?;

    service.delete_elder(elder_id).await?;
    tracing::info!(%elder_id, caregiver_id = %auth.caregiver_id, "elder deleted");
    Ok(ApiResponse::<()>::no_content())
}

/// GET /api/elders/:elder_id/caregivers
pub async fn members(
    Extension(auth): Extension<AuthCaregiver>,
    Path(elder_id): Path<Uuid>,
) -> ApiResult<Vec<CareTeamMember>> {
    let service = CareTeamService::new().await?;
    service.require_member(auth.caregiver_id, elder_id).await?;

    let members = service.members_of(elder_id).await?;
    Ok(ApiResponse::success(members))
}
