//! Invite codes for growing a care team.

use axum::{extract::Path, response::Json, Extension};
use serde_json::Value;
use uuid::Uuid;

use crate::database::models::{Elder, Invite};
use crate::handlers::parse_body;
use crate::middleware::{ApiResponse, ApiResult, AuthCaregiver};
use crate::schema::{AcceptInviteRequest, CreateInviteRequest};
use crate::services::CareTeamService;

/// POST /api/elders/:elder_id/invites
pub async fn create(
    Extension(auth): Extension<AuthCaregiver>,
    Path(elder_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> ApiResult<Invite> {
    let request = parse_body::<CreateInviteRequest>(payload)?;
    request.validate()?;

    let service = CareTeamService::new().await?;
    service.require_member(auth.caregiver_id, elder_id).await?;

    let invite = service
        .create_invite(elder_id, auth.caregiver_id, &request)
        .await?;

    tracing::info!(invite_id = %invite.id, %elder_id, "invite created");
    Ok(ApiResponse::created(invite))
}

/// GET /api/elders/:elder_id/invites
pub async fn list_for_elder(
    Extension(auth): Extension<AuthCaregiver>,
    Path(elder_id): Path<Uuid>,
) -> ApiResult<Vec<Invite>> {
    let service = CareTeamService::new().await?;
    service.require_member(auth.caregiver_id, elder_id).await?;

    let invites = service.invites_for(elder_id).await?;
    Ok(ApiResponse::success(invites))
}

/// POST /api/invites/accept
pub async fn accept(
    Extension(auth): Extension<AuthCaregiver>,
    Json(payload): Json<Value>,
) -> ApiResult<Elder> {
    let request = parse_body::<AcceptInviteRequest>(payload)?;
    request.validate()?;

    let service = CareTeamService::new().await?;
    let elder = service
        .accept_invite(auth.caregiver_id, request.code.trim())
        .await?;
    Ok(ApiResponse::success(elder))
}
