//! The caregiver's own profile: read, update, delete.

use axum::{response::Json, Extension};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::CaregiverProfile;
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::parse_body;
use crate::middleware::{ApiResponse, ApiResult, AuthCaregiver};
use crate::schema::UpdateCaregiverRequest;

/// A valid token can outlive its account; answer 401 rather than 404 so the
/// client drops the session.
pub(crate) async fn fetch_profile(
    pool: &PgPool,
    caregiver_id: Uuid,
) -> Result<CaregiverProfile, ApiError> {
    let sql = format!(
        "SELECT {} FROM caregivers WHERE id = $1",
        CaregiverProfile::COLUMNS
    );
    let profile: Option<CaregiverProfile> = sqlx::query_as(&sql)
        .bind(caregiver_id)
        .fetch_optional(pool)
        .await?;
    profile.ok_or_else(|| ApiError::unauthorized("Account no longer exists"))
}

/// GET /api/caregivers/me
pub async fn me_get(Extension(auth): Extension<AuthCaregiver>) -> ApiResult<CaregiverProfile> {
    let pool = DatabaseManager::pool().await?;
    let profile = fetch_profile(&pool, auth.caregiver_id).await?;
    Ok(ApiResponse::success(profile))
}

/// PUT /api/caregivers/me
pub async fn me_update(
    Extension(auth): Extension<AuthCaregiver>,
    Json(payload): Json<Value>,
) -> ApiResult<CaregiverProfile> {
    let request = parse_body::<UpdateCaregiverRequest>(payload)?.sanitized();
    request.validate()?;

    let pool = DatabaseManager::pool().await?;
    let sql = format!(
        "UPDATE caregivers SET
            name = COALESCE($2, name),
            date_of_birth = COALESCE($3, date_of_birth),
            gender = COALESCE($4, gender),
            phone = COALESCE($5, phone),
            address_line = COALESCE($6, address_line),
            city = COALESCE($7, city),
            postal_code = COALESCE($8, postal_code),
            bio = COALESCE($9, bio),
            updated_at = now()
         WHERE id = $1
         RETURNING {}",
        CaregiverProfile::COLUMNS
    );
    let profile: Option<CaregiverProfile> = sqlx::query_as(&sql)
        .bind(auth.caregiver_id)
        .bind(&request.name)
        .bind(request.date_of_birth)
        .bind(&request.gender)
        .bind(&request.phone)
        .bind(&request.address_line)
        .bind(&request.city)
        .bind(&request.postal_code)
        .bind(&request.bio)
        .fetch_optional(&pool)
        .await?;

    let profile = profile.ok_or_else(|| ApiError::unauthorized("Account no longer exists"))?;
    Ok(ApiResponse::success(profile))
}

/// DELETE /api/caregivers/me
///
/// Elders and notes survive for the rest of the care team; authored notes
/// keep their text with the author unlinked.
pub async fn me_delete(Extension(auth): Extension<AuthCaregiver>) -> ApiResult<()> {
    let pool = DatabaseManager::pool().await?;

    sqlx::query("DELETE FROM caregivers WHERE id = $1")
        .bind(auth.caregiver_id)
        .execute(&pool)
        .await?;

    tracing::info!(caregiver_id = %auth.caregiver_id, "caregiver account deleted");
    Ok(ApiResponse::<()>::no_content())
}
