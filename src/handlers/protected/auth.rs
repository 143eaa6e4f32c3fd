use axum::Extension;

use crate::database::models::CaregiverProfile;
use crate::database::DatabaseManager;
use crate::handlers::protected::caregivers::fetch_profile;
use crate::middleware::{ApiResponse, ApiResult, AuthCaregiver};

/// GET /api/auth/whoami
pub async fn whoami(Extension(auth): Extension<AuthCaregiver>) -> ApiResult<CaregiverProfile> {
    let pool = DatabaseManager::pool().await?;
    let profile = fetch_profile(&pool, auth.caregiver_id).await?;
    Ok(ApiResponse::success(profile))
}
