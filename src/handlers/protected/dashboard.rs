//! The landing-screen aggregate: what's next, what's new, how many elders.

use axum::Extension;
use futures::try_join;
use serde::Serialize;

use crate::database::models::{AppointmentWithResponse, NoteWithAuthor};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::protected::notes::recent_for_caregiver;
use crate::middleware::{ApiResponse, ApiResult, AuthCaregiver};
use crate::services::ScheduleService;

const RECENT_NOTES_LIMIT: i64 = 5;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub upcoming_appointments: Vec<AppointmentWithResponse>,
    pub recent_notes: Vec<NoteWithAuthor>,
    pub elder_count: i64,
}

/// GET /api/dashboard
pub async fn overview(Extension(auth): Extension<AuthCaregiver>) -> ApiResult<Dashboard> {
    let pool = DatabaseManager::pool().await?;
    let schedule = ScheduleService::new().await?;

    let elder_count = async {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM caregiver_elder WHERE caregiver_id = $1")
                .bind(auth.caregiver_id)
                .fetch_one(&pool)
                .await?;
        Ok::<i64, ApiError>(count)
    };

    let (upcoming_appointments, recent_notes, elder_count) = try_join!(
        schedule.upcoming_for_caregiver(auth.caregiver_id),
        recent_for_caregiver(&pool, auth.caregiver_id, RECENT_NOTES_LIMIT),
        elder_count,
    )?;

    Ok(ApiResponse::success(Dashboard {
        upcoming_appointments,
        recent_notes,
        elder_count,
    }))
}
