//! Care notes. Anyone on the team can read and write notes for their elder;
//! editing and deleting stay with the author.

use axum::{extract::Path, response::Json, Extension};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{Note, NoteWithAuthor};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::parse_body;
use crate::middleware::{ApiResponse, ApiResult, AuthCaregiver};
use crate::schema::{CreateNoteRequest, UpdateNoteRequest};
use crate::services::CareTeamService;

const NOTE_WITH_AUTHOR_SELECT: &str = "
    SELECT n.id, n.header, n.content, n.caregiver_id, c.name AS author_name,
           n.elder_id, n.created_at, n.updated_at
      FROM notes n
      LEFT JOIN caregivers c ON c.id = n.caregiver_id";

async fn fetch_note(pool: &PgPool, note_id: Uuid) -> Result<Note, ApiError> {
    let note: Option<Note> = sqlx::query_as("SELECT * FROM notes WHERE id = $1")
        .bind(note_id)
        .fetch_optional(pool)
        .await?;
    note.ok_or_else(|| ApiError::not_found("Note not found"))
}

/// Latest notes across every care team the caregiver belongs to. Shared with
/// the dashboard.
pub(crate) async fn recent_for_caregiver(
    pool: &PgPool,
    caregiver_id: Uuid,
    limit: i64,
) -> Result<Vec<NoteWithAuthor>, ApiError> {
    let sql = format!(
        "{NOTE_WITH_AUTHOR_SELECT}
         JOIN caregiver_elder ce ON ce.elder_id = n.elder_id AND ce.caregiver_id = $1
         ORDER BY n.created_at DESC
         LIMIT $2"
    );
    let notes = sqlx::query_as(&sql)
        .bind(caregiver_id)
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(notes)
}

/// POST /api/elders/:elder_id/notes
pub async fn create(
    Extension(auth): Extension<AuthCaregiver>,
    Path(elder_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> ApiResult<Note> {
    let request = parse_body::<CreateNoteRequest>(payload)?.sanitized();
    request.validate()?;

    CareTeamService::new()
        .await?
        .require_member(auth.caregiver_id, elder_id)
        .await?;

    let pool = DatabaseManager::pool().await?;
    let note: Note = sqlx::query_as(
        "INSERT INTO notes (header, content, caregiver_id, elder_id)
         VALUES ($1, $2, $3, $4)
         RETURNING *",
    )
    .bind(&request.header)
    .bind(&request.content)
    .bind(auth.caregiver_id)
    .bind(elder_id)
    .fetch_one(&pool)
    .await?;

    tracing::info!(note_id = %note.id, %elder_id, "note created");
    Ok(ApiResponse::created(note))
}

/// GET /api/elders/:elder_id/notes
pub async fn list_for_elder(
    Extension(auth): Extension<AuthCaregiver>,
    Path(elder_id): Path<Uuid>,
) -> ApiResult<Vec<NoteWithAuthor>> {
    CareTeamService::new()
        .await?
        .require_member(auth.caregiver_id, elder_id)
        .await?;

    let pool = DatabaseManager::pool().await?;
    let sql = format!(
        "{NOTE_WITH_AUTHOR_SELECT}
         WHERE n.elder_id = $1
         ORDER BY n.created_at DESC"
    );
    let notes: Vec<NoteWithAuthor> = sqlx::query_as(&sql)
        .bind(elder_id)
        .fetch_all(&pool)
        .await?;
    Ok(ApiResponse::success(notes))
}

/// GET /api/notes/:id
pub async fn get(
    Extension(auth): Extension<AuthCaregiver>,
    Path(note_id): Path<Uuid>,
) -> ApiResult<NoteWithAuthor> {
    let pool = DatabaseManager::pool().await?;
    let note = fetch_note(&pool, note_id).await?;

    CareTeamService::new()
        .await?
        .require_member(auth.caregiver_id, note.elder_id)
        .await?;

    let sql = format!("{NOTE_WITH_AUTHOR_SELECT} WHERE n.id = $1");
    let note: NoteWithAuthor = sqlx::query_as(&sql).bind(note_id).fetch_one(&pool).await?;
    Ok(ApiResponse::success(note))
}

/// PUT /api/notes/:id
pub async fn update(
    Extension(auth): Extension<AuthCaregiver>,
    Path(note_id): Path<Uuid>,
    Json(payload): Json<Value>,
) -> ApiResult<Note> {
    let request = parse_body::<UpdateNoteRequest>(payload)?.sanitized();
    request.validate()?;

    let pool = DatabaseManager::pool().await?;
    let note = fetch_note(&pool, note_id).await?;

    CareTeamService::new()
        .await?
        .require_member(auth.caregiver_id, note.elder_id)
        .await?;

    if note.caregiver_id != Some(auth.caregiver_id) {
        return Err(ApiError::forbidden("Only the author can edit this note"));
    }

    let note: Note = sqlx::query_as(
        "UPDATE notes SET
            header = COALESCE($2, header),
            content = COALESCE($3, content),
            updated_at = now()
         WHERE id = $1
         RETURNING *",
    )
    .bind(note_id)
    .bind(&request.header)
    .bind(&request.content)
    .fetch_one(&pool)
    .await?;
    Ok(ApiResponse::success(note))
}

/// DELETE /api/notes/:id
pub async fn delete(
    Extension(auth): Extension<AuthCaregiver>,
    Path(note_id): Path<Uuid>,
) -> ApiResult<()> {
    let pool = DatabaseManager::pool().await?;
    let note = fetch_note(&pool, note_id).await?;

    CareTeamService::new()
        .await?
        .require_member(auth.caregiver_id, note.elder_id)
        .await?;

    if note.caregiver_id != Some(auth.caregiver_id) {
        return Err(ApiError::forbidden("Only the author can delete this note"));
    }

    sqlx::query("DELETE FROM notes WHERE id = $1")
        .bind(note_id)
        .execute(&pool)
        .await?;

    tracing::info!(%note_id, "note deleted");
    Ok(ApiResponse::<()>::no_content())
}
