use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Note {
    pub id: Uuid,
    pub header: String,
    pub content: String,
    /// NULL when the authoring caregiver deleted their account.
    pub caregiver_id: Option<Uuid>,
    pub elder_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Note joined with the author's display name for list views.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct NoteWithAuthor {
    pub id: Uuid,
    pub header: String,
    pub content: String,
    pub caregiver_id: Option<Uuid>,
    pub author_name: Option<String>,
    pub elder_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
