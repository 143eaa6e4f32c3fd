use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// Full caregiver row including credential columns. Deliberately not
/// Serialize: only the auth handlers read this, and responses go out
/// through [`CaregiverProfile`].
#[derive(Debug, Clone, FromRow)]
pub struct Caregiver {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub password_salt: String,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public projection of a caregiver, safe to return to clients.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CaregiverProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub gender: Option<String>,
    pub phone: Option<String>,
    pub address_line: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub bio: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CaregiverProfile {
    /// Column list for SELECT/RETURNING projections of this struct.
    pub const COLUMNS: &'static str = "id, email, name, date_of_birth, gender, phone, \
                                       address_line, city, postal_code, bio, created_at, updated_at";
}

impl From<Caregiver> for CaregiverProfile {
    fn from(c: Caregiver) -> Self {
        Self {
            id: c.id,
            email: c.email,
            name: c.name,
            date_of_birth: c.date_of_birth,
            gender: c.gender,
            phone: c.phone,
            address_line: c.address_line,
            city: c.city,
            postal_code: c.postal_code,
            bio: c.bio,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

/// One row of an elder's care-team roster.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct CareTeamMember {
    pub caregiver_id: Uuid,
    pub name: String,
    pub role: String,
    pub added_at: DateTime<Utc>,
}
