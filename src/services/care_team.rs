//! Care-team membership, elder lifecycle, and invites.
//!
//! Every elder-scoped handler goes through [`CareTeamService::require_member`]
//! before touching data. The guard keeps the 403/404 distinction in one place:
//! an elder that does not exist is a 404, an elder the caller is not
//! associated with is a 403.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::models::{CareTeamMember, Elder, Invite};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::schema::{CreateElderRequest, CreateInviteRequest, UpdateElderRequest};

pub const ROLE_OWNER: &str = "owner";
pub const ROLE_MEMBER: &str = "member";

const INVITE_CODE_LEN: usize = 8;

pub struct CareTeamService {
    pool: PgPool,
}

impl CareTeamService {
    pub async fn new() -> Result<Self, ApiError> {
        Ok(Self {
            pool: DatabaseManager::pool().await?,
        })
    }

    /// Membership guard. Returns the caller's role on the elder's care team.
    pub async fn require_member(
        &self,
        caregiver_id: Uuid,
        elder_id: Uuid,
    ) -> Result<String, ApiError> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM elders WHERE id = $1)")
            .bind(elder_id)
            .fetch_one(&self.pool)
            .await?;

        if !exists {
            return Err(ApiError::not_found("Elder not found"));
        }

        let role: Option<String> = sqlx::query_scalar(
            "SELECT role FROM caregiver_elder WHERE caregiver_id = $1 AND elder_id = $2",
        )
        .bind(caregiver_id)
        .bind(elder_id)
        .fetch_optional(&self.pool)
        .await?;

        role.ok_or_else(|| {
            tracing::warn!(%caregiver_id, %elder_id, "care team access denied");
            ApiError::forbidden("You are not part of this elder's care team")
        })
    }

    /// Create an elder and enroll the creator as owner, atomically.
    pub async fn create_elder(
        &self,
        caregiver_id: Uuid,
        request: &CreateElderRequest,
    ) -> Result<Elder, ApiError> {
        let mut tx = self.pool.begin().await?;

        let elder: Elder = sqlx::query_as(
            "INSERT INTO elders (name, date_of_birth, gender, phone, address_line, city, postal_code)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING *",
        )
        .bind(&request.name)
        .bind(request.date_of_birth)
        .bind(&request.gender)
        .bind(&request.phone)
        .bind(&request.address_line)
        .bind(&request.city)
        .bind(&request.postal_code)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO caregiver_elder (caregiver_id, elder_id, role) VALUES ($1, $2, $3)")
            .bind(caregiver_id)
            .bind(elder.id)
            .bind(ROLE_OWNER)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(elder)
    }

    /// All elders the caregiver cares for, alphabetical.
    pub async fn elders_for(&self, caregiver_id: Uuid) -> Result<Vec<Elder>, ApiError> {
        let elders = sqlx::query_as(
            "SELECT e.* FROM elders e
             JOIN caregiver_elder ce ON ce.elder_id = e.id
             WHERE ce.caregiver_id = $1
             ORDER BY e.name",
        )
        .bind(caregiver_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(elders)
    }

    pub async fn get_elder(&self, elder_id: Uuid) -> Result<Elder, ApiError> {
        let elder = sqlx::query_as("SELECT * FROM elders WHERE id = $1")
            .bind(elder_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(elder)
    }

    /// Partial update; omitted fields keep their stored value.
    pub async fn update_elder(
        &self,
        elder_id: Uuid,
        request: &UpdateElderRequest,
    ) -> Result<Elder, ApiError> {
        let elder = sqlx::query_as(
            "UPDATE elders SET
                name = COALESCE($2, name),
                date_of_birth = COALESCE($3, date_of_birth),
                gender = COALESCE($4, gender),
                phone = COALESCE($5, phone),
                address_line = COALESCE($6, address_line),
                city = COALESCE($7, city),
                postal_code = COALESCE($8, postal_code),
                updated_at = now()
             WHERE id = $1
             RETURNING *",
        )
        .bind(elder_id)
        .bind(&request.name)
        .bind(request.date_of_birth)
        .bind(&request.gender)
        .bind(&request.phone)
        .bind(&request.address_line)
        .bind(&request.city)
        .bind(&request.postal_code)
        .fetch_one(&self.pool)
        .await?;
        Ok(elder)
    }

    /// Deleting an elder cascades to appointments, notes, responses and
    /// memberships via foreign keys.
    pub async fn delete_elder(&self, elder_id: Uuid) -> Result<(), ApiError> {
        sqlx::query("DELETE FROM elders WHERE id = $1")
            .bind(elder_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Roster of caregivers on the elder's team, oldest membership first.
    pub async fn members_of(&self, elder_id: Uuid) -> Result<Vec<CareTeamMember>, ApiError> {
        let members = sqlx::query_as(
            "SELECT ce.caregiver_id, c.name, ce.role, ce.added_at
             FROM caregiver_elder ce
             JOIN caregivers c ON c.id = ce.caregiver_id
             WHERE ce.elder_id = $1
             ORDER BY ce.added_at",
        )
        .bind(elder_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(members)
    }

    pub async fn create_invite(
        &self,
        elder_id: Uuid,
        created_by: Uuid,
        request: &CreateInviteRequest,
    ) -> Result<Invite, ApiError> {
        // Short shareable code from the uuid hex alphabet
        let code = Uuid::new_v4().simple().to_string()[..INVITE_CODE_LEN].to_string();
        let expires_at = request
            .expires_in_days
            .map(|days| Utc::now() + Duration::days(days));

        let invite = sqlx::query_as(
            "INSERT INTO invites (code, elder_id, created_by, max_uses, expires_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING *",
        )
        .bind(&code)
        .bind(elder_id)
        .bind(created_by)
        .bind(request.max_uses)
        .bind(expires_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(invite)
    }

    pub async fn invites_for(&self, elder_id: Uuid) -> Result<Vec<Invite>, ApiError> {
        let invites = sqlx::query_as(
            "SELECT * FROM invites WHERE elder_id = $1 ORDER BY created_at DESC",
        )
        .bind(elder_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(invites)
    }

    /// Redeem an invite code, enrolling the caller as a member of the elder's
    /// care team. Invalid, expired and exhausted codes all answer the same
    /// 404 so codes cannot be probed.
    pub async fn accept_invite(&self, caregiver_id: Uuid, code: &str) -> Result<Elder, ApiError> {
        let mut tx = self.pool.begin().await?;

        // Row lock so concurrent redemptions of a limited code serialize
        let invite: Option<Invite> =
            sqlx::query_as("SELECT * FROM invites WHERE code = $1 FOR UPDATE")
                .bind(code)
                .fetch_optional(&mut *tx)
                .await?;

        let invite =
            invite.ok_or_else(|| ApiError::not_found("Invite code is invalid or expired"))?;

        if let Some(expires_at) = invite.expires_at {
            if expires_at <= Utc::now() {
                return Err(ApiError::not_found("Invite code is invalid or expired"));
            }
        }
        if let Some(max_uses) = invite.max_uses {
            if invite.used_count >= max_uses {
                return Err(ApiError::not_found("Invite code is invalid or expired"));
            }
        }

        let already_member: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM caregiver_elder WHERE caregiver_id = $1 AND elder_id = $2)",
        )
        .bind(caregiver_id)
        .bind(invite.elder_id)
        .fetch_one(&mut *tx)
        .await?;

        if already_member {
            return Err(ApiError::conflict("You are already on this care team"));
        }

        sqlx::query("INSERT INTO caregiver_elder (caregiver_id, elder_id, role) VALUES ($1, $2, $3)")
            .bind(caregiver_id)
            .bind(invite.elder_id)
            .bind(ROLE_MEMBER)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE invites SET used_count = used_count + 1 WHERE id = $1")
            .bind(invite.id)
            .execute(&mut *tx)
            .await?;

        let elder: Elder = sqlx::query_as("SELECT * FROM elders WHERE id = $1")
            .bind(invite.elder_id)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(%caregiver_id, elder_id = %elder.id, "joined care team via invite");
        Ok(elder)
    }
}
