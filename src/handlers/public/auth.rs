//! Public authentication endpoints: register, login, refresh.
//!
//! All three hand out the same token pair: a short-lived JWT plus a
//! single-use refresh token whose SHA-256 hash is the only thing stored.

use axum::response::Json;
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth;
use crate::config;
use crate::database::models::{Caregiver, CaregiverProfile};
use crate::database::DatabaseManager;
use crate::error::ApiError;
use crate::handlers::parse_body;
use crate::middleware::{ApiResponse, ApiResult};
use crate::schema::{LoginRequest, RefreshRequest, RegisterRequest};

// One message for unknown email and wrong password, so accounts cannot be
// enumerated through the login form.
const INVALID_CREDENTIALS: &str = "Invalid email or password";

struct IssuedTokens {
    token: String,
    refresh_token: String,
}

/// Mint a JWT and a fresh refresh token, persisting only the refresh hash.
async fn issue_tokens(pool: &PgPool, caregiver_id: Uuid) -> Result<IssuedTokens, ApiError> {
    let token = auth::generate_jwt(caregiver_id)?;
    let refresh_token = auth::generate_refresh_token()?;
    let token_hash = auth::hash_token(&refresh_token);
    let expires_at =
        Utc::now() + Duration::days(config::config().security.refresh_expiry_days);

    sqlx::query(
        "INSERT INTO refresh_tokens (token_hash, caregiver_id, expires_at) VALUES ($1, $2, $3)",
    )
    .bind(&token_hash)
    .bind(caregiver_id)
    .bind(expires_at)
    .execute(pool)
    .await?;

    Ok(IssuedTokens {
        token,
        refresh_token,
    })
}

/// POST /auth/register
pub async fn register(Json(payload): Json<Value>) -> ApiResult<Value> {
    let request = parse_body::<RegisterRequest>(payload)?.sanitized();
    request.validate()?;

    let pool = DatabaseManager::pool().await?;

    let exists: bool =
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM caregivers WHERE email = $1)")
            .bind(&request.email)
            .fetch_one(&pool)
            .await?;
    if exists {
        return Err(ApiError::conflict("An account with this email already exists"));
    }

    let (password_hash, password_salt) = auth::hash_password(&request.password)?;

    let sql = format!(
        "INSERT INTO caregivers
            (email, password_hash, password_salt, name, date_of_birth, gender,
             phone, address_line, city, postal_code, bio)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
         RETURNING {}",
        CaregiverProfile::COLUMNS
    );
    let caregiver: CaregiverProfile = sqlx::query_as(&sql)
        .bind(&request.email)
        .bind(&password_hash)
        .bind(&password_salt)
        .bind(&request.name)
        .bind(request.date_of_birth)
        .bind(&request.gender)
        .bind(&request.phone)
        .bind(&request.address_line)
        .bind(&request.city)
        .bind(&request.postal_code)
        .bind(&request.bio)
        .fetch_one(&pool)
        .await?;

    let tokens = issue_tokens(&pool, caregiver.id).await?;
    tracing::info!(caregiver_id = %caregiver.id, "caregiver registered");

    Ok(ApiResponse::created(json!({
        "token": tokens.token,
        "refresh_token": tokens.refresh_token,
        "caregiver": caregiver,
    })))
}

/// POST /auth/login
pub async fn login(Json(payload): Json<Value>) -> ApiResult<Value> {
    let request: LoginRequest = parse_body(payload)?;
    request.validate()?;

    let pool = DatabaseManager::pool().await?;
    let email = request.email.trim().to_lowercase();

    let caregiver: Option<Caregiver> = sqlx::query_as("SELECT * FROM caregivers WHERE email = $1")
        .bind(&email)
        .fetch_optional(&pool)
        .await?;

    let caregiver = caregiver.ok_or_else(|| ApiError::unauthorized(INVALID_CREDENTIALS))?;

    if !auth::verify_password(
        &request.password,
        &caregiver.password_hash,
        &caregiver.password_salt,
    ) {
        tracing::warn!(caregiver_id = %caregiver.id, "failed login attempt");
        return Err(ApiError::unauthorized(INVALID_CREDENTIALS));
    }

    let tokens = issue_tokens(&pool, caregiver.id).await?;
    let profile = CaregiverProfile::from(caregiver);

    Ok(ApiResponse::success(json!({
        "token": tokens.token,
        "refresh_token": tokens.refresh_token,
        "caregiver": profile,
    })))
}

/// POST /auth/refresh
///
/// Refresh tokens rotate: the presented token is deleted whether or not it is
/// still valid, and a new pair is issued only when it was.
pub async fn refresh(Json(payload): Json<Value>) -> ApiResult<Value> {
    let request: RefreshRequest = parse_body(payload)?;
    request.validate()?;

    let pool = DatabaseManager::pool().await?;
    let token_hash = auth::hash_token(request.refresh_token.trim());

    let claimed: Option<(Uuid, DateTime<Utc>)> = sqlx::query_as(
        "DELETE FROM refresh_tokens WHERE token_hash = $1 RETURNING caregiver_id, expires_at",
    )
    .bind(&token_hash)
    .fetch_optional(&pool)
    .await?;

    let (caregiver_id, expires_at) =
        claimed.ok_or_else(|| ApiError::unauthorized("Refresh token is invalid or expired"))?;

    if expires_at <= Utc::now() {
        return Err(ApiError::unauthorized("Refresh token is invalid or expired"));
    }

    let tokens = issue_tokens(&pool, caregiver_id).await?;

    Ok(ApiResponse::success(json!({
        "token": tokens.token,
        "refresh_token": tokens.refresh_token,
    })))
}
