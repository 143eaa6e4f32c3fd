//! JWT session tokens.
//!
//! Access tokens are HS256 JWTs carrying the caregiver id as `sub`. Issuer and
//! audience are pinned to the values in [`crate::config`] and enforced on
//! decode, so a token minted for another deployment never authenticates here.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config;

pub mod password;

pub use password::{generate_refresh_token, hash_password, hash_token, verify_password};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub iss: String,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    pub fn new(caregiver_id: Uuid) -> Self {
        let security = &config::config().security;
        let now = Utc::now();
        let exp = (now + Duration::hours(security.jwt_expiry_hours as i64)).timestamp();

        Self {
            sub: caregiver_id,
            iss: security.jwt_issuer.clone(),
            aud: security.jwt_audience.clone(),
            exp,
            iat: now.timestamp(),
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("{0}")]
    InvalidToken(String),

    #[error("JWT secret is not configured")]
    MissingSecret,

    #[error("JWT generation error: {0}")]
    TokenGeneration(String),

    #[error("RNG failure: {0}")]
    Rng(String),
}

pub fn generate_jwt(caregiver_id: Uuid) -> Result<String, AuthError> {
    let secret = &config::config().security.jwt_secret;

    if secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let encoding_key = EncodingKey::from_secret(secret.as_bytes());
    let claims = Claims::new(caregiver_id);

    encode(&Header::default(), &claims, &encoding_key)
        .map_err(|e| AuthError::TokenGeneration(e.to_string()))
}

/// Decode and verify a bearer token. Signature, expiry, issuer and audience
/// must all check out; any failure yields a client-safe message.
pub fn decode_jwt(token: &str) -> Result<Claims, AuthError> {
    let security = &config::config().security;

    if security.jwt_secret.is_empty() {
        return Err(AuthError::MissingSecret);
    }

    let decoding_key = DecodingKey::from_secret(security.jwt_secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[&security.jwt_issuer]);
    validation.set_audience(&[&security.jwt_audience]);

    decode::<Claims>(token, &decoding_key, &validation)
        .map(|data| data.claims)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => {
                AuthError::InvalidToken("Token has expired".to_string())
            }
            _ => AuthError::InvalidToken("Invalid authentication token".to_string()),
        })
}
