use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::auth::{self, Claims};
use crate::error::ApiError;

/// Authenticated caregiver context extracted from the bearer token.
///
/// Injected into request extensions by [`jwt_auth_middleware`]; protected
/// handlers pull it out with `Extension<AuthCaregiver>`.
#[derive(Clone, Copy, Debug)]
pub struct AuthCaregiver {
    pub caregiver_id: Uuid,
}

impl From<Claims> for AuthCaregiver {
    fn from(claims: Claims) -> Self {
        Self {
            caregiver_id: claims.sub,
        }
    }
}

/// JWT authentication middleware for everything under `/api`.
///
/// Fails closed: a missing, malformed, expired or mis-scoped token short
/// circuits with 401 before any handler runs.
pub async fn jwt_auth_middleware(
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(&headers)?;
    let claims = auth::decode_jwt(&token)?;

    request.extensions_mut().insert(AuthCaregiver::from(claims));

    Ok(next.run(request).await)
}

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, ApiError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

    let auth_str = auth_header
        .to_str()
        .map_err(|_| ApiError::unauthorized("Invalid Authorization header format"))?;

    match auth_str.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim().to_string()),
        Some(_) => Err(ApiError::unauthorized("Empty bearer token")),
        None => Err(ApiError::unauthorized(
            "Authorization header must use Bearer token format",
        )),
    }
}
