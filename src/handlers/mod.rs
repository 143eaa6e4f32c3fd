// Two security tiers: public (/auth/*, no token) and protected (/api/*,
// behind the JWT middleware).
pub mod protected;
pub mod public;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Deserialize a JSON body into a request struct with a uniform 400 envelope
/// on shape mismatches.
pub(crate) fn parse_body<T: DeserializeOwned>(value: Value) -> Result<T, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::invalid_json(e.to_string()))
}
