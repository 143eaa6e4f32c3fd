//! PBKDF2-SHA256 password hashing and opaque refresh tokens.
//!
//! Hash and salt are stored hex-encoded in separate columns. Refresh tokens
//! are random 32-byte values handed to the client verbatim; only their SHA-256
//! digest is persisted, so a leaked database cannot replay sessions.

use pbkdf2::pbkdf2_hmac;
use sha2::{Digest, Sha256};

use super::AuthError;

const PBKDF2_ITERATIONS: u32 = 600_000;
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Hash a password with a fresh random salt. Returns `(hash_hex, salt_hex)`.
pub fn hash_password(password: &str) -> Result<(String, String), AuthError> {
    let mut salt = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt).map_err(|e| AuthError::Rng(e.to_string()))?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut hash);

    Ok((hex::encode(hash), hex::encode(salt)))
}

/// Verify a password against a stored hash and salt (both hex-encoded).
pub fn verify_password(password: &str, hash_hex: &str, salt_hex: &str) -> bool {
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ITERATIONS, &mut hash);

    // Constant-time comparison
    expected.len() == HASH_LEN
        && hash
            .iter()
            .zip(expected.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

/// Generate an opaque refresh token. Returns hex-encoded random bytes.
pub fn generate_refresh_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes).map_err(|e| AuthError::Rng(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// SHA-256 digest of a token for storage and lookup. Hex-encoded.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_round_trip() {
        let (hash, salt) = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash, &salt));
        assert!(!verify_password("hunter2hunter3", &hash, &salt));
    }

    #[test]
    fn test_salts_are_unique_per_hash() {
        let (_, salt_a) = hash_password("same password").unwrap();
        let (_, salt_b) = hash_password("same password").unwrap();
        assert_ne!(salt_a, salt_b);
    }

    #[test]
    fn test_malformed_stored_values_never_verify() {
        assert!(!verify_password("anything", "not-hex", "also-not-hex"));
        assert!(!verify_password("anything", "", ""));
    }

    #[test]
    fn test_token_hash_is_deterministic_hex() {
        let token = "0123456789abcdef";
        let digest = hash_token(token);
        assert_eq!(digest, hash_token(token));
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
