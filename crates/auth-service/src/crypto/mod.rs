//! Token codec and password hashing.
//!
//! Tokens are HS256-signed JWTs carrying `sub`, `iat`, `exp` and a `jti`
//! nonce. Signing and verification share one process-wide secret loaded at
//! startup. Password hashes are bcrypt; `is_bcrypt_hash` lets the startup
//! rehash pass distinguish legacy plaintext rows from already-migrated ones.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::config::TOKEN_VALIDITY_SECONDS;
use crate::errors::AuthError;

/// Maximum serialized token size accepted by the parser. Anything larger is
/// rejected before signature verification to bound decode work.
pub const MAX_JWT_SIZE_BYTES: usize = 4096;

/// Claims carried in every issued token.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the username the token was issued to.
    pub sub: String,
    /// Issued-at, seconds since epoch.
    pub iat: i64,
    /// Expiry, seconds since epoch. The persisted `expired` flag overrides
    /// this claim; revocation wins even while `exp` is in the future.
    pub exp: i64,
    /// Unique token id. Makes every issued token string distinct even when
    /// two issues for the same subject land in the same second.
    pub jti: String,
}

impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &self.sub)
            .field("iat", &self.iat)
            .field("exp", &self.exp)
            .field("jti", &"[REDACTED]")
            .finish()
    }
}

/// Sign a new token for `username`, valid for [`TOKEN_VALIDITY_SECONDS`].
pub fn generate_token(secret_key: &[u8], username: &str) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: username.to_string(),
        iat: now,
        exp: now + TOKEN_VALIDITY_SECONDS,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret_key),
    )
    .map_err(|e| AuthError::Crypto(format!("Failed to sign token: {}", e)))
}

/// Verify a token's signature and `exp` claim, returning its claims.
///
/// Every failure mode collapses to [`AuthError::InvalidToken`]; the caller
/// never learns whether the signature, structure, or expiry was at fault.
pub fn parse_token(secret_key: &[u8], token: &str) -> Result<Claims, AuthError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "auth.crypto",
            size = token.len(),
            "Rejecting oversized token"
        );
        return Err(AuthError::InvalidToken);
    }

    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &DecodingKey::from_secret(secret_key), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(target: "auth.crypto", error = %e, "Token validation failed");
            AuthError::InvalidToken
        })
}

/// Hash a password with bcrypt at the given cost (clamped to the supported
/// range).
pub fn hash_password(password: &SecretString, cost: u32) -> Result<String, AuthError> {
    let cost = cost.clamp(
        crate::config::MIN_BCRYPT_COST,
        crate::config::MAX_BCRYPT_COST,
    );
    bcrypt::hash(password.expose_secret(), cost)
        .map_err(|e| AuthError::Crypto(format!("Failed to hash password: {}", e)))
}

/// Verify a password against a stored bcrypt hash.
///
/// A malformed stored hash verifies as false rather than erroring, so a
/// corrupt row degrades to a failed login instead of a 500.
pub fn verify_password(password: &SecretString, hash: &str) -> bool {
    bcrypt::verify(password.expose_secret(), hash).unwrap_or(false)
}

/// True when the stored value already looks like a bcrypt hash.
pub fn is_bcrypt_hash(value: &str) -> bool {
    (value.starts_with("$2a$") || value.starts_with("$2b$") || value.starts_with("$2y$"))
        && value.len() == 60
}
