//! Error taxonomy and the failure entry points.
//!
//! Every terminal authentication failure funnels through
//! [`AuthError::into_response`], which shapes the uniform
//! `{status, message, error_code}` body. All authentication-layer variants
//! share one generic 401 message so the wire never distinguishes an unknown
//! username from a wrong password or a revoked token; the specific variant
//! is visible only in debug logs.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

pub const AUTHENTICATION_FAILED_ERROR_CODE: u32 = 1_000_005;
pub const ACCESS_DENIED_ERROR_CODE: u32 = 1_000_001;
pub const BAD_REQUEST_ERROR_CODE: u32 = 400_001;
pub const NOT_FOUND_ERROR_CODE: u32 = 404_001;
pub const CONFLICT_ERROR_CODE: u32 = 409_001;
pub const INTERNAL_SERVER_ERROR_CODE: u32 = 500_001;

const GENERIC_AUTH_FAILURE_MESSAGE: &str = "Authentication failed";

/// Terminal, non-retryable errors raised by the authentication core.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Password verification failed, or a credential could not be used.
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// No identity exists for the requested username. Collapsed into the
    /// same 401 body as [`AuthError::AuthenticationFailed`] on the wire.
    #[error("Username not found")]
    UsernameNotFound,

    /// The presented token was never issued, or has been purged.
    #[error("Token not found")]
    TokenNotFound,

    /// The persisted token record has been revoked by the expiry sweep.
    #[error("Token expired")]
    TokenExpired,

    /// Signature, structure, or `exp` claim rejected by the codec.
    #[error("Invalid token")]
    InvalidToken,

    /// No provider supports the submitted credential shape.
    #[error("Unsupported credential type")]
    UnsupportedCredential,

    /// Principal resolved but lacks the authority the route requires.
    #[error("Access denied: requires {required}")]
    AccessDenied { required: String },

    /// Sign-up with a username that is already taken.
    #[error("Username already taken")]
    UsernameTaken,

    /// Request body failed validation.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested entity does not exist (administrative lookups).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Store-layer failure. The detail string stays server-side.
    #[error("Store error: {0}")]
    Store(String),

    /// Cryptographic operation failed. The detail string stays server-side.
    #[error("Crypto error: {0}")]
    Crypto(String),
}

impl AuthError {
    /// True for failures of the authentication layer itself (mapped to 401).
    pub fn is_unauthorized(&self) -> bool {
        matches!(
            self,
            AuthError::AuthenticationFailed
                | AuthError::UsernameNotFound
                | AuthError::TokenNotFound
                | AuthError::TokenExpired
                | AuthError::InvalidToken
                | AuthError::UnsupportedCredential
        )
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    status: u16,
    message: String,
    error_code: u32,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let (status, message, error_code) = match &self {
            AuthError::AuthenticationFailed
            | AuthError::UsernameNotFound
            | AuthError::TokenNotFound
            | AuthError::TokenExpired
            | AuthError::InvalidToken
            | AuthError::UnsupportedCredential => (
                StatusCode::UNAUTHORIZED,
                GENERIC_AUTH_FAILURE_MESSAGE.to_string(),
                AUTHENTICATION_FAILED_ERROR_CODE,
            ),
            AuthError::AccessDenied { required } => (
                StatusCode::FORBIDDEN,
                format!("Access denied: requires {}", required),
                ACCESS_DENIED_ERROR_CODE,
            ),
            AuthError::UsernameTaken => (
                StatusCode::CONFLICT,
                "Username already taken".to_string(),
                CONFLICT_ERROR_CODE,
            ),
            AuthError::Validation(detail) => (
                StatusCode::BAD_REQUEST,
                detail.clone(),
                BAD_REQUEST_ERROR_CODE,
            ),
            AuthError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                format!("{} not found", what),
                NOT_FOUND_ERROR_CODE,
            ),
            AuthError::Store(_) | AuthError::Crypto(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
                INTERNAL_SERVER_ERROR_CODE,
            ),
        };

        tracing::debug!(
            target: "auth.errors",
            error = %self,
            status = status.as_u16(),
            "Mapping error to response"
        );

        let body = ErrorBody {
            status: status.as_u16(),
            message,
            error_code,
        };

        (status, Json(body)).into_response()
    }
}
