//! HTTP handlers.

pub mod account_handler;
pub mod token_handler;

use axum::http::StatusCode;

/// Health check endpoint.
///
/// GET /health
pub async fn health_check() -> StatusCode {
    StatusCode::OK
}
