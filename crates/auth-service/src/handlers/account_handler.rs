//! Account endpoints: registration, sign-in, and the current principal.

use axum::{
    extract::State,
    http::StatusCode,
    Extension, Json,
};
use std::sync::Arc;

use crate::errors::AuthError;
use crate::models::{AccountRequest, Principal, TokenResponse};
use crate::services::account::AccountService;
use crate::services::tokens::TokenQueryService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub tokens: Arc<TokenQueryService>,
}

/// Register a new account and return its first token.
///
/// POST /api/users/register
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<AccountRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AuthError> {
    let token = state
        .accounts
        .sign_up(&payload.username, &payload.password)
        .await?;
    Ok((StatusCode::CREATED, Json(TokenResponse::from(token))))
}

/// Verify a username/password pair and return a fresh token.
///
/// POST /api/users/authenticate
pub async fn authenticate(
    State(state): State<AppState>,
    Json(payload): Json<AccountRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let token = state
        .accounts
        .sign_in(&payload.username, &payload.password)
        .await?;
    Ok(Json(TokenResponse::from(token)))
}

/// The authenticated principal for this request.
///
/// GET /api/users/me
pub async fn current_principal(
    Extension(principal): Extension<Principal>,
) -> Result<Json<Principal>, AuthError> {
    if !principal.authenticated {
        return Err(AuthError::AuthenticationFailed);
    }
    Ok(Json(principal))
}
