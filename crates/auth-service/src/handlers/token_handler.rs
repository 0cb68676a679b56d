//! Administrative token endpoints. All routes here sit behind the
//! ROLE_ADMIN guard.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AuthError;
use crate::handlers::account_handler::AppState;
use crate::models::TokenSummary;
use crate::store::Page;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub size: Option<u32>,
}

/// Page through all issued tokens.
///
/// GET /api/tokens?page&size
pub async fn list_tokens(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<TokenSummary>>, AuthError> {
    let page = Page::new(query.page, query.size);
    let tokens = state.tokens.list(page).await?;
    Ok(Json(tokens))
}

/// Fetch one token record.
///
/// GET /api/tokens/:id
pub async fn get_token(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<TokenSummary>, AuthError> {
    let token = state.tokens.get(id).await?;
    Ok(Json(token))
}

/// Page through tokens issued to one user.
///
/// GET /api/users/:id/tokens?page&size
pub async fn list_user_tokens(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Vec<TokenSummary>>, AuthError> {
    let page = Page::new(query.page, query.size);
    let tokens = state.tokens.list_for_user(id, page).await?;
    Ok(Json(tokens))
}
