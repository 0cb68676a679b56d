//! HTTP routes.
//!
//! Defines the Axum router. The authentication filter wraps the whole
//! router so every request carries a principal; role guards sit on the
//! administrative routes only.

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::handlers::{self, account_handler, token_handler};
use crate::handlers::account_handler::AppState;
use crate::middleware::auth::{self, AuthFilterState};
use crate::models::Role;

/// Build the application routes.
///
/// Layer order matters: the authentication filter is attached last so it
/// runs first and the role guards downstream of it can read the principal
/// from request extensions.
pub fn build_routes(state: AppState, filter_state: AuthFilterState) -> Router {
    let admin_routes = Router::new()
        .route("/api/tokens", get(token_handler::list_tokens))
        .route("/api/tokens/:id", get(token_handler::get_token))
        .route("/api/users/:id/tokens", get(token_handler::list_user_tokens))
        .route_layer(middleware::from_fn_with_state(
            Role::Admin,
            auth::require_role,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/users/register", post(account_handler::register))
        .route("/api/users/authenticate", post(account_handler::authenticate))
        .route("/api/users/me", get(account_handler::current_principal))
        .merge(admin_routes)
        .with_state(state)
        .layer(middleware::from_fn_with_state(
            filter_state,
            auth::authenticate_request,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
}
