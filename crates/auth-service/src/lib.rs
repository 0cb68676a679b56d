//! Token Gate authentication service library.
//!
//! Resolves request credentials (HTTP Basic and bearer tokens) to a
//! request-scoped principal, issues and persists signed session tokens,
//! and revokes them through a background expiry sweep.
//!
//! # Architecture
//!
//! Requests flow through the authentication filter into handlers:
//!
//! ```text
//! middleware/auth.rs -> routes/mod.rs -> handlers/*.rs -> services/*.rs -> store/*.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `crypto` - Token codec and password hashing
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Authentication filter and role guards
//! - `models` - Domain model types
//! - `services` - Providers, account lifecycle, token queries
//! - `store` - Persistence traits with Postgres and in-memory backends
//! - `tasks` - Token expiry sweep

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
pub mod store;
pub mod tasks;
