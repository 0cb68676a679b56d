//! Persistence traits for identities and session tokens.
//!
//! Two implementations exist: [`postgres`] backs the running service and
//! [`memory`] backs the test suite. Both uphold the same contracts, notably
//! username and access-token uniqueness and the one-way `expired` flag.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AuthError;
use crate::models::{Identity, NewIdentity, NewSessionToken, SessionToken};

pub mod memory;
pub mod postgres;

/// Pagination parameters for listing endpoints. Pages are 1-based.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub const DEFAULT_SIZE: u32 = 20;
    pub const MAX_SIZE: u32 = 100;

    /// Build a page from raw query values, clamping into the valid range.
    pub fn new(number: Option<u32>, size: Option<u32>) -> Self {
        Self {
            number: number.unwrap_or(1).max(1),
            size: size.unwrap_or(Self::DEFAULT_SIZE).clamp(1, Self::MAX_SIZE),
        }
    }

    pub fn offset(&self) -> u64 {
        // Tolerates a literal `Page { number: 0, .. }` built without `new`.
        u64::from(self.number.saturating_sub(1)) * u64::from(self.size)
    }
}

/// Storage for identities (the users table).
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up an identity by its unique username.
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, AuthError>;

    /// Persist a new identity. Fails with [`AuthError::UsernameTaken`] when
    /// the username already exists.
    async fn save(&self, identity: NewIdentity) -> Result<Identity, AuthError>;

    /// Look up an identity by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError>;

    /// Replace the stored password hash for an identity.
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError>;

    /// Identities whose stored password value is not a bcrypt hash.
    /// Feeds the startup rehash pass.
    async fn find_with_legacy_password(&self) -> Result<Vec<Identity>, AuthError>;
}

/// Storage for issued session tokens (the tokens table). Append-only apart
/// from the one-way `expired` transition.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a freshly issued token with `expired = false`.
    async fn save(&self, token: NewSessionToken) -> Result<SessionToken, AuthError>;

    /// Look up a token record by the exact signed token string.
    async fn find_by_access_token(&self, access_token: &str)
        -> Result<Option<SessionToken>, AuthError>;

    /// Look up a token record by id.
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SessionToken>, AuthError>;

    /// Page through tokens issued to one user, newest first.
    async fn find_by_user_id(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<SessionToken>, AuthError>;

    /// Page through all tokens, newest first.
    async fn find_all(&self, page: Page) -> Result<Vec<SessionToken>, AuthError>;

    /// Active tokens created before `threshold`. Sweep input.
    async fn find_stale(&self, threshold: DateTime<Utc>) -> Result<Vec<SessionToken>, AuthError>;

    /// Mark the given tokens expired. Already-expired ids are skipped, so a
    /// repeated call with the same ids is a no-op. Returns the number of
    /// rows that actually transitioned.
    async fn mark_expired(&self, ids: &[Uuid]) -> Result<u64, AuthError>;
}
