//! Postgres-backed store implementations.
//!
//! All queries use parameterized statements. Uniqueness is enforced by the
//! schema (unique indexes on `users.username` and `tokens.access_token`);
//! the unique-violation code is translated back into the domain error so
//! callers see the same behavior as the in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AuthError;
use crate::models::{Identity, NewIdentity, NewSessionToken, SessionToken};
use crate::store::{CredentialStore, Page, TokenStore};

/// Postgres error code for unique constraint violations.
const UNIQUE_VIOLATION: &str = "23505";

fn store_error(e: sqlx::Error) -> AuthError {
    AuthError::Store(e.to_string())
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(
        e.as_database_error().and_then(|db| db.code()),
        Some(code) if code == UNIQUE_VIOLATION
    )
}

pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    #[instrument(skip_all, fields(username = %username))]
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, AuthError> {
        sqlx::query_as(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)
    }

    #[instrument(skip_all, fields(username = %identity.username))]
    async fn save(&self, identity: NewIdentity) -> Result<Identity, AuthError> {
        sqlx::query_as(
            r#"
            INSERT INTO users (id, username, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            RETURNING id, username, password_hash, role, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&identity.username)
        .bind(&identity.password_hash)
        .bind(identity.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::UsernameTaken
            } else {
                store_error(e)
            }
        })
    }

    #[instrument(skip_all, fields(user_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError> {
        sqlx::query_as(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)
    }

    #[instrument(skip_all, fields(user_id = %id))]
    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET password_hash = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        if result.rows_affected() == 0 {
            return Err(AuthError::NotFound("User".to_string()));
        }
        Ok(())
    }

    #[instrument(skip_all)]
    async fn find_with_legacy_password(&self) -> Result<Vec<Identity>, AuthError> {
        // Bcrypt hashes are exactly 60 characters with a $2a/$2b/$2y prefix;
        // anything else is a legacy plaintext row.
        sqlx::query_as(
            r#"
            SELECT id, username, password_hash, role, created_at
            FROM users
            WHERE password_hash !~ '^\$2[aby]\$.{56}$'
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)
    }
}

pub struct PgTokenStore {
    pool: PgPool,
}

impl PgTokenStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenStore for PgTokenStore {
    #[instrument(skip_all, fields(user_id = %token.user_id))]
    async fn save(&self, token: NewSessionToken) -> Result<SessionToken, AuthError> {
        sqlx::query_as(
            r#"
            INSERT INTO tokens (id, access_token, token_type, created_at, expired, user_id)
            VALUES ($1, $2, $3, NOW(), FALSE, $4)
            RETURNING id, access_token, token_type, created_at, expired, user_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&token.access_token)
        .bind(token.token_type.as_str())
        .bind(token.user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                AuthError::Store("Duplicate access token".to_string())
            } else {
                store_error(e)
            }
        })
    }

    #[instrument(skip_all)]
    async fn find_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<SessionToken>, AuthError> {
        sqlx::query_as(
            r#"
            SELECT id, access_token, token_type, created_at, expired, user_id
            FROM tokens
            WHERE access_token = $1
            "#,
        )
        .bind(access_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)
    }

    #[instrument(skip_all, fields(token_id = %id))]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SessionToken>, AuthError> {
        sqlx::query_as(
            r#"
            SELECT id, access_token, token_type, created_at, expired, user_id
            FROM tokens
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(store_error)
    }

    #[instrument(skip_all, fields(user_id = %user_id, page = page.number, size = page.size))]
    async fn find_by_user_id(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<SessionToken>, AuthError> {
        sqlx::query_as(
            r#"
            SELECT id, access_token, token_type, created_at, expired, user_id
            FROM tokens
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(i64::from(page.size))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)
    }

    #[instrument(skip_all, fields(page = page.number, size = page.size))]
    async fn find_all(&self, page: Page) -> Result<Vec<SessionToken>, AuthError> {
        sqlx::query_as(
            r#"
            SELECT id, access_token, token_type, created_at, expired, user_id
            FROM tokens
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(i64::from(page.size))
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)
    }

    #[instrument(skip_all)]
    async fn find_stale(&self, threshold: DateTime<Utc>) -> Result<Vec<SessionToken>, AuthError> {
        sqlx::query_as(
            r#"
            SELECT id, access_token, token_type, created_at, expired, user_id
            FROM tokens
            WHERE expired = FALSE
              AND created_at < $1
            "#,
        )
        .bind(threshold)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)
    }

    #[instrument(skip_all, fields(count = ids.len()))]
    async fn mark_expired(&self, ids: &[Uuid]) -> Result<u64, AuthError> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query(
            r#"
            UPDATE tokens
            SET expired = TRUE
            WHERE id = ANY($1)
              AND expired = FALSE
            "#,
        )
        .bind(ids)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected())
    }
}
