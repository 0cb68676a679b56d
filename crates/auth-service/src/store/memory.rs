//! In-memory store implementations backing the test suite.
//!
//! Behavioral contracts mirror the Postgres implementations exactly:
//! uniqueness violations surface the same errors, ordering is newest first,
//! and `mark_expired` only counts rows that actually transitioned.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::crypto::is_bcrypt_hash;
use crate::errors::AuthError;
use crate::models::{Identity, NewIdentity, NewSessionToken, SessionToken};
use crate::store::{CredentialStore, Page, TokenStore};

#[derive(Default)]
pub struct MemoryCredentialStore {
    identities: RwLock<HashMap<Uuid, Identity>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<Identity>, AuthError> {
        let identities = self.identities.read().await;
        Ok(identities
            .values()
            .find(|i| i.username == username)
            .cloned())
    }

    async fn save(&self, identity: NewIdentity) -> Result<Identity, AuthError> {
        let mut identities = self.identities.write().await;
        if identities
            .values()
            .any(|i| i.username == identity.username)
        {
            return Err(AuthError::UsernameTaken);
        }

        let stored = Identity {
            id: Uuid::new_v4(),
            username: identity.username,
            password_hash: identity.password_hash,
            role: identity.role,
            created_at: Utc::now(),
        };
        identities.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Identity>, AuthError> {
        let identities = self.identities.read().await;
        Ok(identities.get(&id).cloned())
    }

    async fn update_password_hash(&self, id: Uuid, password_hash: &str) -> Result<(), AuthError> {
        let mut identities = self.identities.write().await;
        match identities.get_mut(&id) {
            Some(identity) => {
                identity.password_hash = password_hash.to_string();
                Ok(())
            }
            None => Err(AuthError::NotFound("User".to_string())),
        }
    }

    async fn find_with_legacy_password(&self) -> Result<Vec<Identity>, AuthError> {
        let identities = self.identities.read().await;
        Ok(identities
            .values()
            .filter(|i| !is_bcrypt_hash(&i.password_hash))
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct MemoryTokenStore {
    tokens: RwLock<HashMap<Uuid, SessionToken>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rewrite a token's creation timestamp. Test hook for aging tokens
    /// past the sweep threshold without sleeping.
    pub async fn backdate(&self, id: Uuid, created_at: DateTime<Utc>) {
        let mut tokens = self.tokens.write().await;
        if let Some(token) = tokens.get_mut(&id) {
            token.created_at = created_at;
        }
    }

    fn sorted_newest_first(mut tokens: Vec<SessionToken>) -> Vec<SessionToken> {
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        tokens
    }
}

#[async_trait]
impl TokenStore for MemoryTokenStore {
    async fn save(&self, token: NewSessionToken) -> Result<SessionToken, AuthError> {
        let mut tokens = self.tokens.write().await;
        if tokens
            .values()
            .any(|t| t.access_token == token.access_token)
        {
            return Err(AuthError::Store(
                "Duplicate access token".to_string(),
            ));
        }

        let stored = SessionToken {
            id: Uuid::new_v4(),
            access_token: token.access_token,
            token_type: token.token_type,
            created_at: Utc::now(),
            expired: false,
            user_id: token.user_id,
        };
        tokens.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_by_access_token(
        &self,
        access_token: &str,
    ) -> Result<Option<SessionToken>, AuthError> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .values()
            .find(|t| t.access_token == access_token)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<SessionToken>, AuthError> {
        let tokens = self.tokens.read().await;
        Ok(tokens.get(&id).cloned())
    }

    async fn find_by_user_id(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<SessionToken>, AuthError> {
        let tokens = self.tokens.read().await;
        let matching = Self::sorted_newest_first(
            tokens
                .values()
                .filter(|t| t.user_id == user_id)
                .cloned()
                .collect(),
        );
        Ok(matching
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect())
    }

    async fn find_all(&self, page: Page) -> Result<Vec<SessionToken>, AuthError> {
        let tokens = self.tokens.read().await;
        let all = Self::sorted_newest_first(tokens.values().cloned().collect());
        Ok(all
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .collect())
    }

    async fn find_stale(&self, threshold: DateTime<Utc>) -> Result<Vec<SessionToken>, AuthError> {
        let tokens = self.tokens.read().await;
        Ok(tokens
            .values()
            .filter(|t| !t.expired && t.created_at < threshold)
            .cloned()
            .collect())
    }

    async fn mark_expired(&self, ids: &[Uuid]) -> Result<u64, AuthError> {
        let mut tokens = self.tokens.write().await;
        let mut transitioned = 0;
        for id in ids {
            if let Some(token) = tokens.get_mut(id) {
                if !token.expired {
                    token.expired = true;
                    transitioned += 1;
                }
            }
        }
        Ok(transitioned)
    }
}
