//! Administrative token queries. Listings return [`TokenSummary`] so raw
//! token strings never leave the issuance path.

use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AuthError;
use crate::models::TokenSummary;
use crate::store::{Page, TokenStore};

pub struct TokenQueryService {
    tokens: Arc<dyn TokenStore>,
}

impl TokenQueryService {
    pub fn new(tokens: Arc<dyn TokenStore>) -> Self {
        Self { tokens }
    }

    /// Page through all issued tokens, newest first.
    #[instrument(skip_all, fields(page = page.number, size = page.size))]
    pub async fn list(&self, page: Page) -> Result<Vec<TokenSummary>, AuthError> {
        let tokens = self.tokens.find_all(page).await?;
        Ok(tokens.into_iter().map(TokenSummary::from).collect())
    }

    /// Fetch a single token record by id.
    #[instrument(skip_all, fields(token_id = %id))]
    pub async fn get(&self, id: Uuid) -> Result<TokenSummary, AuthError> {
        self.tokens
            .find_by_id(id)
            .await?
            .map(TokenSummary::from)
            .ok_or_else(|| AuthError::NotFound("Token".to_string()))
    }

    /// Page through tokens issued to one user, newest first.
    #[instrument(skip_all, fields(user_id = %user_id, page = page.number))]
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> Result<Vec<TokenSummary>, AuthError> {
        let tokens = self.tokens.find_by_user_id(user_id, page).await?;
        Ok(tokens.into_iter().map(TokenSummary::from).collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{NewSessionToken, TokenType};
    use crate::store::memory::MemoryTokenStore;

    async fn seeded() -> (Arc<MemoryTokenStore>, TokenQueryService, Uuid) {
        let store = Arc::new(MemoryTokenStore::new());
        let user_id = Uuid::new_v4();
        for i in 0..3 {
            store
                .save(NewSessionToken {
                    access_token: format!("token-{}", i),
                    token_type: TokenType::Bearer,
                    user_id,
                })
                .await
                .unwrap();
        }
        let service = TokenQueryService::new(Arc::clone(&store) as Arc<dyn TokenStore>);
        (store, service, user_id)
    }

    #[tokio::test]
    async fn test_list_returns_summaries() {
        let (_, service, _) = seeded().await;
        let listed = service.list(Page::new(None, None)).await.unwrap();
        assert_eq!(listed.len(), 3);
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let (_, service, _) = seeded().await;
        let result = service.get(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AuthError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_for_user() {
        let (store, service, user_id) = seeded().await;
        store
            .save(NewSessionToken {
                access_token: "other-user".to_string(),
                token_type: TokenType::Bearer,
                user_id: Uuid::new_v4(),
            })
            .await
            .unwrap();

        let listed = service
            .list_for_user(user_id, Page::new(None, None))
            .await
            .unwrap();
        assert_eq!(listed.len(), 3);
    }
}
