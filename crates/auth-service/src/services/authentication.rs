//! Credential resolution: providers and the coordinating authenticator.
//!
//! Each provider handles exactly one credential shape. The authenticator
//! walks its provider list, asks each whether it supports the submitted
//! credentials, and dispatches to the first match. No match is a terminal
//! failure, not a pass-through.

use std::sync::Arc;

use crate::crypto;
use crate::errors::AuthError;
use crate::models::{Credentials, Principal};
use crate::observability::metrics;
use crate::store::{CredentialStore, TokenStore};

/// Verifies Basic credentials against the stored bcrypt hash.
pub struct BasicProvider {
    credentials: Arc<dyn CredentialStore>,
}

impl BasicProvider {
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self { credentials }
    }

    pub fn supports(&self, credentials: &Credentials) -> bool {
        matches!(credentials, Credentials::Basic { .. })
    }

    /// Resolve Basic credentials to a principal.
    ///
    /// An unknown username and a wrong password both surface as 401; the
    /// distinction exists only in the variant, which stays in debug logs.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        let Credentials::Basic { username, password } = credentials else {
            return Err(AuthError::UnsupportedCredential);
        };

        let identity = self
            .credentials
            .find_by_username(username)
            .await?
            .ok_or(AuthError::UsernameNotFound)?;

        if !crypto::verify_password(password, &identity.password_hash) {
            tracing::debug!(
                target: "auth.providers",
                username = %username,
                "Password verification failed"
            );
            return Err(AuthError::AuthenticationFailed);
        }

        Ok(Principal::authenticated(
            identity.username,
            identity.role.authorities(),
        ))
    }
}

/// Verifies bearer tokens: signature first, then the persisted record.
///
/// The persisted `expired` flag is checked independently of the token's
/// `exp` claim. Revocation wins even while the signature is still valid.
pub struct BearerProvider {
    credentials: Arc<dyn CredentialStore>,
    tokens: Arc<dyn TokenStore>,
    secret_key: Vec<u8>,
}

impl BearerProvider {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<dyn TokenStore>,
        secret_key: Vec<u8>,
    ) -> Self {
        Self {
            credentials,
            tokens,
            secret_key,
        }
    }

    pub fn supports(&self, credentials: &Credentials) -> bool {
        matches!(credentials, Credentials::Bearer { .. })
    }

    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        let Credentials::Bearer { token } = credentials else {
            return Err(AuthError::UnsupportedCredential);
        };

        let claims = crypto::parse_token(&self.secret_key, token)?;

        let identity = self
            .credentials
            .find_by_username(&claims.sub)
            .await?
            .ok_or(AuthError::UsernameNotFound)?;

        let record = self
            .tokens
            .find_by_access_token(token)
            .await?
            .ok_or(AuthError::TokenNotFound)?;

        if record.expired {
            tracing::debug!(
                target: "auth.providers",
                token_id = %record.id,
                "Rejecting revoked token"
            );
            return Err(AuthError::TokenExpired);
        }

        Ok(Principal::authenticated(
            identity.username,
            identity.role.authorities(),
        ))
    }
}

/// The provider set, as a closed sum. Adding a credential shape means
/// adding a variant here and handling it exhaustively.
pub enum Provider {
    Basic(BasicProvider),
    Bearer(BearerProvider),
}

impl Provider {
    pub fn supports(&self, credentials: &Credentials) -> bool {
        match self {
            Provider::Basic(p) => p.supports(credentials),
            Provider::Bearer(p) => p.supports(credentials),
        }
    }

    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        match self {
            Provider::Basic(p) => p.authenticate(credentials).await,
            Provider::Bearer(p) => p.authenticate(credentials).await,
        }
    }

    fn scheme(&self) -> &'static str {
        match self {
            Provider::Basic(_) => "basic",
            Provider::Bearer(_) => "bearer",
        }
    }
}

/// Dispatches submitted credentials to the supporting provider.
pub struct Authenticator {
    providers: Vec<Provider>,
}

impl Authenticator {
    pub fn new(providers: Vec<Provider>) -> Self {
        Self { providers }
    }

    /// Build the standard provider set: Basic and Bearer.
    pub fn standard(
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<dyn TokenStore>,
        secret_key: Vec<u8>,
    ) -> Self {
        Self::new(vec![
            Provider::Basic(BasicProvider::new(Arc::clone(&credentials))),
            Provider::Bearer(BearerProvider::new(credentials, tokens, secret_key)),
        ])
    }

    /// Resolve credentials to a principal via the first supporting provider.
    pub async fn authenticate(&self, credentials: &Credentials) -> Result<Principal, AuthError> {
        let provider = self
            .providers
            .iter()
            .find(|p| p.supports(credentials))
            .ok_or(AuthError::UnsupportedCredential)?;

        let result = provider.authenticate(credentials).await;
        metrics::record_authentication(provider.scheme(), result.is_ok());
        result
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::models::{NewIdentity, NewSessionToken, Role, TokenType};
    use crate::store::memory::{MemoryCredentialStore, MemoryTokenStore};
    use secrecy::SecretString;

    const TEST_KEY: &[u8] = &[9u8; 32];

    struct Fixture {
        credentials: Arc<MemoryCredentialStore>,
        tokens: Arc<MemoryTokenStore>,
        authenticator: Authenticator,
    }

    async fn fixture_with_user(username: &str, password: &str, role: Role) -> Fixture {
        let credentials = Arc::new(MemoryCredentialStore::new());
        let tokens = Arc::new(MemoryTokenStore::new());

        let hash =
            crypto::hash_password(&SecretString::from(password.to_string()), 10).unwrap();
        credentials
            .save(NewIdentity {
                username: username.to_string(),
                password_hash: hash,
                role,
            })
            .await
            .unwrap();

        let authenticator = Authenticator::standard(
            Arc::clone(&credentials) as Arc<dyn CredentialStore>,
            Arc::clone(&tokens) as Arc<dyn TokenStore>,
            TEST_KEY.to_vec(),
        );

        Fixture {
            credentials,
            tokens,
            authenticator,
        }
    }

    fn basic(username: &str, password: &str) -> Credentials {
        Credentials::Basic {
            username: username.to_string(),
            password: SecretString::from(password.to_string()),
        }
    }

    async fn issue(fixture: &Fixture, username: &str) -> String {
        let token = crypto::generate_token(TEST_KEY, username).unwrap();
        let user = fixture
            .credentials
            .find_by_username(username)
            .await
            .unwrap()
            .unwrap();
        fixture
            .tokens
            .save(NewSessionToken {
                access_token: token.clone(),
                token_type: TokenType::Bearer,
                user_id: user.id,
            })
            .await
            .unwrap();
        token
    }

    #[tokio::test]
    async fn test_basic_success() {
        let fixture = fixture_with_user("alice", "P@ssw0rd1", Role::User).await;
        let principal = fixture
            .authenticator
            .authenticate(&basic("alice", "P@ssw0rd1"))
            .await
            .unwrap();
        assert!(principal.authenticated);
        assert_eq!(principal.username, "alice");
        assert!(principal.has_authority("ROLE_USER"));
    }

    #[tokio::test]
    async fn test_basic_wrong_password() {
        let fixture = fixture_with_user("alice", "P@ssw0rd1", Role::User).await;
        let result = fixture
            .authenticator
            .authenticate(&basic("alice", "wrong"))
            .await;
        assert!(matches!(result, Err(AuthError::AuthenticationFailed)));
    }

    #[tokio::test]
    async fn test_basic_unknown_username() {
        let fixture = fixture_with_user("alice", "P@ssw0rd1", Role::User).await;
        let result = fixture
            .authenticator
            .authenticate(&basic("mallory", "P@ssw0rd1"))
            .await;
        assert!(matches!(result, Err(AuthError::UsernameNotFound)));
    }

    #[tokio::test]
    async fn test_bearer_success() {
        let fixture = fixture_with_user("alice", "P@ssw0rd1", Role::Admin).await;
        let token = issue(&fixture, "alice").await;

        let principal = fixture
            .authenticator
            .authenticate(&Credentials::Bearer { token })
            .await
            .unwrap();
        assert!(principal.has_authority("ROLE_ADMIN"));
    }

    #[tokio::test]
    async fn test_bearer_unpersisted_token_rejected() {
        let fixture = fixture_with_user("alice", "P@ssw0rd1", Role::User).await;
        // Validly signed but never stored.
        let token = crypto::generate_token(TEST_KEY, "alice").unwrap();

        let result = fixture
            .authenticator
            .authenticate(&Credentials::Bearer { token })
            .await;
        assert!(matches!(result, Err(AuthError::TokenNotFound)));
    }

    #[tokio::test]
    async fn test_bearer_revoked_token_rejected_despite_valid_exp() {
        let fixture = fixture_with_user("alice", "P@ssw0rd1", Role::User).await;
        let token = issue(&fixture, "alice").await;

        let record = fixture
            .tokens
            .find_by_access_token(&token)
            .await
            .unwrap()
            .unwrap();
        fixture.tokens.mark_expired(&[record.id]).await.unwrap();

        // The signature and exp claim are still valid; only the record is
        // revoked.
        assert!(crypto::parse_token(TEST_KEY, &token).is_ok());
        let result = fixture
            .authenticator
            .authenticate(&Credentials::Bearer { token })
            .await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn test_bearer_bad_signature_rejected() {
        let fixture = fixture_with_user("alice", "P@ssw0rd1", Role::User).await;
        let token = crypto::generate_token(&[1u8; 32], "alice").unwrap();

        let result = fixture
            .authenticator
            .authenticate(&Credentials::Bearer { token })
            .await;
        assert!(matches!(result, Err(AuthError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_empty_provider_set_is_terminal() {
        let authenticator = Authenticator::new(Vec::new());
        let result = authenticator.authenticate(&basic("alice", "pw")).await;
        assert!(matches!(result, Err(AuthError::UnsupportedCredential)));
    }
}
