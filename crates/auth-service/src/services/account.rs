//! Account lifecycle: sign-up, sign-in, token issuance, and the startup
//! rehash of legacy plaintext passwords.

use secrecy::{ExposeSecret, SecretString};
use std::sync::Arc;
use tracing::instrument;

use crate::crypto;
use crate::errors::AuthError;
use crate::models::{NewIdentity, NewSessionToken, Role, SessionToken, TokenType};
use crate::observability::metrics;
use crate::store::{CredentialStore, TokenStore};

const USERNAME_MIN_LEN: usize = 3;
const USERNAME_MAX_LEN: usize = 64;
const PASSWORD_MIN_LEN: usize = 8;
const PASSWORD_MAX_LEN: usize = 128;

pub struct AccountService {
    credentials: Arc<dyn CredentialStore>,
    tokens: Arc<dyn TokenStore>,
    secret_key: Vec<u8>,
    bcrypt_cost: u32,
}

impl AccountService {
    pub fn new(
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<dyn TokenStore>,
        secret_key: Vec<u8>,
        bcrypt_cost: u32,
    ) -> Self {
        Self {
            credentials,
            tokens,
            secret_key,
            bcrypt_cost,
        }
    }

    /// Register a new account with role USER and issue its first token.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn sign_up(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionToken, AuthError> {
        validate_username(username)?;
        validate_password(password)?;

        if self.credentials.find_by_username(username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = crypto::hash_password(password, self.bcrypt_cost)?;
        let identity = self
            .credentials
            .save(NewIdentity {
                username: username.to_string(),
                password_hash,
                role: Role::User,
            })
            .await?;

        tracing::info!(
            target: "auth.account",
            username = %identity.username,
            user_id = %identity.id,
            "Registered new account"
        );

        self.issue_token(&identity.username, identity.id).await
    }

    /// Verify a username/password pair and issue a fresh token.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn sign_in(
        &self,
        username: &str,
        password: &SecretString,
    ) -> Result<SessionToken, AuthError> {
        let identity = self
            .credentials
            .find_by_username(username)
            .await?
            .ok_or(AuthError::UsernameNotFound)?;

        if !crypto::verify_password(password, &identity.password_hash) {
            return Err(AuthError::AuthenticationFailed);
        }

        self.issue_token(&identity.username, identity.id).await
    }

    /// Sign a token for `username` and persist it with `expired = false`.
    async fn issue_token(
        &self,
        username: &str,
        user_id: uuid::Uuid,
    ) -> Result<SessionToken, AuthError> {
        let access_token = crypto::generate_token(&self.secret_key, username)?;
        let token = self
            .tokens
            .save(NewSessionToken {
                access_token,
                token_type: TokenType::Bearer,
                user_id,
            })
            .await?;

        metrics::record_token_issued();
        tracing::info!(
            target: "auth.account",
            username = %username,
            token_id = %token.id,
            "Issued session token"
        );
        Ok(token)
    }

    /// Replace legacy plaintext password rows with bcrypt hashes.
    ///
    /// Runs once at startup. A plaintext value is treated as the password
    /// itself; the row is rewritten with its hash so the next sign-in
    /// verifies against bcrypt.
    #[instrument(skip_all)]
    pub async fn rehash_legacy_passwords(&self) -> Result<u64, AuthError> {
        let legacy = self.credentials.find_with_legacy_password().await?;
        let mut rehashed = 0;

        for identity in legacy {
            let plaintext = SecretString::from(identity.password_hash.clone());
            let hash = crypto::hash_password(&plaintext, self.bcrypt_cost)?;
            self.credentials
                .update_password_hash(identity.id, &hash)
                .await?;
            rehashed += 1;
        }

        if rehashed > 0 {
            tracing::info!(
                target: "auth.account",
                count = rehashed,
                "Rehashed legacy passwords"
            );
        }
        Ok(rehashed)
    }
}

fn validate_username(username: &str) -> Result<(), AuthError> {
    let len = username.chars().count();
    if !(USERNAME_MIN_LEN..=USERNAME_MAX_LEN).contains(&len) {
        return Err(AuthError::Validation(format!(
            "Username must be {}-{} characters",
            USERNAME_MIN_LEN, USERNAME_MAX_LEN
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(AuthError::Validation(
            "Username may only contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(())
}

fn validate_password(password: &SecretString) -> Result<(), AuthError> {
    let len = password.expose_secret().chars().count();
    if !(PASSWORD_MIN_LEN..=PASSWORD_MAX_LEN).contains(&len) {
        return Err(AuthError::Validation(format!(
            "Password must be {}-{} characters",
            PASSWORD_MIN_LEN, PASSWORD_MAX_LEN
        )));
    }
    Ok(())
}
