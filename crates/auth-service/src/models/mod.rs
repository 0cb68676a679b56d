//! Domain model types shared across the service.

use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Role assigned to an identity. Maps deterministically to authority strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Guest,
    User,
    Admin,
}

impl Role {
    /// Authority strings granted by this role.
    pub fn authorities(&self) -> Vec<String> {
        vec![format!("ROLE_{}", self.as_str())]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "GUEST",
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }

    /// The authority string a route guard checks for.
    pub fn required_authority(&self) -> String {
        format!("ROLE_{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GUEST" => Ok(Role::Guest),
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Stored identity (maps to the users table).
///
/// The password hash is deliberately excluded from `Debug` output and is
/// never serialized to callers.
#[derive(Clone, sqlx::FromRow)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Fields for a new identity, before the store assigns id and timestamp.
#[derive(Clone)]
pub struct NewIdentity {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl fmt::Debug for NewIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewIdentity")
            .field("username", &self.username)
            .field("password_hash", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// Session token type. Only bearer tokens are issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenType {
    Bearer,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Bearer => "BEARER",
        }
    }
}

impl FromStr for TokenType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BEARER" => Ok(TokenType::Bearer),
            _ => Err(format!("Invalid token type: {}", s)),
        }
    }
}

impl TryFrom<String> for TokenType {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Issued session token (maps to the tokens table).
///
/// Rows are append-only: a token's owner never changes and `expired`
/// transitions false to true exactly once.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SessionToken {
    pub id: Uuid,
    pub access_token: String,
    #[sqlx(try_from = "String")]
    pub token_type: TokenType,
    pub created_at: DateTime<Utc>,
    pub expired: bool,
    pub user_id: Uuid,
}

/// Fields for a freshly issued token, before the store assigns id and
/// timestamp. `expired` always starts false.
#[derive(Debug, Clone)]
pub struct NewSessionToken {
    pub access_token: String,
    pub token_type: TokenType,
    pub user_id: Uuid,
}

/// Credential request extracted from the Authorization header.
///
/// A closed sum type: dispatch over the variants is exhaustive, there is no
/// open provider hierarchy. Never persisted; `Debug` redacts secrets.
#[derive(Clone)]
pub enum Credentials {
    Basic {
        username: String,
        password: SecretString,
    },
    Bearer {
        token: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credentials::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Credentials::Bearer { .. } => f
                .debug_struct("Bearer")
                .field("token", &"[REDACTED]")
                .finish(),
        }
    }
}

/// Resolved identity for the current request.
///
/// Produced by a provider, stored in request extensions by the filter and
/// discarded with the request. Never global state.
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    pub authenticated: bool,
    pub username: String,
    pub authorities: Vec<String>,
}

impl Principal {
    /// Principal for a request without usable credentials.
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            username: String::new(),
            authorities: Vec::new(),
        }
    }

    pub fn authenticated(username: impl Into<String>, authorities: Vec<String>) -> Self {
        Self {
            authenticated: true,
            username: username.into(),
            authorities,
        }
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.iter().any(|a| a == authority)
    }
}

/// Sign-up / sign-in request body.
#[derive(Deserialize)]
pub struct AccountRequest {
    pub username: String,
    pub password: SecretString,
}

impl fmt::Debug for AccountRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountRequest")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Token representation returned to callers. The raw access token appears
/// here and nowhere else in any response or log line.
#[derive(Debug, Clone, Serialize)]
pub struct TokenResponse {
    pub id: Uuid,
    pub access_token: String,
    pub token_type: &'static str,
    pub created_at: DateTime<Utc>,
    pub expired: bool,
    pub user_id: Uuid,
}

impl From<SessionToken> for TokenResponse {
    fn from(token: SessionToken) -> Self {
        Self {
            id: token.id,
            access_token: token.access_token,
            token_type: token.token_type.as_str(),
            created_at: token.created_at,
            expired: token.expired,
            user_id: token.user_id,
        }
    }
}

/// Token metadata for administrative listings: same shape as
/// [`TokenResponse`] minus the raw token string.
#[derive(Debug, Clone, Serialize)]
pub struct TokenSummary {
    pub id: Uuid,
    pub token_type: &'static str,
    pub created_at: DateTime<Utc>,
    pub expired: bool,
    pub user_id: Uuid,
}

impl From<SessionToken> for TokenSummary {
    fn from(token: SessionToken) -> Self {
        Self {
            id: token.id,
            token_type: token.token_type.as_str(),
            created_at: token.created_at,
            expired: token.expired,
            user_id: token.user_id,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_role_authorities() {
        assert_eq!(Role::User.authorities(), vec!["ROLE_USER".to_string()]);
        assert_eq!(Role::Admin.authorities(), vec!["ROLE_ADMIN".to_string()]);
        assert_eq!(Role::Guest.authorities(), vec!["ROLE_GUEST".to_string()]);
    }

    #[test]
    fn test_role_parsing_round_trip() {
        for role in [Role::Guest, Role::User, Role::Admin] {
            assert_eq!(role.as_str().parse::<Role>().ok(), Some(role));
        }
        assert!("SUPERUSER".parse::<Role>().is_err());
    }

    #[test]
    fn test_token_type_parsing() {
        assert_eq!("BEARER".parse::<TokenType>().ok(), Some(TokenType::Bearer));
        assert!("REFRESH".parse::<TokenType>().is_err());
    }

    #[test]
    fn test_anonymous_principal() {
        let principal = Principal::anonymous();
        assert!(!principal.authenticated);
        assert!(principal.authorities.is_empty());
        assert!(!principal.has_authority("ROLE_USER"));
    }

    #[test]
    fn test_authenticated_principal_authorities() {
        let principal = Principal::authenticated("alice", Role::Admin.authorities());
        assert!(principal.authenticated);
        assert!(principal.has_authority("ROLE_ADMIN"));
        assert!(!principal.has_authority("ROLE_USER"));
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let basic = Credentials::Basic {
            username: "alice".to_string(),
            password: SecretString::from("P@ssw0rd1".to_string()),
        };
        let debug = format!("{:?}", basic);
        assert!(debug.contains("alice"));
        assert!(!debug.contains("P@ssw0rd1"));

        let bearer = Credentials::Bearer {
            token: "abc.def.ghi".to_string(),
        };
        let debug = format!("{:?}", bearer);
        assert!(!debug.contains("abc.def.ghi"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_identity_debug_redacts_hash() {
        let identity = Identity {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            password_hash: "$2b$12$abcdefghijklmnopqrstuv".to_string(),
            role: Role::User,
            created_at: Utc::now(),
        };
        let debug = format!("{:?}", identity);
        assert!(!debug.contains("$2b$12$"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_token_summary_omits_access_token() {
        let token = SessionToken {
            id: Uuid::new_v4(),
            access_token: "header.payload.signature".to_string(),
            token_type: TokenType::Bearer,
            created_at: Utc::now(),
            expired: false,
            user_id: Uuid::new_v4(),
        };
        let summary = TokenSummary::from(token);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("header.payload.signature"));
        assert!(json.contains("BEARER"));
    }
}
