use base64::{engine::general_purpose, Engine as _};
use std::collections::HashMap;
use std::env;
use std::fmt;
use thiserror::Error;

/// Minimum decoded secret key length: HMAC-SHA256 keys shorter than the
/// digest size weaken the MAC.
pub const MIN_SECRET_KEY_BYTES: usize = 32;

/// Signed-token validity. Fixed, not a tunable: store-side revocation via
/// the sweep is the operative expiry mechanism.
pub const TOKEN_VALIDITY_SECONDS: i64 = 24 * 60 * 60;

pub const MIN_BCRYPT_COST: u32 = 10;
pub const MAX_BCRYPT_COST: u32 = 14;
pub const DEFAULT_BCRYPT_COST: u32 = 12;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_TTL_MINUTES: i64 = 15;
const DEFAULT_SWEEP_INTERVAL_SECONDS: u64 = 60;

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub bind_address: String,
    /// Process-wide HMAC signing secret, loaded once, immutable thereafter.
    pub secret_key: Vec<u8>,
    /// Minutes after issuance at which the sweep revokes a token.
    pub token_ttl_minutes: i64,
    /// Sweep tick period; independent of the TTL. Bounds the staleness
    /// window during which an objectively-expired token still authenticates.
    pub sweep_interval_seconds: u64,
    pub bcrypt_cost: u32,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &self.database_url)
            .field("bind_address", &self.bind_address)
            .field("secret_key", &"[REDACTED]")
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("sweep_interval_seconds", &self.sweep_interval_seconds)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid secret key: {0}")]
    InvalidSecretKey(String),

    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let database_url = vars
            .get("DATABASE_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?
            .clone();

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let secret_key_base64 = vars
            .get("AUTH_SECRET_KEY")
            .ok_or_else(|| ConfigError::MissingEnvVar("AUTH_SECRET_KEY".to_string()))?;

        let secret_key = general_purpose::STANDARD
            .decode(secret_key_base64)
            .map_err(ConfigError::Base64Error)?;

        if secret_key.len() < MIN_SECRET_KEY_BYTES {
            return Err(ConfigError::InvalidSecretKey(format!(
                "Expected at least {} bytes, got {}",
                MIN_SECRET_KEY_BYTES,
                secret_key.len()
            )));
        }

        let token_ttl_minutes =
            parse_or_default(vars, "TOKEN_TTL_MINUTES", DEFAULT_TTL_MINUTES)?;
        if token_ttl_minutes <= 0 {
            return Err(ConfigError::InvalidValue(
                "TOKEN_TTL_MINUTES".to_string(),
                "must be positive".to_string(),
            ));
        }

        let sweep_interval_seconds =
            parse_or_default(vars, "SWEEP_INTERVAL_SECONDS", DEFAULT_SWEEP_INTERVAL_SECONDS)?;
        if sweep_interval_seconds == 0 {
            return Err(ConfigError::InvalidValue(
                "SWEEP_INTERVAL_SECONDS".to_string(),
                "must be positive".to_string(),
            ));
        }

        let bcrypt_cost = parse_or_default(vars, "BCRYPT_COST", DEFAULT_BCRYPT_COST)?;
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&bcrypt_cost) {
            return Err(ConfigError::InvalidValue(
                "BCRYPT_COST".to_string(),
                format!("must be {}-{}", MIN_BCRYPT_COST, MAX_BCRYPT_COST),
            ));
        }

        Ok(Config {
            database_url,
            bind_address,
            secret_key,
            token_ttl_minutes,
            sweep_interval_seconds,
            bcrypt_cost,
        })
    }
}

fn parse_or_default<T: std::str::FromStr>(
    vars: &HashMap<String, String>,
    key: &str,
    default: T,
) -> Result<T, ConfigError> {
    match vars.get(key) {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|_| {
            ConfigError::InvalidValue(key.to_string(), format!("cannot parse {:?}", raw))
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn test_secret_key_base64() -> String {
        general_purpose::STANDARD.encode([7u8; 32])
    }

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (
                "DATABASE_URL".to_string(),
                "postgresql://localhost/auth".to_string(),
            ),
            ("AUTH_SECRET_KEY".to_string(), test_secret_key_base64()),
        ])
    }

    #[test]
    fn test_from_vars_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load");
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.token_ttl_minutes, 15);
        assert_eq!(config.sweep_interval_seconds, 60);
        assert_eq!(config.bcrypt_cost, DEFAULT_BCRYPT_COST);
        assert_eq!(config.secret_key.len(), 32);
    }

    #[test]
    fn test_from_vars_overrides() {
        let mut vars = base_vars();
        vars.insert("BIND_ADDRESS".to_string(), "127.0.0.1:9999".to_string());
        vars.insert("TOKEN_TTL_MINUTES".to_string(), "30".to_string());
        vars.insert("SWEEP_INTERVAL_SECONDS".to_string(), "5".to_string());
        vars.insert("BCRYPT_COST".to_string(), "10".to_string());

        let config = Config::from_vars(&vars).expect("Config should load");
        assert_eq!(config.bind_address, "127.0.0.1:9999");
        assert_eq!(config.token_ttl_minutes, 30);
        assert_eq!(config.sweep_interval_seconds, 5);
        assert_eq!(config.bcrypt_cost, 10);
    }

    #[test]
    fn test_missing_database_url() {
        let vars = HashMap::from([("AUTH_SECRET_KEY".to_string(), test_secret_key_base64())]);
        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "DATABASE_URL"));
    }

    #[test]
    fn test_missing_secret_key() {
        let vars = HashMap::from([(
            "DATABASE_URL".to_string(),
            "postgresql://localhost/auth".to_string(),
        )]);
        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(v)) if v == "AUTH_SECRET_KEY"));
    }

    #[test]
    fn test_secret_key_invalid_base64() {
        let mut vars = base_vars();
        vars.insert("AUTH_SECRET_KEY".to_string(), "!!not-base64!!".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::Base64Error(_))
        ));
    }

    #[test]
    fn test_secret_key_too_short() {
        let mut vars = base_vars();
        vars.insert(
            "AUTH_SECRET_KEY".to_string(),
            general_purpose::STANDARD.encode([0u8; 16]),
        );
        let result = Config::from_vars(&vars);
        assert!(
            matches!(result, Err(ConfigError::InvalidSecretKey(msg)) if msg.contains("got 16"))
        );
    }

    #[test]
    fn test_longer_secret_key_accepted() {
        let mut vars = base_vars();
        vars.insert(
            "AUTH_SECRET_KEY".to_string(),
            general_purpose::STANDARD.encode([0u8; 64]),
        );
        let config = Config::from_vars(&vars).expect("Config should load");
        assert_eq!(config.secret_key.len(), 64);
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let mut vars = base_vars();
        vars.insert("TOKEN_TTL_MINUTES".to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(key, _)) if key == "TOKEN_TTL_MINUTES"
        ));
    }

    #[test]
    fn test_unparseable_interval_rejected() {
        let mut vars = base_vars();
        vars.insert(
            "SWEEP_INTERVAL_SECONDS".to_string(),
            "not-a-number".to_string(),
        );
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(key, _)) if key == "SWEEP_INTERVAL_SECONDS"
        ));
    }

    #[test]
    fn test_bcrypt_cost_out_of_range() {
        let mut vars = base_vars();
        vars.insert("BCRYPT_COST".to_string(), "4".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidValue(key, _)) if key == "BCRYPT_COST"
        ));
    }

    #[test]
    fn test_debug_redacts_secret_key() {
        let config = Config::from_vars(&base_vars()).expect("Config should load");
        let debug = format!("{:?}", config);
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("secret_key: ["));
    }
}
