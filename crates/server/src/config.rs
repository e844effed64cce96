//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//! - `JWT_KEY` - HMAC signing key for bearer tokens (min 32 chars, high entropy)
//! - `JWT_ISSUER` - `iss` claim written to and required on every token
//! - `JWT_AUDIENCE` - `aud` claim written to and required on every token
//!
//! ## Optional
//! - `CATALOG_HOST` - Bind address (default: 127.0.0.1)
//! - `CATALOG_PORT` - Listen port (default: 5247)
//! - `CATALOG_BASE_URL` - Public URL; `https` turns on secure cookies (default: <http://localhost:5247>)
//! - `CATALOG_ENV` - `development` or `production` (default: production)
//! - `CATALOG_SESSION_IDLE_MINUTES` - Sliding cookie session lifetime (default: 20, at most one year)
//! - `JWT_DURATION_MINUTES` - Bearer token lifetime (default: 60, at most one year)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment tag

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_JWT_KEY_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Upper bound for minute-valued lifetimes (one year).
const MAX_LIFETIME_MINUTES: i64 = 525_600;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Deployment environment.
///
/// Development shows diagnostic error pages; production shows a generic one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    #[must_use]
    pub const fn is_development(self) -> bool {
        matches!(self, Self::Development)
    }
}

impl std::str::FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("expected development or production, got '{other}'")),
        }
    }
}

/// Catalog server configuration.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL
    pub base_url: String,
    /// Deployment environment
    pub environment: Environment,
    /// Cookie session idle timeout in minutes
    pub session_idle_minutes: i64,
    /// Bearer token settings
    pub jwt: JwtConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment tag
    pub sentry_environment: Option<String>,
}

/// Bearer token signing configuration.
///
/// Implements `Debug` manually to redact the signing key.
#[derive(Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 key
    pub key: SecretString,
    /// Expected `iss`
    pub issuer: String,
    /// Expected `aud`
    pub audience: String,
    /// Lifetime of an issued token
    pub duration_minutes: i64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("key", &"[REDACTED]")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("duration_minutes", &self.duration_minutes)
            .finish()
    }
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the JWT key fails validation (length, placeholder detection, entropy).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("CATALOG_DATABASE_URL")?;
        let host = parse_env("CATALOG_HOST", "127.0.0.1")?;
        let port = parse_env("CATALOG_PORT", "5247")?;
        let base_url = get_env_or_default("CATALOG_BASE_URL", "http://localhost:5247");
        url::Url::parse(&base_url)
            .map_err(|e| ConfigError::InvalidEnvVar("CATALOG_BASE_URL".to_owned(), e.to_string()))?;
        let environment = parse_env("CATALOG_ENV", "production")?;
        let session_idle_minutes = parse_minutes("CATALOG_SESSION_IDLE_MINUTES", "20")?;

        let jwt = JwtConfig::from_env()?;

        Ok(Self {
            database_url,
            host,
            port,
            base_url,
            environment,
            session_idle_minutes,
            jwt,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl JwtConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let key = get_validated_secret("JWT_KEY")?;
        validate_key_length(&key, "JWT_KEY")?;

        Ok(Self {
            key,
            issuer: get_required_env("JWT_ISSUER")?,
            audience: get_required_env("JWT_AUDIENCE")?,
            duration_minutes: parse_minutes("JWT_DURATION_MINUTES", "60")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable (or its default) with `FromStr`.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a lifetime in minutes, bounded to `1..=MAX_LIFETIME_MINUTES`.
fn parse_minutes(key: &str, default: &str) -> Result<i64, ConfigError> {
    check_minutes(key, parse_env(key, default)?)
}

fn check_minutes(key: &str, value: i64) -> Result<i64, ConfigError> {
    if value <= 0 {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        ));
    }
    if value > MAX_LIFETIME_MINUTES {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be at most {MAX_LIFETIME_MINUTES} minutes"),
        ));
    }
    Ok(value)
}

/// Validate that a signing key meets minimum length requirements.
fn validate_key_length(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_JWT_KEY_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_JWT_KEY_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated key."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample_config() -> CatalogConfig {
        CatalogConfig {
            database_url: SecretString::from("postgres://localhost/catalog"),
            host: "127.0.0.1".parse().unwrap(),
            port: 5247,
            base_url: "http://localhost:5247".to_string(),
            environment: Environment::Development,
            session_idle_minutes: 20,
            jwt: JwtConfig {
                key: SecretString::from("k9$Qz!v7Lp2#Wm4@Xr8&Tn1^Bc6*Hd3%"),
                issuer: "catalog".to_string(),
                audience: "catalog-clients".to_string(),
                duration_minutes: 60,
            },
            sentry_dsn: None,
            sentry_environment: None,
        }
    }

    #[test]
    fn test_check_minutes_bounds() {
        assert_eq!(check_minutes("JWT_DURATION_MINUTES", 1).unwrap(), 1);
        assert_eq!(
            check_minutes("JWT_DURATION_MINUTES", MAX_LIFETIME_MINUTES).unwrap(),
            MAX_LIFETIME_MINUTES
        );
        for value in [0, -5, MAX_LIFETIME_MINUTES + 1, i64::MAX] {
            let err = check_minutes("JWT_DURATION_MINUTES", value).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "JWT_DURATION_MINUTES"));
        }
    }

    #[test]
    fn test_max_lifetime_fits_duration_arithmetic() {
        let lifetime = chrono::Duration::try_minutes(MAX_LIFETIME_MINUTES).unwrap();
        assert!(chrono::Utc::now().checked_add_signed(lifetime).is_some());
    }

    #[test]
    fn test_shannon_entropy_bounds() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("zzzzzz") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("ab") - 1.0).abs() < 0.01);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > MIN_ENTROPY_BITS_PER_CHAR);
    }

    #[test]
    fn test_validate_secret_strength_rejects_placeholders() {
        for placeholder in ["your-jwt-key", "changeme-now", "SuperSecretKey"] {
            let err = validate_secret_strength(placeholder, "JWT_KEY").unwrap_err();
            assert!(matches!(err, ConfigError::InsecureSecret(_, _)));
        }
    }

    #[test]
    fn test_validate_secret_strength_rejects_low_entropy() {
        let err = validate_secret_strength(&"ab".repeat(20), "JWT_KEY").unwrap_err();
        assert!(err.to_string().contains("entropy too low"));
    }

    #[test]
    fn test_validate_secret_strength_accepts_random_key() {
        assert!(validate_secret_strength("k9$Qz!v7Lp2#Wm4@Xr8&Tn1^Bc6*Hd3%", "JWT_KEY").is_ok());
    }

    #[test]
    fn test_validate_key_length() {
        assert!(validate_key_length(&SecretString::from("short"), "JWT_KEY").is_err());
        assert!(validate_key_length(&SecretString::from("x".repeat(32)), "JWT_KEY").is_ok());
    }

    #[test]
    fn test_environment_parse() {
        assert_eq!("Development".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("staging".parse::<Environment>().is_err());
    }

    #[test]
    fn test_socket_addr_and_secure_flag() {
        let mut config = sample_config();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:5247");
        assert!(!config.is_secure());

        config.base_url = "https://catalog.example.org".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_jwt_config_debug_redacts_key() {
        let debug_output = format!("{:?}", sample_config());
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("catalog-clients"));
        assert!(!debug_output.contains("k9$Qz!v7"));
    }
}
