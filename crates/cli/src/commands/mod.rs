//! CLI command implementations.
//!
//! # Environment Variables
//!
//! - `CATALOG_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`; both are read from `.env` too)

pub mod identity;
pub mod migrate;

use secrecy::SecretString;
use sqlx::PgPool;
use thiserror::Error;

use product_catalog_server::db::RepositoryError;
use product_catalog_server::services::AuthError;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Identity lookup failed.
    #[error("{0}")]
    Repository(#[from] RepositoryError),

    /// The identity service refused the request.
    #[error("{0}")]
    Identity(String),

    /// No user has this email.
    #[error("No user with email: {0}")]
    UnknownUser(String),

    /// No role has this name.
    #[error("No role named: {0}")]
    UnknownRole(String),
}

impl From<AuthError> for CommandError {
    fn from(error: AuthError) -> Self {
        let message = match error {
            AuthError::InvalidRequest(errors) => errors.messages().collect::<Vec<_>>().join(" "),
            AuthError::Rejected(errors) => errors
                .iter()
                .map(|e| e.description.as_str())
                .collect::<Vec<_>>()
                .join(" "),
            other => other.to_string(),
        };
        Self::Identity(message)
    }
}

/// Connect to the database named by `CATALOG_DATABASE_URL` or `DATABASE_URL`.
pub async fn connect() -> Result<PgPool, CommandError> {
    dotenvy::dotenv().ok();

    let database_url = database_url_from(|key| std::env::var(key).ok())?;

    tracing::info!("Connecting to database...");
    Ok(product_catalog_server::db::create_pool(&database_url).await?)
}

/// Resolve the database URL the same way the server does.
fn database_url_from(lookup: impl Fn(&str) -> Option<String>) -> Result<SecretString, CommandError> {
    ["CATALOG_DATABASE_URL", "DATABASE_URL"]
        .into_iter()
        .find_map(&lookup)
        .map(SecretString::from)
        .ok_or(CommandError::MissingEnvVar("CATALOG_DATABASE_URL"))
}
