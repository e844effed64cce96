//! Persistence for the catalog and identity stores.
//!
//! # Stores
//!
//! - Catalog: `products`, `cart_items`
//! - Identity: `users`, `roles`, `user_roles`
//! - Sessions: `tower_sessions.session` (managed by `tower-sessions-sqlx-store`)
//!
//! Each store is reached through a repository trait so services do not care
//! whether rows live in `PostgreSQL` ([`PgCatalog`]/[`PgIdentity`]) or in
//! process memory ([`MemoryStore`], used by tests and local demos).
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p product-catalog-cli -- migrate
//! ```

pub mod cart;
pub mod identity;
pub mod memory;
pub mod products;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::error::{DatabaseError, ErrorKind};
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use product_catalog_core::{CartItemId, Email, ProductId, RoleId, RoleName, UserId};

use crate::models::{CartItem, Product, ProductDraft, Role, User};

pub use cart::PgCart;
pub use identity::PgIdentity;
pub use memory::MemoryStore;
pub use products::PgCatalog;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database query failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in database is invalid or corrupted.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Unique constraint violation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The row changed or disappeared since it was read.
    #[error("row version is stale")]
    Stale,

    /// A referenced row does not exist.
    #[error("referenced row does not exist")]
    InvalidReference,

    /// A numeric column would leave its range.
    #[error("value out of range")]
    OutOfRange,
}

impl RepositoryError {
    /// Classify a write error by constraint kind.
    pub(crate) fn from_write(error: sqlx::Error, conflict: &str) -> Self {
        match error.as_database_error().map(DatabaseError::kind) {
            Some(ErrorKind::UniqueViolation) => Self::Conflict(conflict.to_owned()),
            Some(ErrorKind::ForeignKeyViolation) => Self::InvalidReference,
            _ => Self::Database(error),
        }
    }
}

/// Product rows.
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Every product, ordered by id.
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;

    async fn find(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Insert a row and return it with its assigned id. `draft.id` is ignored.
    async fn insert(&self, draft: ProductDraft) -> Result<Product, RepositoryError>;

    /// Overwrite every column of row `id`.
    ///
    /// When `draft.version` is set the write only applies if the stored version
    /// matches. Returns [`RepositoryError::Stale`] when no row was written.
    async fn update(&self, id: ProductId, draft: ProductDraft)
    -> Result<Product, RepositoryError>;

    /// Returns `false` when no such row exists.
    async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError>;
}

/// Cart rows, always scoped to one user.
#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Insert a `(user, product)` line or add `quantity` to the existing one.
    ///
    /// Returns [`RepositoryError::InvalidReference`] if the product does not
    /// exist and [`RepositoryError::OutOfRange`] if the summed quantity would
    /// not fit an `i32`. The line is left unchanged in both cases.
    async fn upsert(
        &self,
        user: UserId,
        product: ProductId,
        quantity: i32,
    ) -> Result<CartItem, RepositoryError>;

    /// The user's lines with their products, ordered by id.
    async fn lines(&self, user: UserId) -> Result<Vec<CartItem>, RepositoryError>;

    /// Remove one of the user's lines. Returns `false` if it was not theirs or
    /// did not exist.
    async fn remove(&self, user: UserId, item: CartItemId) -> Result<bool, RepositoryError>;

    /// Remove every line of the user. Returns how many were removed.
    async fn clear(&self, user: UserId) -> Result<u64, RepositoryError>;
}

/// A user row with its stored password hash.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub user_name: String,
    pub email: Email,
    pub password_hash: String,
}

/// Users, roles and memberships.
#[async_trait]
pub trait IdentityRepository: Send + Sync {
    /// Returns [`RepositoryError::Conflict`] when the user name is taken
    /// (case-insensitive).
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Look a user up by email (case-insensitive), with their password hash.
    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Returns [`RepositoryError::Conflict`] when the name is taken
    /// (case-insensitive).
    async fn create_role(&self, name: &RoleName) -> Result<Role, RepositoryError>;

    async fn find_role(&self, id: RoleId) -> Result<Option<Role>, RepositoryError>;

    async fn find_role_by_name(&self, name: &RoleName) -> Result<Option<Role>, RepositoryError>;

    /// Returns [`RepositoryError::Conflict`] when the user already holds the role.
    async fn add_to_role(&self, user: UserId, role: RoleId) -> Result<(), RepositoryError>;

    async fn roles_for(&self, user: UserId) -> Result<Vec<Role>, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Run the embedded migrations.
///
/// # Errors
///
/// Returns `MigrateError` if a migration fails to apply.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
