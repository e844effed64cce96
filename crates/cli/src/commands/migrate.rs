//! Database migration command.
//!
//! Migrations live in `crates/server/migrations/` and cover the catalog,
//! identity and session tables.

use sqlx::PgPool;

use super::CommandError;

/// Apply every pending migration.
pub async fn run(pool: &PgPool) -> Result<(), CommandError> {
    tracing::info!("Running migrations...");
    product_catalog_server::db::migrate(pool).await?;
    tracing::info!("Migrations complete!");
    Ok(())
}
