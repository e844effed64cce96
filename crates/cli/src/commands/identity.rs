//! User and role management commands.
//!
//! These go through the same identity service as the HTTP API, so the same
//! password and role-name rules apply.

use sqlx::PgPool;

use product_catalog_core::{Email, RoleName};
use product_catalog_server::db::{IdentityRepository, PgIdentity};
use product_catalog_server::services::{AssignRoleRequest, IdentityService};

use super::CommandError;

/// Register a user.
pub async fn create_user(pool: &PgPool, email: &str, password: &str) -> Result<(), CommandError> {
    let identity = PgIdentity::new(pool.clone());
    let user = IdentityService::new(&identity).register(email, password).await?;

    tracing::info!("User created! ID: {}, Email: {}", user.id, user.email);
    Ok(())
}

/// Create a role.
pub async fn create_role(pool: &PgPool, name: &str) -> Result<(), CommandError> {
    let identity = PgIdentity::new(pool.clone());
    let role = IdentityService::new(&identity).create_role(name).await?;

    tracing::info!("Role created! ID: {}, Name: {}", role.id, role.name);
    if !role.name.is_staff() {
        tracing::warn!("{} does not grant product management", role.name);
    }
    Ok(())
}

/// Add the user with `email` to the role named `role`.
pub async fn assign_role(pool: &PgPool, email: &str, role: &str) -> Result<(), CommandError> {
    let identity = PgIdentity::new(pool.clone());

    let user = match Email::parse(email) {
        Ok(parsed) => identity.find_credentials(&parsed).await?,
        Err(_) => None,
    };
    let Some((user, _)) = user else {
        return Err(CommandError::UnknownUser(email.to_owned()));
    };

    let found = match RoleName::parse(role) {
        Ok(name) => identity.find_role_by_name(&name).await?,
        Err(_) => None,
    };
    let Some(found) = found else {
        return Err(CommandError::UnknownRole(role.to_owned()));
    };

    let assignment = IdentityService::new(&identity)
        .assign_role(AssignRoleRequest {
            user_id: Some(user.id.to_string()),
            role_id: Some(found.id.to_string()),
            role_name: Some(found.name.to_string()),
        })
        .await?;

    tracing::info!(
        "Role {} assigned to {}",
        assignment.role_name,
        assignment.user_name
    );
    Ok(())
}
