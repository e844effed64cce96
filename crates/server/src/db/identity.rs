//! `PostgreSQL` identity repository: users, roles and memberships.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use product_catalog_core::{Email, RoleId, RoleName, UserId};

use super::{IdentityRepository, NewUser, RepositoryError};
use crate::models::{Role, User};

const USER_COLUMNS: &str = "id, user_name, email, email_confirmed, created_at";

/// Identity rows in `PostgreSQL`.
#[derive(Clone)]
pub struct PgIdentity {
    pool: PgPool,
}

impl PgIdentity {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    user_name: String,
    email: String,
    email_confirmed: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            user_name: row.user_name,
            email,
            email_confirmed: row.email_confirmed,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CredentialsRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(sqlx::FromRow)]
struct RoleRow {
    id: RoleId,
    name: String,
}

impl TryFrom<RoleRow> for Role {
    type Error = RepositoryError;

    fn try_from(row: RoleRow) -> Result<Self, Self::Error> {
        let name = RoleName::parse(&row.name).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid role name in database: {e}"))
        })?;
        Ok(Self { id: row.id, name })
    }
}

#[async_trait]
impl IdentityRepository for PgIdentity {
    async fn create_user(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row: UserRow = sqlx::query_as(&format!(
            r"
            INSERT INTO users (id, user_name, normalized_user_name, email, normalized_email,
                               email_confirmed, password_hash)
            VALUES ($1, $2, $3, $4, $5, TRUE, $6)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(UserId::generate())
        .bind(&user.user_name)
        .bind(user.user_name.to_uppercase())
        .bind(&user.email)
        .bind(user.email.normalized())
        .bind(&user.password_hash)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "user name already exists"))?;

        User::try_from(row)
    }

    async fn find_user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row: Option<CredentialsRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM users WHERE normalized_email = $1 LIMIT 1"
        ))
        .bind(email.normalized())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| Ok((User::try_from(r.user)?, r.password_hash)))
            .transpose()
    }

    async fn create_role(&self, name: &RoleName) -> Result<Role, RepositoryError> {
        let row: RoleRow = sqlx::query_as(
            r"
            INSERT INTO roles (id, name, normalized_name)
            VALUES ($1, $2, $3)
            RETURNING id, name
            ",
        )
        .bind(RoleId::generate())
        .bind(name.as_str())
        .bind(name.normalized())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "role already exists"))?;

        Role::try_from(row)
    }

    async fn find_role(&self, id: RoleId) -> Result<Option<Role>, RepositoryError> {
        let row: Option<RoleRow> = sqlx::query_as("SELECT id, name FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Role::try_from).transpose()
    }

    async fn find_role_by_name(&self, name: &RoleName) -> Result<Option<Role>, RepositoryError> {
        let row: Option<RoleRow> =
            sqlx::query_as("SELECT id, name FROM roles WHERE normalized_name = $1")
                .bind(name.normalized())
                .fetch_optional(&self.pool)
                .await?;

        row.map(Role::try_from).transpose()
    }

    async fn add_to_role(&self, user: UserId, role: RoleId) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO user_roles (user_id, role_id) VALUES ($1, $2)")
            .bind(user)
            .bind(role)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "user already in role"))?;

        Ok(())
    }

    async fn roles_for(&self, user: UserId) -> Result<Vec<Role>, RepositoryError> {
        let rows: Vec<RoleRow> = sqlx::query_as(
            r"
            SELECT r.id, r.name
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.normalized_name
            ",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Role::try_from).collect()
    }
}
