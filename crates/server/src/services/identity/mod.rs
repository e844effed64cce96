//! Identity service.
//!
//! Registration and password login (argon2id), role creation and role
//! assignment. Browser sessions and bearer tokens are layered on top by the
//! routes; both end up checking credentials here.

mod error;

pub use error::AuthError;

use std::sync::LazyLock;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use product_catalog_core::{Email, EmailError, RoleId, RoleName, UserId, parse_optional_uuid};

use crate::db::{IdentityRepository, NewUser, RepositoryError};
use crate::models::{FieldErrors, IdentityError, Role, User};

/// Minimum password length. No other character-class rules apply.
pub const MIN_PASSWORD_LENGTH: usize = 4;

/// Hash verified for unknown emails so their login costs the same as a wrong
/// password.
static DUMMY_PASSWORD_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("no-such-account").ok());

/// Identifiers supplied to a role assignment, as received.
#[derive(Debug, Clone, Default)]
pub struct AssignRoleRequest {
    pub user_id: Option<String>,
    pub role_id: Option<String>,
    pub role_name: Option<String>,
}

/// A completed role assignment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleAssignment {
    pub role_name: String,
    pub user_name: String,
}

/// Users, passwords and roles.
pub struct IdentityService<'a> {
    identity: &'a dyn IdentityRepository,
}

impl<'a> IdentityService<'a> {
    #[must_use]
    pub const fn new(identity: &'a dyn IdentityRepository) -> Self {
        Self { identity }
    }

    /// Register a user whose user name is their email. The email counts as
    /// confirmed immediately.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRequest` for a missing or malformed email or
    /// a missing password, and `AuthError::Rejected` with every identity rule
    /// that failed (short password, duplicate user name).
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = validate_credentials_shape(email, password)?;

        let mut rejected = Vec::new();
        if self.identity.find_credentials(&email).await?.is_some() {
            rejected.push(IdentityError::duplicate_user_name(email.as_str()));
        }
        if let Err(e) = validate_password(password) {
            rejected.push(e);
        }
        if !rejected.is_empty() {
            return Err(AuthError::Rejected(rejected));
        }

        let password_hash = hash_password(password)?;
        let user = self
            .identity
            .create_user(NewUser {
                user_name: email.as_str().to_owned(),
                email: email.clone(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::Rejected(vec![
                    IdentityError::duplicate_user_name(email.as_str()),
                ]),
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Check an email and password.
    ///
    /// Unknown emails, malformed emails and wrong passwords all produce the
    /// same `AuthError::InvalidCredentials`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the credentials do not match.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let Ok(email) = Email::parse(email) else {
            return Err(AuthError::InvalidCredentials);
        };

        let Some((user, password_hash)) = self.identity.find_credentials(&email).await? else {
            tracing::debug!("login for unknown email");
            if let Some(dummy) = DUMMY_PASSWORD_HASH.as_deref() {
                let _ = verify_password(password, dummy);
            }
            return Err(AuthError::InvalidCredentials);
        };

        verify_password(password, &password_hash)?;
        Ok(user)
    }

    /// # Errors
    ///
    /// Returns `AuthError::EmptyRoleName` for a blank name and
    /// `AuthError::RoleAlreadyExists` when the name is taken (case-insensitive).
    #[instrument(skip(self))]
    pub async fn create_role(&self, name: &str) -> Result<Role, AuthError> {
        let name = RoleName::parse(name).map_err(|_| AuthError::EmptyRoleName)?;

        if self.identity.find_role_by_name(&name).await?.is_some() {
            return Err(AuthError::RoleAlreadyExists);
        }

        let role = self.identity.create_role(&name).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::RoleAlreadyExists,
            other => AuthError::Repository(other),
        })?;

        tracing::info!(role_id = %role.id, role = %role.name, "role created");
        Ok(role)
    }

    /// Add a user to a role.
    ///
    /// The request is only refused up front when *all three* identifiers are
    /// blank; a request with some of them blank proceeds to the lookups and
    /// fails there. The role is resolved by `role_id`, but the membership is
    /// added for the role named `role_name`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingAssignmentIds`, `AuthError::RoleNotFound`,
    /// `AuthError::UserNotFound`, or `AuthError::Rejected` when `role_name`
    /// names no role or the user already holds it.
    #[instrument(skip(self))]
    pub async fn assign_role(&self, request: AssignRoleRequest) -> Result<RoleAssignment, AuthError> {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        if blank(&request.user_id) && blank(&request.role_id) && blank(&request.role_name) {
            return Err(AuthError::MissingAssignmentIds);
        }

        let role_id = parse_optional_uuid(request.role_id.as_deref()).map(RoleId::from_uuid);
        let Some(_role) = self.find_role(role_id).await? else {
            return Err(AuthError::RoleNotFound);
        };

        let user_id = parse_optional_uuid(request.user_id.as_deref()).map(UserId::from_uuid);
        let user = match user_id {
            Some(id) => self.identity.find_user(id).await?,
            None => None,
        };
        let Some(user) = user else {
            return Err(AuthError::UserNotFound);
        };

        let raw_name = request.role_name.unwrap_or_default();
        let target = match RoleName::parse(&raw_name) {
            Ok(name) => self.identity.find_role_by_name(&name).await?,
            Err(_) => None,
        };
        let Some(target) = target else {
            return Err(AuthError::Rejected(vec![IdentityError::invalid_role_name(
                &raw_name,
            )]));
        };

        self.identity
            .add_to_role(user.id, target.id)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::Rejected(vec![
                    IdentityError::user_already_in_role(target.name.as_str()),
                ]),
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, role = %target.name, "role assigned");
        Ok(RoleAssignment {
            role_name: raw_name,
            user_name: user.user_name,
        })
    }

    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn roles_for(&self, user: UserId) -> Result<Vec<Role>, AuthError> {
        Ok(self.identity.roles_for(user).await?)
    }

    /// Whether the user holds any catalog-management role.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Repository` if the lookup fails.
    pub async fn is_staff(&self, user: UserId) -> Result<bool, AuthError> {
        Ok(self.roles_for(user).await?.iter().any(|r| r.name.is_staff()))
    }

    async fn find_role(&self, id: Option<RoleId>) -> Result<Option<Role>, AuthError> {
        match id {
            Some(id) => Ok(self.identity.find_role(id).await?),
            None => Ok(None),
        }
    }
}

/// Shape checks applied before any identity rule.
fn validate_credentials_shape(email: &str, password: &str) -> Result<Email, AuthError> {
    let mut errors = FieldErrors::default();

    let email = Email::parse(email)
        .map_err(|e| {
            let message = match e {
                EmailError::Empty => "The Email field is required.".to_owned(),
                other => other.to_string(),
            };
            errors.add("Email", message);
        })
        .ok();

    if password.is_empty() {
        errors.add("Password", "The Password field is required.");
    }

    match email {
        Some(email) if errors.is_empty() => Ok(email),
        _ => Err(AuthError::InvalidRequest(errors)),
    }
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), IdentityError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(IdentityError::password_too_short(MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a stored PHC hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;

    #[tokio::test]
    async fn test_register_then_login() {
        let store = MemoryStore::new();
        let identity = IdentityService::new(&store);

        let user = identity.register("ada@example.com", "pa55").await.unwrap();
        assert_eq!(user.user_name, "ada@example.com");
        assert!(user.email_confirmed);

        let logged_in = identity.login("ADA@example.com", "pa55").await.unwrap();
        assert_eq!(logged_in.id, user.id);
    }

    #[tokio::test]
    async fn test_register_reports_identity_rules() {
        let store = MemoryStore::new();
        let identity = IdentityService::new(&store);
        identity.register("ada@example.com", "pa55").await.unwrap();

        let Err(AuthError::Rejected(errors)) =
            identity.register("Ada@Example.com", "abc").await
        else {
            panic!("expected identity rule violations");
        };
        let codes: Vec<_> = errors.iter().map(|e| e.code).collect();
        assert_eq!(codes, ["DuplicateUserName", "PasswordTooShort"]);
    }

    #[tokio::test]
    async fn test_register_rejects_malformed_request() {
        let store = MemoryStore::new();
        let identity = IdentityService::new(&store);

        let Err(AuthError::InvalidRequest(errors)) = identity.register("nope", "").await else {
            panic!("expected field errors");
        };
        assert_eq!(errors.get("Email").len(), 1);
        assert_eq!(errors.get("Password"), ["The Password field is required."]);
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let store = MemoryStore::new();
        let identity = IdentityService::new(&store);
        identity.register("ada@example.com", "pa55").await.unwrap();

        let wrong_password = identity.login("ada@example.com", "nope").await.unwrap_err();
        let unknown_email = identity.login("bob@example.com", "pa55").await.unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    }

    #[test]
    fn test_unknown_email_path_verifies_a_real_hash() {
        let dummy = DUMMY_PASSWORD_HASH.as_deref().unwrap();
        assert!(PasswordHash::new(dummy).is_ok());
        assert!(matches!(
            verify_password("pa55", dummy),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_create_role_rules() {
        let store = MemoryStore::new();
        let identity = IdentityService::new(&store);

        assert!(matches!(
            identity.create_role("  ").await,
            Err(AuthError::EmptyRoleName)
        ));
        identity.create_role("admin").await.unwrap();
        assert!(matches!(
            identity.create_role("ADMIN").await,
            Err(AuthError::RoleAlreadyExists)
        ));
    }

    #[tokio::test]
    async fn test_assign_role_and_staff_check() {
        let store = MemoryStore::new();
        let identity = IdentityService::new(&store);
        let user = identity.register("ada@example.com", "pa55").await.unwrap();
        let role = identity.create_role("moderator").await.unwrap();
        assert!(!identity.is_staff(user.id).await.unwrap());

        let assignment = identity
            .assign_role(AssignRoleRequest {
                user_id: Some(user.id.to_string()),
                role_id: Some(role.id.to_string()),
                role_name: Some("moderator".to_owned()),
            })
            .await
            .unwrap();
        assert_eq!(assignment.user_name, "ada@example.com");
        assert!(identity.is_staff(user.id).await.unwrap());

        let again = identity
            .assign_role(AssignRoleRequest {
                user_id: Some(user.id.to_string()),
                role_id: Some(role.id.to_string()),
                role_name: Some("moderator".to_owned()),
            })
            .await;
        assert!(matches!(again, Err(AuthError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_assign_role_guard_only_rejects_when_every_id_is_blank() {
        let store = MemoryStore::new();
        let identity = IdentityService::new(&store);
        let role = identity.create_role("admin").await.unwrap();

        let all_blank = identity.assign_role(AssignRoleRequest::default()).await;
        assert!(matches!(all_blank, Err(AuthError::MissingAssignmentIds)));

        // A blank user id slips past the guard and fails at the user lookup.
        let blank_user = identity
            .assign_role(AssignRoleRequest {
                user_id: Some(String::new()),
                role_id: Some(role.id.to_string()),
                role_name: Some("admin".to_owned()),
            })
            .await;
        assert!(matches!(blank_user, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_assign_role_adds_the_named_role_not_the_looked_up_one() {
        let store = MemoryStore::new();
        let identity = IdentityService::new(&store);
        let user = identity.register("ada@example.com", "pa55").await.unwrap();
        let looked_up = identity.create_role("customer").await.unwrap();
        identity.create_role("employee").await.unwrap();

        identity
            .assign_role(AssignRoleRequest {
                user_id: Some(user.id.to_string()),
                role_id: Some(looked_up.id.to_string()),
                role_name: Some("employee".to_owned()),
            })
            .await
            .unwrap();

        let roles: Vec<String> = identity
            .roles_for(user.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name.to_string())
            .collect();
        assert_eq!(roles, ["employee"]);
    }
}
