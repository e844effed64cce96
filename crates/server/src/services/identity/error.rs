//! Identity error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::{FieldErrors, IdentityError};

/// Errors that can occur during identity operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Request is missing fields or has malformed ones.
    #[error("invalid request")]
    InvalidRequest(FieldErrors),

    /// Identity rules rejected the operation (weak password, duplicate name, ...).
    #[error("identity rules violated: {}", describe(.0))]
    Rejected(Vec<IdentityError>),

    /// Unknown email or wrong password. Deliberately indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Role name was blank.
    #[error("role name is empty")]
    EmptyRoleName,

    /// A role with this name already exists.
    #[error("role already exists")]
    RoleAlreadyExists,

    /// Role assignment request carried no identifiers at all.
    #[error("no identifiers supplied for role assignment")]
    MissingAssignmentIds,

    /// Role id did not resolve.
    #[error("role not found")]
    RoleNotFound,

    /// User id did not resolve.
    #[error("user not found")]
    UserNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

fn describe(errors: &[IdentityError]) -> String {
    errors
        .iter()
        .map(|e| e.code)
        .collect::<Vec<_>>()
        .join(", ")
}
