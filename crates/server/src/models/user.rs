//! Identity domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use product_catalog_core::{Email, RoleId, RoleName, UserId};

/// A registered user.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    /// Login name. Registration sets this to the email address.
    pub user_name: String,
    pub email: Email,
    pub email_confirmed: bool,
    pub created_at: DateTime<Utc>,
}

/// A named role users can be added to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Role {
    pub id: RoleId,
    pub name: RoleName,
}

/// A rule violation reported by the identity store, surfaced verbatim to
/// API callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityError {
    pub code: &'static str,
    pub description: String,
}

impl IdentityError {
    #[must_use]
    pub fn password_too_short(min: usize) -> Self {
        Self {
            code: "PasswordTooShort",
            description: format!("Passwords must be at least {min} characters."),
        }
    }

    #[must_use]
    pub fn duplicate_user_name(user_name: &str) -> Self {
        Self {
            code: "DuplicateUserName",
            description: format!("Username '{user_name}' is already taken."),
        }
    }


    #[must_use]
    pub fn invalid_role_name(role: &str) -> Self {
        Self {
            code: "InvalidRoleName",
            description: format!("Role name '{role}' is invalid."),
        }
    }

    #[must_use]
    pub fn user_already_in_role(role: &str) -> Self {
        Self {
            code: "UserAlreadyInRole",
            description: format!("User already in role '{role}'."),
        }
    }
}
