//! Role names.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Roles allowed to create, update and delete catalog products.
pub const STAFF_ROLES: [&str; 3] = ["admin", "moderator", "employee"];

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RoleNameError {
    #[error("role name cannot be empty")]
    Empty,
    #[error("role name must be at most {max} characters")]
    TooLong { max: usize },
}

/// A non-blank role name. Comparison is case-insensitive via
/// [`RoleName::normalized`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleName(String);

impl RoleName {
    pub const MAX_LENGTH: usize = 256;

    /// # Errors
    ///
    /// Returns [`RoleNameError`] when the trimmed name is empty or too long.
    pub fn parse(s: &str) -> Result<Self, RoleNameError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(RoleNameError::Empty);
        }
        if s.chars().count() > Self::MAX_LENGTH {
            return Err(RoleNameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn normalized(&self) -> String {
        self.0.to_uppercase()
    }

    /// Whether this role grants catalog management.
    #[must_use]
    pub fn is_staff(&self) -> bool {
        STAFF_ROLES
            .iter()
            .any(|staff| staff.eq_ignore_ascii_case(&self.0))
    }
}

impl fmt::Display for RoleName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_rejects_blank() {
        assert_eq!(RoleName::parse("  admin ").unwrap().as_str(), "admin");
        assert_eq!(RoleName::parse(" "), Err(RoleNameError::Empty));
    }

    #[test]
    fn test_staff_roles_are_case_insensitive() {
        assert!(RoleName::parse("Admin").unwrap().is_staff());
        assert!(RoleName::parse("EMPLOYEE").unwrap().is_staff());
        assert!(!RoleName::parse("customer").unwrap().is_staff());
    }
}
