//! Domain value types for the product catalog.

pub mod email;
pub mod id;
pub mod price;
pub mod role;

pub use email::{Email, EmailError};
pub use id::*;
pub use price::{Price, PriceError};
pub use role::{RoleName, RoleNameError, STAFF_ROLES};
