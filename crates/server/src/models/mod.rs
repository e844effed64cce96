//! Domain models for the catalog server.
//!
//! These are validated domain objects, separate from the database row types
//! in [`crate::db`].

pub mod cart;
pub mod product;
pub mod session;
pub mod user;

pub use cart::CartItem;
pub use product::{
    FieldErrors, Product, ProductDraft, ProductImage, ProductInput, ProductResponse,
};
pub use session::{CurrentUser, keys as session_keys};
pub use user::{IdentityError, Role, User};
