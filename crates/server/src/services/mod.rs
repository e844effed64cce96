//! Business logic services.
//!
//! # Services
//!
//! - `products` - Catalog CRUD with optimistic concurrency
//! - `cart` - The single, user-scoped cart
//! - `identity` - Registration, password login, roles
//! - `token` - Bearer token issuance and validation

pub mod cart;
pub mod identity;
pub mod products;
pub mod token;

pub use cart::{CartError, CartService, CartSummary};
pub use identity::{AssignRoleRequest, AuthError, IdentityService, RoleAssignment};
pub use products::ProductService;
pub use token::{Claims, TokenError, TokenIssuer};
