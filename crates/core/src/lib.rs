//! Product Catalog Core - Shared domain types.
//!
//! Used by every crate in the workspace:
//! - `server` - Browser and JSON API surfaces over the catalog, cart and identity stores
//! - `cli` - Migrations and role management
//! - `integration-tests` - End-to-end HTTP tests
//!
//! # Architecture
//!
//! The core crate contains only value types - no I/O, no database access,
//! no HTTP. Database encoding is available behind the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Typed ids, prices, emails and role names

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
