//! JSON API.
//!
//! ```text
//! GET    /api/product          - List products (bearer)
//! GET    /api/product/{id}     - One product (bearer)
//! POST   /api/product          - Create (bearer, staff)
//! PUT    /api/product/{id}     - Update (bearer, staff)
//! DELETE /api/product/{id}     - Delete (bearer, staff)
//!
//! POST   /api/user/register    - Register
//! POST   /api/user/login       - Cookie login
//! POST   /api/user/auth        - Issue a bearer token
//! POST   /api/user/logout      - End the cookie session
//! POST   /api/user/createrole  - Create a role (bearer, staff)
//! POST   /api/user/assignrole  - Add a user to a role (bearer, staff)
//!
//! GET    /api/cart             - Caller's cart (bearer)
//! POST   /api/cart             - Add a product (bearer)
//! DELETE /api/cart             - Clear (bearer)
//! DELETE /api/cart/{id}        - Remove a line (bearer)
//! ```

pub mod cart;
pub mod product;
pub mod user;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product API router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(product::list).post(product::create))
        .route(
            "/{id}",
            get(product::get).put(product::update).delete(product::delete),
        )
}

/// Create the user API router.
pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(user::register))
        .route("/login", post(user::login))
        .route("/auth", post(user::auth))
        .route("/logout", post(user::logout))
        .route("/createrole", post(user::create_role))
        .route("/assignrole", post(user::assign_role))
}

/// Create the cart API router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show).post(cart::add).delete(cart::clear))
        .route("/{id}", axum::routing::delete(cart::remove))
}

/// Create all API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/product", product_routes())
        .nest("/user", user_routes())
        .nest("/cart", cart_routes())
}
