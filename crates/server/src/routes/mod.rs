//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                          - Redirect to /product
//!
//! # Products
//! GET  /product                   - Product listing
//! GET  /product/details/{id}      - Product detail
//! GET  /product/image/{id}        - Stored image bytes
//! GET  /product/create            - Create form (staff)
//! POST /product/create            - Create action (staff, multipart)
//! GET  /product/update/{id}       - Update form (staff)
//! POST /product/update/{id}       - Update action (staff, multipart)
//! GET  /product/delete/{id}       - Delete confirmation (staff)
//! POST /product/delete/{id}       - Delete action (staff)
//!
//! # Cart (signed in)
//! GET  /cart                      - Cart page
//! POST /cart/add                  - Add to cart
//! POST /cart/remove/{id}          - Remove a line
//! POST /cart/clear                - Empty the cart
//!
//! # Account
//! GET  /account/login             - Login page
//! POST /account/login             - Login action
//! GET  /account/register          - Register page
//! POST /account/register          - Register action
//! POST /account/logout            - Logout action
//!
//! # JSON API
//! /api/...                        - See [`api`]
//! ```

pub mod account;
pub mod api;
pub mod cart;
pub mod products;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    response::Redirect,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/details/{id}", get(products::details))
        .route("/image/{id}", get(products::image))
        .route(
            "/create",
            get(products::create_page).post(products::create),
        )
        .route(
            "/update/{id}",
            get(products::update_page).post(products::update),
        )
        .route(
            "/delete/{id}",
            get(products::delete_page).post(products::delete),
        )
        .layer(DefaultBodyLimit::max(products::MAX_UPLOAD_BYTES))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove/{id}", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(account::login_page).post(account::login))
        .route(
            "/register",
            get(account::register_page).post(account::register),
        )
        .route("/logout", post(account::logout))
}

/// Create all routes for the catalog.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(|| async { Redirect::to("/product") }))
        .nest("/product", product_routes())
        .nest("/cart", cart_routes())
        .nest("/account", account_routes())
        .nest(
            "/api",
            api::routes().layer(DefaultBodyLimit::max(products::MAX_UPLOAD_BYTES * 2)),
        )
}
