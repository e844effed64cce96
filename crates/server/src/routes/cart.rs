//! Cart route handlers.
//!
//! The cart belongs to the signed-in user and is stored relationally, so the
//! browser and the API see the same lines. Every mutation redirects back to
//! `/cart`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use product_catalog_core::{CartItemId, ProductId};

use crate::error::Result;
use crate::middleware::{Authenticated, Cookie, csrf_token, verify_csrf};
use crate::models::{CartItem, CurrentUser};
use crate::routes::products::CsrfForm;
use crate::services::CartSummary;
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: i32,
    pub product_id: i32,
    pub name: String,
    pub quantity: i32,
    pub price: String,
    pub line_price: String,
    pub has_image: bool,
}

impl From<&CartItem> for CartItemView {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id.as_i32(),
            product_id: item.product.id.as_i32(),
            name: item.product.name.clone(),
            quantity: item.quantity,
            price: format!("${}", item.product.price),
            line_price: format!("${:.2}", item.line_total()),
            has_image: item.product.image.is_some(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: i64,
}

impl From<&CartSummary> for CartView {
    fn from(cart: &CartSummary) -> Self {
        Self {
            items: cart.items.iter().map(CartItemView::from).collect(),
            subtotal: format!("${:.2}", cart.subtotal),
            item_count: cart.item_count,
        }
    }
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartTemplate {
    pub current_user: Option<CurrentUser>,
    pub csrf_token: String,
    pub cart: CartView,
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: ProductId,
    pub quantity: Option<i32>,
    pub csrf_token: Option<String>,
}

/// Display the cart page.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    Authenticated(user, _): Authenticated<Cookie>,
) -> Result<impl IntoResponse> {
    let cart = state.cart().get_cart(user.id).await?;

    Ok(CartTemplate {
        current_user: Some(user),
        csrf_token: csrf_token(&session).await?,
        cart: CartView::from(&cart),
    })
}

/// Add a product to the cart.
#[instrument(skip(state, session, user))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Authenticated(user, _): Authenticated<Cookie>,
    Form(form): Form<AddToCartForm>,
) -> Result<Redirect> {
    verify_csrf(&session, form.csrf_token.as_deref()).await?;

    state
        .cart()
        .add_to_cart(user.id, form.product_id, form.quantity.unwrap_or(1))
        .await?;

    Ok(Redirect::to("/cart"))
}

/// Remove one line from the cart.
#[instrument(skip(state, session, user, form))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Authenticated(user, _): Authenticated<Cookie>,
    Path(id): Path<CartItemId>,
    Form(form): Form<CsrfForm>,
) -> Result<Redirect> {
    verify_csrf(&session, form.csrf_token.as_deref()).await?;

    state.cart().remove_from_cart(user.id, id).await?;
    Ok(Redirect::to("/cart"))
}

/// Remove every line from the cart.
#[instrument(skip(state, session, user, form))]
pub async fn clear(
    State(state): State<AppState>,
    session: Session,
    Authenticated(user, _): Authenticated<Cookie>,
    Form(form): Form<CsrfForm>,
) -> Result<Redirect> {
    verify_csrf(&session, form.csrf_token.as_deref()).await?;

    state.cart().clear_cart(user.id).await?;
    Ok(Redirect::to("/cart"))
}
