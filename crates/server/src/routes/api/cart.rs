//! Cart API handlers. The cart is the bearer-token user's.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::instrument;

use product_catalog_core::{CartItemId, ProductId};

use crate::error::Result;
use crate::middleware::{Authenticated, Bearer};
use crate::models::{CartItem, ProductResponse};
use crate::services::CartSummary;
use crate::state::AppState;

/// Body of `POST /api/cart`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    #[serde(default = "one")]
    pub quantity: i32,
}

const fn one() -> i32 {
    1
}

/// JSON representation of a cart line.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub id: CartItemId,
    pub product: ProductResponse,
    pub quantity: i32,
    pub line_total: Decimal,
}

impl From<&CartItem> for CartItemResponse {
    fn from(item: &CartItem) -> Self {
        Self {
            id: item.id,
            product: ProductResponse::from(&item.product),
            quantity: item.quantity,
            line_total: item.line_total(),
        }
    }
}

/// JSON representation of a cart.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub items: Vec<CartItemResponse>,
    pub item_count: i64,
    pub subtotal: Decimal,
}

impl From<&CartSummary> for CartResponse {
    fn from(cart: &CartSummary) -> Self {
        Self {
            items: cart.items.iter().map(CartItemResponse::from).collect(),
            item_count: cart.item_count,
            subtotal: cart.subtotal,
        }
    }
}

/// The caller's cart.
#[instrument(skip_all)]
pub async fn show(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated<Bearer>,
) -> Result<Json<CartResponse>> {
    let cart = state.cart().get_cart(user.id).await?;
    Ok(Json(CartResponse::from(&cart)))
}

/// Add a product, merging with an existing line.
#[instrument(skip(state, user))]
pub async fn add(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated<Bearer>,
    Json(request): Json<AddToCartRequest>,
) -> Result<Json<CartItemResponse>> {
    let line = state
        .cart()
        .add_to_cart(user.id, request.product_id, request.quantity)
        .await?;
    Ok(Json(CartItemResponse::from(&line)))
}

/// Remove one of the caller's lines.
#[instrument(skip(state, user))]
pub async fn remove(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated<Bearer>,
    Path(id): Path<CartItemId>,
) -> Result<Response> {
    Ok(if state.cart().remove_from_cart(user.id, id).await? {
        Json(json!({ "status": "Ok!" })).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({ "status": "404" }))).into_response()
    })
}

/// Empty the caller's cart.
#[instrument(skip_all)]
pub async fn clear(
    State(state): State<AppState>,
    Authenticated(user, _): Authenticated<Bearer>,
) -> Result<Json<serde_json::Value>> {
    let removed = state.cart().clear_cart(user.id).await?;
    Ok(Json(json!({ "removed": removed })))
}
