//! Product API handlers.
//!
//! Reads need a bearer token; writes also need a staff role. Bodies are
//! camelCase product JSON with the image as base64 `imageFile`.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::instrument;

use product_catalog_core::ProductId;

use crate::error::Result;
use crate::middleware::{Authenticated, Bearer, Staff};
use crate::models::{FieldErrors, ProductInput, ProductResponse};
use crate::state::AppState;

fn product_is_null() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "state": "Product is null ..." })),
    )
        .into_response()
}

fn update_failed() -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "state": "Product update failed ..." })),
    )
        .into_response()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "status": "404" }))).into_response()
}

fn validation_failed(errors: &FieldErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "title": "One or more validation errors occurred.", "errors": errors })),
    )
        .into_response()
}

/// Parse a product body. An empty body or JSON `null` is `Ok(None)`.
fn parse_product(body: &Bytes) -> std::result::Result<Option<ProductInput>, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }

    serde_json::from_slice::<Option<ProductInput>>(body).map_err(|e| {
        let mut errors = FieldErrors::default();
        errors.add("$", e.to_string());
        validation_failed(&errors)
    })
}

/// List every product.
#[instrument(skip_all)]
pub async fn list(
    State(state): State<AppState>,
    Authenticated(_user, _): Authenticated<Bearer>,
) -> Result<Json<Vec<ProductResponse>>> {
    let products = state.products().read().await?;
    Ok(Json(products.iter().map(ProductResponse::from).collect()))
}

/// Fetch one product.
#[instrument(skip(state, _user))]
pub async fn get(
    State(state): State<AppState>,
    Authenticated(_user, _): Authenticated<Bearer>,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    Ok(match state.products().get_by_id(id).await? {
        Some(product) => Json(ProductResponse::from(&product)).into_response(),
        None => not_found(),
    })
}

/// Create a product and return it with its assigned id.
#[instrument(skip(state, user, body))]
pub async fn create(
    State(state): State<AppState>,
    Staff(user, _): Staff<Bearer>,
    body: Bytes,
) -> Result<Response> {
    let input = match parse_product(&body) {
        Ok(Some(input)) => input,
        Ok(None) => return Ok(product_is_null()),
        Err(response) => return Ok(response),
    };
    let draft = match input.validate() {
        Ok(draft) => draft,
        Err(errors) => return Ok(validation_failed(&errors)),
    };

    tracing::debug!(user_id = %user.id, "creating product");
    Ok(match state.products().create(Some(draft)).await? {
        Some(product) => Json(ProductResponse::from(&product)).into_response(),
        None => product_is_null(),
    })
}

/// Overwrite a product. The body `id` must match the route id.
#[instrument(skip(state, user, body))]
pub async fn update(
    State(state): State<AppState>,
    Staff(user, _): Staff<Bearer>,
    Path(id): Path<ProductId>,
    body: Bytes,
) -> Result<Response> {
    let input = match parse_product(&body) {
        Ok(Some(input)) => input,
        Ok(None) => return Ok(product_is_null()),
        Err(response) => return Ok(response),
    };
    let draft = match input.validate() {
        Ok(draft) => draft,
        Err(errors) => return Ok(validation_failed(&errors)),
    };

    tracing::debug!(user_id = %user.id, "updating product");
    Ok(match state.products().update(id, Some(draft)).await? {
        Some(product) => Json(ProductResponse::from(&product)).into_response(),
        None => update_failed(),
    })
}

/// Delete a product.
#[instrument(skip(state, user))]
pub async fn delete(
    State(state): State<AppState>,
    Staff(user, _): Staff<Bearer>,
    Path(id): Path<ProductId>,
) -> Result<Response> {
    tracing::debug!(user_id = %user.id, "deleting product");
    Ok(if state.products().delete(id).await? {
        Json(json!({ "status": "Ok!" })).into_response()
    } else {
        (StatusCode::BAD_REQUEST, Json(json!({ "status": "Bad!" }))).into_response()
    })
}
