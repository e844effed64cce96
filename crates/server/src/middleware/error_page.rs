//! Error pages for browser requests.
//!
//! Handlers return plain-text errors. For non-API requests that end in a
//! 5xx, this layer swaps the body for a rendered page; in development the
//! page also shows the [`ErrorDetail`] attached by `AppError`.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::ErrorDetail;
use crate::state::AppState;

/// Generic error page.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub request_id: Option<String>,
    pub detail: Option<String>,
}

/// Render server errors of HTML routes as a page.
pub async fn error_page_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let is_api = request.uri().path().starts_with("/api/");
    let request_id = request
        .headers()
        .get(super::request_id::REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(String::from);
    let response = next.run(request).await;

    if is_api || !response.status().is_server_error() {
        return response;
    }

    let status = response.status();
    let detail = if state.config().environment.is_development() {
        response
            .extensions()
            .get::<ErrorDetail>()
            .map(|d| d.0.clone())
    } else {
        None
    };

    (status, ErrorTemplate { request_id, detail }).into_response()
}
