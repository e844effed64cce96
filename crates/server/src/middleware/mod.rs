//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. Error pages (render 5xx for browser routes)
//! 5. Session layer (tower-sessions)

pub mod auth;
pub mod csrf;
pub mod error_page;
pub mod request_id;
pub mod session;

pub use auth::{
    Authenticated, Bearer, Cookie, CredentialScheme, OptionalUser, Staff, clear_current_user,
    set_current_user,
};
pub use csrf::{CSRF_FIELD, csrf_token, verify_csrf};
pub use error_page::error_page_middleware;
pub use request_id::request_id_middleware;
pub use session::{create_session_layer, postgres_store};
