//! Anti-forgery tokens for browser forms.
//!
//! Each session holds one random token. Pages embed it in a hidden
//! `csrf_token` field and POST handlers compare the submitted value before
//! doing anything else.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::session_keys;

/// Name of the hidden form field carrying the token.
pub const CSRF_FIELD: &str = "csrf_token";

/// The session's token, created on first use.
///
/// # Errors
///
/// Returns `AppError::Internal` if the session store fails.
pub async fn csrf_token(session: &Session) -> Result<String, AppError> {
    let existing = session
        .get::<String>(session_keys::CSRF_TOKEN)
        .await
        .map_err(|e| AppError::Internal(format!("session read failed: {e}")))?;
    if let Some(token) = existing {
        return Ok(token);
    }

    let token = URL_SAFE_NO_PAD.encode(rand::random::<[u8; 32]>());
    session
        .insert(session_keys::CSRF_TOKEN, &token)
        .await
        .map_err(|e| AppError::Internal(format!("session write failed: {e}")))?;
    Ok(token)
}

/// Check a submitted token against the session's.
///
/// # Errors
///
/// Returns `AppError::InvalidCsrf` when the token is missing or different.
pub async fn verify_csrf(session: &Session, submitted: Option<&str>) -> Result<(), AppError> {
    let expected = session
        .get::<String>(session_keys::CSRF_TOKEN)
        .await
        .ok()
        .flatten();

    match (expected, submitted) {
        (Some(expected), Some(submitted)) if tokens_match(&expected, submitted) => Ok(()),
        _ => {
            tracing::warn!("anti-forgery token mismatch");
            Err(AppError::InvalidCsrf)
        }
    }
}

/// Length-independent comparison that does not stop at the first difference.
fn tokens_match(expected: &str, submitted: &str) -> bool {
    let (a, b) = (expected.as_bytes(), submitted.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
