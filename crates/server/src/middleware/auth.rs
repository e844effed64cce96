//! Authentication extractors.
//!
//! A route picks how its caller proves who they are by naming a
//! [`CredentialScheme`]:
//!
//! - [`Cookie`] reads the [`CurrentUser`] stored in the session by the browser
//!   login.
//! - [`Bearer`] validates an `Authorization: Bearer <jwt>` header and rebuilds
//!   the user from its claims.
//!
//! [`Authenticated<S>`] requires a caller under scheme `S`; [`Staff<S>`]
//! additionally requires one of the catalog-management roles, read from the
//! identity store on every request.
//!
//! # Example
//!
//! ```rust,ignore
//! async fn delete(Staff(user, _): Staff<Bearer>, Path(id): Path<ProductId>) { .. }
//! ```

use std::future::Future;
use std::marker::PhantomData;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{HeaderValue, StatusCode, Uri, header, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// Error returned when a route's credential requirement is not met.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to login page (for HTML requests).
    RedirectToLogin { return_url: String },
    /// Unauthorized response (for API requests).
    Unauthorized,
    /// Missing or invalid bearer token.
    BearerChallenge,
    /// Authenticated, but without a staff role.
    Forbidden { html: bool },
    /// Role lookup failed.
    Internal,
}

/// Access denied page.
#[derive(Template, WebTemplate)]
#[template(path = "account/access_denied.html")]
pub struct AccessDeniedTemplate {
    pub current_user: Option<CurrentUser>,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { return_url } => Redirect::to(&format!(
                "/account/login?returnUrl={}",
                urlencoding::encode(&return_url)
            ))
            .into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::BearerChallenge => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"))],
            )
                .into_response(),
            Self::Forbidden { html: true } => (
                StatusCode::FORBIDDEN,
                AccessDeniedTemplate { current_user: None },
            )
                .into_response(),
            Self::Forbidden { html: false } => {
                (StatusCode::FORBIDDEN, "Access denied").into_response()
            }
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

/// A way of turning request parts into an authenticated caller.
pub trait CredentialScheme: Send + Sync + 'static {
    fn authenticate(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl Future<Output = Result<CurrentUser, AuthRejection>> + Send;
}

/// Cookie session established by `/account/login` or `/api/user/login`.
pub struct Cookie;

/// Signed token issued by `/api/user/auth`.
pub struct Bearer;

/// The URI as the client sent it. `Router::nest` strips its prefix from
/// `parts.uri`, so nested routes read the original from the extensions.
fn request_uri(parts: &Parts) -> &Uri {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or(&parts.uri, |original| &original.0)
}

fn is_api(parts: &Parts) -> bool {
    request_uri(parts).path().starts_with("/api/")
}

impl CredentialScheme for Cookie {
    async fn authenticate(parts: &mut Parts, _state: &AppState) -> Result<CurrentUser, AuthRejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        session
            .get::<CurrentUser>(session_keys::CURRENT_USER)
            .await
            .ok()
            .flatten()
            .ok_or_else(|| {
                if is_api(parts) {
                    AuthRejection::Unauthorized
                } else {
                    AuthRejection::RedirectToLogin {
                        return_url: request_uri(parts)
                            .path_and_query()
                            .map_or_else(|| "/".to_owned(), ToString::to_string),
                    }
                }
            })
    }
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
fn extract_bearer(value: &str) -> Option<&str> {
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl CredentialScheme for Bearer {
    async fn authenticate(parts: &mut Parts, state: &AppState) -> Result<CurrentUser, AuthRejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(extract_bearer)
            .ok_or(AuthRejection::BearerChallenge)?;

        let claims = state.tokens().validate(token).map_err(|e| {
            tracing::debug!(error = %e, "bearer token rejected");
            AuthRejection::BearerChallenge
        })?;

        claims
            .current_user()
            .map_err(|_| AuthRejection::BearerChallenge)
    }
}

/// Extractor that requires a caller authenticated by scheme `S`.
pub struct Authenticated<S>(pub CurrentUser, pub PhantomData<S>);

impl<S: CredentialScheme> FromRequestParts<AppState> for Authenticated<S> {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = S::authenticate(parts, state).await?;
        Ok(Self(user, PhantomData))
    }
}

/// Extractor that requires a caller authenticated by scheme `S` who holds a
/// staff role (`admin`, `moderator` or `employee`).
pub struct Staff<S>(pub CurrentUser, pub PhantomData<S>);

impl<S: CredentialScheme> FromRequestParts<AppState> for Staff<S> {
    type Rejection = AuthRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = S::authenticate(parts, state).await?;

        let is_staff = state.identity().is_staff(user.id).await.map_err(|e| {
            tracing::error!(error = %e, "role lookup failed");
            AuthRejection::Internal
        })?;

        if !is_staff {
            tracing::warn!(user_id = %user.id, "staff role required");
            return Err(AuthRejection::Forbidden {
                html: !is_api(parts),
            });
        }

        Ok(Self(user, PhantomData))
    }
}

/// Extractor that optionally gets the cookie-session user.
///
/// Unlike `Authenticated<Cookie>`, this does not reject anonymous requests.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>().cloned() {
            Some(session) => session
                .get::<CurrentUser>(session_keys::CURRENT_USER)
                .await
                .ok()
                .flatten(),
            None => None,
        };

        Ok(Self(user))
    }
}

/// Store the signed-in user in the session under a fresh session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Clear the current user from the session (logout).
///
/// Returns the user that was signed in, if any.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(
    session: &Session,
) -> Result<Option<CurrentUser>, tower_sessions::session::Error> {
    let user = session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    session.cycle_id().await?;
    Ok(user)
}
