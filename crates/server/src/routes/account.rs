//! Browser account route handlers.
//!
//! Login, registration and logout for the cookie session. Passwords are
//! checked by the identity service; the session only ever holds the
//! [`CurrentUser`].

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{OptionalUser, clear_current_user, csrf_token, set_current_user, verify_csrf};
use crate::models::CurrentUser;
use crate::routes::products::CsrfForm;
use crate::services::AuthError;
use crate::state::AppState;

/// Shown for any failed login so accounts cannot be probed.
const INVALID_LOGIN: &str = "Invalid email or password.";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    #[serde(rename = "returnUrl")]
    pub return_url: Option<String>,
    pub csrf_token: Option<String>,
}

/// Registration form data.
#[derive(Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub csrf_token: Option<String>,
}

/// Query parameters of the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    #[serde(rename = "returnUrl")]
    pub return_url: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/login.html")]
pub struct LoginTemplate {
    pub current_user: Option<CurrentUser>,
    pub csrf_token: String,
    pub email: String,
    pub return_url: String,
    pub error: Option<String>,
}

/// Register page template.
#[derive(Template, WebTemplate)]
#[template(path = "account/register.html")]
pub struct RegisterTemplate {
    pub current_user: Option<CurrentUser>,
    pub csrf_token: String,
    pub email: String,
    pub errors: Vec<String>,
}

/// Only same-site paths are followed after login.
fn safe_return_url(url: Option<&str>) -> &str {
    match url {
        Some(url) if url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\") => {
            url
        }
        _ => "/product",
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    session: Session,
    OptionalUser(current_user): OptionalUser,
    Query(query): Query<LoginQuery>,
) -> Result<impl IntoResponse> {
    Ok(LoginTemplate {
        current_user,
        csrf_token: csrf_token(&session).await?,
        email: String::new(),
        return_url: safe_return_url(query.return_url.as_deref()).to_owned(),
        error: None,
    })
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    verify_csrf(&session, form.csrf_token.as_deref()).await?;
    let return_url = safe_return_url(form.return_url.as_deref()).to_owned();

    let user = match state.identity().login(&form.email, &form.password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            tracing::info!("browser login rejected");
            return Ok((
                StatusCode::UNAUTHORIZED,
                LoginTemplate {
                    current_user: None,
                    csrf_token: csrf_token(&session).await?,
                    email: form.email,
                    return_url,
                    error: Some(INVALID_LOGIN.to_owned()),
                },
            )
                .into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let current_user = CurrentUser::from(&user);
    set_current_user(&session, &current_user)
        .await
        .map_err(|e| AppError::Internal(format!("failed to set session: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    tracing::info!(user_id = %user.id, "signed in");

    Ok(Redirect::to(&return_url).into_response())
}

// =============================================================================
// Registration Routes
// =============================================================================

/// Display the registration page.
pub async fn register_page(
    session: Session,
    OptionalUser(current_user): OptionalUser,
) -> Result<impl IntoResponse> {
    Ok(RegisterTemplate {
        current_user,
        csrf_token: csrf_token(&session).await?,
        email: String::new(),
        errors: Vec::new(),
    })
}

/// Handle registration form submission, signing the new user in.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RegisterForm>,
) -> Result<Response> {
    verify_csrf(&session, form.csrf_token.as_deref()).await?;

    let result = if form.password == form.confirm_password {
        state.identity().register(&form.email, &form.password).await
    } else {
        Err(AuthError::InvalidRequest({
            let mut errors = crate::models::FieldErrors::default();
            errors.add(
                "ConfirmPassword",
                "The password and confirmation password do not match.",
            );
            errors
        }))
    };

    let errors: Vec<String> = match result {
        Ok(user) => {
            let current_user = CurrentUser::from(&user);
            set_current_user(&session, &current_user)
                .await
                .map_err(|e| AppError::Internal(format!("failed to set session: {e}")))?;
            set_sentry_user(&user.id, Some(user.email.as_str()));
            return Ok(Redirect::to("/product").into_response());
        }
        Err(AuthError::InvalidRequest(errors)) => errors.messages().map(String::from).collect(),
        Err(AuthError::Rejected(errors)) => errors.into_iter().map(|e| e.description).collect(),
        Err(e) => return Err(e.into()),
    };

    Ok((
        StatusCode::BAD_REQUEST,
        RegisterTemplate {
            current_user: None,
            csrf_token: csrf_token(&session).await?,
            email: form.email,
            errors,
        },
    )
        .into_response())
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out of the cookie session. Always succeeds.
#[instrument(skip_all)]
pub async fn logout(session: Session, Form(form): Form<CsrfForm>) -> Result<Redirect> {
    verify_csrf(&session, form.csrf_token.as_deref()).await?;

    let user = clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("failed to clear session: {e}")))?;
    clear_sentry_user();
    if let Some(user) = user {
        tracing::info!(user_id = %user.id, "signed out");
    }

    Ok(Redirect::to("/product"))
}
