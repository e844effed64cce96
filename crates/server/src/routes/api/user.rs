//! User API handlers: registration, cookie login, token issuance and role
//! management.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{Bearer, Staff, clear_current_user, set_current_user};
use crate::models::{CurrentUser, FieldErrors};
use crate::services::{AssignRoleRequest, AuthError};
use crate::state::AppState;

/// Email and password, as posted by API clients.
#[derive(Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Credentials {
    #[serde(alias = "Email")]
    pub email: Option<String>,
    #[serde(alias = "Password")]
    pub password: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Required-field check shared by register, login and auth.
    fn require(self) -> std::result::Result<(String, String), FieldErrors> {
        let mut errors = FieldErrors::default();
        let email = self.email.filter(|e| !e.trim().is_empty());
        let password = self.password.filter(|p| !p.is_empty());
        if email.is_none() {
            errors.add("Email", "The Email field is required.");
        }
        if password.is_none() {
            errors.add("Password", "The Password field is required.");
        }
        match (email, password) {
            (Some(email), Some(password)) => Ok((email, password)),
            _ => Err(errors),
        }
    }
}

/// Role creation and assignment body.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RoleRequest {
    #[serde(alias = "RoleName")]
    pub role_name: Option<String>,
    #[serde(alias = "RoleId")]
    pub role_id: Option<String>,
    #[serde(alias = "UserId")]
    pub user_id: Option<String>,
}

/// Response of a successful token request.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub message: &'static str,
    pub status: u16,
    pub token: String,
}

fn bad_request_text(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, message.to_owned()).into_response()
}

fn field_errors(errors: &FieldErrors) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "title": "One or more validation errors occurred.", "errors": errors })),
    )
        .into_response()
}

fn malformed_body(rejection: &JsonRejection) -> Response {
    let mut errors = FieldErrors::default();
    errors.add("$", rejection.body_text());
    field_errors(&errors)
}

/// Map identity failures that carry a client-facing payload.
fn auth_failure(error: AuthError) -> Result<Response> {
    Ok(match error {
        AuthError::InvalidRequest(errors) => field_errors(&errors),
        AuthError::Rejected(errors) => (StatusCode::BAD_REQUEST, Json(errors)).into_response(),
        AuthError::EmptyRoleName => bad_request_text("Error RoleName ..."),
        AuthError::RoleAlreadyExists => bad_request_text("This RoleName already exist ..."),
        AuthError::MissingAssignmentIds => bad_request_text("Error assign role ..."),
        AuthError::RoleNotFound => bad_request_text("Not found Role ..."),
        AuthError::UserNotFound => bad_request_text("Not found User ..."),
        other => return Err(AppError::Auth(other)),
    })
}

/// Register a user. The email doubles as the user name.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    body: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<Response> {
    let Json(credentials) = match body {
        Ok(body) => body,
        Err(rejection) => return Ok(malformed_body(&rejection)),
    };
    let (email, password) = match credentials.require() {
        Ok(pair) => pair,
        Err(errors) => return Ok(field_errors(&errors)),
    };

    match state.identity().register(&email, &password).await {
        Ok(user) => Ok(format!("User {} is registered successfully!", user.user_name).into_response()),
        Err(e) => auth_failure(e),
    }
}

/// Sign in with a cookie session. No token is issued.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    body: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<Response> {
    let Json(credentials) = match body {
        Ok(body) => body,
        Err(rejection) => return Ok(malformed_body(&rejection)),
    };
    let (email, password) = match credentials.require() {
        Ok(pair) => pair,
        Err(errors) => return Ok(field_errors(&errors)),
    };

    let user = match state.identity().login(&email, &password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            return Ok(
                (StatusCode::UNAUTHORIZED, "Invalid email or password.").into_response()
            );
        }
        Err(e) => return Err(e.into()),
    };

    set_current_user(&session, &CurrentUser::from(&user))
        .await
        .map_err(|e| AppError::Internal(format!("failed to set session: {e}")))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(format!("User {} logged in successfully!", user.user_name).into_response())
}

/// Verify credentials and issue a bearer token. No session is created.
#[instrument(skip_all)]
pub async fn auth(
    State(state): State<AppState>,
    body: std::result::Result<Json<Credentials>, JsonRejection>,
) -> Result<Response> {
    let error_model = || {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Error model" })),
        )
            .into_response()
    };

    let Ok(Json(credentials)) = body else {
        return Ok(error_model());
    };
    let Ok((email, password)) = credentials.require() else {
        return Ok(error_model());
    };

    let user = match state.identity().login(&email, &password).await {
        Ok(user) => user,
        Err(AuthError::InvalidCredentials) => {
            return Ok((
                StatusCode::UNAUTHORIZED,
                Json(json!({ "message": "Invalid login attempt" })),
            )
                .into_response());
        }
        Err(e) => return Err(e.into()),
    };

    let issued = state.tokens().issue(&CurrentUser::from(&user))?;
    tracing::info!(user_id = %user.id, expires_at = %issued.expires_at, "token issued");

    Ok(Json(TokenResponse {
        message: "User logged in",
        status: 200,
        token: issued.token,
    })
    .into_response())
}

/// End the cookie session. Always succeeds.
#[instrument(skip_all)]
pub async fn logout(session: Session) -> Result<String> {
    let user = clear_current_user(&session)
        .await
        .map_err(|e| AppError::Internal(format!("failed to clear session: {e}")))?;
    clear_sentry_user();

    let user_name = user.map_or_else(|| "Unknown user".to_owned(), |u| u.user_name);
    Ok(format!("User {user_name} logged out successfully!"))
}

/// Create a role.
#[instrument(skip(state, user))]
pub async fn create_role(
    State(state): State<AppState>,
    Staff(user, _): Staff<Bearer>,
    Json(request): Json<RoleRequest>,
) -> Result<Response> {
    let name = request.role_name.unwrap_or_default();
    match state.identity().create_role(&name).await {
        Ok(role) => {
            tracing::info!(by = %user.id, role = %role.name, "role created via api");
            Ok(format!("Role: {name} created ...").into_response())
        }
        Err(e) => auth_failure(e),
    }
}

/// Add a user to a role.
#[instrument(skip(state, user))]
pub async fn assign_role(
    State(state): State<AppState>,
    Staff(user, _): Staff<Bearer>,
    Json(request): Json<RoleRequest>,
) -> Result<Response> {
    let request = AssignRoleRequest {
        user_id: request.user_id,
        role_id: request.role_id,
        role_name: request.role_name,
    };

    match state.identity().assign_role(request).await {
        Ok(assignment) => {
            tracing::info!(by = %user.id, "role assigned via api");
            Ok(format!(
                "Role {} assigned to {}...",
                assignment.role_name, assignment.user_name
            )
            .into_response())
        }
        Err(e) => auth_failure(e),
    }
}
