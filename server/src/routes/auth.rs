//! Auth routes: Google OAuth flow, password login, registration, identity.

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::http::header::AUTHORIZATION;
use axum::response::IntoResponse;
use models::{AuthResponse, AuthUrlResponse, MessageResponse, PasswordLoginRequest, RegisterRequest, Role, User};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::routes::extract::{Json, Query};
use crate::services::{auth as auth_svc, user as user_svc};
use crate::state::AppState;

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user extracted from the `Authorization: Bearer` header.
/// Use as a handler parameter to require authentication.
///
/// The user row is reloaded on every request so role changes and deletions
/// take effect before the token expires.
pub struct AuthUser {
    pub user: User,
}

impl AuthUser {
    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] for non-admins.
    pub fn require_admin(&self) -> ApiResult<()> {
        self.require_any(&[Role::Admin])
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Forbidden`] unless the user holds one of `roles`.
    pub fn require_any(&self, roles: &[Role]) -> ApiResult<()> {
        if self.user.role.has_any(roles) {
            Ok(())
        } else {
            Err(ApiError::Forbidden("insufficient permissions".to_owned()))
        }
    }
}

/// Pull the token out of an `Authorization` header value. The scheme is
/// matched case-insensitively.
pub(crate) fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| ApiError::Unauthorized("not authenticated".to_owned()))?;

        let app_state = AppState::from_ref(state);
        let claims = app_state.jwt.verify(token)?;
        let user = user_svc::find_by_id(&app_state.pool, claims.user_id)
            .await?
            .ok_or_else(|| ApiError::Unauthorized("user not found".to_owned()))?;

        Ok(Self { user })
    }
}

fn auth_response(state: &AppState, user: User) -> ApiResult<AuthResponse> {
    let token = state.jwt.issue(&user)?;
    Ok(AuthResponse::bearer(token, user))
}

fn google_config(state: &AppState) -> ApiResult<&auth_svc::GoogleConfig> {
    state
        .google
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Google OAuth not configured".to_owned()))
}

// =============================================================================
// GOOGLE OAUTH
// =============================================================================

#[derive(Deserialize)]
pub struct LoginQuery {
    redirect_uri: Option<String>,
}

/// `GET /auth/login`: return the Google authorization URL.
pub async fn google_login(
    State(state): State<AppState>,
    Query(params): Query<LoginQuery>,
) -> ApiResult<Json<AuthUrlResponse>> {
    let config = google_config(&state)?;
    let redirect_uri =
        auth_svc::choose_redirect_uri(&config.redirect_uri, params.redirect_uri.as_deref(), &state.config.cors_origins);
    let oauth_state = state.jwt.issue_oauth_state(&redirect_uri)?;
    let auth_url = config.authorize_url(&oauth_state, &redirect_uri)?;
    Ok(Json(AuthUrlResponse { auth_url }))
}

#[derive(Deserialize)]
pub struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// `GET /auth/callback`: verify state, exchange code, upsert user, issue JWT.
pub async fn google_callback(
    State(state): State<AppState>,
    Query(params): Query<CallbackQuery>,
) -> ApiResult<Json<AuthResponse>> {
    let config = google_config(&state)?;
    if let Some(error) = params.error.filter(|e| !e.is_empty()) {
        return Err(ApiError::BadRequest(format!("google authorization failed: {error}")));
    }
    let code = params
        .code
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("missing authorization code".to_owned()))?;
    let oauth_state = params
        .state
        .as_deref()
        .and_then(|s| state.jwt.verify_oauth_state(s).ok())
        .ok_or_else(|| ApiError::Unauthorized("invalid oauth state".to_owned()))?;

    let access_token = auth_svc::exchange_code(config, &code, &oauth_state.redirect_uri).await?;
    let google_user = auth_svc::fetch_google_user(config, &access_token).await?;
    let user = auth_svc::upsert_google_user(&state.pool, &google_user).await?;

    Ok(Json(auth_response(&state, user)?))
}

// =============================================================================
// PASSWORD
// =============================================================================

/// `POST /auth/password-login`
pub async fn password_login(
    State(state): State<AppState>,
    Json(body): Json<PasswordLoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let user = auth_svc::authenticate(&state.pool, &body.email, &body.password).await?;
    tracing::info!(user_id = %user.id, "password login");
    Ok(Json(auth_response(&state, user)?))
}

/// `POST /auth/register`: create a member account.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> ApiResult<impl IntoResponse> {
    let user = auth_svc::register_user(&state.pool, &body.name, &body.email, &body.password).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

// =============================================================================
// SESSION
// =============================================================================

/// `GET /auth/me`: return current user.
pub async fn me(auth: AuthUser) -> Json<User> {
    Json(auth.user)
}

/// `POST /auth/logout`: tokens are stateless; the client discards its copy.
pub async fn logout(auth: AuthUser) -> Json<MessageResponse> {
    tracing::info!(user_id = %auth.user.id, "logout");
    Json(MessageResponse::new("logged out"))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
