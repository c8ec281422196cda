//! Auth context for the current portal user.
//!
//! SYSTEM CONTEXT
//! ==============
//! Owns the login lifecycle on top of [`ApiClient`]: every successful login
//! path stores `{token, user}` in the session store, logout always clears it,
//! and [`AuthContext::restore`] decides at startup whether the stored session
//! is still usable. Route guards and the token watch only read the store.

use models::{AuthResponse, User};

use crate::api::{ApiClient, ApiResult};
use crate::session::Session;
use crate::token;

/// Outcome of a startup session check.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthStatus {
    Anonymous,
    Authenticated(User),
}

impl AuthStatus {
    #[must_use]
    pub fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous => None,
        }
    }
}

#[derive(Clone)]
pub struct AuthContext {
    api: ApiClient,
}

impl AuthContext {
    #[must_use]
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    fn store_login(&self, auth: AuthResponse) -> ApiResult<User> {
        self.api.store().save(&Session::new(auth.access_token, auth.user.clone()))?;
        tracing::info!(user_id = %auth.user.id, role = %auth.user.role, "signed in");
        Ok(auth.user)
    }

    /// Email/password login.
    ///
    /// # Errors
    ///
    /// Returns [`crate::api::ApiError`] on rejected credentials or transport
    /// failure; the session is left untouched on failure.
    pub async fn login(&self, email: &str, password: &str) -> ApiResult<User> {
        let auth = self.api.password_login(email, password).await?;
        self.store_login(auth)
    }

    /// Create an account, then sign in with the same credentials.
    ///
    /// # Errors
    ///
    /// Returns [`crate::api::ApiError`] from either the registration or the
    /// follow-up login.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ApiResult<User> {
        let created = self.api.register(name, email, password).await?;
        tracing::debug!(user_id = %created.id, "registered account");
        self.login(email, password).await
    }

    /// URL of the Google consent screen.
    ///
    /// # Errors
    ///
    /// Returns [`crate::api::ApiError`]; 503 when the server has no Google
    /// config.
    pub async fn google_login_url(&self, redirect_uri: Option<&str>) -> ApiResult<String> {
        Ok(self.api.google_login_url(redirect_uri).await?.auth_url)
    }

    /// Finish the OAuth flow with the `code` and `state` Google redirected
    /// back with.
    ///
    /// # Errors
    ///
    /// Returns [`crate::api::ApiError`] when the server rejects the code or
    /// state.
    pub async fn complete_google_login(&self, code: &str, state: &str) -> ApiResult<User> {
        let auth = self.api.google_callback(code, state).await?;
        self.store_login(auth)
    }

    /// Tell the server, then drop the local session regardless of the reply.
    ///
    /// # Errors
    ///
    /// Returns [`crate::api::ApiError::Session`] only if the local session
    /// cannot be cleared.
    pub async fn logout(&self) -> ApiResult<()> {
        if self.api.session()?.token.is_some() {
            if let Err(e) = self.api.logout().await {
                tracing::debug!(error = %e, "server logout failed; clearing local session anyway");
            }
        }
        self.api.store().clear()?;
        Ok(())
    }

    /// Startup check of the stored session.
    ///
    /// No token is anonymous. A token that is already expired locally is
    /// cleared without a round trip. Otherwise `/auth/me` decides, and the
    /// refreshed user replaces the stored one.
    ///
    /// # Errors
    ///
    /// Returns [`crate::api::ApiError::Session`] only when the session store
    /// itself fails; server rejections resolve to [`AuthStatus::Anonymous`].
    pub async fn restore(&self, now_unix: i64) -> ApiResult<AuthStatus> {
        let session = self.api.session()?;
        let Some(token) = session.token else {
            return Ok(AuthStatus::Anonymous);
        };
        if token::is_expired(&token, now_unix) {
            tracing::info!("stored token expired; signing out");
            self.api.store().clear()?;
            return Ok(AuthStatus::Anonymous);
        }
        match self.api.me().await {
            Ok(user) => {
                self.api.store().save(&Session::new(token, user.clone()))?;
                Ok(AuthStatus::Authenticated(user))
            }
            Err(e) => {
                tracing::warn!(error = %e, "session check failed; signing out");
                self.api.store().clear()?;
                Ok(AuthStatus::Anonymous)
            }
        }
    }

    /// The stored user, if the session is still live at `now_unix`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::api::ApiError::Session`] if the store cannot be read.
    pub fn current_user(&self, now_unix: i64) -> ApiResult<Option<User>> {
        let session = self.api.session()?;
        Ok(if session.is_logged_in(now_unix) { session.user } else { None })
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
