//! Authentication service: Google OAuth2 code exchange, password login,
//! registration, and first-admin bootstrap.
//!
//! DESIGN
//! ======
//! Both login paths end in the same place: a `users` row and a JWT issued by
//! the route layer. Google users are matched by `google_sub` first, then by
//! email, so an account created by password can later sign in with Google.
//! Only a profile whose email Google reports as verified is accepted.
//! An existing user's role is never touched by a Google login.
//!
//! bcrypt runs on the blocking pool; it is deliberately slow.

use models::{Role, User};
use serde::Deserialize;
use sqlx::PgPool;
use url::Url;
use uuid::Uuid;

use super::user::{USER_COLUMNS, UserTuple, user_from_tuple};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
pub const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
pub const MIN_PASSWORD_LEN: usize = 8;

/// Google OAuth configuration loaded from environment.
#[derive(Debug, Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub userinfo_url: String,
}

impl GoogleConfig {
    /// Load from `GOOGLE_CLIENT_ID`, `GOOGLE_CLIENT_SECRET`, `GOOGLE_REDIRECT_URI`.
    /// Returns `None` if any are missing (Google login will be disabled).
    #[must_use]
    pub fn from_env() -> Option<Self> {
        let client_id = std::env::var("GOOGLE_CLIENT_ID").ok()?;
        let client_secret = std::env::var("GOOGLE_CLIENT_SECRET").ok()?;
        let redirect_uri = std::env::var("GOOGLE_REDIRECT_URI").ok()?;
        Some(Self::new(client_id, client_secret, redirect_uri))
    }

    #[must_use]
    pub fn new(client_id: String, client_secret: String, redirect_uri: String) -> Self {
        Self {
            client_id,
            client_secret,
            redirect_uri,
            auth_url: GOOGLE_AUTH_URL.to_owned(),
            token_url: GOOGLE_TOKEN_URL.to_owned(),
            userinfo_url: GOOGLE_USERINFO_URL.to_owned(),
        }
    }

    /// Build the Google authorization URL for the given signed `state`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Config`] if the configured base URL is malformed.
    pub fn authorize_url(&self, state: &str, redirect_uri: &str) -> Result<String, AuthError> {
        let mut url = Url::parse(&self.auth_url).map_err(|e| AuthError::Config(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", "openid email profile")
            .append_pair("access_type", "online")
            .append_pair("prompt", "select_account")
            .append_pair("state", state);
        Ok(url.into())
    }
}

/// Pick the redirect URI for an OAuth round trip. A caller-supplied URI is
/// honoured only when its origin is one of `allowed_origins`.
#[must_use]
pub fn choose_redirect_uri(configured: &str, requested: Option<&str>, allowed_origins: &[String]) -> String {
    let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
        return configured.to_owned();
    };
    let Ok(url) = Url::parse(requested) else {
        return configured.to_owned();
    };
    let origin = url.origin().ascii_serialization();
    if allowed_origins.iter().any(|allowed| *allowed == origin) {
        requested.to_owned()
    } else {
        tracing::warn!(%requested, "redirect_uri origin not allowed; using configured redirect");
        configured.to_owned()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Profile returned by Google's OpenID userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUser {
    pub sub: String,
    pub email: Option<String>,
    pub email_verified: Option<bool>,
    pub name: Option<String>,
    pub picture: Option<String>,
}

impl GoogleUser {
    /// Normalized email, accepted only when Google has verified it.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::MissingProfile`] when the email or subject is
    /// absent and [`AuthError::UnverifiedEmail`] unless `email_verified` is
    /// `true`.
    pub fn verified_email(&self) -> Result<String, AuthError> {
        let email = self
            .email
            .as_deref()
            .and_then(normalize_email)
            .ok_or(AuthError::MissingProfile)?;
        if self.sub.trim().is_empty() {
            return Err(AuthError::MissingProfile);
        }
        if self.email_verified != Some(true) {
            return Err(AuthError::UnverifiedEmail);
        }
        Ok(email)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("google token exchange failed: {0}")]
    TokenExchange(String),
    #[error("google api error: {0}")]
    GoogleApi(String),
    #[error("missing required user information")]
    MissingProfile,
    #[error("google account email is not verified")]
    UnverifiedEmail,
    #[error("invalid email")]
    InvalidEmail,
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,
    #[error("name is required")]
    MissingName,
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("oauth configuration error: {0}")]
    Config(String),
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),
    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

// =============================================================================
// GOOGLE OAUTH
// =============================================================================

/// Exchange an OAuth code for a Google access token.
///
/// # Errors
///
/// Returns [`AuthError::TokenExchange`] on transport failure, a non-2xx
/// response, or a body without `access_token`.
pub async fn exchange_code(config: &GoogleConfig, code: &str, redirect_uri: &str) -> Result<String, AuthError> {
    let client = reqwest::Client::new();
    let resp = client
        .post(&config.token_url)
        .header("Accept", "application/json")
        .form(&[
            ("client_id", config.client_id.as_str()),
            ("client_secret", config.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await
        .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

    let status = resp.status();
    let body = resp
        .text()
        .await
        .map_err(|e| AuthError::TokenExchange(e.to_string()))?;
    if !status.is_success() {
        return Err(AuthError::TokenExchange(format!("{status}: {body}")));
    }

    let token_resp: TokenResponse =
        serde_json::from_str(&body).map_err(|_| AuthError::TokenExchange(format!("unexpected response: {body}")))?;
    token_resp
        .access_token
        .ok_or_else(|| AuthError::TokenExchange("response did not include access_token".to_owned()))
}

/// Fetch the authenticated Google user's profile.
///
/// # Errors
///
/// Returns [`AuthError::GoogleApi`] on transport failure or a non-2xx response.
pub async fn fetch_google_user(config: &GoogleConfig, access_token: &str) -> Result<GoogleUser, AuthError> {
    let client = reqwest::Client::new();
    let resp = client
        .get(&config.userinfo_url)
        .bearer_auth(access_token)
        .send()
        .await
        .map_err(|e| AuthError::GoogleApi(e.to_string()))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        return Err(AuthError::GoogleApi(format!("{status}: {body}")));
    }

    resp.json::<GoogleUser>()
        .await
        .map_err(|e| AuthError::GoogleApi(e.to_string()))
}

/// Insert or refresh a user from their Google profile.
///
/// # Errors
///
/// Returns the errors of [`GoogleUser::verified_email`],
/// [`AuthError::EmailTaken`] when a linked account's new email belongs to
/// another user, or a database error.
pub async fn upsert_google_user(pool: &PgPool, google: &GoogleUser) -> Result<User, AuthError> {
    let email = google.verified_email()?;
    let name = google
        .name
        .clone()
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| name_from_email(&email));

    let existing: Option<uuid::Uuid> =
        sqlx::query_scalar("SELECT id FROM users WHERE google_sub = $1 OR email = $2 ORDER BY (google_sub IS NOT DISTINCT FROM $1) DESC LIMIT 1")
            .bind(&google.sub)
            .bind(&email)
            .fetch_optional(pool)
            .await?;

    let row = if let Some(id) = existing {
        sqlx::query_as::<_, UserTuple>(&format!(
            "UPDATE users SET name = $2, email = $3, google_sub = $4, picture = COALESCE($5, picture), updated_at = now() \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(&name)
        .bind(&email)
        .bind(&google.sub)
        .bind(&google.picture)
        .fetch_one(pool)
        .await
    } else {
        sqlx::query_as::<_, UserTuple>(&format!(
            "INSERT INTO users (name, email, google_sub, picture, role) VALUES ($1, $2, $3, $4, 'member') \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(&name)
        .bind(&email)
        .bind(&google.sub)
        .bind(&google.picture)
        .fetch_one(pool)
        .await
    };
    let row = match row {
        Ok(row) => row,
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => return Err(AuthError::EmailTaken),
        Err(e) => return Err(e.into()),
    };

    let user = user_from_tuple(row);
    tracing::info!(user_id = %user.id, created = existing.is_none(), "google user signed in");
    Ok(user)
}

// =============================================================================
// PASSWORD LOGIN
// =============================================================================

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

fn name_from_email(email: &str) -> String {
    email
        .split('@')
        .next()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or("user")
        .to_owned()
}

/// # Errors
///
/// Returns [`AuthError::WeakPassword`] below [`MIN_PASSWORD_LEN`] characters.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

/// Hash a password with bcrypt on the blocking pool.
///
/// # Errors
///
/// Returns [`AuthError::Hash`] or [`AuthError::Join`].
pub async fn hash_password(password: &str) -> Result<String, AuthError> {
    let password = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST)).await??;
    Ok(hash)
}

/// Verify a password against a stored bcrypt hash on the blocking pool.
/// Hashes that bcrypt cannot parse count as a mismatch.
///
/// # Errors
///
/// Returns [`AuthError::Join`] if the blocking task panics.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false)).await?;
    Ok(ok)
}

/// Create a password account with the `member` role.
///
/// # Errors
///
/// Returns validation errors, [`AuthError::EmailTaken`] on a duplicate email,
/// or a database error.
pub async fn register_user(pool: &PgPool, name: &str, email: &str, password: &str) -> Result<User, AuthError> {
    create_password_user(pool, name, email, password, Role::Member).await
}

async fn create_password_user(
    pool: &PgPool,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::MissingName);
    }
    let email = normalize_email(email).ok_or(AuthError::InvalidEmail)?;
    validate_password(password)?;
    let password_hash = hash_password(password).await?;

    let result = sqlx::query_as::<_, UserTuple>(&format!(
        "INSERT INTO users (name, email, password_hash, role) VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
    ))
    .bind(name)
    .bind(&email)
    .bind(&password_hash)
    .bind(role.as_str())
    .fetch_one(pool)
    .await;

    match result {
        Ok(row) => {
            let user = user_from_tuple(row);
            tracing::info!(user_id = %user.id, role = %user.role, "password user registered");
            Ok(user)
        }
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(AuthError::EmailTaken),
        Err(e) => Err(e.into()),
    }
}

/// Check an email/password pair. Unknown email and wrong password produce the
/// same error.
///
/// # Errors
///
/// Returns [`AuthError::InvalidCredentials`] or a database error.
pub async fn authenticate(pool: &PgPool, email: &str, password: &str) -> Result<User, AuthError> {
    let email = normalize_email(email).ok_or(AuthError::InvalidCredentials)?;

    let row = sqlx::query_as::<_, (Uuid, String, String, String, Option<String>, time::OffsetDateTime, Option<String>)>(
        &format!("SELECT {USER_COLUMNS}, password_hash FROM users WHERE email = $1"),
    )
    .bind(&email)
    .fetch_optional(pool)
    .await?;

    let Some((id, name, email, role, picture, created_at, Some(hash))) = row else {
        return Err(AuthError::InvalidCredentials);
    };
    if hash.is_empty() || !verify_password(password, &hash).await? {
        return Err(AuthError::InvalidCredentials);
    }
    Ok(user_from_tuple((id, name, email, role, picture, created_at)))
}

/// Ensure an admin account exists for `email`. Creates it when absent and
/// promotes an existing account; never changes an existing password.
///
/// # Errors
///
/// Returns validation, hashing or database errors.
pub async fn ensure_bootstrap_admin(pool: &PgPool, email: &str, password: &str) -> Result<User, AuthError> {
    let normalized = normalize_email(email).ok_or(AuthError::InvalidEmail)?;
    let promoted = sqlx::query_as::<_, UserTuple>(&format!(
        "UPDATE users SET role = 'admin', updated_at = now() WHERE email = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(&normalized)
    .fetch_optional(pool)
    .await?;

    if let Some(row) = promoted {
        return Ok(user_from_tuple(row));
    }
    let name = name_from_email(&normalized);
    create_password_user(pool, &name, &normalized, password, Role::Admin).await
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
