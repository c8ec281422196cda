//! JWT issuance and verification.
//!
//! ARCHITECTURE
//! ============
//! Access tokens are stateless HS256 JWTs carrying [`TokenClaims`]. The
//! server trusts only the signature and `exp`; the user row is re-read on
//! every request so role changes apply without re-login.
//!
//! The same key also signs the short-lived OAuth `state` value, which lets the
//! callback verify it without server-side session storage.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use models::{TokenClaims, User};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use super::crypto::generate_token;

const OAUTH_STATE_TTL: Duration = Duration::minutes(10);
const OAUTH_STATE_PURPOSE: &str = "oauth_state";

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(String),
    #[error("token encoding failed: {0}")]
    Encode(String),
}

impl From<jsonwebtoken::errors::Error> for TokenError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid(err.to_string()),
        }
    }
}

/// Payload of the signed OAuth `state` parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OAuthState {
    pub purpose: String,
    pub nonce: String,
    pub redirect_uri: String,
    pub exp: i64,
}

/// Signing material plus the access-token lifetime.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    #[must_use]
    pub fn new(secret: &[u8], ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: Duration::hours(ttl_hours),
        }
    }

    /// Issue an access token for `user`, valid from now.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encode`] if signing fails.
    pub fn issue(&self, user: &User) -> Result<String, TokenError> {
        self.issue_at(user, OffsetDateTime::now_utc())
    }

    /// Issue an access token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encode`] if signing fails.
    pub fn issue_at(&self, user: &User, now: OffsetDateTime) -> Result<String, TokenError> {
        let claims = TokenClaims {
            sub: user.id.to_string(),
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            picture: user.picture.clone().unwrap_or_default(),
            role: user.role,
            iat: now.unix_timestamp(),
            exp: (now + self.ttl).unix_timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Verify signature and expiry of an access token.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Expired`] past `exp`, otherwise
    /// [`TokenError::Invalid`] for any malformed or forged token.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding, &strict_validation())?;
        Ok(data.claims)
    }

    /// Sign a fresh OAuth `state` bound to `redirect_uri`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Encode`] if signing fails.
    pub fn issue_oauth_state(&self, redirect_uri: &str) -> Result<String, TokenError> {
        let state = OAuthState {
            purpose: OAUTH_STATE_PURPOSE.to_owned(),
            nonce: generate_token(),
            redirect_uri: redirect_uri.to_owned(),
            exp: (OffsetDateTime::now_utc() + OAUTH_STATE_TTL).unix_timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &state, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))
    }

    /// Verify an OAuth `state` produced by [`Self::issue_oauth_state`].
    ///
    /// # Errors
    ///
    /// Returns [`TokenError`] if the state is forged, expired or was minted
    /// for another purpose (an access token is not a valid state).
    pub fn verify_oauth_state(&self, state: &str) -> Result<OAuthState, TokenError> {
        let data = jsonwebtoken::decode::<OAuthState>(state, &self.decoding, &strict_validation())?;
        if data.claims.purpose != OAUTH_STATE_PURPOSE {
            return Err(TokenError::Invalid("wrong token purpose".to_owned()));
        }
        Ok(data.claims)
    }
}

fn strict_validation() -> Validation {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation
}

#[cfg(test)]
#[path = "token_test.rs"]
mod tests;
