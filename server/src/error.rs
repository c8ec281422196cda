//! HTTP error type shared by every route.
//!
//! Service errors convert into [`ApiError`] with `?`; the status mapping lives
//! here so handlers never pick status codes for domain failures themselves.
//! Extractor rejections come through here too (see [`crate::routes::extract`]).
//! Bodies are always `{"message": "..."}`.

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use models::ErrorBody;

use crate::services::auth::AuthError;
use crate::services::event::EventError;
use crate::services::file::FileError;
use crate::services::storage::StorageError;
use crate::services::token::TokenError;
use crate::services::user::UserError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    PayloadTooLarge(String),
    #[error("{0}")]
    UnsupportedMediaType(String),
    #[error("{0}")]
    Unprocessable(String),
    #[error("{0}")]
    ServiceUnavailable(String),
    #[error("{0}")]
    BadGateway(String),
    /// Logged with its cause; the client only sees a generic message.
    #[error("internal server error")]
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::BadGateway(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub(crate) fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal(err.to_string())
    }

    /// Keep the status axum chose for a rejection, with our body shape.
    fn from_rejection(status: StatusCode, message: String) -> Self {
        match status {
            StatusCode::PAYLOAD_TOO_LARGE => Self::PayloadTooLarge(message),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => Self::UnsupportedMediaType(message),
            StatusCode::UNPROCESSABLE_ENTITY => Self::Unprocessable(message),
            s if s.is_server_error() => Self::Internal(message),
            _ => Self::BadRequest(message),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal(cause) => tracing::error!(%cause, "internal error"),
            Self::BadGateway(cause) => tracing::warn!(%cause, "upstream failure"),
            _ => tracing::debug!(%status, message = %self, "request rejected"),
        }

        let mut response = (status, Json(ErrorBody { message: self.to_string() })).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

// =============================================================================
// EXTRACTOR REJECTIONS
// =============================================================================

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::from_rejection(rejection.status(), rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::from_rejection(rejection.status(), rejection.body_text())
    }
}

// =============================================================================
// SERVICE ERROR MAPPING
// =============================================================================

impl From<TokenError> for ApiError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => Self::Unauthorized("token expired".to_owned()),
            TokenError::Invalid(_) => Self::Unauthorized("could not validate credentials".to_owned()),
            TokenError::Encode(e) => Self::Internal(e),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::TokenExchange(_) | AuthError::GoogleApi(_) => Self::BadGateway(err.to_string()),
            AuthError::MissingProfile => Self::BadGateway(err.to_string()),
            AuthError::InvalidEmail | AuthError::WeakPassword | AuthError::MissingName => {
                Self::BadRequest(err.to_string())
            }
            AuthError::EmailTaken => Self::Conflict(err.to_string()),
            AuthError::InvalidCredentials | AuthError::UnverifiedEmail => Self::Unauthorized(err.to_string()),
            AuthError::Config(_) | AuthError::Hash(_) | AuthError::Join(_) | AuthError::Db(_) => {
                Self::internal(err)
            }
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound(_) => Self::NotFound("user not found".to_owned()),
            UserError::AdminLocked(_) => Self::Forbidden(err.to_string()),
            UserError::InvalidRole(_) => Self::BadRequest(err.to_string()),
            UserError::Database(_) => Self::internal(err),
        }
    }
}

impl From<EventError> for ApiError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::NotFound(_) => Self::NotFound("event not found".to_owned()),
            EventError::Forbidden(_) => Self::Forbidden(err.to_string()),
            EventError::InvalidTransition { .. } => Self::Conflict(err.to_string()),
            EventError::Validation(_) => Self::BadRequest(err.to_string()),
            EventError::Database(_) => Self::internal(err),
        }
    }
}

impl From<FileError> for ApiError {
    fn from(err: FileError) -> Self {
        match err {
            FileError::NotFound(_) => Self::NotFound("file not found".to_owned()),
            FileError::EventNotFound(_) => Self::NotFound("event not found".to_owned()),
            FileError::EventArchived(_) => Self::Conflict(err.to_string()),
            FileError::Forbidden(_) => Self::Forbidden(err.to_string()),
            FileError::Validation(_) => Self::BadRequest(err.to_string()),
            FileError::TooLarge { .. } => Self::PayloadTooLarge(err.to_string()),
            FileError::Storage(StorageError::NotFound(_)) => Self::NotFound("file content missing".to_owned()),
            FileError::Storage(_) | FileError::Database(_) => Self::internal(err),
        }
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
