//! REST API client for the portal server.
//!
//! ERROR HANDLING
//! ==============
//! Every non-2xx response becomes [`ApiError::Status`] carrying the server's
//! `{"message"}` text, or `HTTP <code>` when the body has none. A 401 also
//! clears the stored session.

use std::sync::Arc;

use models::{
    AuthResponse, AuthUrlResponse, CreateEventRequest, ErrorBody, Event, EventFile, EventStatus, FileCategory,
    MessageResponse, PasswordLoginRequest, RegisterRequest, RoleUpdateRequest, UpdateEventRequest, User,
};
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::session::{Session, SessionError, SessionStore};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message} (HTTP {status})")]
    Status { status: u16, message: String },
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid base URL: {0}")]
    InvalidBaseUrl(String),
    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ApiError {
    /// HTTP status for server-side rejections, `None` for transport failures.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED.as_u16())
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// File bytes plus the headers that describe them.
#[derive(Debug, Clone)]
pub struct Download {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// A file to send to `POST /files`.
#[derive(Debug, Clone)]
pub struct FileUpload {
    pub event_id: Uuid,
    pub filename: String,
    pub mime_type: Option<String>,
    pub category: Option<FileCategory>,
    pub bytes: Vec<u8>,
}

pub(crate) fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .map(|b| b.message)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

/// Pull `filename="..."` out of a `Content-Disposition` header.
pub(crate) fn disposition_filename(value: &str) -> Option<String> {
    value.split(';').map(str::trim).find_map(|part| {
        let raw = part.strip_prefix("filename=")?;
        let name = raw.trim_matches('"');
        (!name.is_empty()).then(|| name.to_owned())
    })
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    store: Arc<dyn SessionStore>,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidBaseUrl`] unless `base_url` is http(s), or
    /// [`ApiError::Http`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, store: Arc<dyn SessionStore>) -> ApiResult<Self> {
        let base_url = base_url.trim().trim_end_matches('/').to_owned();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(ApiError::InvalidBaseUrl(base_url));
        }
        let http = reqwest::Client::builder().user_agent(concat!("portal/", env!("CARGO_PKG_VERSION"))).build()?;
        Ok(Self { http, base_url, store })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// # Errors
    ///
    /// Returns [`ApiError::Session`] if the store cannot be read.
    pub fn session(&self) -> ApiResult<Session> {
        Ok(self.store.load()?)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn request(&self, method: Method, path: &str) -> ApiResult<RequestBuilder> {
        let builder = self.http.request(method, self.url(path));
        Ok(match self.store.load()?.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        })
    }

    async fn check(&self, response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status == StatusCode::UNAUTHORIZED {
            tracing::debug!("server rejected token; clearing session");
            self.store.clear()?;
        }
        Err(ApiError::Status { status: status.as_u16(), message: error_message(status, &body) })
    }

    async fn send<T: DeserializeOwned>(&self, builder: RequestBuilder) -> ApiResult<T> {
        let response = self.check(builder.send().await?).await?;
        Ok(response.json::<T>().await?)
    }

    // =========================================================================
    // MISC
    // =========================================================================

    /// `GET /health`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or non-2xx status.
    pub async fn health(&self) -> ApiResult<serde_json::Value> {
        self.send(self.request(Method::GET, "/health")?).await
    }

    // =========================================================================
    // AUTH
    // =========================================================================

    /// `GET /auth/login`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 503 when the server has no Google config.
    pub async fn google_login_url(&self, redirect_uri: Option<&str>) -> ApiResult<AuthUrlResponse> {
        let mut builder = self.request(Method::GET, "/auth/login")?;
        if let Some(uri) = redirect_uri {
            builder = builder.query(&[("redirect_uri", uri)]);
        }
        self.send(builder).await
    }

    /// `GET /auth/callback`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on rejected code or state.
    pub async fn google_callback(&self, code: &str, state: &str) -> ApiResult<AuthResponse> {
        let builder = self
            .request(Method::GET, "/auth/callback")?
            .query(&[("code", code), ("state", state)]);
        self.send(builder).await
    }

    /// `POST /auth/password-login`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 401 for bad credentials.
    pub async fn password_login(&self, email: &str, password: &str) -> ApiResult<AuthResponse> {
        let body = PasswordLoginRequest { email: email.to_owned(), password: password.to_owned() };
        self.send(self.request(Method::POST, "/auth/password-login")?.json(&body)).await
    }

    /// `POST /auth/register`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 409 for a taken email, 400 for invalid input.
    pub async fn register(&self, name: &str, email: &str, password: &str) -> ApiResult<User> {
        let body = RegisterRequest { name: name.to_owned(), email: email.to_owned(), password: password.to_owned() };
        self.send(self.request(Method::POST, "/auth/register")?.json(&body)).await
    }

    /// `GET /auth/me`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 401 clears the session.
    pub async fn me(&self) -> ApiResult<User> {
        self.send(self.request(Method::GET, "/auth/me")?).await
    }

    /// `POST /auth/logout`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or non-2xx status.
    pub async fn logout(&self) -> ApiResult<MessageResponse> {
        self.send(self.request(Method::POST, "/auth/logout")?).await
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// `GET /events?status=`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or non-2xx status.
    pub async fn list_events(&self, status: Option<EventStatus>) -> ApiResult<Vec<Event>> {
        let mut builder = self.request(Method::GET, "/events")?;
        if let Some(status) = status {
            builder = builder.query(&[("status", status.as_str())]);
        }
        self.send(builder).await
    }

    /// `GET /events/{id}`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 404 for an unknown event.
    pub async fn get_event(&self, id: Uuid) -> ApiResult<Event> {
        self.send(self.request(Method::GET, &format!("/events/{id}"))?).await
    }

    /// `POST /events`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 403 for members.
    pub async fn create_event(&self, req: &CreateEventRequest) -> ApiResult<Event> {
        self.send(self.request(Method::POST, "/events")?.json(req)).await
    }

    /// `PATCH /events/{id}`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 409 for archived events.
    pub async fn update_event(&self, id: Uuid, req: &UpdateEventRequest) -> ApiResult<Event> {
        self.send(self.request(Method::PATCH, &format!("/events/{id}"))?.json(req)).await
    }

    /// `PATCH /events/{id}/approve`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 409 unless pending.
    pub async fn approve_event(&self, id: Uuid) -> ApiResult<Event> {
        self.send(self.request(Method::PATCH, &format!("/events/{id}/approve"))?).await
    }

    /// `PATCH /events/{id}/archive`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 409 if already archived.
    pub async fn archive_event(&self, id: Uuid) -> ApiResult<Event> {
        self.send(self.request(Method::PATCH, &format!("/events/{id}/archive"))?).await
    }

    /// `DELETE /events/{id}`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 403 for non-admins.
    pub async fn delete_event(&self, id: Uuid) -> ApiResult<MessageResponse> {
        self.send(self.request(Method::DELETE, &format!("/events/{id}"))?).await
    }

    // =========================================================================
    // FILES
    // =========================================================================

    /// `GET /files?event_id=&category=`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] on transport failure or non-2xx status.
    pub async fn list_files(&self, event_id: Option<Uuid>, category: Option<FileCategory>) -> ApiResult<Vec<EventFile>> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(id) = event_id {
            query.push(("event_id", id.to_string()));
        }
        if let Some(category) = category {
            query.push(("category", category.as_str().to_owned()));
        }
        self.send(self.request(Method::GET, "/files")?.query(&query)).await
    }

    /// `GET /files/{id}`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 404 for an unknown file.
    pub async fn get_file(&self, id: Uuid) -> ApiResult<EventFile> {
        self.send(self.request(Method::GET, &format!("/files/{id}"))?).await
    }

    /// `POST /files` as `multipart/form-data`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 413 above the server limit, 409 for archived
    /// events.
    pub async fn upload_file(&self, upload: FileUpload) -> ApiResult<EventFile> {
        let mut part = reqwest::multipart::Part::bytes(upload.bytes).file_name(upload.filename);
        if let Some(mime) = upload.mime_type {
            part = part.mime_str(&mime)?;
        }
        let mut form = reqwest::multipart::Form::new()
            .text("event_id", upload.event_id.to_string())
            .part("file", part);
        if let Some(category) = upload.category {
            form = form.text("category", category.as_str());
        }
        self.send(self.request(Method::POST, "/files")?.multipart(form)).await
    }

    /// `GET /files/{id}/download`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 404 for an unknown file.
    pub async fn download_file(&self, id: Uuid) -> ApiResult<Download> {
        let response = self
            .check(self.request(Method::GET, &format!("/files/{id}/download"))?.send().await?)
            .await?;
        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        };
        let content_type = header(CONTENT_TYPE);
        let filename = header(CONTENT_DISPOSITION).as_deref().and_then(disposition_filename);
        let bytes = response.bytes().await?.to_vec();
        Ok(Download { filename, content_type, bytes })
    }

    /// `DELETE /files/{id}`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 403 unless uploader or admin.
    pub async fn delete_file(&self, id: Uuid) -> ApiResult<MessageResponse> {
        self.send(self.request(Method::DELETE, &format!("/files/{id}"))?).await
    }

    // =========================================================================
    // USERS
    // =========================================================================

    /// `GET /users`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 403 for non-admins.
    pub async fn list_users(&self) -> ApiResult<Vec<User>> {
        self.send(self.request(Method::GET, "/users")?).await
    }

    /// `PATCH /users/{id}/role`
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`]; 403 when the target is an admin.
    pub async fn set_role(&self, id: Uuid, role: &str) -> ApiResult<User> {
        let body = RoleUpdateRequest { role: role.to_owned() };
        self.send(self.request(Method::PATCH, &format!("/users/{id}/role"))?.json(&body)).await
    }
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
