//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under a single Axum router: `/auth/*`,
//! `/events/*`, `/files/*`, `/users/*`, plus `/` and `/health`. Every route
//! except `/`, `/health`, and the login endpoints requires a bearer token via
//! the [`auth::AuthUser`] extractor.

pub mod auth;
pub mod events;
pub mod extract;
pub mod files;
pub mod users;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::routing::{get, patch, post};
use models::MessageResponse;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::routes::extract::Json;
use crate::state::AppState;

/// Room for multipart boundaries and the small text fields around the file.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

pub(crate) fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_credentials(true)
}

/// Build the full application router.
pub fn app(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes.saturating_add(MULTIPART_OVERHEAD_BYTES);
    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/auth/login", get(auth::google_login))
        .route("/auth/callback", get(auth::google_callback))
        .route("/auth/password-login", post(auth::password_login))
        .route("/auth/register", post(auth::register))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/events", get(events::list_events).post(events::create_event))
        .route(
            "/events/{id}",
            get(events::get_event)
                .patch(events::update_event)
                .delete(events::delete_event),
        )
        .route("/events/{id}/approve", patch(events::approve_event))
        .route("/events/{id}/archive", patch(events::archive_event))
        .route(
            "/files",
            get(files::list_files)
                .post(files::upload_file)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/files/{id}", get(files::get_file).delete(files::delete_file))
        .route("/files/{id}/download", get(files::download_file))
        .route("/users", get(users::list_users))
        .route("/users/{id}/role", patch(users::update_role))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<MessageResponse> {
    Json(MessageResponse::new("Club Portal API is running"))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
