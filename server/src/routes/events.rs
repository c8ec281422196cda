//! Event routes: proposals, approval queue, archive.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use models::{CreateEventRequest, Event, EventStatus, MessageResponse, UpdateEventRequest};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::routes::auth::AuthUser;
use crate::routes::extract::{Json, Path, Query};
use crate::services::event as event_svc;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct ListQuery {
    status: Option<String>,
}

pub(crate) fn parse_status_filter(raw: Option<&str>) -> ApiResult<Option<EventStatus>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|e: models::UnknownVariant| ApiError::BadRequest(e.to_string())),
    }
}

/// `POST /events`: propose an event (core members and admins).
pub async fn create_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateEventRequest>,
) -> ApiResult<impl IntoResponse> {
    let event = event_svc::create_event(&state.pool, &auth.user, &body).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /events?status=`
pub async fn list_events(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<ListQuery>,
) -> ApiResult<Json<Vec<Event>>> {
    let status = parse_status_filter(params.status.as_deref())?;
    Ok(Json(event_svc::list_events(&state.pool, status).await?))
}

/// `GET /events/{id}`
pub async fn get_event(State(state): State<AppState>, _auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<Event>> {
    Ok(Json(event_svc::get_event(&state.pool, id).await?))
}

/// `PATCH /events/{id}`: organizer or admin.
pub async fn update_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateEventRequest>,
) -> ApiResult<Json<Event>> {
    Ok(Json(event_svc::update_event(&state.pool, &auth.user, id, &body).await?))
}

/// `PATCH /events/{id}/approve`: admin only.
pub async fn approve_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Event>> {
    Ok(Json(event_svc::approve_event(&state.pool, &auth.user, id).await?))
}

/// `PATCH /events/{id}/archive`: core members and admins.
pub async fn archive_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Event>> {
    Ok(Json(event_svc::archive_event(&state.pool, &auth.user, id).await?))
}

/// `DELETE /events/{id}`: admin only; removes attached files too.
pub async fn delete_event(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    event_svc::delete_event(&state.pool, state.storage.as_ref(), &auth.user, id).await?;
    Ok(Json(MessageResponse::new("event deleted")))
}

#[cfg(test)]
#[path = "events_test.rs"]
mod tests;
