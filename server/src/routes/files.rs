//! Event file routes: multipart upload, listing, download, deletion.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use models::{EventFile, FileCategory, MessageResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::routes::auth::AuthUser;
use crate::routes::extract::{Json, Path, Query};
use crate::services::file::{self as file_svc, Upload};
use crate::state::AppState;

fn multipart_error(err: &MultipartError) -> ApiError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge("file exceeds the upload limit".to_owned())
    } else {
        ApiError::BadRequest(format!("invalid multipart body: {}", err.body_text()))
    }
}

pub(crate) fn parse_category(raw: Option<&str>) -> ApiResult<Option<FileCategory>> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s.parse().map(Some).map_err(|e: models::UnknownVariant| ApiError::BadRequest(e.to_string())),
    }
}

/// Characters that would break a quoted `filename=` parameter are replaced.
pub(crate) fn content_disposition(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| if c == '"' || c == '\\' || c.is_control() || !c.is_ascii() { '_' } else { c })
        .collect();
    format!("attachment; filename=\"{safe}\"")
}

/// `POST /files`: multipart fields `file`, `event_id`, optional `category`.
pub async fn upload_file(
    State(state): State<AppState>,
    auth: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<impl IntoResponse> {
    let mut multipart = multipart?;
    let mut event_id: Option<Uuid> = None;
    let mut category: Option<FileCategory> = None;
    let mut file: Option<(String, Option<String>, Vec<u8>)> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| multipart_error(&e))? {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "event_id" => {
                let raw = field.text().await.map_err(|e| multipart_error(&e))?;
                let parsed = Uuid::parse_str(raw.trim()).map_err(|_| ApiError::BadRequest("invalid event_id".to_owned()))?;
                event_id = Some(parsed);
            }
            "category" => {
                let raw = field.text().await.map_err(|e| multipart_error(&e))?;
                category = parse_category(Some(&raw))?;
            }
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_owned();
                let content_type = field.content_type().map(str::to_owned);
                let bytes = field.bytes().await.map_err(|e| multipart_error(&e))?;
                file = Some((filename, content_type, bytes.to_vec()));
            }
            other => tracing::debug!(field = other, "ignoring unknown multipart field"),
        }
    }

    let event_id = event_id.ok_or_else(|| ApiError::BadRequest("event_id is required".to_owned()))?;
    let (filename, content_type, bytes) = file.ok_or_else(|| ApiError::BadRequest("file is required".to_owned()))?;
    let upload = Upload { event_id, filename, content_type, category, bytes };

    let stored = file_svc::upload_file(
        &state.pool,
        state.storage.as_ref(),
        &auth.user,
        upload,
        state.config.max_upload_bytes,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(stored)))
}

#[derive(Deserialize)]
pub struct ListQuery {
    event_id: Option<Uuid>,
    category: Option<String>,
}

/// `GET /files?event_id=&category=`
pub async fn list_files(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(params): Query<ListQuery>,
) -> ApiResult<Json<Vec<EventFile>>> {
    let category = parse_category(params.category.as_deref())?;
    Ok(Json(file_svc::list_files(&state.pool, params.event_id, category).await?))
}

/// `GET /files/{id}`
pub async fn get_file(State(state): State<AppState>, _auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Json<EventFile>> {
    Ok(Json(file_svc::get_file(&state.pool, id).await?))
}

/// `GET /files/{id}/download`
pub async fn download_file(State(state): State<AppState>, _auth: AuthUser, Path(id): Path<Uuid>) -> ApiResult<Response> {
    let (file, bytes) = file_svc::download_file(&state.pool, state.storage.as_ref(), id).await?;
    Ok((
        [
            (CONTENT_TYPE, file.mime_type.clone()),
            (CONTENT_DISPOSITION, content_disposition(&file.filename)),
        ],
        bytes,
    )
        .into_response())
}

/// `DELETE /files/{id}`: uploader or admin.
pub async fn delete_file(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<MessageResponse>> {
    file_svc::delete_file(&state.pool, state.storage.as_ref(), &auth.user, id).await?;
    Ok(Json(MessageResponse::new("file deleted")))
}

#[cfg(test)]
#[path = "files_test.rs"]
mod tests;
