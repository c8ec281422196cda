//! Event file service: upload, listing, download, deletion.
//!
//! Metadata lives in `event_files`; bytes live in the [`BlobStore`]. Uploads
//! hold a share lock on the event row, write the blob, then insert the row
//! in the same transaction. The blob is removed again if the insert or
//! commit fails, so a committed row always points at a stored blob.

use models::{EventFile, EventStatus, FileCategory, User};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::crypto::sha256_hex;
use super::storage::{BlobStore, StorageError, storage_key};

const FILE_COLUMNS: &str = "id, event_id, uploader_id, filename, storage_key, mime_type, size, category, sha256, uploaded_at";
const DEFAULT_MIME: &str = "application/octet-stream";

type FileTuple = (Uuid, Uuid, Uuid, String, String, String, i64, String, String, OffsetDateTime);

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("file not found: {0}")]
    NotFound(Uuid),
    #[error("event not found: {0}")]
    EventNotFound(Uuid),
    #[error("cannot upload files to an archived event")]
    EventArchived(Uuid),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    Validation(String),
    #[error("file is {size} bytes; the limit is {max} bytes")]
    TooLarge { size: usize, max: usize },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// A file received from a client, before it is stored.
#[derive(Debug, Clone)]
pub struct Upload {
    pub event_id: Uuid,
    pub filename: String,
    pub content_type: Option<String>,
    pub category: Option<FileCategory>,
    pub bytes: Vec<u8>,
}

fn file_from_tuple(
    (id, event_id, uploader_id, filename, storage_key, mime_type, size, category, sha256, uploaded_at): FileTuple,
) -> EventFile {
    let category = category.parse().unwrap_or_else(|_| {
        tracing::warn!(%id, %category, "unknown category in event_files table; treating as other");
        FileCategory::Other
    });
    EventFile { id, event_id, uploader_id, filename, storage_key, mime_type, size, category, sha256, uploaded_at }
}

/// Check the parts of an upload that need no database.
///
/// # Errors
///
/// Returns [`FileError::Validation`] for an empty name or body, or
/// [`FileError::TooLarge`] above `max_bytes`.
pub fn validate_upload(upload: &Upload, max_bytes: usize) -> Result<(), FileError> {
    if upload.filename.trim().is_empty() {
        return Err(FileError::Validation("filename is required".to_owned()));
    }
    if upload.bytes.is_empty() {
        return Err(FileError::Validation("file is empty".to_owned()));
    }
    if upload.bytes.len() > max_bytes {
        return Err(FileError::TooLarge { size: upload.bytes.len(), max: max_bytes });
    }
    Ok(())
}

/// # Errors
///
/// Returns [`FileError::Forbidden`] unless `actor` uploaded the file or is an
/// admin.
pub fn ensure_can_delete(actor: &User, file: &EventFile) -> Result<(), FileError> {
    if actor.role.is_admin() || actor.id == file.uploader_id {
        Ok(())
    } else {
        Err(FileError::Forbidden("only the uploader or an admin can delete this file"))
    }
}

fn resolve_mime(content_type: Option<&str>) -> String {
    content_type
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or(DEFAULT_MIME)
        .to_owned()
}

/// Store an uploaded file against a non-archived event.
///
/// # Errors
///
/// Returns validation errors, [`FileError::EventNotFound`],
/// [`FileError::EventArchived`], or a storage or database error.
pub async fn upload_file(
    pool: &PgPool,
    store: &dyn BlobStore,
    actor: &User,
    upload: Upload,
    max_bytes: usize,
) -> Result<EventFile, FileError> {
    validate_upload(&upload, max_bytes)?;

    // FOR SHARE blocks a concurrent archive until this upload commits, and
    // waits out one already in flight.
    let mut tx = pool.begin().await?;
    let status: Option<String> = sqlx::query_scalar("SELECT status FROM events WHERE id = $1 FOR SHARE")
        .bind(upload.event_id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(status) = status else {
        return Err(FileError::EventNotFound(upload.event_id));
    };
    if status == EventStatus::Archived.as_str() {
        return Err(FileError::EventArchived(upload.event_id));
    }

    let file_id = Uuid::new_v4();
    let key = storage_key(upload.event_id, file_id, &upload.filename);
    let mime_type = resolve_mime(upload.content_type.as_deref());
    let category = upload.category.unwrap_or_else(|| FileCategory::from_mime(&mime_type));
    let digest = sha256_hex(&upload.bytes);
    let size = i64::try_from(upload.bytes.len()).map_err(|_| FileError::TooLarge { size: upload.bytes.len(), max: max_bytes })?;

    store.put(&key, &upload.bytes).await?;

    let inserted = sqlx::query_as::<_, FileTuple>(&format!(
        "INSERT INTO event_files (id, event_id, uploader_id, filename, storage_key, mime_type, size, category, sha256) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) RETURNING {FILE_COLUMNS}"
    ))
    .bind(file_id)
    .bind(upload.event_id)
    .bind(actor.id)
    .bind(upload.filename.trim())
    .bind(&key)
    .bind(&mime_type)
    .bind(size)
    .bind(category.as_str())
    .bind(&digest)
    .fetch_one(&mut *tx)
    .await;
    let committed = match inserted {
        Ok(row) => tx.commit().await.map(|()| row),
        Err(e) => Err(e),
    };

    match committed {
        Ok(row) => {
            let file = file_from_tuple(row);
            tracing::info!(file_id = %file.id, event_id = %file.event_id, size = file.size, "file uploaded");
            Ok(file)
        }
        Err(e) => {
            if let Err(cleanup) = store.delete(&key).await {
                tracing::warn!(%key, error = %cleanup, "failed to remove blob after insert failure");
            }
            Err(e.into())
        }
    }
}

/// List file metadata, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_files(
    pool: &PgPool,
    event_id: Option<Uuid>,
    category: Option<FileCategory>,
) -> Result<Vec<EventFile>, FileError> {
    let rows = sqlx::query_as::<_, FileTuple>(&format!(
        "SELECT {FILE_COLUMNS} FROM event_files \
         WHERE ($1::uuid IS NULL OR event_id = $1) AND ($2::text IS NULL OR category = $2) \
         ORDER BY uploaded_at DESC, id ASC"
    ))
    .bind(event_id)
    .bind(category.map(FileCategory::as_str))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(file_from_tuple).collect())
}

/// # Errors
///
/// Returns [`FileError::NotFound`] or a database error.
pub async fn get_file(pool: &PgPool, file_id: Uuid) -> Result<EventFile, FileError> {
    let row = sqlx::query_as::<_, FileTuple>(&format!("SELECT {FILE_COLUMNS} FROM event_files WHERE id = $1"))
        .bind(file_id)
        .fetch_optional(pool)
        .await?;
    row.map(file_from_tuple).ok_or(FileError::NotFound(file_id))
}

/// Fetch metadata and bytes together.
///
/// # Errors
///
/// Returns [`FileError::NotFound`] when the row is missing, or a storage
/// error when the blob is.
pub async fn download_file(pool: &PgPool, store: &dyn BlobStore, file_id: Uuid) -> Result<(EventFile, Vec<u8>), FileError> {
    let file = get_file(pool, file_id).await?;
    let bytes = store.get(&file.storage_key).await?;
    Ok((file, bytes))
}

/// Remove a file row and its blob.
///
/// # Errors
///
/// Returns [`FileError::NotFound`], [`FileError::Forbidden`] or a database
/// error. Blob removal failures are logged.
pub async fn delete_file(pool: &PgPool, store: &dyn BlobStore, actor: &User, file_id: Uuid) -> Result<(), FileError> {
    let file = get_file(pool, file_id).await?;
    ensure_can_delete(actor, &file)?;

    let deleted = sqlx::query("DELETE FROM event_files WHERE id = $1")
        .bind(file_id)
        .execute(pool)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(FileError::NotFound(file_id));
    }

    if let Err(e) = store.delete(&file.storage_key).await {
        tracing::warn!(%file_id, key = %file.storage_key, error = %e, "failed to delete blob");
    }
    tracing::info!(%file_id, actor_id = %actor.id, "file deleted");
    Ok(())
}

#[cfg(test)]
#[path = "file_test.rs"]
mod tests;
