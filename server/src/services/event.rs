//! Event service: proposals, approval, archiving.
//!
//! DESIGN
//! ======
//! An event is created `pending` by a core member or admin, moves to
//! `approved` once an admin signs off, and ends `archived`. Archived events
//! are read-only. Permission and transition checks are pure functions so the
//! rules can be tested without a database; the async operations lock the row
//! with `FOR UPDATE` before applying them.

use models::{CreateEventRequest, Event, EventStatus, Role, UpdateEventRequest, User};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use super::storage::BlobStore;

pub(crate) const EVENT_COLUMNS: &str =
    "id, title, description, organizer_id, start_time, end_time, status, approved_by, archived_at, created_at, updated_at";

pub(crate) type EventTuple = (
    Uuid,
    String,
    String,
    Uuid,
    OffsetDateTime,
    OffsetDateTime,
    String,
    Option<Uuid>,
    Option<OffsetDateTime>,
    OffsetDateTime,
    OffsetDateTime,
);

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum EventError {
    #[error("event not found: {0}")]
    NotFound(Uuid),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("cannot {action} an event that is {status}")]
    InvalidTransition { status: EventStatus, action: &'static str },
    #[error("{0}")]
    Validation(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Validated field values ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub title: String,
    pub description: String,
    pub start_time: OffsetDateTime,
    pub end_time: OffsetDateTime,
}

pub(crate) fn event_from_tuple(
    (id, title, description, organizer_id, start_time, end_time, status, approved_by, archived_at, created_at, updated_at): EventTuple,
) -> Event {
    let status = status.parse().unwrap_or_else(|_| {
        tracing::warn!(%id, %status, "unknown status in events table; treating as pending");
        EventStatus::Pending
    });
    Event {
        id,
        title,
        description,
        organizer_id,
        start_time,
        end_time,
        status,
        approved_by,
        archived_at,
        created_at,
        updated_at,
    }
}

// =============================================================================
// RULES
// =============================================================================

fn validate_draft(draft: EventDraft) -> Result<EventDraft, EventError> {
    if draft.title.is_empty() {
        return Err(EventError::Validation("title is required".to_owned()));
    }
    if draft.end_time <= draft.start_time {
        return Err(EventError::Validation("end_time must be after start_time".to_owned()));
    }
    Ok(draft)
}

/// # Errors
///
/// Returns [`EventError::Validation`] for a blank title or inverted times.
pub fn validate_new(req: &CreateEventRequest) -> Result<EventDraft, EventError> {
    validate_draft(EventDraft {
        title: req.title.trim().to_owned(),
        description: req.description.trim().to_owned(),
        start_time: req.start_time,
        end_time: req.end_time,
    })
}

/// Merge a partial update into `event` and validate the result.
///
/// # Errors
///
/// Returns [`EventError::Validation`] when nothing is supplied or the merged
/// values are invalid.
pub fn apply_update(event: &Event, req: &UpdateEventRequest) -> Result<EventDraft, EventError> {
    if req.is_empty() {
        return Err(EventError::Validation("no fields to update".to_owned()));
    }
    validate_draft(EventDraft {
        title: req.title.as_deref().map_or_else(|| event.title.clone(), |t| t.trim().to_owned()),
        description: req
            .description
            .as_deref()
            .map_or_else(|| event.description.clone(), |d| d.trim().to_owned()),
        start_time: req.start_time.unwrap_or(event.start_time),
        end_time: req.end_time.unwrap_or(event.end_time),
    })
}

/// # Errors
///
/// Returns [`EventError::Forbidden`] for members.
pub fn ensure_can_create(role: Role) -> Result<(), EventError> {
    if role.is_core() {
        Ok(())
    } else {
        Err(EventError::Forbidden("only core members and admins can propose events"))
    }
}

/// # Errors
///
/// Returns [`EventError::Forbidden`] unless `actor` organizes the event or is
/// an admin.
pub fn ensure_can_edit(actor: &User, event: &Event) -> Result<(), EventError> {
    if actor.role.is_admin() || actor.id == event.organizer_id {
        Ok(())
    } else {
        Err(EventError::Forbidden("only the organizer or an admin can edit this event"))
    }
}

/// # Errors
///
/// Returns [`EventError::Forbidden`] for non-admins.
pub fn ensure_can_approve(role: Role) -> Result<(), EventError> {
    if role.is_admin() { Ok(()) } else { Err(EventError::Forbidden("only admins can approve events")) }
}

/// # Errors
///
/// Returns [`EventError::Forbidden`] for members.
pub fn ensure_can_archive(role: Role) -> Result<(), EventError> {
    if role.is_core() {
        Ok(())
    } else {
        Err(EventError::Forbidden("only core members and admins can archive events"))
    }
}

/// # Errors
///
/// Returns [`EventError::Forbidden`] for non-admins.
pub fn ensure_can_delete(role: Role) -> Result<(), EventError> {
    if role.is_admin() { Ok(()) } else { Err(EventError::Forbidden("only admins can delete events")) }
}

/// # Errors
///
/// Returns [`EventError::InvalidTransition`] unless the event is pending.
pub fn check_approve(status: EventStatus) -> Result<(), EventError> {
    match status {
        EventStatus::Pending => Ok(()),
        other => Err(EventError::InvalidTransition { status: other, action: "approve" }),
    }
}

/// # Errors
///
/// Returns [`EventError::InvalidTransition`] if already archived.
pub fn check_archive(status: EventStatus) -> Result<(), EventError> {
    match status {
        EventStatus::Archived => Err(EventError::InvalidTransition { status, action: "archive" }),
        _ => Ok(()),
    }
}

/// # Errors
///
/// Returns [`EventError::InvalidTransition`] if archived.
pub fn check_editable(status: EventStatus) -> Result<(), EventError> {
    match status {
        EventStatus::Archived => Err(EventError::InvalidTransition { status, action: "edit" }),
        _ => Ok(()),
    }
}

// =============================================================================
// QUERIES
// =============================================================================

/// List events, optionally filtered by status, soonest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_events(pool: &PgPool, status: Option<EventStatus>) -> Result<Vec<Event>, EventError> {
    let rows = sqlx::query_as::<_, EventTuple>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE ($1::text IS NULL OR status = $1) ORDER BY start_time ASC, id ASC"
    ))
    .bind(status.map(EventStatus::as_str))
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(event_from_tuple).collect())
}

/// # Errors
///
/// Returns [`EventError::NotFound`] or a database error.
pub async fn get_event(pool: &PgPool, event_id: Uuid) -> Result<Event, EventError> {
    let row = sqlx::query_as::<_, EventTuple>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"))
        .bind(event_id)
        .fetch_optional(pool)
        .await?;
    row.map(event_from_tuple).ok_or(EventError::NotFound(event_id))
}

async fn lock_event(tx: &mut sqlx::PgConnection, event_id: Uuid) -> Result<Event, EventError> {
    let row = sqlx::query_as::<_, EventTuple>(&format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE"))
        .bind(event_id)
        .fetch_optional(&mut *tx)
        .await?;
    row.map(event_from_tuple).ok_or(EventError::NotFound(event_id))
}

// =============================================================================
// MUTATIONS
// =============================================================================

/// Propose a new event. It starts `pending` with `actor` as organizer.
///
/// # Errors
///
/// Returns [`EventError::Forbidden`], [`EventError::Validation`] or a
/// database error.
pub async fn create_event(pool: &PgPool, actor: &User, req: &CreateEventRequest) -> Result<Event, EventError> {
    ensure_can_create(actor.role)?;
    let draft = validate_new(req)?;

    let row = sqlx::query_as::<_, EventTuple>(&format!(
        "INSERT INTO events (title, description, organizer_id, start_time, end_time, status) \
         VALUES ($1, $2, $3, $4, $5, 'pending') RETURNING {EVENT_COLUMNS}"
    ))
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(actor.id)
    .bind(draft.start_time)
    .bind(draft.end_time)
    .fetch_one(pool)
    .await?;

    let event = event_from_tuple(row);
    tracing::info!(event_id = %event.id, organizer_id = %actor.id, "event proposed");
    Ok(event)
}

/// Apply a partial update.
///
/// # Errors
///
/// Returns [`EventError::NotFound`], [`EventError::Forbidden`],
/// [`EventError::InvalidTransition`] for archived events,
/// [`EventError::Validation`] or a database error.
pub async fn update_event(
    pool: &PgPool,
    actor: &User,
    event_id: Uuid,
    req: &UpdateEventRequest,
) -> Result<Event, EventError> {
    let mut tx = pool.begin().await?;
    let event = lock_event(&mut tx, event_id).await?;
    ensure_can_edit(actor, &event)?;
    check_editable(event.status)?;
    let draft = apply_update(&event, req)?;

    let row = sqlx::query_as::<_, EventTuple>(&format!(
        "UPDATE events SET title = $2, description = $3, start_time = $4, end_time = $5, updated_at = now() \
         WHERE id = $1 RETURNING {EVENT_COLUMNS}"
    ))
    .bind(event_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(draft.start_time)
    .bind(draft.end_time)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(%event_id, actor_id = %actor.id, "event updated");
    Ok(event_from_tuple(row))
}

/// Approve a pending event.
///
/// # Errors
///
/// Returns [`EventError::Forbidden`], [`EventError::NotFound`],
/// [`EventError::InvalidTransition`] or a database error.
pub async fn approve_event(pool: &PgPool, actor: &User, event_id: Uuid) -> Result<Event, EventError> {
    ensure_can_approve(actor.role)?;
    let mut tx = pool.begin().await?;
    let event = lock_event(&mut tx, event_id).await?;
    check_approve(event.status)?;

    let row = sqlx::query_as::<_, EventTuple>(&format!(
        "UPDATE events SET status = 'approved', approved_by = $2, updated_at = now() \
         WHERE id = $1 RETURNING {EVENT_COLUMNS}"
    ))
    .bind(event_id)
    .bind(actor.id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(%event_id, approved_by = %actor.id, "event approved");
    Ok(event_from_tuple(row))
}

/// Archive a pending or approved event.
///
/// # Errors
///
/// Returns [`EventError::Forbidden`], [`EventError::NotFound`],
/// [`EventError::InvalidTransition`] or a database error.
pub async fn archive_event(pool: &PgPool, actor: &User, event_id: Uuid) -> Result<Event, EventError> {
    ensure_can_archive(actor.role)?;
    let mut tx = pool.begin().await?;
    let event = lock_event(&mut tx, event_id).await?;
    check_archive(event.status)?;

    let row = sqlx::query_as::<_, EventTuple>(&format!(
        "UPDATE events SET status = 'archived', archived_at = now(), updated_at = now() \
         WHERE id = $1 RETURNING {EVENT_COLUMNS}"
    ))
    .bind(event_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    tracing::info!(%event_id, actor_id = %actor.id, "event archived");
    Ok(event_from_tuple(row))
}

/// Delete an event, its file rows and their blobs. Blob removal happens after
/// commit and failures are logged, not returned.
///
/// # Errors
///
/// Returns [`EventError::Forbidden`], [`EventError::NotFound`] or a database
/// error.
pub async fn delete_event(pool: &PgPool, store: &dyn BlobStore, actor: &User, event_id: Uuid) -> Result<(), EventError> {
    ensure_can_delete(actor.role)?;
    let mut tx = pool.begin().await?;
    lock_event(&mut tx, event_id).await?;

    let keys: Vec<String> = sqlx::query_scalar("SELECT storage_key FROM event_files WHERE event_id = $1")
        .bind(event_id)
        .fetch_all(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(event_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    for key in &keys {
        if let Err(e) = store.delete(key).await {
            tracing::warn!(%event_id, %key, error = %e, "failed to delete blob for removed event");
        }
    }
    tracing::info!(%event_id, files = keys.len(), actor_id = %actor.id, "event deleted");
    Ok(())
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
