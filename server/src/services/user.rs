//! User lookup and role administration.

use models::{Role, User};
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

pub(crate) const USER_COLUMNS: &str = "id, name, email, role, picture, created_at";

pub(crate) type UserTuple = (Uuid, String, String, String, Option<String>, OffsetDateTime);

#[derive(Debug, thiserror::Error)]
pub enum UserError {
    #[error("user not found: {0}")]
    NotFound(Uuid),
    #[error("cannot change role of admin user")]
    AdminLocked(Uuid),
    #[error("invalid role: {0}")]
    InvalidRole(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub(crate) fn user_from_tuple((id, name, email, role, picture, created_at): UserTuple) -> User {
    let role = role.parse().unwrap_or_else(|_| {
        tracing::warn!(%id, %role, "unknown role in users table; treating as member");
        Role::Member
    });
    User { id, name, email, role, picture, created_at }
}

/// Admins keep their role; everyone else may be moved between roles.
///
/// # Errors
///
/// Returns [`UserError::AdminLocked`] when `current` is admin.
pub fn check_role_change(user_id: Uuid, current: Role) -> Result<(), UserError> {
    if current.is_admin() {
        return Err(UserError::AdminLocked(user_id));
    }
    Ok(())
}

/// Parse the role requested by an admin.
///
/// # Errors
///
/// Returns [`UserError::InvalidRole`] for anything outside the three roles.
pub fn parse_requested_role(raw: &str) -> Result<Role, UserError> {
    raw.parse().map_err(|_| UserError::InvalidRole(raw.to_owned()))
}

/// Fetch one user by id.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<User>, UserError> {
    let row = sqlx::query_as::<_, UserTuple>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.map(user_from_tuple))
}

/// List all users ordered by name. Secrets are never selected.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_users(pool: &PgPool) -> Result<Vec<User>, UserError> {
    let rows = sqlx::query_as::<_, UserTuple>(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY name ASC, id ASC"))
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(user_from_tuple).collect())
}

/// Change a user's role. The current role is locked with `FOR UPDATE` so a
/// concurrent promotion to admin cannot slip past the admin lock.
///
/// # Errors
///
/// Returns [`UserError::NotFound`], [`UserError::AdminLocked`] or a database
/// error.
pub async fn update_role(pool: &PgPool, user_id: Uuid, role: Role) -> Result<User, UserError> {
    let mut tx = pool.begin().await?;

    let current: Option<String> = sqlx::query_scalar("SELECT role FROM users WHERE id = $1 FOR UPDATE")
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;
    let Some(current) = current else {
        return Err(UserError::NotFound(user_id));
    };
    check_role_change(user_id, current.parse().unwrap_or(Role::Member))?;

    let row = sqlx::query_as::<_, UserTuple>(&format!(
        "UPDATE users SET role = $2, updated_at = now() WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(user_id)
    .bind(role.as_str())
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    tracing::info!(%user_id, role = %role, "user role updated");
    Ok(user_from_tuple(row))
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
