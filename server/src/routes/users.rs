//! User administration routes (admin only).

use axum::extract::State;
use models::{RoleUpdateRequest, User};
use uuid::Uuid;

use crate::error::ApiResult;
use crate::routes::auth::AuthUser;
use crate::routes::extract::{Json, Path};
use crate::services::user as user_svc;
use crate::state::AppState;

/// `GET /users`
pub async fn list_users(State(state): State<AppState>, auth: AuthUser) -> ApiResult<Json<Vec<User>>> {
    auth.require_admin()?;
    Ok(Json(user_svc::list_users(&state.pool).await?))
}

/// `PATCH /users/{id}/role`
pub async fn update_role(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<RoleUpdateRequest>,
) -> ApiResult<Json<User>> {
    auth.require_admin()?;
    let role = user_svc::parse_requested_role(&body.role)?;
    let user = user_svc::update_role(&state.pool, id, role).await?;
    tracing::info!(admin_id = %auth.user.id, user_id = %id, role = %role, "role changed by admin");
    Ok(Json(user))
}
