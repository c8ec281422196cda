//! Portal routes and the guard that decides whether a route may render.
//!
//! DESIGN
//! ======
//! Route resolution is a pure function of the path and the stored session so
//! any front end (the CLI today) applies identical redirect rules:
//!
//! - `/` always redirects to `/login`.
//! - `/login` redirects signed-in users to `/dashboard`.
//! - Protected routes redirect to `/login` when there is no live session.
//! - Unknown paths resolve to [`Route::NotFound`].

use std::fmt;

use models::{Role, User};
use uuid::Uuid;

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Root,
    Login,
    AuthCallback,
    Dashboard,
    Events,
    EventDetail(Uuid),
    Proposals,
    Archive,
    Profile,
    NotFound,
}

impl Route {
    /// Parse a path, ignoring any query string, fragment, or trailing slash.
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let path = path.split(['?', '#']).next().unwrap_or_default();
        let trimmed = path.trim_matches('/');
        let segments: Vec<&str> = if trimmed.is_empty() { Vec::new() } else { trimmed.split('/').collect() };
        match segments.as_slice() {
            [] => Self::Root,
            ["login"] => Self::Login,
            ["auth-callback"] => Self::AuthCallback,
            ["dashboard"] => Self::Dashboard,
            ["events"] => Self::Events,
            ["events", id] => id.parse().map_or(Self::NotFound, Self::EventDetail),
            ["proposals"] => Self::Proposals,
            ["archive"] => Self::Archive,
            ["profile"] => Self::Profile,
            _ => Self::NotFound,
        }
    }

    #[must_use]
    pub fn path(&self) -> String {
        match self {
            Self::Root => "/".into(),
            Self::Login => "/login".into(),
            Self::AuthCallback => "/auth-callback".into(),
            Self::Dashboard => "/dashboard".into(),
            Self::Events => "/events".into(),
            Self::EventDetail(id) => format!("/events/{id}"),
            Self::Proposals => "/proposals".into(),
            Self::Archive => "/archive".into(),
            Self::Profile => "/profile".into(),
            Self::NotFound => "/404".into(),
        }
    }

    /// Routes that need a live session.
    #[must_use]
    pub fn is_protected(&self) -> bool {
        matches!(
            self,
            Self::Dashboard | Self::Events | Self::EventDetail(_) | Self::Proposals | Self::Archive | Self::Profile
        )
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Render(Route),
    Redirect(Route),
}

/// Apply the redirect rules to `route` for the given session.
#[must_use]
pub fn resolve(route: Route, session: &Session, now_unix: i64) -> Navigation {
    let signed_in = session.is_logged_in(now_unix);
    match route {
        Route::Root => Navigation::Redirect(Route::Login),
        Route::Login if signed_in => Navigation::Redirect(Route::Dashboard),
        r if r.is_protected() && !signed_in => Navigation::Redirect(Route::Login),
        r => Navigation::Render(r),
    }
}

// =============================================================================
// ROLE GUARDS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GuardError {
    #[error("login required")]
    LoginRequired,
    #[error("insufficient permissions")]
    Forbidden,
}

fn require_any<'a>(session: &'a Session, now_unix: i64, roles: &[Role]) -> Result<&'a User, GuardError> {
    let user = session
        .user
        .as_ref()
        .filter(|_| session.is_logged_in(now_unix))
        .ok_or(GuardError::LoginRequired)?;
    if user.role.has_any(roles) { Ok(user) } else { Err(GuardError::Forbidden) }
}

/// Any signed-in user.
///
/// # Errors
///
/// [`GuardError::LoginRequired`] without a live session.
pub fn require_user(session: &Session, now_unix: i64) -> Result<&User, GuardError> {
    require_any(session, now_unix, &Role::ALL)
}

/// # Errors
///
/// [`GuardError::LoginRequired`] without a live session, otherwise
/// [`GuardError::Forbidden`] unless the user is an admin.
pub fn require_admin(session: &Session, now_unix: i64) -> Result<&User, GuardError> {
    require_any(session, now_unix, &[Role::Admin])
}

/// Core members and admins.
///
/// # Errors
///
/// [`GuardError::LoginRequired`] without a live session, otherwise
/// [`GuardError::Forbidden`] for plain members.
pub fn require_core_member(session: &Session, now_unix: i64) -> Result<&User, GuardError> {
    require_any(session, now_unix, &[Role::CoreMember, Role::Admin])
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
