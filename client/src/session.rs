//! Persisted login session.
//!
//! SYSTEM CONTEXT
//! ==============
//! A session is the access token plus the user it was issued for. The API
//! client reads it to attach the bearer header, the auth context writes it
//! on login, and the router guard and token watch decide from it whether the
//! user is still signed in. Storage sits behind [`SessionStore`] so the CLI
//! can keep it in a file while tests keep it in memory.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use models::User;
use serde::{Deserialize, Serialize};

use crate::token;

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("session encode failed: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("session store lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub user: Option<User>,
}

impl Session {
    #[must_use]
    pub fn new(token: String, user: User) -> Self {
        Self { token: Some(token), user: Some(user) }
    }

    /// Token present, not expired at `now_unix`, and a user recorded.
    #[must_use]
    pub fn is_logged_in(&self, now_unix: i64) -> bool {
        self.user.is_some() && self.token.as_deref().is_some_and(|t| !token::is_expired(t, now_unix))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token.is_none() && self.user.is_none()
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

pub trait SessionStore: Send + Sync {
    /// # Errors
    ///
    /// Returns [`SessionError`] if the backing storage cannot be read.
    fn load(&self) -> Result<Session, SessionError>;

    /// # Errors
    ///
    /// Returns [`SessionError`] if the backing storage cannot be written.
    fn save(&self, session: &Session) -> Result<(), SessionError>;

    /// # Errors
    ///
    /// Returns [`SessionError`] if the backing storage cannot be cleared.
    fn clear(&self) -> Result<(), SessionError>;
}

// =============================================================================
// FILE STORE
// =============================================================================

/// JSON file store. A missing file is an empty session; an unreadable one is
/// logged and treated as empty so a corrupt file never locks the user out.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Session, SessionError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Session::default()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_slice(&raw) {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "ignoring unreadable session file");
                Ok(Session::default())
            }
        }
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let bytes = serde_json::to_vec_pretty(session)?;
        let tmp = self.path.with_extension("tmp");
        let written = write_private(&tmp, &bytes).and_then(|()| std::fs::rename(&tmp, &self.path));
        if let Err(e) = written {
            if let Err(cleanup) = std::fs::remove_file(&tmp) {
                tracing::debug!(path = %tmp.display(), error = %cleanup, "could not remove temporary session file");
            }
            return Err(e.into());
        }
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Write `bytes` to a fresh file that is owner-only from the moment it
/// exists. A stale file at `path` is removed first so `create_new` applies.
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;

    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    let mut options = std::fs::OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

// =============================================================================
// MEMORY STORE
// =============================================================================

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    inner: Mutex<Session>,
}

impl MemorySessionStore {
    #[must_use]
    pub fn new(session: Session) -> Self {
        Self { inner: Mutex::new(session) }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Session, SessionError> {
        self.inner.lock().map(|s| s.clone()).map_err(|_| SessionError::Poisoned)
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        let mut guard = self.inner.lock().map_err(|_| SessionError::Poisoned)?;
        *guard = session.clone();
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        self.save(&Session::default())
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
