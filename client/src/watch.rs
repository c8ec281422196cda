//! Periodic token re-check.
//!
//! SYSTEM CONTEXT
//! ==============
//! A long-running front end cannot rely on the startup check alone: the token
//! can expire while the user is idle. [`TokenWatch`] re-reads the stored
//! token on a fixed interval, signs the user out once it has expired, and
//! reports each check on a channel so the caller can warn or redirect.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::session::{SessionError, SessionStore};
use crate::token;

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(5 * 60);
pub const DEFAULT_WARN_WINDOW: Duration = Duration::from_secs(5 * 60);

const CHANNEL_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenStatus {
    Valid,
    ExpiringSoon { remaining_secs: i64 },
    /// The token expired; the session has been cleared.
    Expired,
    /// No token stored.
    SignedOut,
}

impl TokenStatus {
    /// Statuses after which there is nothing left to watch.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Expired | Self::SignedOut)
    }
}

#[derive(Clone)]
pub struct TokenWatch {
    store: Arc<dyn SessionStore>,
    interval: Duration,
    warn_window: Duration,
}

impl TokenWatch {
    #[must_use]
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store, interval: DEFAULT_CHECK_INTERVAL, warn_window: DEFAULT_WARN_WINDOW }
    }

    #[must_use]
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    #[must_use]
    pub fn with_warn_window(mut self, warn_window: Duration) -> Self {
        self.warn_window = warn_window;
        self
    }

    /// One check at `now_unix`. Clears the session when the token expired.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] if the store cannot be read or cleared.
    pub fn check_at(&self, now_unix: i64) -> Result<TokenStatus, SessionError> {
        let Some(token) = self.store.load()?.token else {
            return Ok(TokenStatus::SignedOut);
        };
        if token::is_expired(&token, now_unix) {
            tracing::info!("token expired; clearing session");
            self.store.clear()?;
            return Ok(TokenStatus::Expired);
        }
        let window = i64::try_from(self.warn_window.as_secs()).unwrap_or(i64::MAX);
        Ok(match token::remaining_secs(&token, now_unix) {
            Some(remaining_secs) if remaining_secs <= window => TokenStatus::ExpiringSoon { remaining_secs },
            _ => TokenStatus::Valid,
        })
    }

    /// Run checks on the configured interval, starting immediately.
    ///
    /// The task stops after a terminal status, a store failure, or once the
    /// receiver is dropped.
    #[must_use]
    pub fn spawn(self) -> (mpsc::Receiver<TokenStatus>, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let status = match self.check_at(token::now_unix()) {
                    Ok(status) => status,
                    Err(e) => {
                        tracing::warn!(error = %e, "token watch stopped: session store failed");
                        break;
                    }
                };
                tracing::debug!(?status, "token check");
                if tx.send(status).await.is_err() || status.is_terminal() {
                    break;
                }
            }
        });
        (rx, handle)
    }
}

#[cfg(test)]
#[path = "watch_test.rs"]
mod tests;
