//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the database pool, JWT keys, the optional Google OAuth config,
//! and the blob store for event files. Everything is cheap to clone.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ServerConfig;
use crate::services::auth::GoogleConfig;
use crate::services::storage::BlobStore;
use crate::services::token::JwtKeys;

/// Shared application state, injected into Axum handlers via State extractor.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub jwt: JwtKeys,
    /// `None` if Google OAuth env vars are not configured.
    pub google: Option<GoogleConfig>,
    pub storage: Arc<dyn BlobStore>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, config: ServerConfig, storage: Arc<dyn BlobStore>) -> Self {
        Self {
            pool,
            jwt: JwtKeys::new(config.jwt_secret.as_bytes(), config.jwt_expiration_hours),
            google: config.google.clone(),
            storage,
            config: Arc::new(config),
        }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
