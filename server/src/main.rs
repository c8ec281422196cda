mod config;
mod db;
mod error;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("database init failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("bootstrap admin failed: {0}")]
    Bootstrap(#[from] services::auth::AuthError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn")))
        .init();

    if let Err(e) = run().await {
        tracing::error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), StartupError> {
    let config = config::ServerConfig::from_env()?;
    let pool = db::init_pool(&config.database_url, config.db_max_connections).await?;

    if let Some(admin) = &config.bootstrap_admin {
        let user = services::auth::ensure_bootstrap_admin(&pool, &admin.email, &admin.password).await?;
        tracing::info!(user_id = %user.id, email = %user.email, "bootstrap admin ready");
    }

    if config.google.is_none() {
        tracing::warn!("Google OAuth not configured; /auth/login disabled");
    }

    tokio::fs::create_dir_all(&config.storage_dir).await?;
    let storage = Arc::new(services::storage::LocalBlobStore::new(config.storage_dir.clone()));
    tracing::info!(dir = %config.storage_dir.display(), "file storage ready");

    let port = config.port;
    let state = state::AppState::new(pool, config, storage);
    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;

    tracing::info!(%port, "club portal listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
