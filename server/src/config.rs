//! Server configuration parsed from environment variables.
//!
//! `main` loads `.env` through `dotenvy` before calling
//! [`ServerConfig::from_env`], so every key below may live in either place.

use std::path::PathBuf;

use crate::services::auth::GoogleConfig;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_JWT_EXPIRATION_HOURS: i64 = 24;
pub const DEFAULT_STORAGE_DIR: &str = "./storage";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
pub const DEFAULT_CORS_ORIGINS: &[&str] = &[
    "http://localhost:3000",
    "http://127.0.0.1:3000",
    "http://localhost:5173",
    "http://127.0.0.1:5173",
    "http://localhost:8000",
    "http://127.0.0.1:8000",
    "http://localhost:8080",
    "http://127.0.0.1:8080",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Credentials for seeding the first administrator at startup.
#[derive(Debug, Clone)]
pub struct BootstrapAdmin {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
    pub storage_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub cors_origins: Vec<String>,
    /// `None` disables the Google OAuth endpoints.
    pub google: Option<GoogleConfig>,
    pub bootstrap_admin: Option<BootstrapAdmin>,
}

impl ServerConfig {
    /// Build typed config from the process environment.
    ///
    /// Required: `DATABASE_URL`, `JWT_SECRET`.
    ///
    /// Optional: `PORT`, `DB_MAX_CONNECTIONS`, `JWT_EXPIRATION_HOURS`,
    /// `STORAGE_DIR`, `MAX_UPLOAD_BYTES`, `CORS_ORIGINS` (comma separated),
    /// the `GOOGLE_*` triple and the `BOOTSTRAP_ADMIN_*` pair.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when a required key is missing or a value does
    /// not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = require("DATABASE_URL")?;
        let jwt_secret = require("JWT_SECRET")?;

        let jwt_expiration_hours = env_parse("JWT_EXPIRATION_HOURS", DEFAULT_JWT_EXPIRATION_HOURS)?;
        if jwt_expiration_hours <= 0 {
            return Err(ConfigError::Invalid { key: "JWT_EXPIRATION_HOURS", value: jwt_expiration_hours.to_string() });
        }

        let cors_origins = std::env::var("CORS_ORIGINS")
            .ok()
            .map(|raw| parse_origins(&raw))
            .filter(|origins| !origins.is_empty())
            .unwrap_or_else(|| DEFAULT_CORS_ORIGINS.iter().map(|s| (*s).to_owned()).collect());

        let bootstrap_admin = match (std::env::var("BOOTSTRAP_ADMIN_EMAIL"), std::env::var("BOOTSTRAP_ADMIN_PASSWORD")) {
            (Ok(email), Ok(password)) => Some(BootstrapAdmin { email, password }),
            _ => None,
        };

        Ok(Self {
            database_url,
            port: env_parse("PORT", DEFAULT_PORT)?,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?,
            jwt_secret,
            jwt_expiration_hours,
            storage_dir: std::env::var("STORAGE_DIR").map_or_else(|_| PathBuf::from(DEFAULT_STORAGE_DIR), PathBuf::from),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            cors_origins,
            google: GoogleConfig::from_env(),
            bootstrap_admin,
        })
    }
}

fn require(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or(ConfigError::Missing(key))
}

/// Parse `key` if set; unset falls back to `default`, garbage is an error.
pub(crate) fn env_parse<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Split a comma-separated origin list, dropping blanks and trailing slashes.
pub(crate) fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().trim_end_matches('/'))
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
