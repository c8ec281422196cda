//! Blob storage for uploaded event files.
//!
//! DESIGN
//! ======
//! File bytes live outside Postgres behind the [`BlobStore`] trait so the
//! file service can be tested against a temp directory. Keys are relative,
//! slash-separated paths such as `events/{event_id}/{file_id}-{name}`.

use std::path::{Component, Path, PathBuf};

use uuid::Uuid;

const MAX_FILENAME_LEN: usize = 120;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("invalid storage key: {0}")]
    InvalidKey(String),
    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// BLOB STORE TRAIT
// =============================================================================

/// Async key/value store for file contents.
#[async_trait::async_trait]
pub trait BlobStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any existing blob.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on an invalid key or IO failure.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError>;

    /// Read the blob at `key`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::NotFound`] if nothing is stored there.
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove the blob at `key`. Missing blobs are not an error.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError`] on an invalid key or IO failure.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

// =============================================================================
// LOCAL DISK
// =============================================================================

/// [`BlobStore`] rooted at a directory on local disk.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, key: &str) -> Result<PathBuf, StorageError> {
        let relative = Path::new(key);
        let valid = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_owned()));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl BlobStore for LocalBlobStore {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound(key.to_owned())),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = self.resolve(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// KEYS
// =============================================================================

/// Reduce a client-supplied filename to a safe single path segment.
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') { c } else { '_' })
        .take(MAX_FILENAME_LEN)
        .collect();
    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() { "file".to_owned() } else { trimmed.to_owned() }
}

#[must_use]
pub fn storage_key(event_id: Uuid, file_id: Uuid, filename: &str) -> String {
    format!("events/{event_id}/{file_id}-{}", sanitize_filename(filename))
}

#[cfg(test)]
#[path = "storage_test.rs"]
mod tests;
