//! Blob storage for uploaded and generated images.
//!
//! [`BlobStore`] is the seam the HTTP layer writes through; [`LocalBlobStore`]
//! keeps bytes under a root directory and hands out URLs under a public base
//! path (served by the API's static file mount).

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;

use crate::error::CoreError;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The key is absolute, empty, or escapes the store root.
    #[error("Invalid storage path '{0}'")]
    InvalidPath(String),

    #[error("Blob '{0}' not found")]
    NotFound(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<StorageError> for CoreError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => CoreError::NotFound {
                entity: "Image",
                key,
            },
            StorageError::InvalidPath(key) => {
                CoreError::invalid_field("image_path", format!("Invalid path '{key}'"))
            }
            StorageError::Io(e) => CoreError::Internal(format!("Storage I/O error: {e}")),
        }
    }
}

/// Storage collaborator for binary assets.
///
/// Paths passed to [`exists`](BlobStore::exists), [`read`](BlobStore::read)
/// and [`delete`](BlobStore::delete) may be either a store-relative key
/// (`templates/foo/a.png`) or a URL previously returned by
/// [`save`](BlobStore::save).
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` as `{scope}/{filename}` and return its public URL.
    async fn save(&self, scope: &str, filename: &str, bytes: &[u8]) -> Result<String, StorageError>;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Remove the blob. Returns `false` when there was nothing to remove or
    /// the path does not belong to this store.
    async fn delete(&self, path: &str) -> Result<bool, StorageError>;
}

// ---------------------------------------------------------------------------
// Local filesystem store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            root: root.into(),
            base_url,
        }
    }

    /// Map a key or URL onto a file under the root, refusing anything that
    /// could escape it.
    fn resolve(&self, path: &str) -> Result<PathBuf, StorageError> {
        let key = path
            .strip_prefix(&self.base_url)
            .filter(|rest| rest.starts_with('/'))
            .unwrap_or(path)
            .trim_start_matches('/');

        if key.is_empty() || key.contains("://") {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        let relative = Path::new(key);
        let safe = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(StorageError::InvalidPath(path.to_string()));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn save(&self, scope: &str, filename: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let key = format!("{}/{}", scope.trim_matches('/'), filename);
        let dest = self.resolve(&key)?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&dest, bytes).await?;

        tracing::debug!(path = %dest.display(), size = bytes.len(), "Blob saved");
        Ok(format!("{}/{}", self.base_url, key))
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        let file = match self.resolve(path) {
            Ok(file) => file,
            Err(StorageError::InvalidPath(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        match tokio::fs::metadata(&file).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        let file = self.resolve(path)?;
        tokio::fs::read(&file).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound(path.to_string()),
            _ => StorageError::Io(e),
        })
    }

    async fn delete(&self, path: &str) -> Result<bool, StorageError> {
        let file = match self.resolve(path) {
            Ok(file) => file,
            // Externally hosted URLs (e.g. a thumbnail set by URL) are not ours.
            Err(StorageError::InvalidPath(_)) => return Ok(false),
            Err(e) => return Err(e),
        };
        match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
