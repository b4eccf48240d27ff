//! Storage collaborator for uploaded files.
//!
//! A [`FileStore`] persists raw bytes and hands back the public path of the
//! stored file. [`Storage`] puts a file through the store and records it in
//! the `media` table, inside the caller's transaction, so field values can
//! reference it. Files whose rows are rolled back are removed again.

use std::path::PathBuf;
use std::sync::Arc;

use analog_core::submission::UploadedFile;
use analog_db::models::media::{CreateMedia, Media};
use analog_db::repositories::MediaRepo;
use async_trait::async_trait;

use crate::error::FieldsError;

/// Fallback name for uploads whose name sanitizes to nothing.
const FALLBACK_FILE_NAME: &str = "upload";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Backend that persists uploaded bytes.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Store `bytes` under a name derived from `file_name` and return the
    /// public path of the stored file.
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<String, StorageError>;

    /// Delete a file previously returned by [`FileStore::put`].
    async fn remove(&self, path: &str) -> Result<(), StorageError>;
}

/// Stores files in a local directory.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    root: PathBuf,
    public_prefix: String,
}

impl LocalFileStore {
    /// `root` is created on first write. Stored files are addressed as
    /// `{public_prefix}/{stored_name}`.
    pub fn new(root: impl Into<PathBuf>, public_prefix: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_prefix: public_prefix.into(),
        }
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn put(&self, file_name: &str, bytes: &[u8]) -> Result<String, StorageError> {
        let stored_name = format!(
            "{}-{}",
            uuid::Uuid::new_v4().simple(),
            sanitize_file_name(file_name)
        );

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&stored_name), bytes).await?;

        Ok(format!(
            "{}/{stored_name}",
            self.public_prefix.trim_end_matches('/')
        ))
    }

    async fn remove(&self, path: &str) -> Result<(), StorageError> {
        let stored_name = path.rsplit('/').next().unwrap_or(path);
        tokio::fs::remove_file(self.root.join(stored_name)).await?;
        Ok(())
    }
}

/// Reduce a client-supplied file name to a safe basename.
///
/// Directory components are dropped and anything outside `[A-Za-z0-9._-]`
/// becomes `-`. Leading dots are stripped so the result is never hidden.
pub fn sanitize_file_name(raw: &str) -> String {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        FALLBACK_FILE_NAME.to_string()
    } else {
        cleaned.to_string()
    }
}

/// Writes uploads to a [`FileStore`] and records them as media.
#[derive(Clone)]
pub struct Storage {
    store: Arc<dyn FileStore>,
}

impl Storage {
    pub fn new(store: Arc<dyn FileStore>) -> Self {
        Self { store }
    }

    /// Persist an uploaded file and insert its `media` row in `tx`.
    ///
    /// The file is removed again if the row cannot be inserted. Once the row
    /// is in, the caller owns the file: on rollback it must pass the path to
    /// [`Storage::discard`].
    pub async fn write_in(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        upload: &UploadedFile,
    ) -> Result<Media, FieldsError> {
        let path = self.store.put(&upload.file_name, &upload.bytes).await?;

        let input = CreateMedia {
            file_name: upload.file_name.clone(),
            path,
            content_type: upload.content_type.clone(),
            size_bytes: upload.bytes.len() as i64,
        };
        let media = match MediaRepo::create_in(tx, &input).await {
            Ok(media) => media,
            Err(e) => {
                self.discard(std::slice::from_ref(&input.path)).await;
                return Err(e.into());
            }
        };

        tracing::info!(media_id = media.id, path = %media.path, "Stored upload");
        Ok(media)
    }

    /// Remove stored files whose media rows never committed.
    pub async fn discard(&self, paths: &[String]) {
        for path in paths {
            match self.store.remove(path).await {
                Ok(()) => tracing::debug!(path = %path, "Discarded upload"),
                Err(e) => tracing::warn!(path = %path, error = %e, "Failed to discard upload"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_directories() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\photos\\cat.png"), "cat.png");
    }

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_file_name("my photo (1).jpg"), "my-photo--1-.jpg");
    }

    #[test]
    fn sanitize_never_returns_hidden_or_empty() {
        assert_eq!(sanitize_file_name(".env"), "env");
        assert_eq!(sanitize_file_name(""), "upload");
        assert_eq!(sanitize_file_name("dir/"), "upload");
    }

    #[tokio::test]
    async fn local_store_writes_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalFileStore::new(dir.path().join("uploads"), "/uploads/");

        let path = store.put("hero image.png", b"png").await.unwrap();

        assert!(path.starts_with("/uploads/"));
        assert!(path.ends_with("-hero-image.png"));
        let stored_name = path.trim_start_matches("/uploads/");
        let bytes = std::fs::read(dir.path().join("uploads").join(stored_name)).unwrap();
        assert_eq!(bytes, b"png");

        store.remove(&path).await.unwrap();
        assert!(!dir.path().join("uploads").join(stored_name).exists());
        assert!(store.remove(&path).await.is_err());
    }
}
