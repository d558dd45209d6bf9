//! Artifact cache store.
//!
//! Artifacts are written once and never updated in place. Writes go to a
//! uniquely named temporary file in the cache directory and are renamed into
//! place, so a concurrent [`CacheStore::exists`] never observes a partial
//! artifact.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use shutter_models::ArtifactKey;
use tokio::fs;
use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};

/// Filesystem-backed artifact cache.
///
/// The store itself holds no state; the filesystem is the only persisted state.
#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStore;

impl CacheStore {
    pub fn new() -> Self {
        Self
    }

    /// Whether the artifact for `key` exists.
    ///
    /// A plain stat; any error (including permission problems) reads as "absent".
    pub async fn exists(&self, key: &ArtifactKey) -> bool {
        fs::try_exists(key.path()).await.unwrap_or(false)
    }

    /// Create the hidden cache directory for `key`.
    ///
    /// Idempotent: an already existing directory, including one created by a
    /// concurrent writer, is success.
    pub async fn ensure_directory(&self, key: &ArtifactKey) -> StorageResult<()> {
        let dir = key.dir();
        match fs::create_dir_all(dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
            Err(e) => Err(StorageError::create_dir_failed(dir, e)),
        }
    }

    /// Persist artifact bytes under `key`, creating the directory if needed.
    pub async fn write(&self, key: &ArtifactKey, bytes: &[u8]) -> StorageResult<()> {
        self.ensure_directory(key).await?;

        let tmp = temp_path(key.path());
        if let Err(e) = fs::write(&tmp, bytes).await {
            remove_temp(&tmp).await;
            return Err(StorageError::write_failed(key.path(), e));
        }

        if let Err(e) = fs::rename(&tmp, key.path()).await {
            remove_temp(&tmp).await;
            return Err(StorageError::write_failed(key.path(), e));
        }

        debug!(
            artifact = %key,
            bytes = bytes.len(),
            "Stored artifact"
        );
        Ok(())
    }

    /// Read the artifact bytes for `key`.
    pub async fn read(&self, key: &ArtifactKey) -> StorageResult<Vec<u8>> {
        fs::read(key.path())
            .await
            .map_err(|e| StorageError::read_failed(key.path(), e))
    }
}

/// Temporary sibling path for an artifact, e.g. `.beach.jpg.jpg.<uuid>.tmp`.
fn temp_path(artifact: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    name.push(artifact.file_name().unwrap_or_default());
    name.push(format!(".{}.tmp", uuid::Uuid::new_v4()));
    artifact.with_file_name(name)
}

async fn remove_temp(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove temporary artifact {}: {}", tmp.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_write_creates_hidden_dir_and_artifact() {
        let dir = TempDir::new().unwrap();
        let key = ArtifactKey::for_source(&dir.path().join("beach.jpg"));
        let store = CacheStore::new();

        assert!(!store.exists(&key).await);
        store.write(&key, b"jpeg-bytes").await.unwrap();

        assert!(store.exists(&key).await);
        assert!(dir.path().join(".small").is_dir());
        assert_eq!(store.read(&key).await.unwrap(), b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_write_leaves_no_temp_files() {
        let dir = TempDir::new().unwrap();
        let key = ArtifactKey::for_source(&dir.path().join("clip.mov"));
        let store = CacheStore::new();

        store.write(&key, b"frame").await.unwrap();

        let mut entries = fs::read_dir(key.dir()).await.unwrap();
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        assert_eq!(names, vec!["clip.mov.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_ensure_directory_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let key = ArtifactKey::for_source(&dir.path().join("a.png"));
        let store = CacheStore::new();

        store.ensure_directory(&key).await.unwrap();
        store.ensure_directory(&key).await.unwrap();

        let (a, b) = tokio::join!(store.ensure_directory(&key), store.ensure_directory(&key));
        assert!(a.is_ok() && b.is_ok());
    }

    #[tokio::test]
    async fn test_ensure_directory_fails_when_blocked_by_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".small"), b"not a dir").await.unwrap();
        let key = ArtifactKey::for_source(&dir.path().join("a.png"));

        let err = CacheStore::new().ensure_directory(&key).await.unwrap_err();
        assert!(matches!(err, StorageError::CreateDirFailed { .. }));

        let err = CacheStore::new().write(&key, b"x").await.unwrap_err();
        assert!(matches!(err, StorageError::CreateDirFailed { .. }));
    }

    #[tokio::test]
    async fn test_read_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let key = ArtifactKey::for_source(&dir.path().join("nothing.jpg"));

        let err = CacheStore::new().read(&key).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let tmp = temp_path(Path::new("/p/.small/beach.jpg.jpg"));
        assert_eq!(tmp.parent().unwrap(), Path::new("/p/.small"));
        let name = tmp.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(".beach.jpg.jpg."));
        assert!(name.ends_with(".tmp"));
    }
}
