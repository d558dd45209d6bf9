//! Source file access shared by the adapters.

use std::path::Path;

use tokio::fs::File;

use crate::error::{TranscodeError, TranscodeResult};

/// Open a source file for reading.
///
/// A file that vanished since it was listed, or that cannot be read, maps to
/// [`TranscodeError::SourceUnreadable`]. Directories are rejected too.
pub async fn open_source(path: &Path) -> TranscodeResult<File> {
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|e| TranscodeError::source_unreadable(path, e))?;

    if metadata.is_dir() {
        return Err(TranscodeError::source_unreadable(
            path,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "is a directory"),
        ));
    }

    File::open(path)
        .await
        .map_err(|e| TranscodeError::source_unreadable(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_existing_source() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("beach.jpg");
        tokio::fs::write(&path, b"jpeg").await.unwrap();

        assert!(open_source(&path).await.is_ok());
    }

    #[tokio::test]
    async fn test_missing_source_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.jpg");

        let err = open_source(&path).await.unwrap_err();
        match err {
            TranscodeError::SourceUnreadable { path: p, source } => {
                assert_eq!(p, path);
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_directory_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let err = open_source(dir.path()).await.unwrap_err();
        assert!(matches!(err, TranscodeError::SourceUnreadable { .. }));
    }
}
