//! Storage error types.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur while touching the artifact cache.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to create cache directory {}: {source}", .path.display())]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write artifact {}: {source}", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read artifact {}: {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    pub fn create_dir_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::CreateDirFailed {
            path: path.into(),
            source,
        }
    }

    pub fn write_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::WriteFailed {
            path: path.into(),
            source,
        }
    }

    pub fn read_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFailed {
            path: path.into(),
            source,
        }
    }

    /// Whether the artifact simply does not exist (as opposed to an I/O fault).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::ReadFailed { source, .. } if source.kind() == std::io::ErrorKind::NotFound
        )
    }
}
