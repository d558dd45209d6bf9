//! Errors returned by the artifact service.

use std::path::{Path, PathBuf};
use std::time::Duration;

use shutter_media::TranscodeError;
use shutter_models::{MediaClass, ModelError};
use thiserror::Error;

use crate::outcome::{FailureKind, FailureReason};

pub type ArtifactResult<T> = Result<T, ArtifactError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    #[error("Unsupported file type: {}", .0.display())]
    UnsupportedType(PathBuf),

    #[error("Source unreadable: {}: {reason}", .path.display())]
    SourceUnreadable { path: PathBuf, reason: String },

    #[error("Unsupported format: {}: {reason}", .path.display())]
    UnsupportedFormat { path: PathBuf, reason: String },

    #[error("Generation failed: {}: {reason}", .path.display())]
    ToolFailure { path: PathBuf, reason: String },

    #[error("Artifact cache I/O failed: {}: {reason}", .path.display())]
    CacheIo { path: PathBuf, reason: String },

    #[error("Timed out after {waited:?} waiting for {}", .path.display())]
    Timeout { path: PathBuf, waited: Duration },

    #[error("{class} queue is full")]
    QueueFull { class: MediaClass },
}

impl ArtifactError {
    pub fn unsupported_type(path: impl Into<PathBuf>) -> Self {
        Self::UnsupportedType(path.into())
    }

    pub fn tool_failure(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ToolFailure {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn cache_io(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::CacheIo {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn timeout(path: impl Into<PathBuf>, waited: Duration) -> Self {
        Self::Timeout {
            path: path.into(),
            waited,
        }
    }

    /// Map a broadcast failure onto the error for `path`.
    pub fn from_failure(path: &Path, reason: FailureReason) -> Self {
        let path = path.to_path_buf();
        let FailureReason { kind, message } = reason;
        match kind {
            FailureKind::SourceUnreadable => Self::SourceUnreadable { path, reason: message },
            FailureKind::UnsupportedFormat => Self::UnsupportedFormat { path, reason: message },
            FailureKind::ToolFailure => Self::ToolFailure { path, reason: message },
            FailureKind::CacheIo => Self::CacheIo { path, reason: message },
            FailureKind::QueueFull => match MediaClass::from_path(&path) {
                Some(class) => Self::QueueFull { class },
                None => Self::UnsupportedType(path),
            },
        }
    }

    /// Map a transcoder error onto the error for `path`.
    pub fn from_transcode(path: &Path, err: &TranscodeError) -> Self {
        Self::from_failure(path, FailureReason::from(err))
    }

    /// Check if error is retryable.
    ///
    /// Timeouts and full queues are transient. Everything else repeats until
    /// the source file changes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ArtifactError::Timeout { .. } | ArtifactError::QueueFull { .. }
        )
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ArtifactError::UnsupportedType(_) => "unsupported_type",
            ArtifactError::SourceUnreadable { .. } => "source_unreadable",
            ArtifactError::UnsupportedFormat { .. } => "unsupported_format",
            ArtifactError::ToolFailure { .. } => "tool_failure",
            ArtifactError::CacheIo { .. } => "cache_io",
            ArtifactError::Timeout { .. } => "timeout",
            ArtifactError::QueueFull { .. } => "queue_full",
        }
    }
}

impl From<ModelError> for ArtifactError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::UnsupportedType(path) => Self::UnsupportedType(path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ArtifactError::timeout("/p/a.jpg", Duration::from_secs(30)).is_retryable());
        assert!(ArtifactError::QueueFull { class: MediaClass::Image }.is_retryable());
        assert!(!ArtifactError::unsupported_type("/p/notes.txt").is_retryable());
        assert!(!ArtifactError::tool_failure("/p/a.jpg", "exit 1").is_retryable());
    }

    #[test]
    fn test_from_failure_maps_kind() {
        let path = Path::new("/p/clip.mov");
        let err = ArtifactError::from_failure(
            path,
            FailureReason {
                kind: FailureKind::QueueFull,
                message: "full".into(),
            },
        );
        assert_eq!(err, ArtifactError::QueueFull { class: MediaClass::Motion });

        let err = ArtifactError::from_failure(
            path,
            FailureReason {
                kind: FailureKind::CacheIo,
                message: "read-only".into(),
            },
        );
        assert_eq!(err.label(), "cache_io");
        assert!(err.to_string().contains("/p/clip.mov"));
    }

    #[test]
    fn test_model_error_conversion() {
        let err: ArtifactError = ModelError::unsupported_type("/p/notes.txt").into();
        assert_eq!(err, ArtifactError::unsupported_type("/p/notes.txt"));
    }
}
