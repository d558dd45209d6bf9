//! Outcome broadcast to every caller waiting on a generation.

use shutter_media::TranscodeError;
use shutter_storage::StorageError;
use std::fmt;

/// Result of one generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// The artifact was written (or already existed).
    Ready,
    /// The attempt failed; no artifact was written.
    Failed(FailureReason),
}

impl GenerationOutcome {
    pub fn failed(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Failed(FailureReason {
            kind,
            message: message.into(),
        })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, GenerationOutcome::Ready)
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            GenerationOutcome::Ready => "ready",
            GenerationOutcome::Failed(reason) => reason.kind.as_str(),
        }
    }
}

/// Classification of a failed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    SourceUnreadable,
    UnsupportedFormat,
    ToolFailure,
    CacheIo,
    QueueFull,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::SourceUnreadable => "source_unreadable",
            FailureKind::UnsupportedFormat => "unsupported_format",
            FailureKind::ToolFailure => "tool_failure",
            FailureKind::CacheIo => "cache_io",
            FailureKind::QueueFull => "queue_full",
        }
    }
}

/// Why a generation failed, cloneable so it can be broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureReason {
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind.as_str(), self.message)
    }
}

impl From<&TranscodeError> for FailureReason {
    fn from(err: &TranscodeError) -> Self {
        let kind = match err {
            TranscodeError::SourceUnreadable { .. } => FailureKind::SourceUnreadable,
            TranscodeError::UnsupportedFormat { .. } => FailureKind::UnsupportedFormat,
            TranscodeError::ToolFailure { .. } => FailureKind::ToolFailure,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl From<&StorageError> for FailureReason {
    fn from(err: &StorageError) -> Self {
        Self {
            kind: FailureKind::CacheIo,
            message: err.to_string(),
        }
    }
}
