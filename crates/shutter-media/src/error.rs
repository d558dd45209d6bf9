//! Error types for transcoding.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for transcoding operations.
pub type TranscodeResult<T> = Result<T, TranscodeError>;

/// Errors a [`Transcoder`](crate::Transcoder) may report.
///
/// The set is closed: tool diagnostics are folded into one of these variants
/// so nothing downstream matches on tool output.
#[derive(Debug, Error)]
pub enum TranscodeError {
    #[error("Source unreadable: {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported format: {}: {message}", .path.display())]
    UnsupportedFormat { path: PathBuf, message: String },

    #[error("{tool} failed: {message}")]
    ToolFailure {
        tool: String,
        message: String,
        exit_code: Option<i32>,
    },
}

impl TranscodeError {
    /// Create a source unreadable error.
    pub fn source_unreadable(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::SourceUnreadable {
            path: path.into(),
            source,
        }
    }

    /// Create an unsupported format error.
    pub fn unsupported_format(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a tool failure error.
    pub fn tool_failure(
        tool: impl Into<String>,
        message: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::ToolFailure {
            tool: tool.into(),
            message: message.into(),
            exit_code,
        }
    }

    /// Create a tool-not-installed error.
    pub fn tool_not_found(tool: impl Into<String>) -> Self {
        let tool = tool.into();
        let message = format!("{} not found in PATH", tool);
        Self::tool_failure(tool, message, None)
    }
}
