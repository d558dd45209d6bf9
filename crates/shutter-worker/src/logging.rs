//! Structured generation logging utilities.
//!
//! Provides consistent, structured logging for artifact generation with
//! tracing spans and contextual information.

use std::fmt;
use std::time::Duration;

use shutter_models::{MediaClass, SourceFile};
use tracing::{error, info, warn, Span};

use crate::outcome::{FailureKind, FailureReason};

/// Which execution path is generating an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPath {
    /// A pool worker, by index within its class pool
    Worker(usize),
    /// The requesting caller's own task after its queue was full
    Fallback,
}

impl GenerationPath {
    /// Label for metrics (no worker index, to keep cardinality fixed).
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationPath::Worker(_) => "worker",
            GenerationPath::Fallback => "fallback",
        }
    }
}

impl fmt::Display for GenerationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerationPath::Worker(id) => write!(f, "worker-{}", id),
            GenerationPath::Fallback => f.write_str("fallback"),
        }
    }
}

/// Generation logger for structured logging with consistent formatting.
///
/// Carries the source path, media class, and generation path so every
/// lifecycle event of one generation shares the same fields.
#[derive(Debug, Clone)]
pub struct GenerationLogger {
    source: String,
    class: MediaClass,
    path: GenerationPath,
}

impl GenerationLogger {
    pub fn new(source: &SourceFile, path: GenerationPath) -> Self {
        Self {
            source: source.path().display().to_string(),
            class: source.class(),
            path,
        }
    }

    pub fn log_start(&self) {
        info!(
            source = %self.source,
            class = %self.class,
            path = %self.path,
            "Generation started"
        );
    }

    /// Log an artifact that turned out to exist already.
    pub fn log_already_cached(&self) {
        info!(
            source = %self.source,
            class = %self.class,
            path = %self.path,
            "Artifact already cached, skipping generation"
        );
    }

    pub fn log_completion(&self, elapsed: Duration, bytes: usize) {
        info!(
            source = %self.source,
            class = %self.class,
            path = %self.path,
            elapsed_ms = elapsed.as_millis() as u64,
            bytes,
            "Generation completed"
        );
    }

    /// Log a failed generation.
    ///
    /// Problems with the source itself are warnings; tool and cache faults are
    /// errors.
    pub fn log_failure(&self, reason: &FailureReason) {
        match reason.kind {
            FailureKind::SourceUnreadable | FailureKind::UnsupportedFormat => warn!(
                source = %self.source,
                class = %self.class,
                path = %self.path,
                kind = reason.kind.as_str(),
                "Generation failed: {}", reason.message
            ),
            _ => error!(
                source = %self.source,
                class = %self.class,
                path = %self.path,
                kind = reason.kind.as_str(),
                "Generation failed: {}", reason.message
            ),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn class(&self) -> MediaClass {
        self.class
    }

    pub fn path(&self) -> GenerationPath {
        self.path
    }

    /// Create a tracing span for this generation.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "generation",
            source = %self.source,
            class = %self.class,
            path = %self.path
        )
    }
}
