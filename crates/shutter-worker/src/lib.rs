//! Artifact generation service.
//!
//! This crate provides:
//! - [`ArtifactService`]: the request coordinator (cache check, deduplication,
//!   queueing with inline fallback, bounded waits)
//! - Per-class worker pools draining the bounded queues
//! - Configuration from the environment, structured logging and metrics
//! - A directory listing helper used by the prewarm binary

pub mod config;
pub mod error;
pub mod generator;
pub mod listing;
pub mod logging;
pub mod metrics;
pub mod outcome;
pub mod pool;
pub mod service;

pub use config::{OverflowPolicy, ServiceConfig};
pub use error::{ArtifactError, ArtifactResult};
pub use generator::{GenerationJob, Generator};
pub use listing::list_directory;
pub use logging::{GenerationLogger, GenerationPath};
pub use outcome::{FailureKind, FailureReason, GenerationOutcome};
pub use pool::WorkerPool;
pub use service::ArtifactService;
