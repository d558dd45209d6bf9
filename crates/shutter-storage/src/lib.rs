//! On-disk artifact cache.
//!
//! This crate provides:
//! - Existence checks for cached artifacts
//! - Idempotent creation of the hidden cache directory
//! - Atomic artifact writes (temp file + rename)
//! - Artifact reads for the serving layer

pub mod error;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use store::CacheStore;
