//! Shared data models for the shutter artifact cache.
//!
//! This crate provides:
//! - Media classification of source files by extension
//! - Artifact keys and the on-disk cache layout
//! - Directory listing entries
//! - Encoding constants shared by the transcoders and the service

pub mod artifact;
pub mod encoding;
pub mod error;
pub mod listing;
pub mod media;

pub use artifact::{ArtifactKey, ARTIFACT_DIR_NAME, ARTIFACT_EXTENSION};
pub use error::{ModelError, ModelResult};
pub use listing::DirEntryInfo;
pub use media::{MediaClass, SourceFile, IMAGE_EXTENSIONS, MOTION_EXTENSIONS};
