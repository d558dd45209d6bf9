//! Media classification of source files.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::artifact::ArtifactKey;
use crate::error::{ModelError, ModelResult};

/// Extensions (lowercase, without dot) handled as still images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "heic", "heif", "arw", "raw", "dng"];

/// Extensions (lowercase, without dot) handled as motion clips.
pub const MOTION_EXTENSIONS: &[&str] = &["mov", "mp4", "avi", "mkv"];

/// Work class of a source file.
///
/// Each class has its own queue, worker pool and transcoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaClass {
    /// Photos and raw camera formats
    Image,
    /// Video clips; the artifact is a single representative frame
    Motion,
}

impl MediaClass {
    /// Classify a path by its extension (case-insensitive).
    ///
    /// Returns `None` for extensions in neither class.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaClass::Image)
        } else if MOTION_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaClass::Motion)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaClass::Image => "image",
            MediaClass::Motion => "motion",
        }
    }

    /// Both classes, in dispatch-table order.
    pub fn all() -> [MediaClass; 2] {
        [MediaClass::Image, MediaClass::Motion]
    }
}

impl fmt::Display for MediaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified source file.
///
/// Existence is not checked here; it is checked lazily by whoever reads the file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceFile {
    path: PathBuf,
    class: MediaClass,
}

impl SourceFile {
    /// Classify a source path, rejecting unsupported extensions.
    pub fn new(path: impl Into<PathBuf>) -> ModelResult<Self> {
        let path = path.into();
        match MediaClass::from_path(&path) {
            Some(class) => Ok(Self { path, class }),
            None => Err(ModelError::unsupported_type(path)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn class(&self) -> MediaClass {
        self.class
    }

    /// Key of the cached artifact derived from this source.
    pub fn artifact_key(&self) -> ArtifactKey {
        ArtifactKey::for_source(&self.path)
    }
}

impl fmt::Display for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())
    }
}
