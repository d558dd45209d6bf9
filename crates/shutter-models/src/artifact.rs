//! Artifact keys and the on-disk cache layout.
//!
//! For a source at `<dir>/<name>.<ext>` the artifact lives at
//! `<dir>/.small/<name>.<ext>.jpg`. Keeping the source extension in the
//! artifact name means `photo.jpg` and `photo.png` never collide, and keeping
//! the hidden directory next to the source means removing a directory also
//! removes its artifacts.

use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

/// Name of the hidden per-directory cache folder.
pub const ARTIFACT_DIR_NAME: &str = ".small";

/// Extension appended to every artifact file name.
pub const ARTIFACT_EXTENSION: &str = "jpg";

/// Stable identifier of a cached artifact.
///
/// The key is the artifact's own path, so it doubles as the cache address and
/// the deduplication key for in-flight generations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArtifactKey(PathBuf);

impl ArtifactKey {
    /// Resolve the artifact key for a source path. Pure; performs no I/O.
    pub fn for_source(source: &Path) -> Self {
        let dir = source.parent().unwrap_or_else(|| Path::new(""));
        let mut name: OsString = source.file_name().unwrap_or_default().to_os_string();
        name.push(".");
        name.push(ARTIFACT_EXTENSION);
        Self(dir.join(ARTIFACT_DIR_NAME).join(name))
    }

    /// Path of the artifact file.
    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Hidden directory holding the artifact.
    pub fn dir(&self) -> &Path {
        self.0.parent().unwrap_or_else(|| Path::new(ARTIFACT_DIR_NAME))
    }

    pub fn into_path(self) -> PathBuf {
        self.0
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl AsRef<Path> for ArtifactKey {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}
