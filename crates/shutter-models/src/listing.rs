//! Directory listing entries.

use serde::{Deserialize, Serialize};

use crate::media::MediaClass;

/// One visible entry of a browsed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirEntryInfo {
    /// File or directory name
    pub name: String,
    /// Whether the entry is a directory
    pub is_dir: bool,
    /// Media class, if the entry is a supported media file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_class: Option<MediaClass>,
}

impl DirEntryInfo {
    /// Whether an artifact can be requested for this entry.
    pub fn has_artifact(&self) -> bool {
        !self.is_dir && self.media_class.is_some()
    }
}
