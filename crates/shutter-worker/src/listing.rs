//! Directory listing for browsing and prewarming.

use std::io;
use std::path::Path;

use shutter_models::{DirEntryInfo, MediaClass};

/// List the visible entries of `dir`, sorted by name.
///
/// Dot-prefixed entries (including the artifact cache directory) are skipped.
pub async fn list_directory(dir: impl AsRef<Path>) -> io::Result<Vec<DirEntryInfo>> {
    let mut entries = Vec::new();
    let mut read_dir = tokio::fs::read_dir(dir.as_ref()).await?;

    while let Some(entry) = read_dir.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }

        let is_dir = entry.file_type().await?.is_dir();
        let media_class = if is_dir {
            None
        } else {
            MediaClass::from_path(Path::new(&name))
        };

        entries.push(DirEntryInfo {
            name,
            is_dir,
            media_class,
        });
    }

    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_directory_skips_hidden_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".small")).unwrap();
        std::fs::create_dir(dir.path().join("albums")).unwrap();
        for name in ["zebra.mov", "beach.JPG", "notes.txt", ".DS_Store"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let entries = list_directory(dir.path()).await.unwrap();
        let names: Vec<&str> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["albums", "beach.JPG", "notes.txt", "zebra.mov"]);

        assert!(entries[0].is_dir);
        assert_eq!(entries[0].media_class, None);
        assert_eq!(entries[1].media_class, Some(MediaClass::Image));
        assert_eq!(entries[2].media_class, None);
        assert_eq!(entries[3].media_class, Some(MediaClass::Motion));
    }

    #[tokio::test]
    async fn test_list_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(list_directory(dir.path().join("nope")).await.is_err());
    }
}
