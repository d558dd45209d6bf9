//! Encoding constants shared by the transcoders and the artifact service.

use std::time::Duration;

/// Bounding box (pixels) of cached thumbnail artifacts.
pub const THUMBNAIL_MAX_DIMENSION: u32 = 300;

/// Bounding box (pixels) of uncached previews.
pub const PREVIEW_MAX_DIMENSION: u32 = 1600;

/// Offset of the representative frame for motion sources.
pub const DEFAULT_FRAME_OFFSET: Duration = Duration::ZERO;

/// Format an offset the way FFmpeg expects it after `-ss`.
pub fn format_offset(offset: Duration) -> String {
    format!("{:.3}", offset.as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_offset() {
        assert_eq!(format_offset(Duration::ZERO), "0.000");
        assert_eq!(format_offset(Duration::from_millis(1500)), "1.500");
    }

    #[test]
    fn test_preview_larger_than_thumbnail() {
        assert!(PREVIEW_MAX_DIMENSION > THUMBNAIL_MAX_DIMENSION);
    }
}
