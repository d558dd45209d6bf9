//! The Transcoder capability.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use shutter_models::encoding::DEFAULT_FRAME_OFFSET;
use shutter_models::MediaClass;

use crate::error::TranscodeResult;
use crate::motion::FfmpegTranscoder;
use crate::still::VipsTranscoder;

/// A request to render one JPEG from a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscodeRequest {
    /// Source file to decode
    pub source: PathBuf,
    /// Media class of the source
    pub class: MediaClass,
    /// Bounding box of the output in pixels
    pub max_dimension: u32,
    /// Offset of the representative frame (motion class only)
    pub frame_offset: Duration,
}

impl TranscodeRequest {
    pub fn new(source: impl AsRef<Path>, class: MediaClass, max_dimension: u32) -> Self {
        Self {
            source: source.as_ref().to_path_buf(),
            class,
            max_dimension,
            frame_offset: DEFAULT_FRAME_OFFSET,
        }
    }

    pub fn with_frame_offset(mut self, offset: Duration) -> Self {
        self.frame_offset = offset;
        self
    }
}

/// Decodes a source file and produces scaled JPEG bytes.
///
/// Calls are blocking from the caller's point of view and are never
/// cancelled mid-flight.
#[async_trait]
pub trait Transcoder: Send + Sync {
    async fn transcode(&self, request: &TranscodeRequest) -> TranscodeResult<Vec<u8>>;
}

/// Routes requests to the still or motion adapter by media class.
#[derive(Debug, Clone, Default)]
pub struct MediaTranscoder {
    still: VipsTranscoder,
    motion: FfmpegTranscoder,
}

impl MediaTranscoder {
    pub fn new(still: VipsTranscoder, motion: FfmpegTranscoder) -> Self {
        Self { still, motion }
    }
}

#[async_trait]
impl Transcoder for MediaTranscoder {
    async fn transcode(&self, request: &TranscodeRequest) -> TranscodeResult<Vec<u8>> {
        match request.class {
            MediaClass::Image => self.still.transcode(request).await,
            MediaClass::Motion => self.motion.transcode(request).await,
        }
    }
}
