//! Motion adapter backed by FFmpeg.

use async_trait::async_trait;
use shutter_models::encoding::format_offset;
use tracing::debug;

use crate::command::{FfmpegCommand, ToolRunner};
use crate::error::TranscodeResult;
use crate::source::open_source;
use crate::transcoder::{TranscodeRequest, Transcoder};

/// Extracts one representative frame from a clip as a scaled JPEG.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    runner: ToolRunner,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegTranscoder {
    pub fn new() -> Self {
        Self {
            runner: ToolRunner::new("ffmpeg"),
        }
    }

    /// Build the frame extraction command for a request.
    pub fn command(request: &TranscodeRequest) -> FfmpegCommand {
        let size = request.max_dimension;
        let filter = format!(
            "scale={}:{}:force_original_aspect_ratio=decrease",
            size, size
        );

        FfmpegCommand::new(&request.source)
            .seek(format_offset(request.frame_offset))
            .video_filter(filter)
            .single_frame()
            .jpeg_pipe()
            .log_level("error")
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn transcode(&self, request: &TranscodeRequest) -> TranscodeResult<Vec<u8>> {
        // FFmpeg opens the input itself; this only surfaces unreadable sources early.
        drop(open_source(&request.source).await?);

        let args = Self::command(request).build_args();
        let output = self.runner.run(&request.source, &args, None).await?;
        debug!(
            source = %request.source.display(),
            bytes = output.stdout.len(),
            "ffmpeg produced motion artifact"
        );
        Ok(output.stdout)
    }
}
