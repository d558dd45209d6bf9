//! Still-image adapter backed by `vipsthumbnail`.

use async_trait::async_trait;
use tracing::debug;

use crate::command::{ToolRunner, VipsCommand};
use crate::error::TranscodeResult;
use crate::source::open_source;
use crate::transcoder::{TranscodeRequest, Transcoder};

/// Name of the vips executable on this platform.
///
/// Windows builds ship `vipsthumbnail.exe`; prefer it when it is on `PATH`.
pub fn vips_executable() -> &'static str {
    if which::which("vipsthumbnail.exe").is_ok() {
        "vipsthumbnail.exe"
    } else {
        "vipsthumbnail"
    }
}

/// Scales photos and raw camera formats to a JPEG bounding box.
#[derive(Debug, Clone)]
pub struct VipsTranscoder {
    runner: ToolRunner,
}

impl Default for VipsTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl VipsTranscoder {
    pub fn new() -> Self {
        Self {
            runner: ToolRunner::new(vips_executable()),
        }
    }
}

#[async_trait]
impl Transcoder for VipsTranscoder {
    async fn transcode(&self, request: &TranscodeRequest) -> TranscodeResult<Vec<u8>> {
        let file = open_source(&request.source).await?;
        let args = VipsCommand::new(request.max_dimension).build_args();

        let output = self.runner.run(&request.source, &args, Some(file)).await?;
        debug!(
            source = %request.source.display(),
            bytes = output.stdout.len(),
            "vips produced still artifact"
        );
        Ok(output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TranscodeError;
    use shutter_models::MediaClass;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_source_fails_before_running_tool() {
        let dir = TempDir::new().unwrap();
        let request = TranscodeRequest::new(dir.path().join("missing.jpg"), MediaClass::Image, 300);

        let err = VipsTranscoder::new().transcode(&request).await.unwrap_err();
        assert!(matches!(err, TranscodeError::SourceUnreadable { .. }));
    }
}
