//! One generation attempt, shared by pool workers and the inline fallback.

use std::sync::Arc;
use std::time::{Duration, Instant};

use shutter_media::{TranscodeRequest, Transcoder};
use shutter_models::{MediaClass, SourceFile};
use shutter_queue::PendingTicket;
use shutter_storage::CacheStore;
use tracing::Instrument;

use crate::logging::{GenerationLogger, GenerationPath};
use crate::metrics;
use crate::outcome::{FailureReason, GenerationOutcome};

/// A queued generation: the source to render and the registry ticket to
/// complete when done.
#[derive(Debug)]
pub struct GenerationJob {
    pub source: SourceFile,
    pub ticket: PendingTicket<GenerationOutcome>,
}

impl GenerationJob {
    pub fn new(source: SourceFile, ticket: PendingTicket<GenerationOutcome>) -> Self {
        Self { source, ticket }
    }

    pub fn class(&self) -> MediaClass {
        self.source.class()
    }
}

/// Transcodes a source and stores the result in the artifact cache.
pub struct Generator {
    transcoder: Arc<dyn Transcoder>,
    store: CacheStore,
    max_dimension: u32,
    frame_offset: Duration,
}

impl Generator {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        store: CacheStore,
        max_dimension: u32,
        frame_offset: Duration,
    ) -> Self {
        Self {
            transcoder,
            store,
            max_dimension,
            frame_offset,
        }
    }

    pub fn transcoder(&self) -> &Arc<dyn Transcoder> {
        &self.transcoder
    }

    /// Generate the cached artifact for `source`.
    ///
    /// Returns `Ready` without transcoding if the artifact already exists, so
    /// a second attempt for the same source is a no-op. Failures are logged
    /// here and returned as an outcome; nothing is written on failure.
    pub async fn generate(&self, source: &SourceFile, path: GenerationPath) -> GenerationOutcome {
        let logger = GenerationLogger::new(source, path);
        let span = logger.create_span();
        self.generate_inner(source, &logger).instrument(span).await
    }

    async fn generate_inner(&self, source: &SourceFile, logger: &GenerationLogger) -> GenerationOutcome {
        let key = source.artifact_key();
        if self.store.exists(&key).await {
            logger.log_already_cached();
            return GenerationOutcome::Ready;
        }

        logger.log_start();
        let started = Instant::now();

        let outcome = match self.render_and_store(source).await {
            Ok(bytes) => {
                logger.log_completion(started.elapsed(), bytes);
                GenerationOutcome::Ready
            }
            Err(reason) => {
                logger.log_failure(&reason);
                GenerationOutcome::Failed(reason)
            }
        };

        metrics::record_generation(
            source.class(),
            logger.path(),
            outcome.label(),
            started.elapsed().as_secs_f64(),
        );
        outcome
    }

    async fn render_and_store(&self, source: &SourceFile) -> Result<usize, FailureReason> {
        let key = source.artifact_key();
        self.store
            .ensure_directory(&key)
            .await
            .map_err(|e| FailureReason::from(&e))?;

        let request = TranscodeRequest::new(source.path(), source.class(), self.max_dimension)
            .with_frame_offset(self.frame_offset);
        let bytes = self
            .transcoder
            .transcode(&request)
            .await
            .map_err(|e| FailureReason::from(&e))?;

        self.store
            .write(&key, &bytes)
            .await
            .map_err(|e| FailureReason::from(&e))?;
        Ok(bytes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::FailureKind;
    use async_trait::async_trait;
    use mockall::mock;
    use shutter_media::{TranscodeError, TranscodeResult};

    mock! {
        pub Encoder {}

        #[async_trait]
        impl Transcoder for Encoder {
            async fn transcode(&self, request: &TranscodeRequest) -> TranscodeResult<Vec<u8>>;
        }
    }

    fn generator(mock: MockEncoder) -> Generator {
        Generator::new(Arc::new(mock), CacheStore::new(), 300, Duration::ZERO)
    }

    #[tokio::test]
    async fn test_generate_writes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("beach.jpg");
        std::fs::write(&source_path, b"raw").unwrap();

        let mut mock = MockEncoder::new();
        mock.expect_transcode()
            .withf(|req| req.max_dimension == 300 && req.class == MediaClass::Image)
            .times(1)
            .returning(|_| Ok(b"jpeg".to_vec()));

        let source = SourceFile::new(&source_path).unwrap();
        let outcome = generator(mock).generate(&source, GenerationPath::Worker(0)).await;

        assert_eq!(outcome, GenerationOutcome::Ready);
        let artifact = dir.path().join(".small").join("beach.jpg.jpg");
        assert_eq!(std::fs::read(artifact).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn test_generate_skips_existing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("beach.jpg");
        std::fs::create_dir(dir.path().join(".small")).unwrap();
        std::fs::write(dir.path().join(".small").join("beach.jpg.jpg"), b"old").unwrap();

        let mut mock = MockEncoder::new();
        mock.expect_transcode().never();

        let source = SourceFile::new(&source_path).unwrap();
        let outcome = generator(mock).generate(&source, GenerationPath::Fallback).await;
        assert!(outcome.is_ready());
    }

    #[tokio::test]
    async fn test_generate_failure_leaves_no_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let source_path = dir.path().join("clip.mov");

        let mut mock = MockEncoder::new();
        mock.expect_transcode()
            .times(1)
            .returning(|req| Err(TranscodeError::tool_failure("ffmpeg", format!("bad {:?}", req.source), Some(1))));

        let source = SourceFile::new(&source_path).unwrap();
        let outcome = generator(mock).generate(&source, GenerationPath::Worker(0)).await;

        match outcome {
            GenerationOutcome::Failed(reason) => assert_eq!(reason.kind, FailureKind::ToolFailure),
            other => panic!("expected failure, got {:?}", other),
        }
        assert!(!dir.path().join(".small").join("clip.mov.jpg").exists());
    }
}
