//! Request coordinator.
//!
//! ```text
//! request(path) ──► unsupported? ──► UnsupportedType
//!        │
//!        ├──► artifact exists ──► path
//!        │
//!        └──► join_or_start
//!               ├── Joined ──────────────────────────────► wait (timeout)
//!               └── Started ──► try_enqueue ── ok ───────► wait (timeout)
//!                                   └── full ──► generate inline, complete ticket
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use shutter_media::{TranscodeRequest, Transcoder};
use shutter_models::{ArtifactKey, MediaClass, SourceFile};
use shutter_queue::{
    ClassQueue, CompletionSignal, EnqueueRejected, PendingRegistry, Registration, RegistryStats,
};
use shutter_storage::CacheStore;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{OverflowPolicy, ServiceConfig};
use crate::error::{ArtifactError, ArtifactResult};
use crate::generator::{GenerationJob, Generator};
use crate::logging::GenerationPath;
use crate::metrics;
use crate::outcome::{FailureKind, GenerationOutcome};
use crate::pool::WorkerPool;

/// Coordinates artifact requests across the cache, the pending registry,
/// the class queues, and the worker pools.
pub struct ArtifactService {
    config: ServiceConfig,
    store: CacheStore,
    registry: Arc<PendingRegistry<GenerationOutcome>>,
    generator: Arc<Generator>,
    image_queue: ClassQueue<GenerationJob>,
    motion_queue: ClassQueue<GenerationJob>,
    pools: Mutex<Vec<WorkerPool>>,
}

impl ArtifactService {
    /// Create the service and spawn its worker pools.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: ServiceConfig, transcoder: Arc<dyn Transcoder>) -> Self {
        let store = CacheStore::new();
        let generator = Arc::new(Generator::new(
            transcoder,
            store,
            config.thumbnail_max_dimension,
            config.frame_offset,
        ));

        let (image_queue, image_rx) = ClassQueue::bounded(MediaClass::Image, config.queue_capacity);
        let (motion_queue, motion_rx) =
            ClassQueue::bounded(MediaClass::Motion, config.queue_capacity);

        let pools = vec![
            WorkerPool::spawn(
                MediaClass::Image,
                config.workers_for(MediaClass::Image),
                image_rx,
                Arc::clone(&generator),
            ),
            WorkerPool::spawn(
                MediaClass::Motion,
                config.workers_for(MediaClass::Motion),
                motion_rx,
                Arc::clone(&generator),
            ),
        ];

        info!(
            queue_capacity = config.queue_capacity,
            image_workers = config.image_workers,
            motion_workers = config.motion_workers,
            overflow_policy = ?config.overflow_policy,
            "Artifact service started"
        );

        Self {
            config,
            store,
            registry: Arc::new(PendingRegistry::new()),
            generator,
            image_queue,
            motion_queue,
            pools: Mutex::new(pools),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Snapshot of the pending registry counters.
    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }

    /// Jobs waiting in the queue for `class`.
    pub fn queue_depth(&self, class: MediaClass) -> usize {
        self.queue(class).depth()
    }

    fn queue(&self, class: MediaClass) -> &ClassQueue<GenerationJob> {
        match class {
            MediaClass::Image => &self.image_queue,
            MediaClass::Motion => &self.motion_queue,
        }
    }

    /// Return the path of the cached artifact for `path`, generating it first
    /// if needed.
    ///
    /// Concurrent requests for the same missing artifact share one
    /// generation. A caller that has to wait gives up after the configured
    /// timeout; the generation itself keeps running.
    pub async fn get_or_create_artifact(&self, path: impl AsRef<Path>) -> ArtifactResult<PathBuf> {
        let path = path.as_ref();
        let class = MediaClass::from_path(path);
        let result = self.resolve(path).await;

        let outcome = match &result {
            Ok(_) => "success",
            Err(e) => e.label(),
        };
        metrics::record_artifact_request(class, outcome);
        result
    }

    async fn resolve(&self, path: &Path) -> ArtifactResult<PathBuf> {
        let source = SourceFile::new(path)?;
        let key = source.artifact_key();

        if self.store.exists(&key).await {
            debug!(artifact = %key, "Artifact cache hit");
            return Ok(key.into_path());
        }

        let signal = match self.registry.join_or_start(&key) {
            Registration::Joined(signal) => signal,
            Registration::Started { ticket, signal } => {
                let job = GenerationJob::new(source.clone(), ticket);
                match self.queue(source.class()).try_enqueue(job) {
                    Ok(()) => {
                        metrics::set_queue_depth(source.class(), self.queue_depth(source.class()));
                        signal
                    }
                    Err(rejected) => return self.handle_rejected(rejected).await,
                }
            }
        };

        self.wait_for(&source, key, signal).await
    }

    /// The starter's job did not fit in its queue.
    async fn handle_rejected(
        &self,
        rejected: EnqueueRejected<GenerationJob>,
    ) -> ArtifactResult<PathBuf> {
        let full = rejected.is_full();
        let GenerationJob { source, ticket } = rejected.into_job();
        let class = source.class();

        if full && self.config.overflow_policy == OverflowPolicy::Reject {
            warn!(source = %source, class = %class, "Queue full, rejecting request");
            ticket.complete(GenerationOutcome::failed(
                FailureKind::QueueFull,
                format!("{} queue is full", class),
            ));
            return Err(ArtifactError::QueueFull { class });
        }

        // A closed queue means the service is shutting down; the request is
        // still served inline.
        warn!(source = %source, class = %class, full, "Queue unavailable, generating inline");
        metrics::record_queue_fallback(class);

        let outcome = self.generator.generate(&source, GenerationPath::Fallback).await;
        ticket.complete(outcome.clone());

        match outcome {
            GenerationOutcome::Ready => Ok(source.artifact_key().into_path()),
            GenerationOutcome::Failed(reason) => Err(ArtifactError::from_failure(source.path(), reason)),
        }
    }

    async fn wait_for(
        &self,
        source: &SourceFile,
        key: ArtifactKey,
        signal: CompletionSignal<GenerationOutcome>,
    ) -> ArtifactResult<PathBuf> {
        let waited = self.config.wait_timeout;
        let outcome = match tokio::time::timeout(waited, signal.wait()).await {
            Ok(outcome) => outcome,
            Err(_) => {
                warn!(source = %source, ?waited, "Timed out waiting for generation");
                metrics::record_wait_timeout(source.class());
                return Err(ArtifactError::timeout(source.path(), waited));
            }
        };

        match outcome {
            Some(GenerationOutcome::Ready) => {
                if self.store.exists(&key).await {
                    Ok(key.into_path())
                } else {
                    Err(ArtifactError::cache_io(
                        source.path(),
                        "generation completed but artifact not found",
                    ))
                }
            }
            Some(GenerationOutcome::Failed(reason)) => {
                Err(ArtifactError::from_failure(source.path(), reason))
            }
            None => Err(ArtifactError::tool_failure(
                source.path(),
                "generation abandoned without an outcome",
            )),
        }
    }

    /// Render an uncached, larger JPEG of an image-class source.
    ///
    /// Runs on the caller's task and bypasses the registry and queues.
    pub async fn render_preview(&self, path: impl AsRef<Path>) -> ArtifactResult<Vec<u8>> {
        let path = path.as_ref();
        let source = SourceFile::new(path)?;
        if source.class() != MediaClass::Image {
            return Err(ArtifactError::unsupported_type(path));
        }

        let request = TranscodeRequest::new(path, MediaClass::Image, self.config.preview_max_dimension);
        self.generator
            .transcoder()
            .transcode(&request)
            .await
            .map_err(|e| ArtifactError::from_transcode(path, &e))
    }

    /// Stop accepting queued work and wait for workers to drain.
    ///
    /// Requests arriving after this point are generated inline. Returns
    /// `false` if some workers had to be aborted.
    pub async fn shutdown(&self) -> bool {
        info!("Shutting down artifact service");
        self.image_queue.close();
        self.motion_queue.close();

        let pools: Vec<WorkerPool> = self.pools.lock().await.drain(..).collect();
        let mut clean = true;
        for pool in pools {
            clean &= pool.join(self.config.shutdown_timeout).await;
        }

        info!(stats = ?self.registry.stats(), clean, "Artifact service stopped");
        clean
    }
}
