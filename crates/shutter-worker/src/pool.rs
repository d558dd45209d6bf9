//! Fixed-size worker pools, one per media class.

use std::sync::Arc;
use std::time::Duration;

use shutter_models::MediaClass;
use shutter_queue::SharedReceiver;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::generator::{GenerationJob, Generator};
use crate::logging::GenerationPath;

/// Long-lived workers draining one class queue.
pub struct WorkerPool {
    class: MediaClass,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawn `workers` tasks pulling from `rx`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(
        class: MediaClass,
        workers: usize,
        rx: SharedReceiver<GenerationJob>,
        generator: Arc<Generator>,
    ) -> Self {
        let handles = (0..workers.max(1))
            .map(|worker_id| {
                let rx = rx.clone();
                let generator = Arc::clone(&generator);
                tokio::spawn(run_worker(class, worker_id, rx, generator))
            })
            .collect();

        info!(class = %class, workers, "Worker pool started");
        Self { class, handles }
    }

    pub fn class(&self) -> MediaClass {
        self.class
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Wait for every worker to exit, up to `timeout`.
    ///
    /// Workers exit once their queue is closed and drained. Returns `false`
    /// if the deadline passed first; remaining workers are aborted.
    pub async fn join(self, timeout: Duration) -> bool {
        let class = self.class;
        let mut handles = self.handles;

        let all = async {
            for handle in handles.iter_mut() {
                if let Err(e) = handle.await {
                    error!(class = %class, "Worker task failed: {}", e);
                }
            }
        };

        match tokio::time::timeout(timeout, all).await {
            Ok(()) => {
                info!(class = %class, "Worker pool stopped");
                true
            }
            Err(_) => {
                warn!(class = %class, ?timeout, "Worker pool did not drain in time, aborting");
                for handle in &handles {
                    handle.abort();
                }
                false
            }
        }
    }
}

async fn run_worker(
    class: MediaClass,
    worker_id: usize,
    rx: SharedReceiver<GenerationJob>,
    generator: Arc<Generator>,
) {
    info!(class = %class, worker_id, "Worker started");

    while let Some(job) = rx.recv().await {
        let generator = Arc::clone(&generator);

        // A panic inside the generation drops the ticket, which wakes every
        // waiter; the worker itself keeps serving the queue.
        let task = tokio::spawn(async move {
            let GenerationJob { source, ticket } = job;
            let outcome = generator
                .generate(&source, GenerationPath::Worker(worker_id))
                .await;
            ticket.complete(outcome)
        });

        if let Err(e) = task.await {
            error!(class = %class, worker_id, "Generation task panicked: {}", e);
        }
    }

    info!(class = %class, worker_id, "Worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::GenerationOutcome;
    use async_trait::async_trait;
    use shutter_media::{TranscodeRequest, TranscodeResult, Transcoder};
    use shutter_models::SourceFile;
    use shutter_queue::{ClassQueue, PendingRegistry, Registration};
    use shutter_storage::CacheStore;

    struct PanickingTranscoder;

    #[async_trait]
    impl Transcoder for PanickingTranscoder {
        async fn transcode(&self, _request: &TranscodeRequest) -> TranscodeResult<Vec<u8>> {
            panic!("decoder crashed");
        }
    }

    #[tokio::test]
    async fn test_panicking_generation_wakes_waiters_and_worker_survives() {
        let dir = tempfile::tempdir().unwrap();
        let generator = Arc::new(Generator::new(
            Arc::new(PanickingTranscoder),
            CacheStore::new(),
            300,
            Duration::ZERO,
        ));
        let registry = Arc::new(PendingRegistry::<GenerationOutcome>::new());
        let (queue, rx) = ClassQueue::bounded(MediaClass::Image, 4);
        let pool = WorkerPool::spawn(MediaClass::Image, 1, rx, generator);
        assert_eq!(pool.size(), 1);

        for name in ["a.jpg", "b.jpg"] {
            let source = SourceFile::new(dir.path().join(name)).unwrap();
            let Registration::Started { ticket, signal } = registry.join_or_start(&source.artifact_key())
            else {
                panic!("expected to start");
            };
            queue.try_enqueue(GenerationJob::new(source, ticket)).unwrap();
            assert_eq!(signal.wait().await, None);
        }

        assert_eq!(registry.in_flight_count(), 0);
        assert_eq!(registry.stats().abandoned_generations, 2);

        queue.close();
        assert!(pool.join(Duration::from_secs(5)).await);
    }
}
