//! Bounded per-class work queues.
//!
//! Each media class owns one queue. Producers never block: a full queue hands
//! the job back so the caller can fall back to doing the work itself. Workers
//! of the class share one receiver, so jobs are dispatched in FIFO order.

use std::sync::{Arc, Mutex};

use shutter_models::MediaClass;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::error::{EnqueueRejected, QueueError};

/// Producer side of a bounded class queue.
pub struct ClassQueue<J> {
    class: MediaClass,
    capacity: usize,
    /// `None` once the queue is closed
    sender: Mutex<Option<mpsc::Sender<J>>>,
}

/// Consumer side of a class queue, shared by a pool of workers.
pub struct SharedReceiver<J> {
    class: MediaClass,
    inner: Arc<tokio::sync::Mutex<mpsc::Receiver<J>>>,
}

impl<J> Clone for SharedReceiver<J> {
    fn clone(&self) -> Self {
        Self {
            class: self.class,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<J: Send + 'static> ClassQueue<J> {
    /// Create a bounded queue for `class`. Capacity is clamped to at least 1.
    pub fn bounded(class: MediaClass, capacity: usize) -> (Self, SharedReceiver<J>) {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                class,
                capacity,
                sender: Mutex::new(Some(tx)),
            },
            SharedReceiver {
                class,
                inner: Arc::new(tokio::sync::Mutex::new(rx)),
            },
        )
    }

    pub fn class(&self) -> MediaClass {
        self.class
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of jobs waiting to be dequeued.
    pub fn depth(&self) -> usize {
        match self.sender.lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|tx| self.capacity - tx.capacity())
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// Enqueue without waiting.
    ///
    /// A full or closed queue returns the job to the caller.
    pub fn try_enqueue(&self, job: J) -> Result<(), EnqueueRejected<J>> {
        let guard = match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        let Some(tx) = guard.as_ref() else {
            return Err(EnqueueRejected {
                job,
                error: QueueError::Closed { class: self.class },
            });
        };

        match tx.try_send(job) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(job)) => {
                debug!(class = %self.class, capacity = self.capacity, "Queue full");
                Err(EnqueueRejected {
                    job,
                    error: QueueError::Full {
                        class: self.class,
                        capacity: self.capacity,
                    },
                })
            }
            Err(TrySendError::Closed(job)) => Err(EnqueueRejected {
                job,
                error: QueueError::Closed { class: self.class },
            }),
        }
    }

    /// Close the queue. Jobs already queued are still delivered to workers.
    pub fn close(&self) {
        let mut guard = match self.sender.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.take().is_some() {
            debug!(class = %self.class, "Queue closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        match self.sender.lock() {
            Ok(guard) => guard.is_none(),
            Err(_) => true,
        }
    }
}

impl<J: Send + 'static> SharedReceiver<J> {
    pub fn class(&self) -> MediaClass {
        self.class
    }

    /// Wait for the next job.
    ///
    /// Returns `None` once the queue is closed and drained.
    pub async fn recv(&self) -> Option<J> {
        let mut rx = self.inner.lock().await;
        rx.recv().await
    }
}
