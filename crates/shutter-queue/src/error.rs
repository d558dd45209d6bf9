//! Queue error types.

use shutter_models::MediaClass;
use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("{class} queue is full (capacity {capacity})")]
    Full { class: MediaClass, capacity: usize },

    #[error("{class} queue is closed")]
    Closed { class: MediaClass },
}

/// A job that could not be enqueued, handed back to the caller.
#[derive(Debug)]
pub struct EnqueueRejected<J> {
    pub job: J,
    pub error: QueueError,
}

impl<J> EnqueueRejected<J> {
    pub fn is_full(&self) -> bool {
        matches!(self.error, QueueError::Full { .. })
    }

    pub fn into_job(self) -> J {
        self.job
    }
}
