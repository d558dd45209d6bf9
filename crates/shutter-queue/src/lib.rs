//! Coordination primitives for artifact generation.
//!
//! This crate provides:
//! - [`PendingRegistry`]: at most one in-flight generation per artifact key,
//!   with a broadcast completion signal shared by every joined caller
//! - [`ClassQueue`]: a bounded FIFO per media class with non-blocking enqueue
//!   and a receiver shared by a pool of workers

pub mod error;
pub mod queue;
pub mod registry;

pub use error::{EnqueueRejected, QueueError, QueueResult};
pub use queue::{ClassQueue, SharedReceiver};
pub use registry::{CompletionSignal, PendingRegistry, PendingTicket, Registration, RegistryStats};
