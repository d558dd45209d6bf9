//! Registry of in-flight artifact generations.
//!
//! When several callers ask for the same missing artifact at once, exactly one
//! of them becomes the starter and owns the generation; everyone else joins
//! and waits on the same completion signal.
//!
//! ```text
//! Caller A ─┐  join_or_start     ┌──► Started { ticket, signal }  ── ticket ──► worker
//! Caller B ─┼──────────────────► │
//! Caller C ─┘                    └──► Joined(signal)
//!                                          ▲
//!                   ticket.complete(outcome) ── broadcast ──┘  (A, B, C all woken)
//! ```
//!
//! Subscribing happens under the map's shard lock, and the entry is removed
//! before the signal fires. Once removed, the sender is unreachable from the
//! map, so a caller arriving concurrently either subscribed before removal
//! (and is woken by the send that follows) or finds no entry and starts a
//! fresh generation.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use shutter_models::ArtifactKey;
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Tracks in-flight generations keyed by artifact.
///
/// `T` is the outcome broadcast to every waiter when the generation finishes.
pub struct PendingRegistry<T> {
    /// In-flight generations: key -> broadcast sender for the outcome
    in_flight: DashMap<ArtifactKey, broadcast::Sender<T>>,
    total_requests: AtomicU64,
    coalesced_requests: AtomicU64,
    started_generations: AtomicU64,
    completed_generations: AtomicU64,
    abandoned_generations: AtomicU64,
}

/// Snapshot of registry counters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    /// Total `join_or_start` calls
    pub total_requests: u64,
    /// Calls that joined an existing generation
    pub coalesced_requests: u64,
    /// Calls that started a new generation
    pub started_generations: u64,
    /// Generations completed with an outcome
    pub completed_generations: u64,
    /// Generations whose ticket was dropped without an outcome
    pub abandoned_generations: u64,
    /// Generations currently in flight
    pub in_flight: usize,
}

impl RegistryStats {
    /// Returns the coalescing ratio (0.0 to 1.0)
    pub fn coalescing_ratio(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.coalesced_requests as f64 / self.total_requests as f64
        }
    }
}

/// Result of [`PendingRegistry::join_or_start`].
pub enum Registration<T: Clone + Send + 'static> {
    /// The caller owns the generation and must complete the ticket.
    Started {
        ticket: PendingTicket<T>,
        signal: CompletionSignal<T>,
    },
    /// Another caller owns the generation; wait on the signal.
    Joined(CompletionSignal<T>),
}

impl<T: Clone + Send + 'static> Registration<T> {
    pub fn is_starter(&self) -> bool {
        matches!(self, Registration::Started { .. })
    }
}

impl<T> Default for PendingRegistry<T> {
    fn default() -> Self {
        Self {
            in_flight: DashMap::new(),
            total_requests: AtomicU64::new(0),
            coalesced_requests: AtomicU64::new(0),
            started_generations: AtomicU64::new(0),
            completed_generations: AtomicU64::new(0),
            abandoned_generations: AtomicU64::new(0),
        }
    }
}

impl<T: Clone + Send + 'static> PendingRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the in-flight generation for `key`, or start one.
    ///
    /// Atomic load-or-insert: of any number of concurrent callers for the same
    /// key, exactly one receives [`Registration::Started`].
    pub fn join_or_start(self: &Arc<Self>, key: &ArtifactKey) -> Registration<T> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        match self.in_flight.entry(key.clone()) {
            Entry::Occupied(entry) => {
                let rx = entry.get().subscribe();
                self.coalesced_requests.fetch_add(1, Ordering::Relaxed);
                debug!(
                    artifact = %key,
                    waiters = entry.get().receiver_count(),
                    "Joining in-flight generation"
                );
                Registration::Joined(CompletionSignal::new(key.clone(), rx))
            }
            Entry::Vacant(entry) => {
                // One message is ever sent per generation.
                let (tx, rx) = broadcast::channel(1);
                entry.insert(tx);
                self.started_generations.fetch_add(1, Ordering::Relaxed);
                debug!(artifact = %key, "Starting new generation");
                Registration::Started {
                    ticket: PendingTicket {
                        key: key.clone(),
                        registry: Arc::clone(self),
                        completed: false,
                    },
                    signal: CompletionSignal::new(key.clone(), rx),
                }
            }
        }
    }

    /// Whether a generation for `key` is in flight.
    pub fn is_pending(&self, key: &ArtifactKey) -> bool {
        self.in_flight.contains_key(key)
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    /// Returns a snapshot of the current statistics.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            coalesced_requests: self.coalesced_requests.load(Ordering::Relaxed),
            started_generations: self.started_generations.load(Ordering::Relaxed),
            completed_generations: self.completed_generations.load(Ordering::Relaxed),
            abandoned_generations: self.abandoned_generations.load(Ordering::Relaxed),
            in_flight: self.in_flight.len(),
        }
    }

    /// Remove the entry for `key` and fire its signal.
    ///
    /// With `None` the sender is dropped without sending, which wakes every
    /// waiter with a closed channel. Returns the number of waiters notified.
    fn finish(&self, key: &ArtifactKey, outcome: Option<T>) -> usize {
        let Some((_, tx)) = self.in_flight.remove(key) else {
            return 0;
        };

        let waiters = tx.receiver_count();
        match outcome {
            Some(outcome) => {
                // Waiters that already timed out have dropped their receivers.
                let _ = tx.send(outcome);
                self.completed_generations.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                self.abandoned_generations.fetch_add(1, Ordering::Relaxed);
            }
        }

        if waiters > 0 {
            debug!(artifact = %key, waiters, "Completion signalled to waiters");
        }
        waiters
    }
}

/// Ownership of one in-flight generation.
///
/// Completing the ticket removes the registry entry and wakes every waiter.
/// A ticket dropped without completing (for example because the generating
/// task panicked) still removes the entry and wakes waiters with no outcome.
pub struct PendingTicket<T: Clone + Send + 'static> {
    key: ArtifactKey,
    registry: Arc<PendingRegistry<T>>,
    completed: bool,
}

impl<T: Clone + Send + 'static> PendingTicket<T> {
    pub fn key(&self) -> &ArtifactKey {
        &self.key
    }

    /// Fire the completion signal with `outcome`. Returns the number of waiters.
    pub fn complete(mut self, outcome: T) -> usize {
        self.completed = true;
        self.registry.finish(&self.key, Some(outcome))
    }
}

impl<T: Clone + Send + 'static> Drop for PendingTicket<T> {
    fn drop(&mut self) {
        if !self.completed {
            warn!(artifact = %self.key, "Generation abandoned without an outcome");
            self.registry.finish(&self.key, None);
        }
    }
}

impl<T: Clone + Send + 'static> fmt::Debug for PendingTicket<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTicket")
            .field("key", &self.key)
            .field("completed", &self.completed)
            .finish()
    }
}

/// One waiter's view of a generation's completion.
pub struct CompletionSignal<T> {
    key: ArtifactKey,
    rx: broadcast::Receiver<T>,
}

impl<T: Clone> CompletionSignal<T> {
    fn new(key: ArtifactKey, rx: broadcast::Receiver<T>) -> Self {
        Self { key, rx }
    }

    pub fn key(&self) -> &ArtifactKey {
        &self.key
    }

    /// Wait until the generation finishes.
    ///
    /// Returns `None` if the generation was abandoned without an outcome.
    pub async fn wait(mut self) -> Option<T> {
        loop {
            match self.rx.recv().await {
                Ok(outcome) => return Some(outcome),
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
            }
        }
    }
}

impl<T> fmt::Debug for CompletionSignal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionSignal")
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tokio_test::{assert_pending, assert_ready};

    fn key(name: &str) -> ArtifactKey {
        ArtifactKey::for_source(&Path::new("/photos").join(name))
    }

    fn started(registration: Registration<u32>) -> (PendingTicket<u32>, CompletionSignal<u32>) {
        match registration {
            Registration::Started { ticket, signal } => (ticket, signal),
            Registration::Joined(_) => panic!("expected to start"),
        }
    }

    fn joined(registration: Registration<u32>) -> CompletionSignal<u32> {
        match registration {
            Registration::Joined(signal) => signal,
            Registration::Started { .. } => panic!("expected to join"),
        }
    }

    #[test]
    fn test_first_caller_starts_rest_join() {
        let registry = Arc::new(PendingRegistry::<u32>::new());
        let k = key("beach.jpg");

        let first = registry.join_or_start(&k);
        assert!(first.is_starter());
        assert!(!registry.join_or_start(&k).is_starter());
        assert!(!registry.join_or_start(&k).is_starter());

        let stats = registry.stats();
        assert_eq!(stats.total_requests, 3);
        assert_eq!(stats.started_generations, 1);
        assert_eq!(stats.coalesced_requests, 2);
        assert_eq!(stats.in_flight, 1);
        assert!((stats.coalescing_ratio() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_distinct_keys_are_independent() {
        let registry = Arc::new(PendingRegistry::<u32>::new());
        let jpg = registry.join_or_start(&key("photo.jpg"));
        let png = registry.join_or_start(&key("photo.png"));
        assert!(jpg.is_starter() && png.is_starter());
        assert_eq!(registry.in_flight_count(), 2);

        drop(jpg);
        assert_eq!(registry.in_flight_count(), 1);
        assert!(registry.is_pending(&key("photo.png")));
    }

    #[tokio::test]
    async fn test_complete_wakes_all_waiters() {
        let registry = Arc::new(PendingRegistry::<u32>::new());
        let k = key("clip.mov");

        let (ticket, own) = started(registry.join_or_start(&k));
        let a = joined(registry.join_or_start(&k));
        let b = joined(registry.join_or_start(&k));

        let woken = ticket.complete(7);
        assert_eq!(woken, 3);
        assert!(!registry.is_pending(&k));

        assert_eq!(own.wait().await, Some(7));
        assert_eq!(a.wait().await, Some(7));
        assert_eq!(b.wait().await, Some(7));
        assert_eq!(registry.stats().completed_generations, 1);
    }

    #[test]
    fn test_waiter_stays_pending_until_completion() {
        let registry = Arc::new(PendingRegistry::<u32>::new());
        let k = key("beach.jpg");
        let (ticket, _own) = started(registry.join_or_start(&k));
        let signal = joined(registry.join_or_start(&k));

        let mut wait = tokio_test::task::spawn(signal.wait());
        assert_pending!(wait.poll());

        ticket.complete(1);
        assert!(wait.is_woken());
        assert_eq!(assert_ready!(wait.poll()), Some(1));
    }

    #[test]
    fn test_new_generation_after_completion() {
        let registry = Arc::new(PendingRegistry::<u32>::new());
        let k = key("beach.jpg");

        let (ticket, _signal) = started(registry.join_or_start(&k));
        ticket.complete(0);

        assert!(registry.join_or_start(&k).is_starter());
        assert_eq!(registry.stats().started_generations, 2);
    }

    #[tokio::test]
    async fn test_dropped_ticket_wakes_waiters_without_outcome() {
        let registry = Arc::new(PendingRegistry::<u32>::new());
        let k = key("beach.jpg");

        let (ticket, own) = started(registry.join_or_start(&k));
        let other = joined(registry.join_or_start(&k));
        drop(ticket);

        assert!(!registry.is_pending(&k));
        assert_eq!(own.wait().await, None);
        assert_eq!(other.wait().await, None);
        assert_eq!(registry.stats().abandoned_generations, 1);
    }

    #[tokio::test]
    async fn test_complete_without_waiters() {
        let registry = Arc::new(PendingRegistry::<u32>::new());
        let k = key("beach.jpg");

        let (ticket, signal) = started(registry.join_or_start(&k));
        drop(signal);
        assert_eq!(ticket.complete(3), 0);
        assert_eq!(registry.in_flight_count(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_registration_has_single_starter() {
        let registry = Arc::new(PendingRegistry::<u32>::new());
        let barrier = Arc::new(tokio::sync::Barrier::new(32));
        let k = key("clip.mov");

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                let k = k.clone();
                tokio::spawn(async move {
                    let registration = registry.join_or_start(&k);
                    // Hold every registration until all callers have registered.
                    barrier.wait().await;
                    registration.is_starter()
                })
            })
            .collect();

        let mut starters = 0;
        for handle in handles {
            if handle.await.unwrap() {
                starters += 1;
            }
        }

        let stats = registry.stats();
        assert_eq!(starters, 1);
        assert_eq!(stats.started_generations, 1);
        assert_eq!(stats.coalesced_requests, 31);
        assert_eq!(stats.in_flight, 0);
    }
}
