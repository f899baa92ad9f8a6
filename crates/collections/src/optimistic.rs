//! Optimistic mutation queue.
//!
//! Improves perceived latency for high-frequency mutations: a predicted
//! local state is applied synchronously, the real mutation runs in the
//! background, and the next authoritative snapshot overwrites the replica
//! wholesale. A failed mutation is **not** rolled back - the UI may be
//! transiently inconsistent with the store until the next snapshot arrives.
//! That is a deliberate simplicity/responsiveness trade-off: every snapshot
//! is the single source of truth and the replica is safe to overwrite at
//! any time.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::error::CollectionsError;

/// Local replica of one partition with optimistic writes.
///
/// Wire [`reconcile`](Self::reconcile) as the subscription's `on_snapshot`
/// so every authoritative delivery replaces the replica.
pub struct OptimisticMutationQueue<T> {
    local: watch::Sender<Vec<T>>,
    in_flight: Arc<AtomicUsize>,
}

impl<T> Clone for OptimisticMutationQueue<T> {
    fn clone(&self) -> Self {
        Self {
            local: self.local.clone(),
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> OptimisticMutationQueue<T> {
    /// Create a queue with an empty replica.
    #[must_use]
    pub fn new() -> Self {
        let (local, _) = watch::channel(Vec::new());
        Self {
            local,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Snapshot of the current local (possibly predicted) state.
    #[must_use]
    pub fn local(&self) -> Vec<T> {
        self.local.borrow().clone()
    }

    /// Watch the local replica, e.g. for UI binding.
    #[must_use]
    pub fn watch_local(&self) -> watch::Receiver<Vec<T>> {
        self.local.subscribe()
    }

    /// Number of mutations still awaiting the store's answer.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Replace the replica with an authoritative snapshot.
    ///
    /// Idempotent no-op when predictions were correct; otherwise this is
    /// the point where a failed or raced mutation self-heals.
    pub fn reconcile(&self, snapshot: Vec<T>) {
        self.local.send_replace(snapshot);
    }

    /// Apply `predict` to the replica synchronously, then run the real
    /// `mutation` in the background.
    ///
    /// Failures are logged and swallowed: no rollback happens here, the
    /// next snapshot delivery overwrites the predicted state. The returned
    /// handle is for tests and shutdown draining; callers normally drop it.
    pub fn apply<P, Fut>(&self, predict: P, mutation: Fut) -> JoinHandle<()>
    where
        P: FnOnce(&mut Vec<T>),
        Fut: Future<Output = Result<(), CollectionsError>> + Send + 'static,
    {
        self.local.send_modify(predict);
        self.in_flight.fetch_add(1, Ordering::AcqRel);
        let in_flight = Arc::clone(&self.in_flight);
        tokio::spawn(async move {
            if let Err(error) = mutation.await {
                // No rollback by design; the next authoritative snapshot
                // overwrites the predicted state.
                warn!(%error, "optimistic mutation failed; awaiting snapshot reconcile");
            }
            in_flight.fetch_sub(1, Ordering::AcqRel);
        })
    }
}

impl<T: Clone + Send + Sync + 'static> Default for OptimisticMutationQueue<T> {
    fn default() -> Self {
        Self::new()
    }
}
