//! Live subscription channel.
//!
//! Each subscription runs its own task: it delivers the full ordered
//! collection on subscribe and again after every mutation visible to the
//! partition, never a diff. Delivery is at-least-once; a lagged feed
//! collapses into a single fresh re-read, so every callback is a complete,
//! authoritative replacement of the observer's local state.
//!
//! `on_error` fires once on listener failure (revocation, feed closure,
//! store or decode error) and the stream terminates; the channel never
//! retries on its own. Re-subscription is the caller's responsibility, and
//! the observer's last-known snapshot stays in place.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::AbortHandle;
use tracing::{debug, error};

use copperleaf_core::OwnerId;

use crate::error::Result;
use crate::item::RegistryItem;
use crate::store::{ChangeSignal, DocumentStore, PartitionPath, StoreError};

/// Push-based snapshot delivery for one partition.
pub struct LiveSubscriptionChannel<S> {
    store: Arc<S>,
}

impl<S> Clone for LiveSubscriptionChannel<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: DocumentStore> LiveSubscriptionChannel<S> {
    /// Create a channel over `store`.
    #[must_use]
    pub const fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Open a subscription for `owner`'s collection of kind `T::KIND`.
    ///
    /// `on_snapshot` receives the full ordered collection on subscribe and
    /// after every mutation. `on_error` receives at most one terminal
    /// failure. The watch is opened before the initial read so no mutation
    /// can fall between them.
    ///
    /// # Errors
    ///
    /// Returns a `Store` error if the watch cannot be opened (e.g. access
    /// already revoked).
    pub async fn subscribe<T, F, E>(
        &self,
        owner: OwnerId,
        mut on_snapshot: F,
        mut on_error: E,
    ) -> Result<SubscriptionHandle>
    where
        T: RegistryItem,
        F: FnMut(Vec<T>) + Send + 'static,
        E: FnMut(StoreError) + Send + 'static,
    {
        let path = PartitionPath::new(owner, T::KIND);
        let mut feed = self.store.watch(path).await?;
        let store = Arc::clone(&self.store);
        let active = Arc::new(AtomicBool::new(true));
        let task_active = Arc::clone(&active);

        let task = tokio::spawn(async move {
            // Initial snapshot.
            match read_snapshot::<T, S>(&store, path).await {
                Ok(items) => {
                    if !task_active.load(Ordering::Acquire) {
                        return;
                    }
                    debug!(%path, count = items.len(), "initial snapshot delivered");
                    on_snapshot(items);
                }
                Err(err) => {
                    error!(%path, error = %err, "subscription failed on initial read");
                    on_error(err);
                    return;
                }
            }

            loop {
                let signal = match feed.next().await {
                    Ok(signal) => signal,
                    Err(err) => {
                        if task_active.load(Ordering::Acquire) {
                            error!(%path, error = %err, "change feed failed");
                            on_error(err);
                        }
                        return;
                    }
                };
                if !task_active.load(Ordering::Acquire) {
                    return;
                }
                match signal {
                    ChangeSignal::Mutated => match read_snapshot::<T, S>(&store, path).await {
                        Ok(items) => {
                            if !task_active.load(Ordering::Acquire) {
                                return;
                            }
                            debug!(%path, count = items.len(), "snapshot delivered");
                            on_snapshot(items);
                        }
                        Err(err) => {
                            error!(%path, error = %err, "subscription failed on re-read");
                            on_error(err);
                            return;
                        }
                    },
                    ChangeSignal::Revoked => {
                        error!(%path, "subscription revoked");
                        on_error(StoreError::AccessRevoked {
                            path: path.to_string(),
                        });
                        return;
                    }
                }
            }
        });

        Ok(SubscriptionHandle {
            active,
            task: task.abort_handle(),
        })
    }
}

async fn read_snapshot<T: RegistryItem, S: DocumentStore>(
    store: &S,
    path: PartitionPath,
) -> std::result::Result<Vec<T>, StoreError> {
    let documents = store.fetch_all(path).await?;
    let mut items = Vec::with_capacity(documents.len());
    for document in &documents {
        items.push(T::from_document(document)?);
    }
    items.sort_by(T::snapshot_cmp);
    Ok(items)
}

/// Handle for tearing down one subscription.
///
/// Dropping the handle does not unsubscribe; subscriptions live until
/// explicitly torn down. The handle is cheap to clone and safe to keep
/// after the owning UI context is gone.
#[derive(Clone)]
pub struct SubscriptionHandle {
    active: Arc<AtomicBool>,
    task: AbortHandle,
}

impl SubscriptionHandle {
    /// Stop further callbacks immediately. Idempotent.
    pub fn unsubscribe(&self) {
        if self.active.swap(false, Ordering::AcqRel) {
            self.task.abort();
            debug!("subscription cancelled");
        }
    }

    /// Whether the subscription has not been cancelled.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }
}
