//! In-memory document store.
//!
//! Backs tests and local development with the same contract a production
//! client implements against the managed remote store: insertion-ordered
//! partitions, atomic batch commits, and a broadcast change feed per
//! partition. [`MemoryStore::revoke_partition`] simulates permission loss
//! so listener-failure paths can be exercised.

use std::collections::HashMap;

use tokio::sync::{RwLock, broadcast};
use tracing::debug;

use copperleaf_core::ItemId;

use super::{
    BatchOp, ChangeFeed, ChangeSignal, Document, DocumentStore, PartitionPath, StoreError,
};
use crate::config::SyncConfig;

struct Partition {
    /// Documents in insertion order. "First found" semantics in the layer
    /// above depend on this order being stable.
    documents: Vec<(ItemId, Document)>,
    changes: broadcast::Sender<ChangeSignal>,
    revoked: bool,
}

impl Partition {
    fn new(feed_capacity: usize) -> Self {
        let (changes, _) = broadcast::channel(feed_capacity);
        Self {
            documents: Vec::new(),
            changes,
            revoked: false,
        }
    }

    fn position(&self, id: ItemId) -> Option<usize> {
        self.documents.iter().position(|(doc_id, _)| *doc_id == id)
    }

    fn notify(&self, signal: ChangeSignal) {
        // No receivers is fine; the snapshot is re-read on subscribe anyway.
        let _ = self.changes.send(signal);
    }
}

/// In-process [`DocumentStore`] implementation.
pub struct MemoryStore {
    partitions: RwLock<HashMap<PartitionPath, Partition>>,
    feed_capacity: usize,
}

impl MemoryStore {
    /// Create a store with the default feed capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(&SyncConfig::default())
    }

    /// Create a store tuned by [`SyncConfig`].
    #[must_use]
    pub fn with_config(config: &SyncConfig) -> Self {
        Self {
            partitions: RwLock::new(HashMap::new()),
            feed_capacity: config.feed_capacity,
        }
    }

    /// Revoke access to a partition.
    ///
    /// Every open change feed receives [`ChangeSignal::Revoked`] and all
    /// subsequent operations on the partition fail with
    /// [`StoreError::AccessRevoked`].
    pub async fn revoke_partition(&self, path: PartitionPath) {
        let mut partitions = self.partitions.write().await;
        let partition = partitions
            .entry(path)
            .or_insert_with(|| Partition::new(self.feed_capacity));
        partition.revoked = true;
        partition.notify(ChangeSignal::Revoked);
        debug!(%path, "partition access revoked");
    }

    fn check_access(path: PartitionPath, partition: &Partition) -> Result<(), StoreError> {
        if partition.revoked {
            return Err(StoreError::AccessRevoked {
                path: path.to_string(),
            });
        }
        Ok(())
    }

    fn apply_update(document: &mut Document, updates: &super::FieldUpdates) {
        for (field, value) in updates.iter() {
            document.insert(field.to_owned(), value.clone());
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentStore for MemoryStore {
    async fn insert(
        &self,
        path: PartitionPath,
        id: ItemId,
        document: Document,
    ) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write().await;
        let partition = partitions
            .entry(path)
            .or_insert_with(|| Partition::new(self.feed_capacity));
        Self::check_access(path, partition)?;
        if partition.position(id).is_some() {
            return Err(StoreError::DuplicateId {
                path: path.to_string(),
                id,
            });
        }
        partition.documents.push((id, document));
        partition.notify(ChangeSignal::Mutated);
        Ok(())
    }

    async fn fetch_all(&self, path: PartitionPath) -> Result<Vec<Document>, StoreError> {
        let partitions = self.partitions.read().await;
        let Some(partition) = partitions.get(&path) else {
            return Ok(Vec::new());
        };
        Self::check_access(path, partition)?;
        Ok(partition
            .documents
            .iter()
            .map(|(_, doc)| doc.clone())
            .collect())
    }

    async fn fetch_one(
        &self,
        path: PartitionPath,
        id: ItemId,
    ) -> Result<Option<Document>, StoreError> {
        let partitions = self.partitions.read().await;
        let Some(partition) = partitions.get(&path) else {
            return Ok(None);
        };
        Self::check_access(path, partition)?;
        Ok(partition
            .position(id)
            .and_then(|idx| partition.documents.get(idx))
            .map(|(_, doc)| doc.clone()))
    }

    async fn commit_batch(
        &self,
        path: PartitionPath,
        ops: Vec<BatchOp>,
    ) -> Result<(), StoreError> {
        if ops.is_empty() {
            return Ok(());
        }

        let mut partitions = self.partitions.write().await;
        let partition = partitions
            .entry(path)
            .or_insert_with(|| Partition::new(self.feed_capacity));
        Self::check_access(path, partition)?;

        // Validate the whole batch before touching anything so a failure
        // leaves no partial application behind.
        for op in &ops {
            match op {
                BatchOp::Insert { id, .. } => {
                    if partition.position(*id).is_some() {
                        return Err(StoreError::DuplicateId {
                            path: path.to_string(),
                            id: *id,
                        });
                    }
                }
                BatchOp::Update { id, .. } | BatchOp::Delete { id } => {
                    if partition.position(*id).is_none() {
                        return Err(StoreError::DocumentNotFound {
                            path: path.to_string(),
                            id: *id,
                        });
                    }
                }
            }
        }

        for op in ops {
            match op {
                BatchOp::Insert { id, document } => {
                    partition.documents.push((id, document));
                }
                BatchOp::Update { id, updates } => {
                    if let Some(idx) = partition.position(id)
                        && let Some((_, document)) = partition.documents.get_mut(idx)
                    {
                        Self::apply_update(document, &updates);
                    }
                }
                BatchOp::Delete { id } => {
                    if let Some(idx) = partition.position(id) {
                        partition.documents.remove(idx);
                    }
                }
            }
        }

        partition.notify(ChangeSignal::Mutated);
        Ok(())
    }

    async fn remove(&self, path: PartitionPath, id: ItemId) -> Result<(), StoreError> {
        let mut partitions = self.partitions.write().await;
        let Some(partition) = partitions.get_mut(&path) else {
            return Err(StoreError::DocumentNotFound {
                path: path.to_string(),
                id,
            });
        };
        Self::check_access(path, partition)?;
        let Some(idx) = partition.position(id) else {
            return Err(StoreError::DocumentNotFound {
                path: path.to_string(),
                id,
            });
        };
        partition.documents.remove(idx);
        partition.notify(ChangeSignal::Mutated);
        Ok(())
    }

    async fn watch(&self, path: PartitionPath) -> Result<ChangeFeed, StoreError> {
        let mut partitions = self.partitions.write().await;
        let partition = partitions
            .entry(path)
            .or_insert_with(|| Partition::new(self.feed_capacity));
        Self::check_access(path, partition)?;
        Ok(ChangeFeed::new(partition.changes.subscribe()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::FieldUpdates;
    use copperleaf_core::{CollectionKind, OwnerId};
    use serde_json::json;

    fn path() -> PartitionPath {
        PartitionPath::new(OwnerId::generate(), CollectionKind::Addresses)
    }

    fn doc(label: &str) -> Document {
        let mut document = Document::new();
        document.insert("label".into(), json!(label));
        document
    }

    #[tokio::test]
    async fn test_insert_and_fetch_preserve_order() {
        let store = MemoryStore::new();
        let path = path();
        let first = ItemId::generate();
        let second = ItemId::generate();

        store.insert(path, first, doc("a")).await.expect("insert");
        store.insert(path, second, doc("b")).await.expect("insert");

        let all = store.fetch_all(path).await.expect("fetch");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["label"], json!("a"));
        assert_eq!(all[1]["label"], json!("b"));
    }

    #[tokio::test]
    async fn test_duplicate_insert_rejected() {
        let store = MemoryStore::new();
        let path = path();
        let id = ItemId::generate();

        store.insert(path, id, doc("a")).await.expect("insert");
        let err = store.insert(path, id, doc("b")).await.expect_err("dup");
        assert!(matches!(err, StoreError::DuplicateId { .. }));
    }

    #[tokio::test]
    async fn test_failed_batch_applies_nothing() {
        let store = MemoryStore::new();
        let path = path();
        let existing = ItemId::generate();
        store.insert(path, existing, doc("a")).await.expect("insert");

        let mut updates = FieldUpdates::new();
        updates.set("label", json!("renamed"));
        let missing = ItemId::generate();
        let err = store
            .commit_batch(
                path,
                vec![
                    BatchOp::Update {
                        id: existing,
                        updates,
                    },
                    BatchOp::Delete { id: missing },
                ],
            )
            .await
            .expect_err("batch must fail");
        assert!(matches!(err, StoreError::DocumentNotFound { .. }));

        // The valid update in the failed batch must not be visible.
        let all = store.fetch_all(path).await.expect("fetch");
        assert_eq!(all[0]["label"], json!("a"));
    }

    #[tokio::test]
    async fn test_batch_emits_single_signal() {
        let store = MemoryStore::new();
        let path = path();
        let first = ItemId::generate();
        store.insert(path, first, doc("a")).await.expect("insert");

        let mut feed = store.watch(path).await.expect("watch");

        let mut promote = FieldUpdates::new();
        promote.set("isDefault", json!(true));
        let second = ItemId::generate();
        store
            .commit_batch(
                path,
                vec![
                    BatchOp::Update {
                        id: first,
                        updates: promote,
                    },
                    BatchOp::Insert {
                        id: second,
                        document: doc("b"),
                    },
                ],
            )
            .await
            .expect("commit");

        assert_eq!(feed.next().await.expect("signal"), ChangeSignal::Mutated);
        // Exactly one signal for the two-op batch.
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(20), feed.next())
                .await
                .is_err()
        );
    }

    #[tokio::test]
    async fn test_lagged_feed_collapses_into_one_reread() {
        let store = MemoryStore::with_config(&SyncConfig { feed_capacity: 1 });
        let path = path();
        let mut feed = store.watch(path).await.expect("watch");

        // Three mutations against a one-slot buffer without draining the
        // feed: the receiver is now lagged.
        for label in ["a", "b", "c"] {
            store
                .insert(path, ItemId::generate(), doc(label))
                .await
                .expect("insert");
        }

        // The missed signals collapse into Mutated rather than an error,
        // and a full re-read sees every mutation.
        assert_eq!(feed.next().await.expect("signal"), ChangeSignal::Mutated);
        let all = store.fetch_all(path).await.expect("fetch");
        assert_eq!(all.len(), 3);
    }

    #[tokio::test]
    async fn test_revocation_fails_operations_and_signals_feeds() {
        let store = MemoryStore::new();
        let path = path();
        let mut feed = store.watch(path).await.expect("watch");

        store.revoke_partition(path).await;

        assert_eq!(feed.next().await.expect("signal"), ChangeSignal::Revoked);
        let err = store
            .insert(path, ItemId::generate(), doc("a"))
            .await
            .expect_err("revoked");
        assert!(matches!(err, StoreError::AccessRevoked { .. }));
        assert!(matches!(
            store.fetch_all(path).await,
            Err(StoreError::AccessRevoked { .. })
        ));
    }
}
