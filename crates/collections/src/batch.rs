//! Transactional batch writer.
//!
//! Accumulates field updates across multiple documents and commits them as
//! one all-or-nothing unit. The writer never retries; callers own retry
//! policy. Two batches issued concurrently by different processes may
//! interleave - there is no isolation across separate commits.

use tracing::{debug, info, instrument};

use copperleaf_core::ItemId;

use crate::store::{BatchOp, Document, DocumentStore, FieldUpdates, PartitionPath, StoreError};

/// Builder for one atomic batch against a single partition.
pub struct TransactionalBatchWriter<'a, S> {
    store: &'a S,
    path: PartitionPath,
    ops: Vec<BatchOp>,
}

impl<'a, S: DocumentStore> TransactionalBatchWriter<'a, S> {
    /// Start an empty batch for `path`.
    #[must_use]
    pub const fn new(store: &'a S, path: PartitionPath) -> Self {
        Self {
            store,
            path,
            ops: Vec::new(),
        }
    }

    /// Stage an insert of a new document.
    pub fn stage_insert(&mut self, id: ItemId, document: Document) {
        self.ops.push(BatchOp::Insert { id, document });
    }

    /// Stage field updates against an existing document.
    ///
    /// Empty update sets are dropped rather than staged.
    pub fn stage_update(&mut self, id: ItemId, updates: FieldUpdates) {
        if updates.is_empty() {
            return;
        }
        self.ops.push(BatchOp::Update { id, updates });
    }

    /// Stage removal of an existing document.
    pub fn stage_delete(&mut self, id: ItemId) {
        self.ops.push(BatchOp::Delete { id });
    }

    /// Number of staged operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Whether nothing has been staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Commit the staged operations as one atomic unit.
    ///
    /// An empty batch commits as a no-op without touching the store.
    ///
    /// # Errors
    ///
    /// Returns the store's error unchanged; on failure none of the staged
    /// operations were applied.
    #[instrument(skip(self), fields(path = %self.path, ops = self.ops.len()))]
    pub async fn commit(self) -> Result<(), StoreError> {
        if self.ops.is_empty() {
            debug!("empty batch, nothing to commit");
            return Ok(());
        }
        let count = self.ops.len();
        self.store.commit_batch(self.path, self.ops).await?;
        info!(ops = count, "batch committed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use copperleaf_core::{CollectionKind, OwnerId};
    use serde_json::json;

    fn doc(label: &str) -> Document {
        let mut document = Document::new();
        document.insert("label".into(), json!(label));
        document
    }

    #[tokio::test]
    async fn test_empty_batch_commits_without_signal() {
        let store = MemoryStore::new();
        let path = PartitionPath::new(OwnerId::generate(), CollectionKind::Addresses);
        let mut feed = store.watch(path).await.expect("watch");

        let writer = TransactionalBatchWriter::new(&store, path);
        assert!(writer.is_empty());
        writer.commit().await.expect("no-op commit");

        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(20), feed.next())
                .await
                .is_err(),
            "no-op commit must not signal observers"
        );
    }

    #[tokio::test]
    async fn test_empty_updates_are_dropped() {
        let store = MemoryStore::new();
        let path = PartitionPath::new(OwnerId::generate(), CollectionKind::Addresses);
        let id = ItemId::generate();
        store.insert(path, id, doc("a")).await.expect("insert");

        let mut writer = TransactionalBatchWriter::new(&store, path);
        writer.stage_update(id, FieldUpdates::new());
        assert!(writer.is_empty());
    }

    #[tokio::test]
    async fn test_mixed_batch_applies_together() {
        let store = MemoryStore::new();
        let path = PartitionPath::new(OwnerId::generate(), CollectionKind::Addresses);
        let existing = ItemId::generate();
        store.insert(path, existing, doc("a")).await.expect("insert");

        let mut writer = TransactionalBatchWriter::new(&store, path);
        let mut updates = FieldUpdates::new();
        updates.set("label", json!("renamed"));
        writer.stage_update(existing, updates);
        let new_id = ItemId::generate();
        writer.stage_insert(new_id, doc("b"));
        assert_eq!(writer.len(), 2);
        writer.commit().await.expect("commit");

        let all = store.fetch_all(path).await.expect("fetch");
        assert_eq!(all.len(), 2);
        assert_eq!(all[0]["label"], json!("renamed"));
    }
}
