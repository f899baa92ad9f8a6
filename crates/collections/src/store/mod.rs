//! Document-store seam.
//!
//! The consistency layer talks to its backing store exclusively through the
//! [`DocumentStore`] trait: a generic asynchronous document-store client
//! exposing insert, fetch, atomic batch commit, remove, and change watching.
//! Documents are plain JSON objects keyed by [`ItemId`] within a
//! [`PartitionPath`]; the typed layer above handles (de)serialization.
//!
//! [`MemoryStore`] is the in-process implementation used by tests and local
//! development. A production deployment implements this trait over the
//! managed remote store's SDK.

pub mod memory;

pub use memory::MemoryStore;

use std::collections::BTreeMap;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

use copperleaf_core::{CollectionKind, ItemId, OwnerId};

/// A stored document: a flat JSON object in the store's wire form.
pub type Document = serde_json::Map<String, Value>;

/// Scope of one owner's collection of a given kind.
///
/// The default-uniqueness invariant is enforced within a single partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartitionPath {
    /// Owning principal.
    pub owner: OwnerId,
    /// Collection kind under that owner.
    pub kind: CollectionKind,
}

impl PartitionPath {
    /// Build the path for one owner's collection.
    #[must_use]
    pub const fn new(owner: OwnerId, kind: CollectionKind) -> Self {
        Self { owner, kind }
    }
}

impl std::fmt::Display for PartitionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "owners/{}/{}", self.owner, self.kind.as_segment())
    }
}

/// An ordered set of field changes applied to one document.
///
/// Keys are wire-form (camelCase) field names. Insertion into the map is
/// last-write-wins per field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldUpdates(BTreeMap<String, Value>);

impl FieldUpdates {
    /// Create an empty update set.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Stage a field change.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> &mut Self {
        self.0.insert(field.into(), value);
        self
    }

    /// Whether no changes are staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of staged field changes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over staged `(field, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// One operation inside an atomic batch.
#[derive(Debug, Clone)]
pub enum BatchOp {
    /// Insert a new document under `id`.
    Insert {
        id: ItemId,
        document: Document,
    },
    /// Apply field updates to the existing document `id`.
    Update {
        id: ItemId,
        updates: FieldUpdates,
    },
    /// Remove the existing document `id`.
    Delete {
        id: ItemId,
    },
}

impl BatchOp {
    /// The document this operation targets.
    #[must_use]
    pub const fn target(&self) -> ItemId {
        match self {
            Self::Insert { id, .. } | Self::Update { id, .. } | Self::Delete { id } => *id,
        }
    }
}

/// Store-level failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A fetch, update, or delete targeted a document that does not exist.
    #[error("document {id} not found in {path}")]
    DocumentNotFound {
        /// Partition that was addressed.
        path: String,
        /// The missing document id.
        id: ItemId,
    },

    /// An insert collided with an existing document id.
    #[error("document {id} already exists in {path}")]
    DuplicateId {
        /// Partition that was addressed.
        path: String,
        /// The colliding document id.
        id: ItemId,
    },

    /// The caller's access to the partition was revoked.
    #[error("access to {path} was revoked")]
    AccessRevoked {
        /// Partition that was addressed.
        path: String,
    },

    /// The change feed shut down (store dropped or connection lost).
    #[error("change feed closed")]
    FeedClosed,

    /// A stored document could not be decoded into its typed form.
    #[error("malformed document in {path}: {reason}")]
    Corrupt {
        /// Partition that was addressed.
        path: String,
        /// Decode failure detail.
        reason: String,
    },
}

/// Signals emitted on a partition's change feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeSignal {
    /// The partition was mutated; consumers should re-read the full state.
    Mutated,
    /// The caller's access to the partition was revoked.
    Revoked,
}

/// A live feed of change signals for one partition.
///
/// Delivery is at-least-once: a lagged feed collapses the missed signals
/// into a single [`ChangeSignal::Mutated`], which is sufficient because
/// consumers always re-read the full partition state per signal.
pub struct ChangeFeed {
    rx: broadcast::Receiver<ChangeSignal>,
}

impl ChangeFeed {
    pub(crate) const fn new(rx: broadcast::Receiver<ChangeSignal>) -> Self {
        Self { rx }
    }

    /// Wait for the next change signal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::FeedClosed`] once the store side shuts down.
    pub async fn next(&mut self) -> Result<ChangeSignal, StoreError> {
        match self.rx.recv().await {
            Ok(signal) => Ok(signal),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "change feed lagged; collapsing into one re-read");
                Ok(ChangeSignal::Mutated)
            }
            Err(broadcast::error::RecvError::Closed) => Err(StoreError::FeedClosed),
        }
    }
}

/// Generic asynchronous document-store client.
///
/// `commit_batch` is atomic as a unit: either every operation in the batch
/// becomes visible together or none does, and no partial application is
/// observable by any subsequent read. The store never retries; callers own
/// retry policy. Separate batches are not isolated from one another.
pub trait DocumentStore: Send + Sync + 'static {
    /// Insert a new document.
    fn insert(
        &self,
        path: PartitionPath,
        id: ItemId,
        document: Document,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Fetch every document in the partition, in insertion order.
    fn fetch_all(
        &self,
        path: PartitionPath,
    ) -> impl Future<Output = Result<Vec<Document>, StoreError>> + Send;

    /// Fetch a single document, or `None` if absent.
    fn fetch_one(
        &self,
        path: PartitionPath,
        id: ItemId,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;

    /// Apply a set of operations as one all-or-nothing unit.
    fn commit_batch(
        &self,
        path: PartitionPath,
        ops: Vec<BatchOp>,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Remove a single document.
    fn remove(
        &self,
        path: PartitionPath,
        id: ItemId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Open a change feed for the partition.
    fn watch(
        &self,
        path: PartitionPath,
    ) -> impl Future<Output = Result<ChangeFeed, StoreError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_updates_last_write_wins() {
        let mut updates = FieldUpdates::new();
        updates.set("isDefault", json!(true));
        updates.set("isDefault", json!(false));
        assert_eq!(updates.len(), 1);
        let (field, value) = updates.iter().next().expect("one entry");
        assert_eq!(field, "isDefault");
        assert_eq!(value, &json!(false));
    }

    #[test]
    fn test_partition_path_display() {
        let owner = OwnerId::generate();
        let path = PartitionPath::new(owner, CollectionKind::PaymentInstruments);
        assert_eq!(path.to_string(), format!("owners/{owner}/paymentInstruments"));
    }
}
