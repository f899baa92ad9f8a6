//! Default-item registry: the invariant engine.
//!
//! One registry instance manages one collection kind for whichever owner
//! the principal resolver currently reports. Every mutation that touches
//! the default flag is issued as a single atomic batch, so a reader never
//! observes two defaults within one transaction.
//!
//! The read-then-batch flows here are not atomic end-to-end: a concurrent
//! writer on another device between the read and the commit can leave zero
//! or two defaults until the next write resolves it. That window is
//! accepted; observers reconcile through full-snapshot delivery.

use std::marker::PhantomData;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use tracing::{info, instrument};

use copperleaf_core::ItemId;

use crate::auth::PrincipalResolver;
use crate::batch::TransactionalBatchWriter;
use crate::error::{CollectionsError, Result};
use crate::item::{DeletionGuardPolicy, RegistryItem, fields};
use crate::store::{DocumentStore, FieldUpdates, PartitionPath};

/// Invariant engine for one collection kind.
///
/// Generic over the item type `T`, the backing store `S`, and the principal
/// resolver `P`. The registry is the only writer for its partitions;
/// observers consume snapshots through the subscription channel and never
/// mutate items directly.
pub struct DefaultItemRegistry<T, S, P> {
    store: Arc<S>,
    principal: Arc<P>,
    _item: PhantomData<fn() -> T>,
}

impl<T, S, P> Clone for DefaultItemRegistry<T, S, P> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            principal: Arc::clone(&self.principal),
            _item: PhantomData,
        }
    }
}

impl<T, S, P> DefaultItemRegistry<T, S, P>
where
    T: RegistryItem,
    S: DocumentStore,
    P: PrincipalResolver,
{
    /// Create a registry over `store`, scoped by `principal`.
    #[must_use]
    pub const fn new(store: Arc<S>, principal: Arc<P>) -> Self {
        Self {
            store,
            principal,
            _item: PhantomData,
        }
    }

    /// Create a new item, optionally promoting it to the partition default.
    ///
    /// With `make_default`, every currently-default item is demoted in the
    /// same batch that inserts the new one.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a principal, `Validation` on a malformed
    /// draft, `Store` on commit failure.
    #[instrument(skip(self, draft), fields(kind = %T::KIND, make_default))]
    pub async fn add(&self, draft: T::Draft, make_default: bool) -> Result<ItemId> {
        let path = self.partition()?;
        T::validate_draft(&draft)?;

        let id = ItemId::generate();
        let now = Utc::now();
        let item = T::from_draft(draft, id, path.owner, make_default, now);
        let document = item.to_document()?;

        if make_default {
            let mut batch = TransactionalBatchWriter::new(self.store.as_ref(), path);
            for current in self.load_unordered(path).await? {
                if current.is_default() {
                    batch.stage_update(current.id(), demote(now));
                }
            }
            batch.stage_insert(id, document);
            batch.commit().await?;
        } else {
            self.store.insert(path, id, document).await?;
        }

        info!(%id, "item added");
        Ok(id)
    }

    /// Apply a partial update and bump `updatedAt`.
    ///
    /// A patch carrying `isDefault = true` demotes every other default in
    /// the same batch. A patch carrying `isDefault = false` only clears
    /// this item's flag; it never promotes a replacement.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` is absent, plus the failures of [`Self::add`].
    #[instrument(skip(self, patch), fields(kind = %T::KIND, %id))]
    pub async fn update(&self, id: ItemId, patch: T::Patch) -> Result<()> {
        let path = self.partition()?;
        T::validate_patch(&patch)?;
        self.require_existing(path, id).await?;

        let now = Utc::now();
        let mut updates = T::patch_updates(&patch);
        updates.set(fields::UPDATED_AT, json!(now));

        let mut batch = TransactionalBatchWriter::new(self.store.as_ref(), path);
        if T::patch_sets_default(&patch) {
            for current in self.load_unordered(path).await? {
                if current.is_default() && current.id() != id {
                    batch.stage_update(current.id(), demote(now));
                }
            }
        }
        batch.stage_update(id, updates);
        batch.commit().await?;

        info!("item updated");
        Ok(())
    }

    /// Promote `id` to the partition default, demoting the previous one.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` is absent; `NotAuthenticated` or `Store` as
    /// elsewhere.
    #[instrument(skip(self), fields(kind = %T::KIND, %id))]
    pub async fn set_default(&self, id: ItemId) -> Result<()> {
        let path = self.partition()?;
        self.require_existing(path, id).await?;

        let now = Utc::now();
        let mut batch = TransactionalBatchWriter::new(self.store.as_ref(), path);
        for current in self.load_unordered(path).await? {
            if current.is_default() && current.id() != id {
                batch.stage_update(current.id(), demote(now));
            }
        }
        batch.stage_update(id, promote(now));
        batch.commit().await?;

        info!("item set as default");
        Ok(())
    }

    /// Delete `id`, applying the kind's deletion guard.
    ///
    /// Under [`DeletionGuardPolicy::RequireReplacementOrReject`], deleting
    /// the current default promotes the first other item in the same batch,
    /// and deleting the only item fails with `InvariantViolation` leaving
    /// the collection untouched.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` is absent, `InvariantViolation` per the guard,
    /// `NotAuthenticated` or `Store` as elsewhere.
    #[instrument(skip(self), fields(kind = %T::KIND, %id))]
    pub async fn delete(&self, id: ItemId) -> Result<()> {
        let path = self.partition()?;
        let target = self.require_existing(path, id).await?;

        match T::DELETE_GUARD {
            DeletionGuardPolicy::Unrestricted => {
                self.store.remove(path, id).await?;
            }
            DeletionGuardPolicy::RequireReplacementOrReject => {
                if target.is_default() {
                    let replacement = self
                        .load_unordered(path)
                        .await?
                        .into_iter()
                        .find(|item| item.id() != id);
                    let Some(replacement) = replacement else {
                        return Err(CollectionsError::InvariantViolation(
                            "cannot remove the only default instrument".to_owned(),
                        ));
                    };
                    let now = Utc::now();
                    let mut batch = TransactionalBatchWriter::new(self.store.as_ref(), path);
                    batch.stage_update(replacement.id(), promote(now));
                    batch.stage_delete(id);
                    batch.commit().await?;
                    info!(replacement = %replacement.id(), "default reassigned on delete");
                } else {
                    self.store.remove(path, id).await?;
                }
            }
        }

        info!("item deleted");
        Ok(())
    }

    /// Fetch a single item.
    ///
    /// # Errors
    ///
    /// `NotFound` if `id` is absent.
    pub async fn get(&self, id: ItemId) -> Result<T> {
        let path = self.partition()?;
        self.require_existing(path, id).await
    }

    /// Fetch the full collection in snapshot order.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` or `Store` failures.
    pub async fn list(&self) -> Result<Vec<T>> {
        let path = self.partition()?;
        let mut items = self.load_unordered(path).await?;
        items.sort_by(T::snapshot_cmp);
        Ok(items)
    }

    fn partition(&self) -> Result<PartitionPath> {
        let owner = self.principal.require_owner_id()?;
        Ok(PartitionPath::new(owner, T::KIND))
    }

    /// Load the partition in store (insertion) order. The deletion guard's
    /// "first found" replacement choice depends on this order.
    async fn load_unordered(&self, path: PartitionPath) -> Result<Vec<T>> {
        let documents = self.store.fetch_all(path).await?;
        let mut items = Vec::with_capacity(documents.len());
        for document in &documents {
            items.push(T::from_document(document)?);
        }
        Ok(items)
    }

    async fn require_existing(&self, path: PartitionPath, id: ItemId) -> Result<T> {
        match self.store.fetch_one(path, id).await? {
            Some(document) => Ok(T::from_document(&document)?),
            None => Err(CollectionsError::NotFound { kind: T::KIND, id }),
        }
    }
}

fn demote(now: DateTime<Utc>) -> FieldUpdates {
    let mut updates = FieldUpdates::new();
    updates.set(fields::IS_DEFAULT, json!(false));
    updates.set(fields::UPDATED_AT, json!(now));
    updates
}

fn promote(now: DateTime<Utc>) -> FieldUpdates {
    let mut updates = FieldUpdates::new();
    updates.set(fields::IS_DEFAULT, json!(true));
    updates.set(fields::UPDATED_AT, json!(now));
    updates
}
