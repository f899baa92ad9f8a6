//! Address book service.

use std::sync::Arc;

use tracing::error;

use copperleaf_core::{Address, AddressDraft, AddressPatch, ItemId};

use crate::auth::PrincipalResolver;
use crate::error::Result;
use crate::optimistic::OptimisticMutationQueue;
use crate::registry::DefaultItemRegistry;
use crate::store::{DocumentStore, StoreError};
use crate::subscription::{LiveSubscriptionChannel, SubscriptionHandle};

/// The surface behind the address-book screen and the checkout address
/// picker.
pub struct AddressBook<S, P> {
    registry: DefaultItemRegistry<Address, S, P>,
    channel: LiveSubscriptionChannel<S>,
    principal: Arc<P>,
}

impl<S, P> Clone for AddressBook<S, P> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            channel: self.channel.clone(),
            principal: Arc::clone(&self.principal),
        }
    }
}

impl<S: DocumentStore, P: PrincipalResolver> AddressBook<S, P> {
    /// Build the service over `store`, scoped by `principal`.
    #[must_use]
    pub fn new(store: Arc<S>, principal: Arc<P>) -> Self {
        Self {
            registry: DefaultItemRegistry::new(Arc::clone(&store), Arc::clone(&principal)),
            channel: LiveSubscriptionChannel::new(store),
            principal,
        }
    }

    /// Save a new address.
    ///
    /// # Errors
    ///
    /// See [`DefaultItemRegistry::add`].
    pub async fn add(&self, draft: AddressDraft, make_default: bool) -> Result<ItemId> {
        self.registry.add(draft, make_default).await
    }

    /// Edit an existing address.
    ///
    /// # Errors
    ///
    /// See [`DefaultItemRegistry::update`].
    pub async fn update(&self, id: ItemId, patch: AddressPatch) -> Result<()> {
        self.registry.update(id, patch).await
    }

    /// Make `id` the default shipping address.
    ///
    /// # Errors
    ///
    /// See [`DefaultItemRegistry::set_default`].
    pub async fn set_default(&self, id: ItemId) -> Result<()> {
        self.registry.set_default(id).await
    }

    /// Remove an address. Deleting the default is allowed and leaves the
    /// collection without one.
    ///
    /// # Errors
    ///
    /// See [`DefaultItemRegistry::delete`].
    pub async fn delete(&self, id: ItemId) -> Result<()> {
        self.registry.delete(id).await
    }

    /// Fetch one address.
    ///
    /// # Errors
    ///
    /// See [`DefaultItemRegistry::get`].
    pub async fn get(&self, id: ItemId) -> Result<Address> {
        self.registry.get(id).await
    }

    /// Fetch all addresses, newest first.
    ///
    /// # Errors
    ///
    /// See [`DefaultItemRegistry::list`].
    pub async fn list(&self) -> Result<Vec<Address>> {
        self.registry.list().await
    }

    /// Subscribe to the current owner's addresses.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a principal; `Store` if the watch cannot
    /// be opened.
    pub async fn subscribe_addresses<F, E>(
        &self,
        on_snapshot: F,
        on_error: E,
    ) -> Result<SubscriptionHandle>
    where
        F: FnMut(Vec<Address>) + Send + 'static,
        E: FnMut(StoreError) + Send + 'static,
    {
        let owner = self.principal.require_owner_id()?;
        self.channel
            .subscribe::<Address, _, _>(owner, on_snapshot, on_error)
            .await
    }

    /// Wire a subscription into `queue` so every authoritative snapshot
    /// reconciles the optimistic replica.
    ///
    /// # Errors
    ///
    /// Same as [`Self::subscribe_addresses`].
    pub async fn bind_optimistic(
        &self,
        queue: &OptimisticMutationQueue<Address>,
    ) -> Result<SubscriptionHandle> {
        let replica = queue.clone();
        self.subscribe_addresses(
            move |snapshot| replica.reconcile(snapshot),
            |err| error!(error = %err, "address subscription failed"),
        )
        .await
    }
}
