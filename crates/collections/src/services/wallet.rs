//! Payment wallet service.

use std::sync::Arc;

use tracing::error;

use copperleaf_core::{ItemId, PaymentInstrument, PaymentInstrumentDraft, PaymentInstrumentPatch};

use crate::auth::PrincipalResolver;
use crate::error::Result;
use crate::optimistic::OptimisticMutationQueue;
use crate::registry::DefaultItemRegistry;
use crate::store::{DocumentStore, StoreError};
use crate::subscription::{LiveSubscriptionChannel, SubscriptionHandle};

/// The surface behind the card-management screen and the checkout payment
/// picker.
pub struct PaymentWallet<S, P> {
    registry: DefaultItemRegistry<PaymentInstrument, S, P>,
    channel: LiveSubscriptionChannel<S>,
    principal: Arc<P>,
}

impl<S, P> Clone for PaymentWallet<S, P> {
    fn clone(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            channel: self.channel.clone(),
            principal: Arc::clone(&self.principal),
        }
    }
}

impl<S: DocumentStore, P: PrincipalResolver> PaymentWallet<S, P> {
    /// Build the service over `store`, scoped by `principal`.
    #[must_use]
    pub fn new(store: Arc<S>, principal: Arc<P>) -> Self {
        Self {
            registry: DefaultItemRegistry::new(Arc::clone(&store), Arc::clone(&principal)),
            channel: LiveSubscriptionChannel::new(store),
            principal,
        }
    }

    /// Store a new instrument.
    ///
    /// # Errors
    ///
    /// See [`DefaultItemRegistry::add`].
    pub async fn add(&self, draft: PaymentInstrumentDraft, make_default: bool) -> Result<ItemId> {
        self.registry.add(draft, make_default).await
    }

    /// Edit an existing instrument (expiry, holder name, default flag).
    ///
    /// # Errors
    ///
    /// See [`DefaultItemRegistry::update`].
    pub async fn update(&self, id: ItemId, patch: PaymentInstrumentPatch) -> Result<()> {
        self.registry.update(id, patch).await
    }

    /// Make `id` the default instrument.
    ///
    /// # Errors
    ///
    /// See [`DefaultItemRegistry::set_default`].
    pub async fn set_default(&self, id: ItemId) -> Result<()> {
        self.registry.set_default(id).await
    }

    /// Remove an instrument. Removing the current default promotes another
    /// instrument in the same batch, and removing the only instrument while
    /// it is the default is rejected - checkout must never be left without
    /// a default.
    ///
    /// # Errors
    ///
    /// `InvariantViolation` per the guard; see [`DefaultItemRegistry::delete`].
    pub async fn delete(&self, id: ItemId) -> Result<()> {
        self.registry.delete(id).await
    }

    /// Fetch one instrument.
    ///
    /// # Errors
    ///
    /// See [`DefaultItemRegistry::get`].
    pub async fn get(&self, id: ItemId) -> Result<PaymentInstrument> {
        self.registry.get(id).await
    }

    /// Fetch all instruments, default first, then newest first.
    ///
    /// # Errors
    ///
    /// See [`DefaultItemRegistry::list`].
    pub async fn list(&self) -> Result<Vec<PaymentInstrument>> {
        self.registry.list().await
    }

    /// Subscribe to the current owner's instruments.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a principal; `Store` if the watch cannot
    /// be opened.
    pub async fn subscribe_instruments<F, E>(
        &self,
        on_snapshot: F,
        on_error: E,
    ) -> Result<SubscriptionHandle>
    where
        F: FnMut(Vec<PaymentInstrument>) + Send + 'static,
        E: FnMut(StoreError) + Send + 'static,
    {
        let owner = self.principal.require_owner_id()?;
        self.channel
            .subscribe::<PaymentInstrument, _, _>(owner, on_snapshot, on_error)
            .await
    }

    /// Wire a subscription into `queue` so every authoritative snapshot
    /// reconciles the optimistic replica.
    ///
    /// # Errors
    ///
    /// Same as [`Self::subscribe_instruments`].
    pub async fn bind_optimistic(
        &self,
        queue: &OptimisticMutationQueue<PaymentInstrument>,
    ) -> Result<SubscriptionHandle> {
        let replica = queue.clone();
        self.subscribe_instruments(
            move |snapshot| replica.reconcile(snapshot),
            |err| error!(error = %err, "instrument subscription failed"),
        )
        .await
    }
}
