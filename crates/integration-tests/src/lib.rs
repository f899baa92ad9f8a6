//! Integration tests for Copperleaf.
//!
//! # Test Categories
//!
//! - `default_invariant` - Default-uniqueness across add/update/set-default
//! - `delete_guards` - Kind-specific deletion policies
//! - `subscriptions` - Full-snapshot delivery, ordering, teardown, errors
//! - `optimistic` - Predicted state and snapshot reconciliation
//! - `auth_and_errors` - Principal resolution and the failure taxonomy
//!
//! The tests run entirely against the in-memory store; no external services
//! are required.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use copperleaf_collections::{AddressBook, MemoryStore, PaymentWallet, SessionPrincipal};
use copperleaf_core::{
    AddressDraft, InstrumentType, OwnerId, PaymentInstrumentDraft,
};

/// Shared fixture: one store, one session, both facades.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub principal: Arc<SessionPrincipal>,
    pub owner: OwnerId,
    pub addresses: AddressBook<MemoryStore, SessionPrincipal>,
    pub wallet: PaymentWallet<MemoryStore, SessionPrincipal>,
}

impl TestContext {
    /// Create a context with a signed-in owner.
    #[must_use]
    pub fn signed_in() -> Self {
        let store = Arc::new(MemoryStore::new());
        let principal = Arc::new(SessionPrincipal::new());
        let owner = OwnerId::generate();
        principal.sign_in(owner);
        Self::build(store, principal, owner)
    }

    /// Create a context with no signed-in owner.
    #[must_use]
    pub fn signed_out() -> Self {
        let store = Arc::new(MemoryStore::new());
        let principal = Arc::new(SessionPrincipal::new());
        let owner = OwnerId::generate();
        Self::build(store, principal, owner)
    }

    fn build(
        store: Arc<MemoryStore>,
        principal: Arc<SessionPrincipal>,
        owner: OwnerId,
    ) -> Self {
        let addresses = AddressBook::new(Arc::clone(&store), Arc::clone(&principal));
        let wallet = PaymentWallet::new(Arc::clone(&store), Arc::clone(&principal));
        Self {
            store,
            principal,
            owner,
            addresses,
            wallet,
        }
    }
}

/// Address draft with sensible defaults.
#[must_use]
pub fn address_draft(label: &str) -> AddressDraft {
    AddressDraft {
        label: label.to_owned(),
        street: "12 Fern Way".to_owned(),
        city: "Wellington".to_owned(),
        region: "Wellington".to_owned(),
        postal_code: "6011".to_owned(),
        country: "NZ".to_owned(),
        geo: None,
    }
}

/// Card draft with sensible defaults.
#[must_use]
pub fn card_draft(last4: &str) -> PaymentInstrumentDraft {
    PaymentInstrumentDraft {
        instrument_type: InstrumentType::Visa,
        last4: last4.to_owned(),
        expiry_month: 12,
        expiry_year: 2030,
        holder_name: "Ada Lovelace".to_owned(),
    }
}

/// Receive the next value from a callback channel, failing the test after
/// a timeout rather than hanging.
pub async fn recv_within<T>(rx: &mut mpsc::UnboundedReceiver<T>, what: &str) -> T {
    tokio::time::timeout(Duration::from_millis(500), rx.recv())
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
        .unwrap_or_else(|| panic!("channel closed waiting for {what}"))
}

/// Assert that no value arrives on the channel within a short window.
pub async fn assert_silent<T>(rx: &mut mpsc::UnboundedReceiver<T>, what: &str) {
    assert!(
        tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .is_err(),
        "unexpected {what}"
    );
}
