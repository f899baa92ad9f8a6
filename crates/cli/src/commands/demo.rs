//! Consistency-layer demos against an in-memory store.
//!
//! Each demo signs in a fresh owner, opens a live subscription that logs
//! every snapshot, and walks the registry operations so the default-flag
//! transitions are visible in the log output.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use copperleaf_collections::{
    AddressBook, CollectionsError, MemoryStore, PaymentWallet, SessionPrincipal, SyncConfig,
};
use copperleaf_collections::config::ConfigError;
use copperleaf_core::{
    AddressDraft, AddressPatch, InstrumentType, OwnerId, PaymentInstrumentDraft,
};

// Snapshot delivery is asynchronous; give the subscription task a moment
// to drain between operations so the log reads in order.
const SETTLE: Duration = Duration::from_millis(50);

/// Demo-level failures: configuration or layer errors.
#[derive(Debug, thiserror::Error)]
pub enum DemoError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Collections(#[from] CollectionsError),
}

fn setup() -> Result<(Arc<MemoryStore>, Arc<SessionPrincipal>), DemoError> {
    let config = SyncConfig::from_env()?;
    let store = Arc::new(MemoryStore::with_config(&config));
    let principal = Arc::new(SessionPrincipal::new());
    let owner = OwnerId::generate();
    principal.sign_in(owner);
    info!(%owner, "signed in demo owner");
    Ok((store, principal))
}

fn address_draft(label: &str, street: &str) -> AddressDraft {
    AddressDraft {
        label: label.to_owned(),
        street: street.to_owned(),
        city: "Wellington".to_owned(),
        region: "Wellington".to_owned(),
        postal_code: "6011".to_owned(),
        country: "NZ".to_owned(),
        geo: None,
    }
}

fn card_draft(instrument_type: InstrumentType, last4: &str) -> PaymentInstrumentDraft {
    PaymentInstrumentDraft {
        instrument_type,
        last4: last4.to_owned(),
        expiry_month: 12,
        expiry_year: 2030,
        holder_name: "Demo Holder".to_owned(),
    }
}

/// Walk the address-book flows.
pub async fn run_addresses() -> Result<(), DemoError> {
    let (store, principal) = setup()?;
    let book = AddressBook::new(store, principal);

    let handle = book
        .subscribe_addresses(
            |snapshot| {
                let defaults: Vec<_> = snapshot
                    .iter()
                    .filter(|a| a.is_default)
                    .map(|a| a.label.clone())
                    .collect();
                info!(count = snapshot.len(), ?defaults, "address snapshot");
            },
            |err| warn!(error = %err, "address subscription error"),
        )
        .await?;

    let home = book.add(address_draft("Home", "12 Fern Way"), true).await?;
    tokio::time::sleep(SETTLE).await;

    // Adding a second default demotes Home in the same batch.
    let work = book.add(address_draft("Work", "4 Quay St"), true).await?;
    tokio::time::sleep(SETTLE).await;

    book.update(
        home,
        AddressPatch {
            city: Some("Auckland".to_owned()),
            ..AddressPatch::default()
        },
    )
    .await?;
    book.set_default(home).await?;
    tokio::time::sleep(SETTLE).await;

    // Unrestricted guard: deleting the default leaves no default behind.
    book.delete(home).await?;
    tokio::time::sleep(SETTLE).await;
    let remaining = book.list().await?;
    info!(
        count = remaining.len(),
        any_default = remaining.iter().any(|a| a.is_default),
        "after deleting the default address"
    );

    book.delete(work).await?;
    tokio::time::sleep(SETTLE).await;

    handle.unsubscribe();
    info!("address demo complete");
    Ok(())
}

/// Walk the payment-wallet flows, including the deletion guard.
pub async fn run_wallet() -> Result<(), DemoError> {
    let (store, principal) = setup()?;
    let wallet = PaymentWallet::new(store, principal);

    let handle = wallet
        .subscribe_instruments(
            |snapshot| {
                let ordered: Vec<_> = snapshot
                    .iter()
                    .map(|c| format!("{}*{}{}", c.instrument_type, c.last4, if c.is_default { " (default)" } else { "" }))
                    .collect();
                info!(count = snapshot.len(), ?ordered, "wallet snapshot");
            },
            |err| warn!(error = %err, "wallet subscription error"),
        )
        .await?;

    let visa = wallet.add(card_draft(InstrumentType::Visa, "4242"), true).await?;
    wallet.add(card_draft(InstrumentType::Amex, "0005"), false).await?;
    tokio::time::sleep(SETTLE).await;

    // Guarded delete: the Amex is promoted in the same batch.
    wallet.delete(visa).await?;
    tokio::time::sleep(SETTLE).await;

    // The Amex is now the only (default) instrument; deleting it is
    // rejected and the collection stays intact.
    let remaining = wallet.list().await?;
    if let Some(last) = remaining.first() {
        match wallet.delete(last.id).await {
            Err(CollectionsError::InvariantViolation(reason)) => {
                info!(%reason, "guard rejected deleting the only instrument");
            }
            Err(err) => return Err(err.into()),
            Ok(()) => warn!("expected the deletion guard to reject this"),
        }
    }
    tokio::time::sleep(SETTLE).await;

    handle.unsubscribe();
    info!("wallet demo complete");
    Ok(())
}
