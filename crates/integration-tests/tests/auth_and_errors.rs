//! Principal resolution and the failure taxonomy.

use copperleaf_collections::CollectionsError;
use copperleaf_core::ItemId;
use copperleaf_integration_tests::{TestContext, address_draft, card_draft};

#[tokio::test]
async fn test_operations_without_principal_fail_fast() {
    let ctx = TestContext::signed_out();

    assert!(matches!(
        ctx.addresses.add(address_draft("Home"), true).await,
        Err(CollectionsError::NotAuthenticated)
    ));
    assert!(matches!(
        ctx.wallet.list().await,
        Err(CollectionsError::NotAuthenticated)
    ));
    assert!(matches!(
        ctx.addresses.subscribe_addresses(|_| {}, |_| {}).await,
        Err(CollectionsError::NotAuthenticated)
    ));
}

#[tokio::test]
async fn test_sign_out_revokes_future_operations() {
    let ctx = TestContext::signed_in();
    ctx.addresses.add(address_draft("Home"), true).await.expect("add");

    ctx.principal.sign_out();
    assert!(matches!(
        ctx.addresses.list().await,
        Err(CollectionsError::NotAuthenticated)
    ));

    // Signing back in restores access to the same partition.
    ctx.principal.sign_in(ctx.owner);
    assert_eq!(ctx.addresses.list().await.expect("list").len(), 1);
}

#[tokio::test]
async fn test_missing_ids_raise_not_found() {
    let ctx = TestContext::signed_in();
    let missing = ItemId::generate();

    assert!(matches!(
        ctx.addresses.get(missing).await,
        Err(CollectionsError::NotFound { .. })
    ));
    assert!(matches!(
        ctx.wallet.set_default(missing).await,
        Err(CollectionsError::NotFound { .. })
    ));
    assert!(matches!(
        ctx.wallet.delete(missing).await,
        Err(CollectionsError::NotFound { .. })
    ));
}

#[tokio::test]
async fn test_invalid_drafts_raise_validation() {
    let ctx = TestContext::signed_in();

    let mut bad_address = address_draft("Home");
    bad_address.street = String::new();
    assert!(matches!(
        ctx.addresses.add(bad_address, false).await,
        Err(CollectionsError::Validation(_))
    ));

    let mut bad_card = card_draft("4242");
    bad_card.expiry_month = 13;
    assert!(matches!(
        ctx.wallet.add(bad_card, false).await,
        Err(CollectionsError::Validation(_))
    ));

    // Nothing was stored.
    assert!(ctx.addresses.list().await.expect("list").is_empty());
    assert!(ctx.wallet.list().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_owners_do_not_see_each_others_partitions() {
    let ctx = TestContext::signed_in();
    ctx.addresses.add(address_draft("Home"), true).await.expect("add");

    // A different owner signing in on the same session sees an empty book.
    let other = copperleaf_core::OwnerId::generate();
    ctx.principal.sign_in(other);
    assert!(ctx.addresses.list().await.expect("list").is_empty());

    ctx.principal.sign_in(ctx.owner);
    assert_eq!(ctx.addresses.list().await.expect("list").len(), 1);
}
