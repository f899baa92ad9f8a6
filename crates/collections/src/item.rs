//! Typed items managed by the registry.
//!
//! [`RegistryItem`] is the seam between the generic invariant engine and a
//! concrete collection: it names the partition kind, carries the deletion
//! guard policy, lowers drafts and patches to store documents, and defines
//! snapshot ordering. Implemented here for [`Address`] and
//! [`PaymentInstrument`].

use std::cmp::Ordering;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use copperleaf_core::{
    Address, AddressDraft, AddressPatch, CollectionKind, ItemId, OwnerId, PaymentInstrument,
    PaymentInstrumentDraft, PaymentInstrumentPatch, ValidationError,
};

use crate::store::{Document, FieldUpdates, StoreError};

/// Wire-form field names shared by every collection kind.
pub mod fields {
    pub const IS_DEFAULT: &str = "isDefault";
    pub const UPDATED_AT: &str = "updatedAt";
}

/// How `delete` treats the partition's current default item.
///
/// The two collection kinds intentionally differ here: addresses tolerate a
/// temporary "no default" state, payment instruments do not. Downstream
/// checkout logic relies on this asymmetry, so it is preserved rather than
/// unified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionGuardPolicy {
    /// Delete unconditionally, even the current default. No replacement is
    /// promoted.
    Unrestricted,
    /// Deleting the current default requires another item to promote in the
    /// same batch; deleting the only item is rejected.
    RequireReplacementOrReject,
}

/// A collection item the registry can manage.
pub trait RegistryItem:
    Clone + Serialize + serde::de::DeserializeOwned + Send + Sync + 'static
{
    /// Partition kind the item lives in.
    const KIND: CollectionKind;
    /// Deletion guard applied to this kind.
    const DELETE_GUARD: DeletionGuardPolicy;

    /// Caller-supplied creation payload.
    type Draft: Send + Sync + 'static;
    /// Partial-update payload.
    type Patch: Send + Sync + 'static;

    /// Materialize a full item from a draft.
    fn from_draft(
        draft: Self::Draft,
        id: ItemId,
        owner: OwnerId,
        is_default: bool,
        now: DateTime<Utc>,
    ) -> Self;

    /// Validate a creation payload.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] on missing or malformed fields.
    fn validate_draft(draft: &Self::Draft) -> Result<(), ValidationError>;

    /// Validate the fields present in a patch.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] on malformed fields.
    fn validate_patch(patch: &Self::Patch) -> Result<(), ValidationError>;

    /// Lower a patch to wire-form field updates, skipping absent fields.
    /// Does not include `updatedAt`; the registry stamps that itself.
    fn patch_updates(patch: &Self::Patch) -> FieldUpdates;

    /// Whether the patch promotes this item to the partition default.
    fn patch_sets_default(patch: &Self::Patch) -> bool;

    fn id(&self) -> ItemId;
    fn is_default(&self) -> bool;
    fn created_at(&self) -> DateTime<Utc>;

    /// Snapshot ordering for this kind.
    fn snapshot_cmp(a: &Self, b: &Self) -> Ordering;

    /// Serialize into the store's document form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] if the item does not serialize to a
    /// JSON object.
    fn to_document(&self) -> Result<Document, StoreError> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(_) => Err(StoreError::Corrupt {
                path: Self::KIND.to_string(),
                reason: "item did not serialize to an object".to_owned(),
            }),
            Err(e) => Err(StoreError::Corrupt {
                path: Self::KIND.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    /// Deserialize from the store's document form.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Corrupt`] if required fields are missing or
    /// malformed.
    fn from_document(document: &Document) -> Result<Self, StoreError> {
        serde_json::from_value(Value::Object(document.clone())).map_err(|e| StoreError::Corrupt {
            path: Self::KIND.to_string(),
            reason: e.to_string(),
        })
    }
}

impl RegistryItem for Address {
    const KIND: CollectionKind = CollectionKind::Addresses;
    // Addresses tolerate a "no default" state after deleting the default.
    const DELETE_GUARD: DeletionGuardPolicy = DeletionGuardPolicy::Unrestricted;

    type Draft = AddressDraft;
    type Patch = AddressPatch;

    fn from_draft(
        draft: AddressDraft,
        id: ItemId,
        owner: OwnerId,
        is_default: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id: owner,
            label: draft.label,
            street: draft.street,
            city: draft.city,
            region: draft.region,
            postal_code: draft.postal_code,
            country: draft.country,
            geo: draft.geo,
            is_default,
            created_at: now,
            updated_at: now,
        }
    }

    fn validate_draft(draft: &AddressDraft) -> Result<(), ValidationError> {
        draft.validate()
    }

    fn validate_patch(patch: &AddressPatch) -> Result<(), ValidationError> {
        patch.validate()
    }

    fn patch_updates(patch: &AddressPatch) -> FieldUpdates {
        let mut updates = FieldUpdates::new();
        if let Some(label) = &patch.label {
            updates.set("label", json!(label));
        }
        if let Some(street) = &patch.street {
            updates.set("street", json!(street));
        }
        if let Some(city) = &patch.city {
            updates.set("city", json!(city));
        }
        if let Some(region) = &patch.region {
            updates.set("region", json!(region));
        }
        if let Some(postal_code) = &patch.postal_code {
            updates.set("postalCode", json!(postal_code));
        }
        if let Some(country) = &patch.country {
            updates.set("country", json!(country));
        }
        if let Some(geo) = &patch.geo {
            updates.set("geo", json!(geo));
        }
        if let Some(is_default) = patch.is_default {
            updates.set(fields::IS_DEFAULT, json!(is_default));
        }
        updates
    }

    fn patch_sets_default(patch: &AddressPatch) -> bool {
        patch.is_default == Some(true)
    }

    fn id(&self) -> ItemId {
        self.id
    }

    fn is_default(&self) -> bool {
        self.is_default
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn snapshot_cmp(a: &Self, b: &Self) -> Ordering {
        // Newest first; id as a stable tie-break.
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    }
}

impl RegistryItem for PaymentInstrument {
    const KIND: CollectionKind = CollectionKind::PaymentInstruments;
    // Checkout must never be left without a default instrument.
    const DELETE_GUARD: DeletionGuardPolicy = DeletionGuardPolicy::RequireReplacementOrReject;

    type Draft = PaymentInstrumentDraft;
    type Patch = PaymentInstrumentPatch;

    fn from_draft(
        draft: PaymentInstrumentDraft,
        id: ItemId,
        owner: OwnerId,
        is_default: bool,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            owner_id: owner,
            instrument_type: draft.instrument_type,
            last4: draft.last4,
            expiry_month: draft.expiry_month,
            expiry_year: draft.expiry_year,
            holder_name: draft.holder_name,
            is_default,
            created_at: now,
            updated_at: now,
        }
    }

    fn validate_draft(draft: &PaymentInstrumentDraft) -> Result<(), ValidationError> {
        draft.validate()
    }

    fn validate_patch(patch: &PaymentInstrumentPatch) -> Result<(), ValidationError> {
        patch.validate()
    }

    fn patch_updates(patch: &PaymentInstrumentPatch) -> FieldUpdates {
        let mut updates = FieldUpdates::new();
        if let Some(month) = patch.expiry_month {
            updates.set("expiryMonth", json!(month));
        }
        if let Some(year) = patch.expiry_year {
            updates.set("expiryYear", json!(year));
        }
        if let Some(name) = &patch.holder_name {
            updates.set("holderName", json!(name));
        }
        if let Some(is_default) = patch.is_default {
            updates.set(fields::IS_DEFAULT, json!(is_default));
        }
        updates
    }

    fn patch_sets_default(patch: &PaymentInstrumentPatch) -> bool {
        patch.is_default == Some(true)
    }

    fn id(&self) -> ItemId {
        self.id
    }

    fn is_default(&self) -> bool {
        self.is_default
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn snapshot_cmp(a: &Self, b: &Self) -> Ordering {
        // Default instrument always sorts first, then newest first.
        b.is_default
            .cmp(&a.is_default)
            .then_with(|| b.created_at.cmp(&a.created_at))
            .then_with(|| a.id.cmp(&b.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use copperleaf_core::InstrumentType;

    fn address(created_secs: i64, is_default: bool) -> Address {
        let now = Utc.timestamp_opt(created_secs, 0).single().expect("ts");
        Address::from_draft(
            AddressDraft {
                label: "Home".into(),
                street: "12 Fern Way".into(),
                city: "Wellington".into(),
                region: "Wellington".into(),
                postal_code: "6011".into(),
                country: "NZ".into(),
                geo: None,
            },
            ItemId::generate(),
            OwnerId::generate(),
            is_default,
            now,
        )
    }

    fn instrument(created_secs: i64, is_default: bool) -> PaymentInstrument {
        let now = Utc.timestamp_opt(created_secs, 0).single().expect("ts");
        PaymentInstrument::from_draft(
            PaymentInstrumentDraft {
                instrument_type: InstrumentType::Visa,
                last4: "4242".into(),
                expiry_month: 12,
                expiry_year: 2030,
                holder_name: "Ada Lovelace".into(),
            },
            ItemId::generate(),
            OwnerId::generate(),
            is_default,
            now,
        )
    }

    #[test]
    fn test_address_orders_newest_first() {
        let older = address(100, true);
        let newer = address(200, false);
        assert_eq!(Address::snapshot_cmp(&newer, &older), Ordering::Less);
    }

    #[test]
    fn test_instrument_default_sorts_before_newer_items() {
        let default_card = instrument(100, true);
        let newer_card = instrument(200, false);
        assert_eq!(
            PaymentInstrument::snapshot_cmp(&default_card, &newer_card),
            Ordering::Less
        );
    }

    #[test]
    fn test_document_round_trip() {
        let addr = address(100, true);
        let document = addr.to_document().expect("serialize");
        assert_eq!(document["isDefault"], json!(true));
        let back = Address::from_document(&document).expect("deserialize");
        assert_eq!(back, addr);
    }

    #[test]
    fn test_missing_field_is_corrupt() {
        let mut document = address(100, false).to_document().expect("serialize");
        document.remove("street");
        assert!(matches!(
            Address::from_document(&document),
            Err(StoreError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_patch_updates_skip_absent_fields() {
        let patch = AddressPatch {
            city: Some("Auckland".into()),
            is_default: Some(true),
            ..AddressPatch::default()
        };
        let updates = Address::patch_updates(&patch);
        assert_eq!(updates.len(), 2);
        assert!(Address::patch_sets_default(&patch));

        let demote = AddressPatch {
            is_default: Some(false),
            ..AddressPatch::default()
        };
        assert!(!Address::patch_sets_default(&demote));
    }
}
