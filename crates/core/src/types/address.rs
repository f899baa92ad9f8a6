//! Shipping/billing address records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemId, OwnerId, ValidationError, require_max_len, require_non_empty};

/// Geographic coordinates attached to an address.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// A saved shipping or billing address.
///
/// Addresses live in the `(owner, addresses)` partition of the document
/// store. At most one address per partition carries `is_default = true`;
/// the registry is the only writer allowed to change that flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Immutable document id, unique within the partition.
    pub id: ItemId,
    /// Owning principal.
    pub owner_id: OwnerId,
    /// Display label ("Home", "Work", ...).
    pub label: String,
    pub street: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    /// Optional geocoded position for delivery routing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoPoint>,
    /// Whether this address is used by default in checkout flows.
    pub is_default: bool,
    /// Set once at creation, never mutated.
    pub created_at: DateTime<Utc>,
    /// Advances on every mutation.
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for creating an [`Address`].
///
/// The registry supplies `id`, timestamps, and the default flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressDraft {
    pub label: String,
    pub street: String,
    pub city: String,
    pub region: String,
    pub postal_code: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoPoint>,
}

impl AddressDraft {
    /// Maximum length accepted for any single address field.
    pub const MAX_FIELD_LENGTH: usize = 256;

    /// Check required fields and format constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if a required field is empty or a field
    /// exceeds [`Self::MAX_FIELD_LENGTH`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty("label", &self.label)?;
        require_non_empty("street", &self.street)?;
        require_non_empty("city", &self.city)?;
        require_non_empty("postalCode", &self.postal_code)?;
        require_non_empty("country", &self.country)?;
        for (field, value) in [
            ("label", &self.label),
            ("street", &self.street),
            ("city", &self.city),
            ("region", &self.region),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ] {
            require_max_len(field, value, Self::MAX_FIELD_LENGTH)?;
        }
        Ok(())
    }
}

/// Partial update for an [`Address`]. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postal_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoPoint>,
    /// Setting `Some(true)` promotes this address to the partition default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

impl AddressPatch {
    /// Check format constraints on the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if a present field is empty or too long.
    pub fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("label", &self.label),
            ("street", &self.street),
            ("city", &self.city),
            ("region", &self.region),
            ("postalCode", &self.postal_code),
            ("country", &self.country),
        ] {
            if let Some(value) = value {
                require_non_empty(field, value)?;
                require_max_len(field, value, AddressDraft::MAX_FIELD_LENGTH)?;
            }
        }
        Ok(())
    }

    /// Whether the patch carries no changes at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.street.is_none()
            && self.city.is_none()
            && self.region.is_none()
            && self.postal_code.is_none()
            && self.country.is_none()
            && self.geo.is_none()
            && self.is_default.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> AddressDraft {
        AddressDraft {
            label: "Home".into(),
            street: "12 Fern Way".into(),
            city: "Wellington".into(),
            region: "Wellington".into(),
            postal_code: "6011".into(),
            country: "NZ".into(),
            geo: None,
        }
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(draft().validate().is_ok());
    }

    #[test]
    fn test_empty_street_rejected() {
        let mut d = draft();
        d.street = "  ".into();
        assert_eq!(
            d.validate(),
            Err(ValidationError::Empty { field: "street" })
        );
    }

    #[test]
    fn test_overlong_label_rejected() {
        let mut d = draft();
        d.label = "x".repeat(AddressDraft::MAX_FIELD_LENGTH + 1);
        assert!(matches!(
            d.validate(),
            Err(ValidationError::TooLong { field: "label", .. })
        ));
    }

    #[test]
    fn test_empty_patch_reports_empty() {
        assert!(AddressPatch::default().is_empty());
        let patch = AddressPatch {
            city: Some("Auckland".into()),
            ..AddressPatch::default()
        };
        assert!(!patch.is_empty());
    }

    #[test]
    fn test_address_serializes_camel_case() {
        let addr = Address {
            id: ItemId::generate(),
            owner_id: OwnerId::generate(),
            label: "Home".into(),
            street: "12 Fern Way".into(),
            city: "Wellington".into(),
            region: "Wellington".into(),
            postal_code: "6011".into(),
            country: "NZ".into(),
            geo: None,
            is_default: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let value = serde_json::to_value(&addr).expect("serialize");
        assert!(value.get("postalCode").is_some());
        assert!(value.get("isDefault").is_some());
        assert!(value.get("postal_code").is_none());
    }
}
