//! Stored payment instrument records.

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

use super::{ItemId, OwnerId, ValidationError, require_max_len, require_non_empty};

/// Closed set of accepted card networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InstrumentType {
    Visa,
    Mastercard,
    Amex,
    Discover,
}

impl std::fmt::Display for InstrumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Amex => "amex",
            Self::Discover => "discover",
        };
        f.write_str(name)
    }
}

/// A stored payment instrument.
///
/// Only the non-sensitive tail of the card number is ever stored; the full
/// PAN never reaches this layer. Instruments live in the
/// `(owner, paymentInstruments)` partition and at most one per partition
/// carries `is_default = true`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstrument {
    /// Immutable document id, unique within the partition.
    pub id: ItemId,
    /// Owning principal.
    pub owner_id: OwnerId,
    pub instrument_type: InstrumentType,
    /// Last four digits of the card number.
    pub last4: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub holder_name: String,
    /// Whether this instrument is used by default in checkout flows.
    pub is_default: bool,
    /// Set once at creation, never mutated.
    pub created_at: DateTime<Utc>,
    /// Advances on every mutation.
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied fields for creating a [`PaymentInstrument`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstrumentDraft {
    pub instrument_type: InstrumentType,
    pub last4: String,
    pub expiry_month: u8,
    pub expiry_year: u16,
    pub holder_name: String,
}

impl PaymentInstrumentDraft {
    /// Maximum length accepted for the holder name.
    pub const MAX_HOLDER_LENGTH: usize = 128;

    /// Check required fields and format constraints.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if `last4` is not exactly four ASCII
    /// digits, the expiry is out of range, or the holder name is empty or
    /// too long.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_last4(&self.last4)?;
        validate_expiry(self.expiry_month, self.expiry_year)?;
        require_non_empty("holderName", &self.holder_name)?;
        require_max_len("holderName", &self.holder_name, Self::MAX_HOLDER_LENGTH)?;
        Ok(())
    }
}

/// Partial update for a [`PaymentInstrument`]. `None` fields are left
/// untouched. The instrument type and last4 are immutable once stored;
/// replacing a card means adding a new instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentInstrumentPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_month: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_year: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub holder_name: Option<String>,
    /// Setting `Some(true)` promotes this instrument to the partition
    /// default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
}

impl PaymentInstrumentPatch {
    /// Check format constraints on the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if a present field fails its constraint.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match (self.expiry_month, self.expiry_year) {
            (Some(month), Some(year)) => validate_expiry(month, year)?,
            (Some(month), None) => {
                if !(1..=12).contains(&month) {
                    return Err(ValidationError::Format {
                        field: "expiryMonth",
                        reason: "must be between 1 and 12",
                    });
                }
            }
            // A year alone still has to land in the accepted window.
            (None, Some(year)) => validate_expiry(1, year)?,
            (None, None) => {}
        }
        if let Some(name) = &self.holder_name {
            require_non_empty("holderName", name)?;
            require_max_len(
                "holderName",
                name,
                PaymentInstrumentDraft::MAX_HOLDER_LENGTH,
            )?;
        }
        Ok(())
    }

    /// Whether the patch carries no changes at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.expiry_month.is_none()
            && self.expiry_year.is_none()
            && self.holder_name.is_none()
            && self.is_default.is_none()
    }
}

fn validate_last4(last4: &str) -> Result<(), ValidationError> {
    if last4.len() != 4 || !last4.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ValidationError::Format {
            field: "last4",
            reason: "must be exactly four digits",
        });
    }
    Ok(())
}

fn validate_expiry(month: u8, year: u16) -> Result<(), ValidationError> {
    if !(1..=12).contains(&month) {
        return Err(ValidationError::ExpiryOutOfRange { month, year });
    }
    // Issuers cap expiry windows well under 50 years out.
    let current_year = u16::try_from(Utc::now().year()).unwrap_or(u16::MAX);
    if year < 2000 || year > current_year.saturating_add(50) {
        return Err(ValidationError::ExpiryOutOfRange { month, year });
    }
    Ok(())
}
