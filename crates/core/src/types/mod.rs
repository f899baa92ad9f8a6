//! Core types for Copperleaf.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod address;
pub mod id;
pub mod kind;
pub mod payment;

pub use address::{Address, AddressDraft, AddressPatch, GeoPoint};
pub use id::*;
pub use kind::CollectionKind;
pub use payment::{
    InstrumentType, PaymentInstrument, PaymentInstrumentDraft, PaymentInstrumentPatch,
};

use thiserror::Error;

/// Errors raised when a draft or patch fails field validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was missing or empty.
    #[error("{field} cannot be empty")]
    Empty {
        /// Name of the offending field.
        field: &'static str,
    },
    /// A field exceeded its maximum length.
    #[error("{field} must be at most {max} characters")]
    TooLong {
        /// Name of the offending field.
        field: &'static str,
        /// Maximum allowed length.
        max: usize,
    },
    /// A field did not match its required format.
    #[error("{field} is invalid: {reason}")]
    Format {
        /// Name of the offending field.
        field: &'static str,
        /// Why the value was rejected.
        reason: &'static str,
    },
    /// An expiry date lies outside the representable range.
    #[error("expiry {month}/{year} is out of range")]
    ExpiryOutOfRange {
        /// Month as supplied by the caller.
        month: u8,
        /// Year as supplied by the caller.
        year: u16,
    },
}

pub(crate) fn require_non_empty(
    field: &'static str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Empty { field });
    }
    Ok(())
}

pub(crate) fn require_max_len(
    field: &'static str,
    value: &str,
    max: usize,
) -> Result<(), ValidationError> {
    if value.len() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}
