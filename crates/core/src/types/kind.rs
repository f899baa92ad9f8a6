//! Collection kinds backed by the document store.

use serde::{Deserialize, Serialize};

/// The per-owner collections managed by the consistency layer.
///
/// Together with an [`crate::OwnerId`] a kind names a partition: the scope
/// within which the default-uniqueness invariant is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionKind {
    /// Shipping and billing addresses.
    Addresses,
    /// Stored payment instruments (cards).
    PaymentInstruments,
}

impl CollectionKind {
    /// Path segment used when addressing the collection in the store.
    #[must_use]
    pub const fn as_segment(self) -> &'static str {
        match self {
            Self::Addresses => "addresses",
            Self::PaymentInstruments => "paymentInstruments",
        }
    }
}

impl std::fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_segment())
    }
}
