//! Unified error handling for the consistency layer.
//!
//! Registry operation failures surface synchronously to the caller.
//! Subscription failures surface only through the `on_error` callback and
//! leave the consumer's last-known snapshot in place. Optimistic-queue
//! failures are swallowed at the mutation call site by design and self-heal
//! via the next snapshot.

use thiserror::Error;

use copperleaf_core::{CollectionKind, ItemId, ValidationError};

use crate::store::StoreError;

/// Failure taxonomy for registry and subscription operations.
#[derive(Debug, Error)]
pub enum CollectionsError {
    /// No principal is currently resolved.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The operation targeted an id that does not exist in the partition.
    #[error("{kind} item {id} not found")]
    NotFound {
        /// Collection kind of the partition.
        kind: CollectionKind,
        /// The missing id.
        id: ItemId,
    },

    /// A draft or patch failed field validation.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// The operation would break a guaranteed invariant.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The backing store rejected or failed the operation.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Result type alias for [`CollectionsError`].
pub type Result<T> = std::result::Result<T, CollectionsError>;
