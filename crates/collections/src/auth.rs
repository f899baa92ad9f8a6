//! Current-principal resolution.
//!
//! Every registry operation and subscription is scoped to the signed-in
//! owner. This module carries the minimal contract the layer consumes:
//! resolve the current principal id or fail fast. Session lifecycle,
//! tokens, and credentials live with the authentication collaborator.

use std::sync::{PoisonError, RwLock};

use copperleaf_core::OwnerId;

use crate::error::CollectionsError;

/// Resolves the owner on whose behalf an operation runs.
pub trait PrincipalResolver: Send + Sync + 'static {
    /// Return the current principal id.
    ///
    /// # Errors
    ///
    /// Returns [`CollectionsError::NotAuthenticated`] if no principal is
    /// resolved.
    fn require_owner_id(&self) -> Result<OwnerId, CollectionsError>;
}

/// A resolver pinned to one owner. Used by tests and the demo CLI.
#[derive(Debug, Clone, Copy)]
pub struct FixedPrincipal {
    owner: OwnerId,
}

impl FixedPrincipal {
    /// Pin the resolver to `owner`.
    #[must_use]
    pub const fn new(owner: OwnerId) -> Self {
        Self { owner }
    }
}

impl PrincipalResolver for FixedPrincipal {
    fn require_owner_id(&self) -> Result<OwnerId, CollectionsError> {
        Ok(self.owner)
    }
}

/// Session-backed resolver: tracks the currently signed-in owner.
///
/// The session collaborator calls [`sign_in`](Self::sign_in) /
/// [`sign_out`](Self::sign_out); everything else only reads.
#[derive(Debug, Default)]
pub struct SessionPrincipal {
    current: RwLock<Option<OwnerId>>,
}

impl SessionPrincipal {
    /// Create a resolver with no signed-in owner.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `owner` as the signed-in principal.
    pub fn sign_in(&self, owner: OwnerId) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(owner);
    }

    /// Clear the signed-in principal.
    pub fn sign_out(&self) {
        *self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The signed-in principal, if any.
    #[must_use]
    pub fn current(&self) -> Option<OwnerId> {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PrincipalResolver for SessionPrincipal {
    fn require_owner_id(&self) -> Result<OwnerId, CollectionsError> {
        self.current().ok_or(CollectionsError::NotAuthenticated)
    }
}
