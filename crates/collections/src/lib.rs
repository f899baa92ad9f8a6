//! Copperleaf Collections - default-item consistency layer.
//!
//! Per-owner collections of addresses and payment instruments are backed by
//! a remote document store. This crate guarantees that at most one item in a
//! `(owner, kind)` partition is flagged as the default, propagates changes
//! live to all observers as full snapshots, and reconciles optimistic local
//! edits against asynchronous authoritative state.
//!
//! # Architecture
//!
//! - [`store`] - Document-store seam ([`store::DocumentStore`]) plus the
//!   in-memory client used for tests and local development
//! - [`batch`] - Atomic multi-document batch writer
//! - [`registry`] - The invariant engine: add/update/set-default/delete
//! - [`subscription`] - Push-based full-snapshot delivery per observer
//! - [`optimistic`] - Predicted local state with snapshot reconciliation
//! - [`auth`] - Current-principal resolution
//! - [`services`] - Typed facades consumed by UI screens
//!
//! # Consistency model
//!
//! Batch commits are atomic as a unit, but the read-then-batch flows that
//! maintain the default flag are not atomic end-to-end: a concurrent writer
//! on another device can produce a transient state with zero or two defaults
//! until the next write resolves it. Observers always receive full ordered
//! snapshots and must treat each one as an authoritative replacement of
//! local state, which makes reconciliation idempotent.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod auth;
pub mod batch;
pub mod config;
pub mod error;
pub mod item;
pub mod optimistic;
pub mod registry;
pub mod services;
pub mod store;
pub mod subscription;

pub use auth::{FixedPrincipal, PrincipalResolver, SessionPrincipal};
pub use batch::TransactionalBatchWriter;
pub use config::SyncConfig;
pub use error::{CollectionsError, Result};
pub use item::{DeletionGuardPolicy, RegistryItem};
pub use optimistic::OptimisticMutationQueue;
pub use registry::DefaultItemRegistry;
pub use services::{AddressBook, PaymentWallet};
pub use store::{DocumentStore, MemoryStore, StoreError};
pub use subscription::{LiveSubscriptionChannel, SubscriptionHandle};
