//! Copperleaf Core - Shared types library.
//!
//! This crate provides common types used across all Copperleaf components:
//!
//! - `collections` - Default-item consistency layer over the document store
//! - `cli` - Command-line demo and management tools
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no store access, no async
//! runtime. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, collection kinds, address and payment
//!   instrument records with their drafts, patches, and validation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
