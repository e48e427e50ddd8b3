//! Bamazon Core - Shared domain types.
//!
//! Used by:
//! - `shop` - The storefront, admin and auth application
//! - `cli` - Migrations and user management
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP. Database encoding is opt-in through the `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for entity IDs and email addresses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
