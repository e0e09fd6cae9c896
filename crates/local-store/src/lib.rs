//! Durable per-user local storage.
//!
//! This crate provides the key-value store the client persists its local
//! state into: cart contents, recently-viewed products, the pending-order
//! marker used across payment redirects, and per-product size preferences.
//!
//! All keys are namespaced by the active identity where the data is
//! user-scoped; see [`keys`] for the key schema.

pub mod error;
pub mod file;
pub mod keys;
pub mod memory;
pub mod store;

pub use error::{Result, StoreError};
pub use file::FileLocalStore;
pub use memory::InMemoryLocalStore;
pub use store::{LocalStore, LocalStoreExt};
