//! Shared types for the storefront client.
//!
//! This crate provides the identifiers and value types used across the
//! cart, checkout, and backend crates, plus the user-notice channel the
//! UI shell subscribes to.

pub mod identity;
pub mod notify;
pub mod types;

pub use identity::Identity;
pub use notify::{InMemoryNotifier, LogNotifier, Notifier, UserNotice};
pub use types::{Money, OrderId, ProductId, Size, UserId};
