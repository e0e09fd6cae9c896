//! Order status watcher.
//!
//! Keeps the user's order list reasonably fresh while the order-list view
//! is active. This is a bounded-staleness model, not a real-time feed: the
//! acceptable staleness window equals the poll interval.

mod watcher;

pub use watcher::{OrderFeed, OrderStatusWatcher, WatcherHandle};
