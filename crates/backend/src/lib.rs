//! Remote backend-as-a-service client.
//!
//! This crate is the client's only gateway to the managed backend: row
//! reads and writes on the order tables, the atomic inventory-adjustment
//! RPCs, catalog reads, and session primitives. It owns no client-side
//! state beyond connection configuration; every stock check re-reads the
//! backend or accepts staleness explicitly.
//!
//! Two implementations are provided: [`InMemoryBackend`] for tests and the
//! REST implementation [`RestBackend`] speaking the managed store's HTTP
//! dialect. All remote calls in the REST implementation carry an explicit
//! timeout and surface [`BackendError::Timeout`] as a distinct failure kind.

pub mod catalog;
pub mod error;
pub mod inventory;
pub mod memory;
pub mod orders;
pub mod records;
pub mod rest;
pub mod session;
pub mod status;
pub mod timeout;

pub use catalog::{CatalogApi, CategoryWithProducts, ProductsAndCategories};
pub use error::{BackendError, Result};
pub use inventory::InventoryApi;
pub use memory::InMemoryBackend;
pub use orders::{OrdersApi, generate_order_slug};
pub use records::{
    CategoryRecord, NewOrder, NewOrderItem, NewReview, OrderDetail, OrderItemRecord,
    OrderLineDetail, OrderRecord, ProductRecord, ReviewRecord, StockLevel,
};
pub use rest::RestBackend;
pub use session::{AuthEvent, AuthEventStream, InMemorySession, Session, SessionApi};
pub use status::OrderStatus;
pub use timeout::with_timeout;
