//! Order table operations.

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, UserId};
use uuid::Uuid;

use crate::Result;
use crate::records::{NewOrder, NewOrderItem, OrderDetail, OrderItemRecord, OrderRecord};
use crate::status::OrderStatus;

/// Trait for order reads and writes on the remote backend.
///
/// Line items are immutable once inserted; corrections require a new order.
#[async_trait]
pub trait OrdersApi: Send + Sync {
    /// Inserts a new order header with status `Pending` and returns the
    /// created row, including its server-assigned ID.
    async fn create_order(&self, user: UserId, order: NewOrder) -> Result<OrderRecord>;

    /// Inserts all line items of one order in a single write.
    async fn insert_order_items(&self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItemRecord>>;

    /// Returns the user's orders, newest first.
    async fn my_orders(&self, user: UserId) -> Result<Vec<OrderRecord>>;

    /// Returns one of the user's orders with its line items and product data.
    async fn order_by_slug(&self, user: UserId, slug: &str) -> Result<OrderDetail>;

    /// Returns the line items of an order.
    async fn order_items(&self, order: OrderId) -> Result<Vec<OrderItemRecord>>;

    /// Updates an order's status.
    async fn set_status(&self, order: OrderId, status: OrderStatus) -> Result<()>;

    /// Confirms a gateway payment for an order, recording the transaction
    /// reference and moving the order to `Processing`.
    async fn confirm_payment(&self, order: OrderId, txn_ref: &str) -> Result<()>;

    /// Deletes an order and its line items.
    async fn delete_order(&self, order: OrderId) -> Result<()>;
}

/// Generates a human-readable order slug: `order-<4 hex chars>-<unix millis>`.
pub fn generate_order_slug() -> String {
    let entropy = Uuid::new_v4().simple().to_string();
    format!(
        "order-{}-{}",
        &entropy[..4],
        Utc::now().timestamp_millis()
    )
}
