//! Checkout confirmation snapshot.

use backend::OrderStatus;
use cart::CartLine;
use common::{Money, OrderId};
use serde::{Deserialize, Serialize};

use crate::customer::CustomerInfo;

/// Snapshot of a successfully submitted order, carried to the confirmation
/// view. The remote order record is the source of truth afterwards; this is
/// display data only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    /// Server-assigned order ID.
    pub order_id: OrderId,
    /// Human-readable order identifier.
    pub slug: String,
    /// Order status at submission (always `Pending`).
    pub status: OrderStatus,
    /// Total charged for the order.
    pub total_price: Money,
    /// Customer fields the order was placed with.
    pub customer: CustomerInfo,
    /// The cart lines as they were at submission time.
    pub lines: Vec<CartLine>,
}
