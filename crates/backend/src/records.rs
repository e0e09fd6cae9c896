//! Row types for the backend's logical tables.
//!
//! Field names follow the remote schema; the two camel-cased columns the
//! schema carries (`totalPrice`, `heroImage`) are mapped with serde renames.

use chrono::{DateTime, Utc};
use common::{Money, OrderId, ProductId, Size, UserId};
use serde::{Deserialize, Serialize};

use crate::status::OrderStatus;

/// A row of the `product` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Backend row key.
    pub id: ProductId,
    /// URL-safe identifier.
    pub slug: String,
    /// Display title.
    pub title: String,
    /// Display image URL.
    #[serde(rename = "heroImage")]
    pub hero_image: String,
    /// Unit price.
    pub price: Money,
    /// Owning category row key.
    pub category: i64,
}

/// A row of the `category` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    /// Backend row key.
    pub id: i64,
    /// URL-safe identifier.
    pub slug: String,
    /// Display name.
    pub name: String,
    /// Display image URL.
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

/// A row of the `product_size` table: per-size stock for one product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StockLevel {
    /// Product row key.
    pub product: ProductId,
    /// Size this stock figure covers.
    pub size: Size,
    /// Units available. Never negative; mutated only through the
    /// decrement/increment RPCs.
    pub quantity: u32,
}

/// Fields for inserting a new order header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    /// Human-readable order identifier.
    pub slug: String,
    /// Total price at submission time.
    #[serde(rename = "totalPrice")]
    pub total_price: Money,
    /// Recipient name.
    pub customer_name: String,
    /// Recipient phone number.
    pub customer_phone: String,
    /// Delivery address.
    pub customer_address: String,
}

/// A row of the `order` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Backend row key, assigned on insert.
    pub id: OrderId,
    /// Human-readable order identifier.
    pub slug: String,
    /// Owning user.
    pub user: UserId,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Total price at submission time.
    #[serde(rename = "totalPrice")]
    pub total_price: Money,
    /// Recipient name.
    pub customer_name: String,
    /// Recipient phone number.
    pub customer_phone: String,
    /// Delivery address.
    pub customer_address: String,
    /// Insertion timestamp.
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a new order line item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NewOrderItem {
    /// Owning order.
    pub order: OrderId,
    /// Ordered product.
    pub product: ProductId,
    /// Units ordered.
    pub quantity: u32,
    /// Size ordered.
    pub size: Size,
}

/// A row of the `order_item` table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderItemRecord {
    /// Backend row key.
    pub id: i64,
    /// Owning order.
    pub order: OrderId,
    /// Ordered product.
    pub product: ProductId,
    /// Units ordered.
    pub quantity: u32,
    /// Size ordered.
    pub size: Size,
}

/// One order line joined with its product for the order detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLineDetail {
    /// The line item row.
    pub item: OrderItemRecord,
    /// The product the line refers to.
    pub product: ProductRecord,
}

/// An order header with its line items, as shown on the order detail view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetail {
    /// The order header.
    pub order: OrderRecord,
    /// The order's lines, joined with product display data.
    pub lines: Vec<OrderLineDetail>,
}

/// Fields for inserting a new product review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewReview {
    /// Reviewed product.
    pub product: ProductId,
    /// Star rating, 1 through 5.
    pub rating: u8,
    /// Review text.
    pub comment: String,
}

/// A row of the `product_review` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    /// Backend row key.
    pub id: i64,
    /// Reviewed product.
    pub product: ProductId,
    /// Reviewing user.
    pub user: UserId,
    /// Star rating, 1 through 5.
    pub rating: u8,
    /// Review text.
    pub comment: String,
    /// Insertion timestamp.
    pub created_at: DateTime<Utc>,
}
