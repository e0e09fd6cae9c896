//! Order status state machine.

use serde::{Deserialize, Serialize};

/// The status of an order on the backend.
///
/// Status transitions:
/// ```text
/// Pending ──► Processing ──► Shipped ──► InTransit ──► Delivered ──► Completed
///    │            │
///    └────────────┴──► CancelRequested ──► Cancelled
/// ```
///
/// `CancelRequested` records that the user asked to cancel; the final
/// transition to `Cancelled` is an administrative decision made outside the
/// client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order created, awaiting payment confirmation or processing.
    #[default]
    Pending,

    /// Payment confirmed, order is being prepared.
    Processing,

    /// Order handed to the carrier.
    Shipped,

    /// Order is on its way to the customer.
    InTransit,

    /// Order arrived at the customer.
    Delivered,

    /// Order fulfilled and closed (terminal state).
    Completed,

    /// Order was cancelled (terminal state).
    Cancelled,

    /// The user asked to cancel; awaiting an administrative decision.
    CancelRequested,
}

impl OrderStatus {
    /// Returns true if the user may still request cancellation.
    pub fn can_request_cancellation(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Processing)
    }

    /// Returns true if this is a terminal status (no further transitions).
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::InTransit => "InTransit",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::CancelRequested => "CancelRequested",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
