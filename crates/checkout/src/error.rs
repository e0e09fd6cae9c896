//! Checkout error types.

use backend::{BackendError, OrderStatus};
use common::OrderId;
use local_store::StoreError;
use thiserror::Error;

use crate::phase::CheckoutPhase;

/// Errors that can occur during checkout, cancellation, and payment flows.
///
/// Like [`BackendError`], this is a closed set of tagged kinds; callers
/// branch on the variant, never on message text.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Checkout was started with an empty cart.
    #[error("Cart is empty")]
    EmptyCart,

    /// A required customer field is missing.
    #[error("Missing required field: {field}")]
    MissingField { field: &'static str },

    /// Another checkout attempt is already in flight for this cart.
    #[error("A checkout is already in progress")]
    InFlight,

    /// A write failed after the order header was created, leaving remote
    /// state partially applied.
    #[error("Checkout failed during {phase} for order {order_id}: {source}")]
    PartialWrite {
        phase: CheckoutPhase,
        order_id: OrderId,
        #[source]
        source: BackendError,
    },

    /// The payment gateway returned a malformed or unusable response.
    #[error("Gateway error: {message}")]
    Gateway { message: String },

    /// A payment redirect arrived with no pending-order marker to resolve
    /// it against.
    #[error("No pending order to resolve the payment redirect against")]
    MissingPendingOrder,

    /// The redirect URL could not be interpreted.
    #[error("Unrecognized payment redirect: {url}")]
    InvalidRedirect { url: String },

    /// The order's status no longer allows a cancellation request.
    #[error("Order cannot be cancelled from {status} status")]
    NotCancellable { status: OrderStatus },

    /// Local storage failed while bridging the payment redirect.
    #[error("Local storage error: {0}")]
    Storage(#[from] StoreError),

    /// A backend call failed before any partial state was created.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl CheckoutError {
    /// Returns true for failures the user can fix by correcting input.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            CheckoutError::EmptyCart | CheckoutError::MissingField { .. }
        )
    }

    /// Returns the order left behind by a partial write, if any.
    pub fn partial_order(&self) -> Option<OrderId> {
        match self {
            CheckoutError::PartialWrite { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }
}

/// Convenience type alias for checkout results.
pub type Result<T> = std::result::Result<T, CheckoutError>;
