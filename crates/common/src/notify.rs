//! User-facing notifications.
//!
//! Remote-call failures are caught at the boundary where they were issued and
//! turned into a single user-facing notice; they are not re-thrown past the
//! UI boundary. The UI shell implements [`Notifier`] to surface notices as
//! alerts or toasts.

use std::sync::{Arc, RwLock};

use crate::{ProductId, Size};

/// A notice to surface to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserNotice {
    /// Checkout completed and the order was created.
    OrderCreated {
        /// Human-readable order identifier.
        slug: String,
    },

    /// Checkout failed before or during the remote write sequence.
    CheckoutFailed {
        /// Human-readable description of the failure.
        message: String,
    },

    /// A gateway payment completed successfully.
    PaymentSucceeded {
        /// Transaction reference reported by the gateway.
        txn_ref: String,
    },

    /// A gateway payment failed or was cancelled.
    PaymentFailed {
        /// Error code reported by the gateway.
        code: String,
    },

    /// A cancellation request was recorded for an order.
    CancellationRequested {
        /// Human-readable order identifier.
        slug: String,
    },

    /// Restoring stock for a cancelled line item failed.
    RestockFailed {
        /// Product whose stock could not be restored.
        product: ProductId,
        /// Size whose stock could not be restored.
        size: Size,
    },

    /// The remote session expired; the user must re-authenticate.
    SessionExpired,
}

/// Sink for user-facing notices.
pub trait Notifier: Send + Sync {
    /// Delivers a notice to the user.
    fn notify(&self, notice: UserNotice);
}

/// In-memory notifier for testing; records every notice it receives.
#[derive(Debug, Clone, Default)]
pub struct InMemoryNotifier {
    notices: Arc<RwLock<Vec<UserNotice>>>,
}

impl InMemoryNotifier {
    /// Creates a new in-memory notifier.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of all notices delivered so far.
    pub fn notices(&self) -> Vec<UserNotice> {
        self.notices.read().unwrap().clone()
    }

    /// Returns the number of notices delivered so far.
    pub fn len(&self) -> usize {
        self.notices.read().unwrap().len()
    }

    /// Returns true if no notices have been delivered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for InMemoryNotifier {
    fn notify(&self, notice: UserNotice) {
        self.notices.write().unwrap().push(notice);
    }
}

/// Notifier that logs notices instead of displaying them.
///
/// Used as the default sink when the UI shell has not installed its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notice: UserNotice) {
        tracing::info!(?notice, "user notice");
    }
}
