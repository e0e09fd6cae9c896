//! Payment redirect handling.
//!
//! Paying through a gateway leaves the process: the user finishes on an
//! external page and comes back via a deep link. Before the handoff the
//! pending order's ID is persisted, so the return can be resolved even
//! across a full process restart while the user is away. The marker is a
//! single scalar and is cleared on every exit path of the return handler;
//! a stale marker must never be acted on twice or leak across sessions.

use std::sync::Arc;

use backend::OrdersApi;
use common::{Notifier, OrderId, UserNotice};
use local_store::{LocalStore, LocalStoreExt, keys};

use crate::error::CheckoutError;

/// Deep-link host for a successful payment return.
pub const SUCCESS_HOST: &str = "payment-success";

/// Deep-link host for a cancelled or failed payment return.
pub const CANCEL_HOST: &str = "payment-cancel";

/// Query parameter carrying the gateway's response code.
const RESPONSE_CODE_PARAM: &str = "vnp_ResponseCode";

/// Query parameter carrying the gateway's transaction reference.
const TXN_REF_PARAM: &str = "vnp_TxnRef";

/// Response code the gateway sends for an approved payment.
const SUCCESS_CODE: &str = "00";

/// The gateway's verdict as carried by the return deep link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    /// The gateway approved the payment.
    Success {
        /// Transaction reference reported by the gateway.
        txn_ref: String,
    },

    /// The gateway declined the payment or the user cancelled.
    Failure {
        /// Error code reported by the gateway.
        code: String,
    },
}

impl RedirectOutcome {
    /// Parses a return deep link on the given app scheme.
    pub fn parse(url: &str, scheme: &str) -> Result<Self, CheckoutError> {
        let invalid = || CheckoutError::InvalidRedirect {
            url: url.to_string(),
        };

        let parsed = url::Url::parse(url).map_err(|_| invalid())?;
        if parsed.scheme() != scheme {
            return Err(invalid());
        }

        let mut code = None;
        let mut txn_ref = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                RESPONSE_CODE_PARAM => code = Some(value.into_owned()),
                TXN_REF_PARAM => txn_ref = Some(value.into_owned()),
                _ => {}
            }
        }

        match parsed.host_str() {
            Some(SUCCESS_HOST) => {
                let code = code.unwrap_or_default();
                if code == SUCCESS_CODE {
                    Ok(RedirectOutcome::Success {
                        txn_ref: txn_ref.unwrap_or_default(),
                    })
                } else {
                    Ok(RedirectOutcome::Failure { code })
                }
            }
            Some(CANCEL_HOST) => Ok(RedirectOutcome::Failure {
                code: code.unwrap_or_else(|| "cancelled".to_string()),
            }),
            _ => Err(invalid()),
        }
    }
}

/// How a handled redirect was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectResolution {
    /// Payment confirmed on the backend; the cart should now be reset.
    PaymentConfirmed {
        /// The order the payment belongs to.
        order_id: OrderId,
        /// Transaction reference reported by the gateway.
        txn_ref: String,
    },

    /// Payment declined; the pending order was deleted.
    PaymentRejected {
        /// The order the payment belonged to.
        order_id: OrderId,
        /// Error code reported by the gateway.
        code: String,
    },
}

/// Resolves payment-gateway redirect returns against the pending order.
pub struct PaymentRedirectHandler<O: OrdersApi> {
    orders: O,
    storage: Arc<dyn LocalStore>,
    notifier: Arc<dyn Notifier>,
    scheme: String,
}

impl<O: OrdersApi> PaymentRedirectHandler<O> {
    /// Creates a handler for deep links on the given app scheme.
    pub fn new(
        orders: O,
        storage: Arc<dyn LocalStore>,
        notifier: Arc<dyn Notifier>,
        scheme: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            storage,
            notifier,
            scheme: scheme.into(),
        }
    }

    /// Persists the pending-order marker before the app hands off to the
    /// gateway.
    ///
    /// This write must succeed: without the marker a later return cannot be
    /// resolved, so a storage failure here aborts the handoff.
    #[tracing::instrument(skip(self))]
    pub async fn begin(&self, order: OrderId) -> Result<(), CheckoutError> {
        self.storage.put_json(keys::PENDING_ORDER, &order).await?;
        Ok(())
    }

    /// Returns the pending-order marker, if one is set.
    pub async fn pending_order(&self) -> Result<Option<OrderId>, CheckoutError> {
        Ok(self.storage.get_json(keys::PENDING_ORDER).await?)
    }

    /// Clears the marker without acting on it, for handoffs that never
    /// left the app (e.g. the gateway session could not be created).
    pub async fn abandon(&self) {
        self.clear_marker().await;
    }

    /// Handles the deep-link return from a payment gateway.
    ///
    /// On success the payment is confirmed remotely; on failure the pending
    /// order is deleted. Either way, and also when resolution itself fails,
    /// the marker is cleared before this method returns.
    #[tracing::instrument(skip(self))]
    pub async fn handle_return(&self, url: &str) -> Result<RedirectResolution, CheckoutError> {
        let outcome = RedirectOutcome::parse(url, &self.scheme)?;

        let order_id = match self.storage.get_json::<OrderId>(keys::PENDING_ORDER).await {
            Ok(Some(order_id)) => order_id,
            Ok(None) => {
                // There is no order context to act on; guessing could
                // confirm or delete somebody else's order.
                self.notifier.notify(UserNotice::CheckoutFailed {
                    message: "payment returned but no order was pending".to_string(),
                });
                return Err(CheckoutError::MissingPendingOrder);
            }
            Err(e) => {
                self.clear_marker().await;
                return Err(e.into());
            }
        };

        let result = self.resolve(order_id, outcome).await;
        self.clear_marker().await;
        result
    }

    async fn resolve(
        &self,
        order_id: OrderId,
        outcome: RedirectOutcome,
    ) -> Result<RedirectResolution, CheckoutError> {
        match outcome {
            RedirectOutcome::Success { txn_ref } => {
                self.orders.confirm_payment(order_id, &txn_ref).await?;
                metrics::counter!("payments_confirmed_total").increment(1);
                tracing::info!(order = %order_id, txn_ref, "payment confirmed");
                self.notifier.notify(UserNotice::PaymentSucceeded {
                    txn_ref: txn_ref.clone(),
                });
                Ok(RedirectResolution::PaymentConfirmed { order_id, txn_ref })
            }
            RedirectOutcome::Failure { code } => {
                self.orders.delete_order(order_id).await?;
                metrics::counter!("payments_rejected_total").increment(1);
                tracing::warn!(order = %order_id, code, "payment rejected");
                self.notifier
                    .notify(UserNotice::PaymentFailed { code: code.clone() });
                Ok(RedirectResolution::PaymentRejected { order_id, code })
            }
        }
    }

    async fn clear_marker(&self) {
        if let Err(e) = self.storage.remove(keys::PENDING_ORDER).await {
            tracing::warn!(error = %e, "failed to clear pending-order marker");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::{InMemoryBackend, NewOrder, OrderStatus, generate_order_slug};
    use common::{InMemoryNotifier, Money, UserId};
    use local_store::InMemoryLocalStore;

    const SCHEME: &str = "solestride";

    #[test]
    fn parse_success_redirect() {
        let outcome = RedirectOutcome::parse(
            "solestride://payment-success?vnp_ResponseCode=00&vnp_TxnRef=TXN-123",
            SCHEME,
        )
        .unwrap();
        assert_eq!(
            outcome,
            RedirectOutcome::Success {
                txn_ref: "TXN-123".to_string()
            }
        );
    }

    #[test]
    fn parse_declined_redirect_on_success_host() {
        let outcome = RedirectOutcome::parse(
            "solestride://payment-success?vnp_ResponseCode=24",
            SCHEME,
        )
        .unwrap();
        assert_eq!(
            outcome,
            RedirectOutcome::Failure {
                code: "24".to_string()
            }
        );
    }

    #[test]
    fn parse_cancel_redirect() {
        let outcome = RedirectOutcome::parse("solestride://payment-cancel", SCHEME).unwrap();
        assert_eq!(
            outcome,
            RedirectOutcome::Failure {
                code: "cancelled".to_string()
            }
        );
    }

    #[test]
    fn parse_rejects_foreign_links() {
        assert!(RedirectOutcome::parse("https://example.com/callback", SCHEME).is_err());
        assert!(RedirectOutcome::parse("solestride://something-else", SCHEME).is_err());
        assert!(RedirectOutcome::parse("not a url", SCHEME).is_err());
    }

    struct Harness {
        handler: PaymentRedirectHandler<InMemoryBackend>,
        backend: InMemoryBackend,
        storage: Arc<InMemoryLocalStore>,
        notifier: InMemoryNotifier,
    }

    async fn setup() -> (Harness, OrderId) {
        let backend = InMemoryBackend::new();
        let storage = Arc::new(InMemoryLocalStore::new());
        let notifier = InMemoryNotifier::new();
        let handler = PaymentRedirectHandler::new(
            backend.clone(),
            storage.clone(),
            Arc::new(notifier.clone()),
            SCHEME,
        );

        let order = backend
            .create_order(
                UserId::new(),
                NewOrder {
                    slug: generate_order_slug(),
                    total_price: Money::from_minor(1_000_000),
                    customer_name: "An Nguyen".to_string(),
                    customer_phone: "0900000000".to_string(),
                    customer_address: "1 Le Loi".to_string(),
                },
            )
            .await
            .unwrap();

        (
            Harness {
                handler,
                backend,
                storage,
                notifier,
            },
            order.id,
        )
    }

    #[tokio::test]
    async fn begin_persists_the_marker() {
        let (h, order_id) = setup().await;

        h.handler.begin(order_id).await.unwrap();

        assert_eq!(h.handler.pending_order().await.unwrap(), Some(order_id));
    }

    #[tokio::test]
    async fn successful_return_confirms_payment_and_clears_marker() {
        let (h, order_id) = setup().await;
        h.handler.begin(order_id).await.unwrap();

        let resolution = h
            .handler
            .handle_return("solestride://payment-success?vnp_ResponseCode=00&vnp_TxnRef=TXN-9")
            .await
            .unwrap();

        assert_eq!(
            resolution,
            RedirectResolution::PaymentConfirmed {
                order_id,
                txn_ref: "TXN-9".to_string()
            }
        );
        assert_eq!(
            h.backend.confirmed_payments(),
            vec![(order_id, "TXN-9".to_string())]
        );
        assert_eq!(h.backend.order(order_id).unwrap().status, OrderStatus::Processing);
        assert_eq!(
            h.notifier.notices(),
            vec![UserNotice::PaymentSucceeded {
                txn_ref: "TXN-9".to_string()
            }]
        );
        assert!(!h.storage.contains_key(keys::PENDING_ORDER));
    }

    #[tokio::test]
    async fn failed_return_deletes_order_and_clears_marker() {
        let (h, order_id) = setup().await;
        h.handler.begin(order_id).await.unwrap();

        let resolution = h
            .handler
            .handle_return("solestride://payment-cancel?vnp_ResponseCode=24")
            .await
            .unwrap();

        assert_eq!(
            resolution,
            RedirectResolution::PaymentRejected {
                order_id,
                code: "24".to_string()
            }
        );
        assert!(h.backend.order(order_id).is_none());
        assert_eq!(
            h.notifier.notices(),
            vec![UserNotice::PaymentFailed {
                code: "24".to_string()
            }]
        );
        assert!(!h.storage.contains_key(keys::PENDING_ORDER));
    }

    #[tokio::test]
    async fn missing_marker_aborts_with_an_error() {
        let (h, _) = setup().await;

        let result = h
            .handler
            .handle_return("solestride://payment-success?vnp_ResponseCode=00")
            .await;

        assert!(matches!(result, Err(CheckoutError::MissingPendingOrder)));
        assert_eq!(h.backend.confirmed_payments().len(), 0);
        assert_eq!(h.notifier.len(), 1);
    }

    #[tokio::test]
    async fn marker_is_cleared_even_when_confirmation_fails() {
        let (h, order_id) = setup().await;
        h.handler.begin(order_id).await.unwrap();
        h.backend.set_fail_on_confirm_payment(true);

        let result = h
            .handler
            .handle_return("solestride://payment-success?vnp_ResponseCode=00&vnp_TxnRef=TXN-9")
            .await;

        assert!(matches!(result, Err(CheckoutError::Backend(_))));
        assert!(!h.storage.contains_key(keys::PENDING_ORDER));
    }

    #[tokio::test]
    async fn marker_is_cleared_even_when_deletion_fails() {
        let (h, order_id) = setup().await;
        h.handler.begin(order_id).await.unwrap();
        h.backend.set_fail_on_delete_order(true);

        let result = h.handler.handle_return("solestride://payment-cancel").await;

        assert!(matches!(result, Err(CheckoutError::Backend(_))));
        assert!(!h.storage.contains_key(keys::PENDING_ORDER));
    }

    #[tokio::test]
    async fn abandon_clears_the_marker_without_acting() {
        let (h, order_id) = setup().await;
        h.handler.begin(order_id).await.unwrap();

        h.handler.abandon().await;

        assert_eq!(h.handler.pending_order().await.unwrap(), None);
        assert!(h.backend.order(order_id).is_some());
        assert!(h.notifier.is_empty());
    }

    #[tokio::test]
    async fn second_return_cannot_act_on_a_cleared_marker() {
        let (h, order_id) = setup().await;
        h.handler.begin(order_id).await.unwrap();

        let url = "solestride://payment-success?vnp_ResponseCode=00&vnp_TxnRef=TXN-9";
        h.handler.handle_return(url).await.unwrap();

        let second = h.handler.handle_return(url).await;
        assert!(matches!(second, Err(CheckoutError::MissingPendingOrder)));
        assert_eq!(h.backend.confirmed_payments().len(), 1);
    }
}
