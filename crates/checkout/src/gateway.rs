//! Payment gateway integrations.
//!
//! Two integration styles are in production use: a hosted-checkout gateway
//! whose payment URL is constructed locally, and a backend-brokered gateway
//! where an order-owned endpoint creates the payment session and hands back
//! the URL. Both end the same way: the user finishes on the gateway page
//! and returns through the deep-link protocol handled by
//! [`crate::PaymentRedirectHandler`].

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use backend::{BackendError, with_timeout};
use common::{Money, OrderId};
use serde::Deserialize;

use crate::error::CheckoutError;

/// The order reference and amount a payment session is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentRequest {
    /// The order being paid for.
    pub order_id: OrderId,
    /// The amount to charge.
    pub amount: Money,
}

/// Trait for creating a gateway payment session.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// The gateway's identifier, used in broker endpoints and logs.
    fn name(&self) -> &str;

    /// Creates a payment session and returns the URL to open externally.
    async fn payment_url(&self, request: PaymentRequest) -> Result<String, CheckoutError>;
}

/// Hosted-checkout gateway: the payment URL is built locally with the
/// amount and the return/cancel deep links, no broker involved.
pub struct HostedCheckoutGateway {
    checkout_url: String,
    business: String,
    scheme: String,
}

impl HostedCheckoutGateway {
    /// Creates a gateway pointing at a hosted checkout page.
    ///
    /// `scheme` is the app's deep-link scheme used for the return and
    /// cancel URLs.
    pub fn new(
        checkout_url: impl Into<String>,
        business: impl Into<String>,
        scheme: impl Into<String>,
    ) -> Self {
        Self {
            checkout_url: checkout_url.into(),
            business: business.into(),
            scheme: scheme.into(),
        }
    }
}

#[async_trait]
impl PaymentGateway for HostedCheckoutGateway {
    fn name(&self) -> &str {
        "hosted"
    }

    async fn payment_url(&self, request: PaymentRequest) -> Result<String, CheckoutError> {
        let query = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("cmd", "_xclick")
            .append_pair("business", &self.business)
            .append_pair("item_name", &format!("Order {}", request.order_id))
            .append_pair("amount", &request.amount.to_string())
            .append_pair("return", &format!("{}://payment-success", self.scheme))
            .append_pair("cancel_return", &format!("{}://payment-cancel", self.scheme))
            .finish();
        Ok(format!("{}?{}", self.checkout_url, query))
    }
}

/// Backend-brokered gateway: POSTs `{orderId, amount}` to the order-owned
/// payment endpoint and receives `{paymentUrl}`.
pub struct BrokeredGateway {
    http: reqwest::Client,
    api_base: String,
    gateway: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct PaymentUrlResponse {
    #[serde(rename = "paymentUrl")]
    payment_url: String,
}

impl BrokeredGateway {
    /// Creates a brokered gateway client for `{api_base}/api/payment/{gateway}`.
    pub fn new(
        api_base: impl Into<String>,
        gateway: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CheckoutError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(BackendError::from)?;
        Ok(Self {
            http,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            gateway: gateway.into(),
            timeout,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/payment/{}", self.api_base, self.gateway)
    }
}

#[async_trait]
impl PaymentGateway for BrokeredGateway {
    fn name(&self) -> &str {
        &self.gateway
    }

    #[tracing::instrument(skip(self), fields(gateway = %self.gateway, order = %request.order_id))]
    async fn payment_url(&self, request: PaymentRequest) -> Result<String, CheckoutError> {
        let response = with_timeout("create gateway payment", self.timeout, async {
            let resp = self
                .http
                .post(self.endpoint())
                .json(&serde_json::json!({
                    "orderId": request.order_id,
                    "amount": request.amount,
                }))
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(BackendError::Api {
                    message: format!("payment broker returned {}", resp.status()),
                });
            }
            Ok(resp.json::<PaymentUrlResponse>().await?)
        })
        .await?;

        if response.payment_url.is_empty() {
            return Err(CheckoutError::Gateway {
                message: "payment broker returned an empty payment URL".to_string(),
            });
        }
        Ok(response.payment_url)
    }
}

#[derive(Debug, Default)]
struct InMemoryGatewayState {
    requests: Vec<PaymentRequest>,
    fail_on_create: bool,
}

/// In-memory gateway for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<RwLock<InMemoryGatewayState>>,
}

impl InMemoryGateway {
    /// Creates a new in-memory gateway.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the gateway to fail session creation.
    pub fn set_fail_on_create(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create = fail;
    }

    /// Returns every payment request received so far.
    pub fn requests(&self) -> Vec<PaymentRequest> {
        self.state.read().unwrap().requests.clone()
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn payment_url(&self, request: PaymentRequest) -> Result<String, CheckoutError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_create {
            return Err(CheckoutError::Gateway {
                message: "simulated session failure".to_string(),
            });
        }

        state.requests.push(request);
        Ok(format!("https://pay.example/session/{}", request.order_id))
    }
}
