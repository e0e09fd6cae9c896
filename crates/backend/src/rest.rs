//! REST implementation of the backend traits.
//!
//! Speaks the managed store's HTTP dialect: row operations under
//! `rest/v1/<table>` with `column=eq.value` filters, remote procedures under
//! `rest/v1/rpc/<fn>`, and session teardown under `auth/v1/logout`. Every
//! call runs under the configured deadline via [`with_timeout`], so a hung
//! transport surfaces as [`BackendError::Timeout`] instead of holding the
//! caller indefinitely.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{OrderId, ProductId, Size, UserId};
use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio::sync::broadcast;

use crate::catalog::{CatalogApi, CategoryWithProducts, ProductsAndCategories, validate_rating};
use crate::inventory::InventoryApi;
use crate::orders::OrdersApi;
use crate::records::{
    CategoryRecord, NewOrder, NewOrderItem, NewReview, OrderDetail, OrderItemRecord,
    OrderLineDetail, OrderRecord, ProductRecord, ReviewRecord, StockLevel,
};
use crate::session::{AuthEvent, AuthEventStream, Session, SessionApi, subscribe};
use crate::status::OrderStatus;
use crate::timeout::with_timeout;
use crate::{BackendError, Result};

/// Error body returned by the remote store on rejected requests.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: Option<String>,
}

/// Backend client speaking the managed store's REST dialect.
#[derive(Clone)]
pub struct RestBackend {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    timeout: Duration,
    session: Arc<RwLock<Option<Session>>>,
    events: broadcast::Sender<AuthEvent>,
}

impl RestBackend {
    /// Creates a client for the store at `base_url` using the given anon key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        let (events, _) = broadcast::channel(16);
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
            session: Arc::new(RwLock::new(None)),
            events,
        })
    }

    /// Installs a session obtained by the authentication shell and emits
    /// `SignedIn`.
    pub fn set_session(&self, session: Session) {
        let user_id = session.user_id;
        *self.session.write().unwrap() = Some(session);
        let _ = self.events.send(AuthEvent::SignedIn(user_id));
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn bearer(&self) -> String {
        self.session
            .read()
            .unwrap()
            .as_ref()
            .map(|s| s.access_token.clone())
            .unwrap_or_else(|| self.api_key.clone())
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        metrics::counter!("backend_requests_total").increment(1);
        self.http
            .request(method, self.endpoint(path))
            .header("apikey", &self.api_key)
            .bearer_auth(self.bearer())
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(BackendError::SessionExpired);
        }
        if status == StatusCode::NOT_FOUND {
            let what = resp.url().path().to_string();
            return Err(BackendError::NotFound { what });
        }

        let message = match resp.json::<ApiErrorBody>().await {
            Ok(body) => body.message.unwrap_or_else(|| status.to_string()),
            Err(_) => status.to_string(),
        };
        Err(BackendError::Api { message })
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        op: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>> {
        with_timeout(op, self.timeout, async {
            let resp = self
                .request(reqwest::Method::GET, path)
                .query(query)
                .send()
                .await?;
            Ok(Self::check(resp).await?.json().await?)
        })
        .await
    }

    async fn fetch_single<T: DeserializeOwned>(
        &self,
        op: &'static str,
        path: &str,
        query: &[(&str, String)],
        what: impl Into<String>,
    ) -> Result<T> {
        let rows: Vec<T> = self.fetch_rows(op, path, query).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound { what: what.into() })
    }

    fn in_filter<I: std::fmt::Display>(ids: impl IntoIterator<Item = I>) -> String {
        let joined = ids
            .into_iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        format!("in.({joined})")
    }
}

#[async_trait]
impl OrdersApi for RestBackend {
    #[tracing::instrument(skip(self, order), fields(slug = %order.slug))]
    async fn create_order(&self, user: UserId, order: NewOrder) -> Result<OrderRecord> {
        with_timeout("create order", self.timeout, async {
            let body = serde_json::json!({
                "slug": order.slug,
                "user": user,
                "status": OrderStatus::Pending,
                "totalPrice": order.total_price,
                "customer_name": order.customer_name,
                "customer_phone": order.customer_phone,
                "customer_address": order.customer_address,
            });
            let resp = self
                .request(reqwest::Method::POST, "rest/v1/order")
                .header("Prefer", "return=representation")
                .json(&body)
                .send()
                .await?;
            let rows: Vec<OrderRecord> = Self::check(resp).await?.json().await?;
            rows.into_iter().next().ok_or_else(|| BackendError::Api {
                message: "order insert returned no row".to_string(),
            })
        })
        .await
    }

    #[tracing::instrument(skip(self, items), fields(count = items.len()))]
    async fn insert_order_items(&self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItemRecord>> {
        with_timeout("insert order items", self.timeout, async {
            let resp = self
                .request(reqwest::Method::POST, "rest/v1/order_item")
                .header("Prefer", "return=representation")
                .json(&items)
                .send()
                .await?;
            Ok(Self::check(resp).await?.json().await?)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn my_orders(&self, user: UserId) -> Result<Vec<OrderRecord>> {
        self.fetch_rows(
            "list orders",
            "rest/v1/order",
            &[
                ("select", "*".to_string()),
                ("user", format!("eq.{user}")),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn order_by_slug(&self, user: UserId, slug: &str) -> Result<OrderDetail> {
        let order: OrderRecord = self
            .fetch_single(
                "read order",
                "rest/v1/order",
                &[
                    ("select", "*".to_string()),
                    ("slug", format!("eq.{slug}")),
                    ("user", format!("eq.{user}")),
                ],
                format!("order {slug}"),
            )
            .await?;

        let items = self.order_items(order.id).await?;
        if items.is_empty() {
            return Ok(OrderDetail {
                order,
                lines: Vec::new(),
            });
        }

        let products: Vec<ProductRecord> = self
            .fetch_rows(
                "read order products",
                "rest/v1/product",
                &[
                    ("select", "*".to_string()),
                    ("id", Self::in_filter(items.iter().map(|i| i.product))),
                ],
            )
            .await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            let product = products
                .iter()
                .find(|p| p.id == item.product)
                .cloned()
                .ok_or_else(|| BackendError::NotFound {
                    what: format!("product {}", item.product),
                })?;
            lines.push(OrderLineDetail { item, product });
        }

        Ok(OrderDetail { order, lines })
    }

    #[tracing::instrument(skip(self))]
    async fn order_items(&self, order: OrderId) -> Result<Vec<OrderItemRecord>> {
        self.fetch_rows(
            "read order items",
            "rest/v1/order_item",
            &[
                ("select", "*".to_string()),
                ("order", format!("eq.{order}")),
            ],
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn set_status(&self, order: OrderId, status: OrderStatus) -> Result<()> {
        with_timeout("update order status", self.timeout, async {
            let resp = self
                .request(reqwest::Method::PATCH, "rest/v1/order")
                .query(&[("id", format!("eq.{order}"))])
                .json(&serde_json::json!({ "status": status }))
                .send()
                .await?;
            Self::check(resp).await?;
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn confirm_payment(&self, order: OrderId, txn_ref: &str) -> Result<()> {
        with_timeout("confirm payment", self.timeout, async {
            let resp = self
                .request(reqwest::Method::POST, "rest/v1/rpc/confirm_order_payment")
                .json(&serde_json::json!({
                    "order_id": order,
                    "txn_ref": txn_ref,
                }))
                .send()
                .await?;
            Self::check(resp).await?;
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_order(&self, order: OrderId) -> Result<()> {
        with_timeout("delete order", self.timeout, async {
            let resp = self
                .request(reqwest::Method::DELETE, "rest/v1/order")
                .query(&[("id", format!("eq.{order}"))])
                .send()
                .await?;
            Self::check(resp).await?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl InventoryApi for RestBackend {
    #[tracing::instrument(skip(self))]
    async fn decrement(&self, product: ProductId, size: Size, quantity: u32) -> Result<()> {
        with_timeout("decrement inventory", self.timeout, async {
            let resp = self
                .request(reqwest::Method::POST, "rest/v1/rpc/decrement_product_quantity")
                .json(&serde_json::json!({
                    "product_id": product,
                    "size": size,
                    "quantity": quantity,
                }))
                .send()
                .await?;
            // The RPC refuses decrements that would go negative with 409.
            if resp.status() == StatusCode::CONFLICT {
                return Err(BackendError::OutOfStock { product, size });
            }
            Self::check(resp).await?;
            metrics::counter!("inventory_decrements_total").increment(1);
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn increment(&self, product: ProductId, size: Size, quantity: u32) -> Result<()> {
        with_timeout("increment inventory", self.timeout, async {
            let resp = self
                .request(reqwest::Method::POST, "rest/v1/rpc/increment_product_quantity")
                .json(&serde_json::json!({
                    "product_id": product,
                    "size": size,
                    "quantity": quantity,
                }))
                .send()
                .await?;
            Self::check(resp).await?;
            metrics::counter!("inventory_increments_total").increment(1);
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn quantity_available(&self, product: ProductId, size: Size) -> Result<u32> {
        let stock: StockLevel = self
            .fetch_single(
                "read stock",
                "rest/v1/product_size",
                &[
                    ("select", "*".to_string()),
                    ("product", format!("eq.{product}")),
                    ("size", format!("eq.{size}")),
                ],
                format!("stock for product {product} size {size}"),
            )
            .await?;
        Ok(stock.quantity)
    }
}

#[async_trait]
impl CatalogApi for RestBackend {
    #[tracing::instrument(skip(self))]
    async fn products_and_categories(&self) -> Result<ProductsAndCategories> {
        let select = [("select", "*".to_string())];
        let (products, categories) = tokio::join!(
            self.fetch_rows::<ProductRecord>("list products", "rest/v1/product", &select),
            self.fetch_rows::<CategoryRecord>("list categories", "rest/v1/category", &select),
        );
        Ok(ProductsAndCategories {
            products: products?,
            categories: categories?,
        })
    }

    #[tracing::instrument(skip(self))]
    async fn product_by_slug(&self, slug: &str) -> Result<ProductRecord> {
        self.fetch_single(
            "read product",
            "rest/v1/product",
            &[
                ("select", "*".to_string()),
                ("slug", format!("eq.{slug}")),
            ],
            format!("product {slug}"),
        )
        .await
    }

    #[tracing::instrument(skip(self))]
    async fn category_with_products(&self, slug: &str) -> Result<CategoryWithProducts> {
        let category: CategoryRecord = self
            .fetch_single(
                "read category",
                "rest/v1/category",
                &[
                    ("select", "*".to_string()),
                    ("slug", format!("eq.{slug}")),
                ],
                format!("category {slug}"),
            )
            .await?;

        let products = self
            .fetch_rows(
                "list category products",
                "rest/v1/product",
                &[
                    ("select", "*".to_string()),
                    ("category", format!("eq.{}", category.id)),
                ],
            )
            .await?;

        Ok(CategoryWithProducts { category, products })
    }

    #[tracing::instrument(skip(self))]
    async fn favorites(&self, user: UserId) -> Result<Vec<ProductRecord>> {
        #[derive(Deserialize)]
        struct FavoriteRow {
            product: ProductRecord,
        }

        let rows: Vec<FavoriteRow> = self
            .fetch_rows(
                "list favorites",
                "rest/v1/favorite_product",
                &[
                    ("select", "product(*)".to_string()),
                    ("user", format!("eq.{user}")),
                ],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.product).collect())
    }

    #[tracing::instrument(skip(self))]
    async fn toggle_favorite(&self, user: UserId, product: ProductId) -> Result<bool> {
        #[derive(Deserialize)]
        struct FavoriteKey {
            #[allow(dead_code)]
            product: ProductId,
        }

        let existing: Vec<FavoriteKey> = self
            .fetch_rows(
                "read favorite",
                "rest/v1/favorite_product",
                &[
                    ("select", "product".to_string()),
                    ("user", format!("eq.{user}")),
                    ("product", format!("eq.{product}")),
                ],
            )
            .await?;

        if existing.is_empty() {
            with_timeout("add favorite", self.timeout, async {
                let resp = self
                    .request(reqwest::Method::POST, "rest/v1/favorite_product")
                    .json(&serde_json::json!({ "user": user, "product": product }))
                    .send()
                    .await?;
                Self::check(resp).await?;
                Ok(true)
            })
            .await
        } else {
            with_timeout("remove favorite", self.timeout, async {
                let resp = self
                    .request(reqwest::Method::DELETE, "rest/v1/favorite_product")
                    .query(&[
                        ("user", format!("eq.{user}")),
                        ("product", format!("eq.{product}")),
                    ])
                    .send()
                    .await?;
                Self::check(resp).await?;
                Ok(false)
            })
            .await
        }
    }

    #[tracing::instrument(skip(self))]
    async fn reviews(&self, product: ProductId) -> Result<Vec<ReviewRecord>> {
        self.fetch_rows(
            "list reviews",
            "rest/v1/product_review",
            &[
                ("select", "*".to_string()),
                ("product", format!("eq.{product}")),
                ("order", "created_at.desc".to_string()),
            ],
        )
        .await
    }

    #[tracing::instrument(skip(self, review))]
    async fn add_review(&self, user: UserId, review: NewReview) -> Result<ReviewRecord> {
        validate_rating(review.rating)?;

        with_timeout("add review", self.timeout, async {
            let body = serde_json::json!({
                "product": review.product,
                "user": user,
                "rating": review.rating,
                "comment": review.comment,
            });
            let resp = self
                .request(reqwest::Method::POST, "rest/v1/product_review")
                .header("Prefer", "return=representation")
                .json(&body)
                .send()
                .await?;
            let rows: Vec<ReviewRecord> = Self::check(resp).await?.json().await?;
            rows.into_iter().next().ok_or_else(|| BackendError::Api {
                message: "review insert returned no row".to_string(),
            })
        })
        .await
    }
}

#[async_trait]
impl SessionApi for RestBackend {
    async fn current_session(&self) -> Result<Option<Session>> {
        Ok(self.session.read().unwrap().clone())
    }

    #[tracing::instrument(skip(self))]
    async fn sign_out(&self) -> Result<()> {
        let remote = with_timeout("sign out", self.timeout, async {
            let resp = self
                .request(reqwest::Method::POST, "auth/v1/logout")
                .send()
                .await?;
            Self::check(resp).await?;
            Ok(())
        })
        .await;

        // The local session is cleared even when the remote call fails; an
        // unreachable backend must not leave the client half signed in.
        *self.session.write().unwrap() = None;
        let _ = self.events.send(AuthEvent::SignedOut);

        remote
    }

    fn auth_events(&self) -> AuthEventStream {
        subscribe(&self.events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use futures_util::StreamExt;

    fn client() -> RestBackend {
        RestBackend::new(
            "https://store.example.co/",
            "anon-key",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn session_for(user: UserId) -> Session {
        Session {
            user_id: user,
            access_token: "jwt-token".to_string(),
            expires_at: Utc::now() + ChronoDuration::hours(1),
        }
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        let backend = client();
        assert_eq!(
            backend.endpoint("rest/v1/order"),
            "https://store.example.co/rest/v1/order"
        );
    }

    #[test]
    fn bearer_falls_back_to_anon_key() {
        let backend = client();
        assert_eq!(backend.bearer(), "anon-key");

        backend.set_session(session_for(UserId::new()));
        assert_eq!(backend.bearer(), "jwt-token");
    }

    #[test]
    fn in_filter_joins_ids() {
        let ids = [ProductId::new(1), ProductId::new(7)];
        assert_eq!(RestBackend::in_filter(ids), "in.(1,7)");
    }

    #[tokio::test]
    async fn set_session_emits_signed_in() {
        let backend = client();
        let mut events = backend.auth_events();

        let user = UserId::new();
        backend.set_session(session_for(user));

        assert_eq!(events.next().await, Some(AuthEvent::SignedIn(user)));
        let session = backend.current_session().await.unwrap().unwrap();
        assert_eq!(session.user_id, user);
    }
}
