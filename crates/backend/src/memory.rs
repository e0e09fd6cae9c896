//! In-memory backend for testing.
//!
//! Behaves like the managed backend at the interface boundary: server-side
//! row keys, atomic stock adjustments that refuse to go negative, and
//! per-operation failure injection for exercising partial-write paths.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use common::{OrderId, ProductId, Size, UserId};

use crate::catalog::{CatalogApi, CategoryWithProducts, ProductsAndCategories, validate_rating};
use crate::inventory::InventoryApi;
use crate::orders::OrdersApi;
use crate::records::{
    CategoryRecord, NewOrder, NewOrderItem, NewReview, OrderDetail, OrderItemRecord,
    OrderLineDetail, OrderRecord, ProductRecord, ReviewRecord,
};
use crate::status::OrderStatus;
use crate::{BackendError, Result};

#[derive(Debug, Default)]
struct BackendState {
    products: Vec<ProductRecord>,
    categories: Vec<CategoryRecord>,
    stock: HashMap<(ProductId, Size), u32>,
    orders: Vec<OrderRecord>,
    order_items: Vec<OrderItemRecord>,
    favorites: HashSet<(UserId, ProductId)>,
    reviews: Vec<ReviewRecord>,
    next_order_id: i64,
    next_item_id: i64,
    next_review_id: i64,
    decrement_log: Vec<(ProductId, Size, u32)>,
    increment_log: Vec<(ProductId, Size, u32)>,
    confirmed_payments: Vec<(OrderId, String)>,
    create_order_delay: Option<std::time::Duration>,
    fail_on_create_order: bool,
    fail_on_insert_items: bool,
    fail_on_decrement: bool,
    fail_increment_for: Option<(ProductId, Size)>,
    fail_on_confirm_payment: bool,
    fail_on_delete_order: bool,
    fail_my_orders: bool,
    expire_session_on_my_orders: bool,
}

/// In-memory backend for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBackend {
    state: Arc<RwLock<BackendState>>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a product row.
    pub fn add_product(&self, product: ProductRecord) {
        self.state.write().unwrap().products.push(product);
    }

    /// Seeds a category row.
    pub fn add_category(&self, category: CategoryRecord) {
        self.state.write().unwrap().categories.push(category);
    }

    /// Seeds the stock level for a product/size pair.
    pub fn set_stock(&self, product: ProductId, size: Size, quantity: u32) {
        self.state
            .write()
            .unwrap()
            .stock
            .insert((product, size), quantity);
    }

    /// Returns the current stock for a product/size pair, if tracked.
    pub fn stock_of(&self, product: ProductId, size: Size) -> Option<u32> {
        self.state.read().unwrap().stock.get(&(product, size)).copied()
    }

    /// Returns the number of order headers stored.
    pub fn order_count(&self) -> usize {
        self.state.read().unwrap().orders.len()
    }

    /// Returns an order header by ID.
    pub fn order(&self, order: OrderId) -> Option<OrderRecord> {
        self.state
            .read()
            .unwrap()
            .orders
            .iter()
            .find(|o| o.id == order)
            .cloned()
    }

    /// Returns the number of line items stored for an order.
    pub fn item_count_for(&self, order: OrderId) -> usize {
        self.state
            .read()
            .unwrap()
            .order_items
            .iter()
            .filter(|i| i.order == order)
            .count()
    }

    /// Returns every decrement applied so far, in call order.
    pub fn decrement_log(&self) -> Vec<(ProductId, Size, u32)> {
        self.state.read().unwrap().decrement_log.clone()
    }

    /// Returns every increment applied so far, in call order.
    pub fn increment_log(&self) -> Vec<(ProductId, Size, u32)> {
        self.state.read().unwrap().increment_log.clone()
    }

    /// Returns confirmed payments as (order, transaction reference) pairs.
    pub fn confirmed_payments(&self) -> Vec<(OrderId, String)> {
        self.state.read().unwrap().confirmed_payments.clone()
    }

    /// Configures the backend to fail order-header inserts.
    pub fn set_fail_on_create_order(&self, fail: bool) {
        self.state.write().unwrap().fail_on_create_order = fail;
    }

    /// Delays order-header inserts, for exercising in-flight guards.
    pub fn set_create_order_delay(&self, delay: std::time::Duration) {
        self.state.write().unwrap().create_order_delay = Some(delay);
    }

    /// Configures the backend to fail line-item inserts.
    pub fn set_fail_on_insert_items(&self, fail: bool) {
        self.state.write().unwrap().fail_on_insert_items = fail;
    }

    /// Configures the backend to refuse stock decrements.
    pub fn set_fail_on_decrement(&self, fail: bool) {
        self.state.write().unwrap().fail_on_decrement = fail;
    }

    /// Configures the backend to refuse increments for one product/size pair.
    pub fn set_fail_increment_for(&self, target: Option<(ProductId, Size)>) {
        self.state.write().unwrap().fail_increment_for = target;
    }

    /// Configures the backend to fail payment confirmations.
    pub fn set_fail_on_confirm_payment(&self, fail: bool) {
        self.state.write().unwrap().fail_on_confirm_payment = fail;
    }

    /// Configures the backend to fail order deletions.
    pub fn set_fail_on_delete_order(&self, fail: bool) {
        self.state.write().unwrap().fail_on_delete_order = fail;
    }

    /// Configures the backend to fail order-list reads.
    pub fn set_fail_my_orders(&self, fail: bool) {
        self.state.write().unwrap().fail_my_orders = fail;
    }

    /// Configures order-list reads to fail with an expired-session error.
    pub fn set_expire_session_on_my_orders(&self, expire: bool) {
        self.state.write().unwrap().expire_session_on_my_orders = expire;
    }
}

#[async_trait]
impl OrdersApi for InMemoryBackend {
    async fn create_order(&self, user: UserId, order: NewOrder) -> Result<OrderRecord> {
        let delay = self.state.read().unwrap().create_order_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.write().unwrap();

        if state.fail_on_create_order {
            return Err(BackendError::Api {
                message: "order insert rejected".to_string(),
            });
        }

        state.next_order_id += 1;
        let record = OrderRecord {
            id: OrderId::new(state.next_order_id),
            slug: order.slug,
            user,
            status: OrderStatus::Pending,
            total_price: order.total_price,
            customer_name: order.customer_name,
            customer_phone: order.customer_phone,
            customer_address: order.customer_address,
            created_at: Utc::now(),
        };
        state.orders.push(record.clone());
        Ok(record)
    }

    async fn insert_order_items(&self, items: Vec<NewOrderItem>) -> Result<Vec<OrderItemRecord>> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_insert_items {
            return Err(BackendError::Api {
                message: "order_item insert rejected".to_string(),
            });
        }

        let mut inserted = Vec::with_capacity(items.len());
        for item in items {
            state.next_item_id += 1;
            let record = OrderItemRecord {
                id: state.next_item_id,
                order: item.order,
                product: item.product,
                quantity: item.quantity,
                size: item.size,
            };
            state.order_items.push(record);
            inserted.push(record);
        }
        Ok(inserted)
    }

    async fn my_orders(&self, user: UserId) -> Result<Vec<OrderRecord>> {
        let state = self.state.read().unwrap();

        if state.expire_session_on_my_orders {
            return Err(BackendError::SessionExpired);
        }
        if state.fail_my_orders {
            return Err(BackendError::Api {
                message: "order read rejected".to_string(),
            });
        }

        let mut orders: Vec<OrderRecord> = state
            .orders
            .iter()
            .filter(|o| o.user == user)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn order_by_slug(&self, user: UserId, slug: &str) -> Result<OrderDetail> {
        let state = self.state.read().unwrap();

        let order = state
            .orders
            .iter()
            .find(|o| o.slug == slug && o.user == user)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                what: format!("order {slug}"),
            })?;

        let mut lines = Vec::new();
        for item in state.order_items.iter().filter(|i| i.order == order.id) {
            let product = state
                .products
                .iter()
                .find(|p| p.id == item.product)
                .cloned()
                .ok_or_else(|| BackendError::NotFound {
                    what: format!("product {}", item.product),
                })?;
            lines.push(OrderLineDetail {
                item: *item,
                product,
            });
        }

        Ok(OrderDetail { order, lines })
    }

    async fn order_items(&self, order: OrderId) -> Result<Vec<OrderItemRecord>> {
        Ok(self
            .state
            .read()
            .unwrap()
            .order_items
            .iter()
            .filter(|i| i.order == order)
            .copied()
            .collect())
    }

    async fn set_status(&self, order: OrderId, status: OrderStatus) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let record = state
            .orders
            .iter_mut()
            .find(|o| o.id == order)
            .ok_or_else(|| BackendError::NotFound {
                what: format!("order {order}"),
            })?;
        record.status = status;
        Ok(())
    }

    async fn confirm_payment(&self, order: OrderId, txn_ref: &str) -> Result<()> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_confirm_payment {
            return Err(BackendError::Api {
                message: "payment confirmation rejected".to_string(),
            });
        }

        let record = state
            .orders
            .iter_mut()
            .find(|o| o.id == order)
            .ok_or_else(|| BackendError::NotFound {
                what: format!("order {order}"),
            })?;
        record.status = OrderStatus::Processing;
        state.confirmed_payments.push((order, txn_ref.to_string()));
        Ok(())
    }

    async fn delete_order(&self, order: OrderId) -> Result<()> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_delete_order {
            return Err(BackendError::Api {
                message: "order delete rejected".to_string(),
            });
        }

        state.orders.retain(|o| o.id != order);
        state.order_items.retain(|i| i.order != order);
        Ok(())
    }
}

#[async_trait]
impl InventoryApi for InMemoryBackend {
    async fn decrement(&self, product: ProductId, size: Size, quantity: u32) -> Result<()> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_decrement {
            return Err(BackendError::Api {
                message: "inventory adjustment rejected".to_string(),
            });
        }

        let available =
            state
                .stock
                .get_mut(&(product, size))
                .ok_or_else(|| BackendError::NotFound {
                    what: format!("stock for product {product} size {size}"),
                })?;

        if *available < quantity {
            return Err(BackendError::OutOfStock { product, size });
        }

        *available -= quantity;
        state.decrement_log.push((product, size, quantity));
        Ok(())
    }

    async fn increment(&self, product: ProductId, size: Size, quantity: u32) -> Result<()> {
        let mut state = self.state.write().unwrap();

        if state.fail_increment_for == Some((product, size)) {
            return Err(BackendError::Api {
                message: "inventory adjustment rejected".to_string(),
            });
        }

        *state.stock.entry((product, size)).or_insert(0) += quantity;
        state.increment_log.push((product, size, quantity));
        Ok(())
    }

    async fn quantity_available(&self, product: ProductId, size: Size) -> Result<u32> {
        self.state
            .read()
            .unwrap()
            .stock
            .get(&(product, size))
            .copied()
            .ok_or_else(|| BackendError::NotFound {
                what: format!("stock for product {product} size {size}"),
            })
    }
}

#[async_trait]
impl CatalogApi for InMemoryBackend {
    async fn products_and_categories(&self) -> Result<ProductsAndCategories> {
        let state = self.state.read().unwrap();
        Ok(ProductsAndCategories {
            products: state.products.clone(),
            categories: state.categories.clone(),
        })
    }

    async fn product_by_slug(&self, slug: &str) -> Result<ProductRecord> {
        self.state
            .read()
            .unwrap()
            .products
            .iter()
            .find(|p| p.slug == slug)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                what: format!("product {slug}"),
            })
    }

    async fn category_with_products(&self, slug: &str) -> Result<CategoryWithProducts> {
        let state = self.state.read().unwrap();
        let category = state
            .categories
            .iter()
            .find(|c| c.slug == slug)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                what: format!("category {slug}"),
            })?;
        let products = state
            .products
            .iter()
            .filter(|p| p.category == category.id)
            .cloned()
            .collect();
        Ok(CategoryWithProducts { category, products })
    }

    async fn favorites(&self, user: UserId) -> Result<Vec<ProductRecord>> {
        let state = self.state.read().unwrap();
        Ok(state
            .products
            .iter()
            .filter(|p| state.favorites.contains(&(user, p.id)))
            .cloned()
            .collect())
    }

    async fn toggle_favorite(&self, user: UserId, product: ProductId) -> Result<bool> {
        let mut state = self.state.write().unwrap();
        if state.favorites.remove(&(user, product)) {
            Ok(false)
        } else {
            state.favorites.insert((user, product));
            Ok(true)
        }
    }

    async fn reviews(&self, product: ProductId) -> Result<Vec<ReviewRecord>> {
        let mut reviews: Vec<ReviewRecord> = self
            .state
            .read()
            .unwrap()
            .reviews
            .iter()
            .filter(|r| r.product == product)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(reviews)
    }

    async fn add_review(&self, user: UserId, review: NewReview) -> Result<ReviewRecord> {
        validate_rating(review.rating)?;

        let mut state = self.state.write().unwrap();
        state.next_review_id += 1;
        let record = ReviewRecord {
            id: state.next_review_id,
            product: review.product,
            user,
            rating: review.rating,
            comment: review.comment,
            created_at: Utc::now(),
        };
        state.reviews.push(record.clone());
        Ok(record)
    }
}
