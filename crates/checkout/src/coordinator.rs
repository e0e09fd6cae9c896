//! Order submission coordinator.

use std::sync::atomic::{AtomicBool, Ordering};

use backend::{
    InventoryApi, NewOrder, NewOrderItem, OrderRecord, OrderStatus, OrdersApi,
    generate_order_slug,
};
use cart::CartLine;
use common::{Money, ProductId, Size, UserId};

use crate::customer::CustomerInfo;
use crate::error::CheckoutError;
use crate::phase::CheckoutPhase;
use crate::receipt::CheckoutReceipt;

/// Result of a cancellation request's stock restoration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancellationOutcome {
    /// Line items whose stock was restored.
    pub restored: usize,
    /// Product/size pairs whose restoration call failed.
    pub failed: Vec<(ProductId, Size)>,
}

impl CancellationOutcome {
    /// Returns true when every line item's stock was restored.
    pub fn fully_restored(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Orchestrates the multi-step order submission sequence.
///
/// The steps are strictly sequential because each depends on the identifier
/// produced by the previous one. None of the writes are idempotent, so the
/// coordinator carries an in-flight flag that rejects a second concurrent
/// submission for the same cart (the triggering UI action is
/// user-repeatable).
pub struct CheckoutCoordinator<O, I>
where
    O: OrdersApi,
    I: InventoryApi,
{
    orders: O,
    inventory: I,
    in_flight: AtomicBool,
}

/// Releases the in-flight flag on every exit path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<O, I> CheckoutCoordinator<O, I>
where
    O: OrdersApi,
    I: InventoryApi,
{
    /// Creates a new coordinator over the given backend handles.
    pub fn new(orders: O, inventory: I) -> Self {
        Self {
            orders,
            inventory,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Returns true while a submission is in flight.
    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Submits a cart snapshot as a new order.
    ///
    /// Runs the full sequence: validate, create the order header, insert
    /// line items, decrement inventory per line. On success the caller owns
    /// resetting the cart; on failure the cart must be left untouched so
    /// the user is not misled into thinking checkout completed.
    #[tracing::instrument(skip(self, lines, customer), fields(line_count = lines.len()))]
    pub async fn submit(
        &self,
        user: UserId,
        lines: &[CartLine],
        customer: &CustomerInfo,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);

        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            metrics::counter!("checkout_rejected_in_flight_total").increment(1);
            return Err(CheckoutError::InFlight);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let started = std::time::Instant::now();
        let result = self.run(user, lines, customer).await;
        metrics::histogram!("checkout_duration_seconds").record(started.elapsed().as_secs_f64());

        match &result {
            Ok(receipt) => {
                metrics::counter!("checkout_succeeded_total").increment(1);
                tracing::info!(order = %receipt.order_id, slug = %receipt.slug, "checkout succeeded");
            }
            Err(e) => {
                metrics::counter!("checkout_failed_total").increment(1);
                tracing::warn!(error = %e, "checkout failed");
            }
        }

        result
    }

    async fn run(
        &self,
        user: UserId,
        lines: &[CartLine],
        customer: &CustomerInfo,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        tracing::debug!(phase = %CheckoutPhase::Validating, "checkout phase");
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        customer.validate()?;

        let total_price = lines
            .iter()
            .fold(Money::zero(), |total, line| total + line.line_total());

        tracing::debug!(phase = %CheckoutPhase::CreatingOrder, "checkout phase");
        let order = self
            .orders
            .create_order(
                user,
                NewOrder {
                    slug: generate_order_slug(),
                    total_price,
                    customer_name: customer.name.clone(),
                    customer_phone: customer.phone.clone(),
                    customer_address: customer.address.clone(),
                },
            )
            .await?;

        tracing::debug!(phase = %CheckoutPhase::CreatingLineItems, "checkout phase");
        let items: Vec<NewOrderItem> = lines
            .iter()
            .map(|line| NewOrderItem {
                order: order.id,
                product: line.product_id,
                quantity: line.quantity,
                size: line.size,
            })
            .collect();
        // A failure here orphans the order header with no line items; the
        // header is left in place rather than deleted.
        self.orders
            .insert_order_items(items)
            .await
            .map_err(|source| CheckoutError::PartialWrite {
                phase: CheckoutPhase::CreatingLineItems,
                order_id: order.id,
                source,
            })?;

        tracing::debug!(phase = %CheckoutPhase::AdjustingInventory, "checkout phase");
        // Each decrement is atomic on the backend, but there is no
        // atomicity across lines: a mid-loop failure leaves the earlier
        // decrements applied.
        for line in lines {
            self.inventory
                .decrement(line.product_id, line.size, line.quantity)
                .await
                .map_err(|source| CheckoutError::PartialWrite {
                    phase: CheckoutPhase::AdjustingInventory,
                    order_id: order.id,
                    source,
                })?;
        }

        Ok(CheckoutReceipt {
            order_id: order.id,
            slug: order.slug,
            status: order.status,
            total_price,
            customer: customer.clone(),
            lines: lines.to_vec(),
        })
    }

    /// Requests cancellation of an order.
    ///
    /// Moves the order to `CancelRequested` (a request, not a final
    /// cancellation), then restores previously decremented stock one line
    /// item at a time. The status change and the restoration are
    /// independent operations: a failed increment is recorded in the
    /// outcome and the remaining increments are still attempted.
    #[tracing::instrument(skip(self, order), fields(order = %order.id, status = %order.status))]
    pub async fn request_cancellation(
        &self,
        order: &OrderRecord,
    ) -> Result<CancellationOutcome, CheckoutError> {
        if !order.status.can_request_cancellation() {
            return Err(CheckoutError::NotCancellable {
                status: order.status,
            });
        }

        let items = self.orders.order_items(order.id).await?;

        self.orders
            .set_status(order.id, OrderStatus::CancelRequested)
            .await?;
        metrics::counter!("order_cancellation_requests_total").increment(1);

        let mut failed = Vec::new();
        for item in &items {
            if let Err(e) = self
                .inventory
                .increment(item.product, item.size, item.quantity)
                .await
            {
                tracing::warn!(
                    error = %e,
                    product = %item.product,
                    size = %item.size,
                    "stock restoration failed"
                );
                failed.push((item.product, item.size));
            }
        }

        Ok(CancellationOutcome {
            restored: items.len() - failed.len(),
            failed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backend::InMemoryBackend;
    use std::sync::Arc;
    use std::time::Duration;

    fn customer() -> CustomerInfo {
        CustomerInfo::new("An Nguyen", "0900000000", "1 Le Loi")
    }

    fn line(product: i64, size: u32, quantity: u32, price: i64) -> CartLine {
        CartLine {
            product_id: ProductId::new(product),
            size: Size::new(size),
            title: format!("Product {product}"),
            hero_image: format!("https://cdn.example/{product}.jpg"),
            unit_price: Money::from_minor(price),
            quantity,
            max_quantity: 10,
        }
    }

    fn runner_x_line(quantity: u32) -> CartLine {
        line(1, 42, quantity, 500_000)
    }

    fn setup() -> (CheckoutCoordinator<InMemoryBackend, InMemoryBackend>, InMemoryBackend) {
        let backend = InMemoryBackend::new();
        backend.set_stock(ProductId::new(1), Size::new(42), 10);
        let coordinator = CheckoutCoordinator::new(backend.clone(), backend.clone());
        (coordinator, backend)
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_before_any_write() {
        let (coordinator, backend) = setup();

        let result = coordinator.submit(UserId::new(), &[], &customer()).await;

        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
        assert_eq!(backend.order_count(), 0);
    }

    #[tokio::test]
    async fn missing_customer_field_is_rejected_before_any_write() {
        let (coordinator, backend) = setup();
        let lines = vec![runner_x_line(1)];
        let incomplete = CustomerInfo::new("An Nguyen", "", "1 Le Loi");

        let result = coordinator.submit(UserId::new(), &lines, &incomplete).await;

        assert!(matches!(
            result,
            Err(CheckoutError::MissingField { field: "phone" })
        ));
        assert_eq!(backend.order_count(), 0);
        assert!(backend.decrement_log().is_empty());
    }

    #[tokio::test]
    async fn happy_path_creates_order_items_and_decrements_stock() {
        let (coordinator, backend) = setup();
        let lines = vec![runner_x_line(2)];

        let receipt = coordinator
            .submit(UserId::new(), &lines, &customer())
            .await
            .unwrap();

        assert_eq!(receipt.total_price, Money::from_minor(1_000_000));
        assert_eq!(receipt.status, OrderStatus::Pending);
        assert!(receipt.slug.starts_with("order-"));
        assert_eq!(receipt.lines.len(), 1);

        let order = backend.order(receipt.order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_price, Money::from_minor(1_000_000));
        assert_eq!(backend.item_count_for(receipt.order_id), 1);
        assert_eq!(
            backend.decrement_log(),
            vec![(ProductId::new(1), Size::new(42), 2)]
        );
        assert_eq!(backend.stock_of(ProductId::new(1), Size::new(42)), Some(8));
        assert!(!coordinator.is_in_flight());
    }

    #[tokio::test]
    async fn header_failure_leaves_nothing_behind() {
        let (coordinator, backend) = setup();
        backend.set_fail_on_create_order(true);
        let lines = vec![runner_x_line(1)];

        let result = coordinator.submit(UserId::new(), &lines, &customer()).await;

        assert!(matches!(result, Err(CheckoutError::Backend(_))));
        assert_eq!(backend.order_count(), 0);
        assert!(backend.decrement_log().is_empty());
    }

    #[tokio::test]
    async fn line_item_failure_orphans_the_header() {
        let (coordinator, backend) = setup();
        backend.set_fail_on_insert_items(true);
        let lines = vec![runner_x_line(1)];

        let result = coordinator.submit(UserId::new(), &lines, &customer()).await;

        let err = result.unwrap_err();
        let orphan = err.partial_order().expect("partial write expected");
        assert!(matches!(
            err,
            CheckoutError::PartialWrite {
                phase: CheckoutPhase::CreatingLineItems,
                ..
            }
        ));
        // The orphaned header stays: no compensating delete in this path.
        assert!(backend.order(orphan).is_some());
        assert_eq!(backend.item_count_for(orphan), 0);
        assert!(backend.decrement_log().is_empty());
    }

    #[tokio::test]
    async fn inventory_failure_keeps_order_and_items() {
        let (coordinator, backend) = setup();
        backend.set_fail_on_decrement(true);
        let lines = vec![runner_x_line(2)];

        let result = coordinator.submit(UserId::new(), &lines, &customer()).await;

        let err = result.unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::PartialWrite {
                phase: CheckoutPhase::AdjustingInventory,
                ..
            }
        ));
        let order_id = err.partial_order().unwrap();
        let order = backend.order(order_id).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(backend.item_count_for(order_id), 1);
        assert_eq!(backend.stock_of(ProductId::new(1), Size::new(42)), Some(10));
    }

    #[tokio::test]
    async fn mid_loop_inventory_failure_keeps_earlier_decrements() {
        let backend = InMemoryBackend::new();
        backend.set_stock(ProductId::new(1), Size::new(42), 10);
        // No stock row for product 2: its decrement fails after product 1's
        // decrement has already been applied.
        let coordinator = CheckoutCoordinator::new(backend.clone(), backend.clone());

        let lines = vec![
            runner_x_line(2),
            line(2, 40, 1, 750_000),
        ];

        let result = coordinator.submit(UserId::new(), &lines, &customer()).await;

        assert!(matches!(
            result,
            Err(CheckoutError::PartialWrite {
                phase: CheckoutPhase::AdjustingInventory,
                ..
            })
        ));
        // The applied decrement is not rolled back.
        assert_eq!(backend.stock_of(ProductId::new(1), Size::new(42)), Some(8));
    }

    #[tokio::test]
    async fn double_submit_creates_exactly_one_order() {
        let (coordinator, backend) = setup();
        backend.set_create_order_delay(Duration::from_millis(50));
        let coordinator = Arc::new(coordinator);
        let lines = vec![runner_x_line(1)];
        let user = UserId::new();

        let first = {
            let coordinator = Arc::clone(&coordinator);
            let lines = lines.clone();
            tokio::spawn(async move { coordinator.submit(user, &lines, &customer()).await })
        };
        // Give the first submission time to take the in-flight flag.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let second = coordinator.submit(user, &lines, &customer()).await;

        assert!(matches!(second, Err(CheckoutError::InFlight)));
        assert!(first.await.unwrap().is_ok());
        assert_eq!(backend.order_count(), 1);
    }

    #[tokio::test]
    async fn flag_is_released_after_failure() {
        let (coordinator, backend) = setup();
        backend.set_fail_on_create_order(true);
        let lines = vec![runner_x_line(1)];
        let user = UserId::new();

        assert!(coordinator.submit(user, &lines, &customer()).await.is_err());
        assert!(!coordinator.is_in_flight());

        backend.set_fail_on_create_order(false);
        assert!(coordinator.submit(user, &lines, &customer()).await.is_ok());
    }

    #[tokio::test]
    async fn cancellation_restores_stock_per_line() {
        let (coordinator, backend) = setup();
        backend.set_stock(ProductId::new(2), Size::new(40), 5);
        let lines = vec![
            runner_x_line(2),
            line(2, 40, 1, 750_000),
        ];

        let receipt = coordinator
            .submit(UserId::new(), &lines, &customer())
            .await
            .unwrap();
        let order = backend.order(receipt.order_id).unwrap();

        let outcome = coordinator.request_cancellation(&order).await.unwrap();

        assert!(outcome.fully_restored());
        assert_eq!(outcome.restored, 2);
        assert_eq!(
            backend.order(order.id).unwrap().status,
            OrderStatus::CancelRequested
        );
        assert_eq!(backend.stock_of(ProductId::new(1), Size::new(42)), Some(10));
        assert_eq!(backend.stock_of(ProductId::new(2), Size::new(40)), Some(5));
    }

    #[tokio::test]
    async fn failed_restock_does_not_stop_the_rest() {
        let (coordinator, backend) = setup();
        backend.set_stock(ProductId::new(2), Size::new(40), 5);
        let lines = vec![
            runner_x_line(2),
            line(2, 40, 1, 750_000),
        ];

        let receipt = coordinator
            .submit(UserId::new(), &lines, &customer())
            .await
            .unwrap();
        let order = backend.order(receipt.order_id).unwrap();

        // The first line's restock fails; the second must still run.
        backend.set_fail_increment_for(Some((ProductId::new(1), Size::new(42))));
        let outcome = coordinator.request_cancellation(&order).await.unwrap();

        assert_eq!(outcome.restored, 1);
        assert_eq!(outcome.failed, vec![(ProductId::new(1), Size::new(42))]);
        // Status change is independent of restoration failures.
        assert_eq!(
            backend.order(order.id).unwrap().status,
            OrderStatus::CancelRequested
        );
        assert_eq!(backend.stock_of(ProductId::new(2), Size::new(40)), Some(5));
        assert_eq!(backend.stock_of(ProductId::new(1), Size::new(42)), Some(8));
    }

    #[tokio::test]
    async fn shipped_orders_cannot_request_cancellation() {
        let (coordinator, backend) = setup();
        let lines = vec![runner_x_line(1)];

        let receipt = coordinator
            .submit(UserId::new(), &lines, &customer())
            .await
            .unwrap();
        backend
            .set_status(receipt.order_id, OrderStatus::Shipped)
            .await
            .unwrap();
        let order = backend.order(receipt.order_id).unwrap();

        let result = coordinator.request_cancellation(&order).await;
        assert!(matches!(
            result,
            Err(CheckoutError::NotCancellable {
                status: OrderStatus::Shipped
            })
        ));
        assert!(backend.increment_log().is_empty());
    }
}
