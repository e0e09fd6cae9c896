//! Storefront application context.
//!
//! [`Storefront`] is the explicit context object the UI shell owns: cart,
//! recently-viewed list, checkout coordinator, payment redirect handler,
//! and backend handles, wired together by dependency injection rather than
//! ambient globals. The shell drives it from the single cooperative UI
//! scheduler, so mutating methods take `&mut self` and there is no internal
//! locking.
//!
//! Auth state changes are consumed by the shell from
//! [`Storefront::auth_events`] and fed back through
//! [`Storefront::on_auth_event`], which re-scopes the cart and
//! recently-viewed list to the new identity before they are rendered again.

pub mod config;

use std::sync::Arc;

use backend::{
    AuthEvent, AuthEventStream, BackendError, CatalogApi, InventoryApi, OrdersApi, ProductRecord,
    RestBackend, SessionApi,
};
use cart::{CartStore, NewCartLine, RecentlyViewed, SizePrefs, ViewedProduct};
use checkout::{
    CancellationOutcome, CheckoutCoordinator, CheckoutError, CheckoutReceipt, CustomerInfo,
    PaymentGateway, PaymentRedirectHandler, PaymentRequest, RedirectResolution,
};
use common::{Identity, LogNotifier, Notifier, Size, UserId, UserNotice};
use local_store::{FileLocalStore, LocalStore};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use watcher::{OrderFeed, OrderStatusWatcher, WatcherHandle};

pub use config::Config;

/// Result of starting a gateway payment: the submitted order plus the URL
/// to open externally.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayHandoff {
    /// The submitted order.
    pub receipt: CheckoutReceipt,
    /// The gateway page to open.
    pub payment_url: String,
}

/// The storefront application context.
pub struct Storefront<B, S>
where
    B: OrdersApi + InventoryApi + CatalogApi + Clone + 'static,
    S: SessionApi + Clone + 'static,
{
    config: Config,
    backend: B,
    session: S,
    storage: Arc<dyn LocalStore>,
    notifier: Arc<dyn Notifier>,
    cart: CartStore,
    recents: RecentlyViewed,
    prefs: SizePrefs,
    coordinator: CheckoutCoordinator<B, B>,
    redirect: PaymentRedirectHandler<B>,
}

/// Context assembled over the REST backend.
pub type RestStorefront = Storefront<RestBackend, RestBackend>;

/// Initializes tracing from the configured filter directive.
pub fn init_tracing(config: &Config) {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

impl RestStorefront {
    /// Assembles the context over the REST backend and file-backed local
    /// storage, per the configuration.
    pub async fn connect(config: Config) -> Result<Self, BackendError> {
        let backend = RestBackend::new(
            config.backend_url.clone(),
            config.backend_anon_key.clone(),
            config.request_timeout,
        )?;
        let storage: Arc<dyn LocalStore> = Arc::new(FileLocalStore::new(config.data_dir.clone()));
        Ok(Self::new(config, backend.clone(), backend, storage, Arc::new(LogNotifier)).await)
    }
}

impl<B, S> Storefront<B, S>
where
    B: OrdersApi + InventoryApi + CatalogApi + Clone + 'static,
    S: SessionApi + Clone + 'static,
{
    /// Wires the context over the given backend, session, storage, and
    /// notifier handles, hydrating per-identity state before first render.
    pub async fn new(
        config: Config,
        backend: B,
        session: S,
        storage: Arc<dyn LocalStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let identity = match session.current_session().await {
            Ok(Some(s)) => Identity::User(s.user_id),
            Ok(None) => Identity::Guest,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read session, starting as guest");
                Identity::Guest
            }
        };

        let cart = CartStore::open(storage.clone(), identity).await;
        let recents = RecentlyViewed::open(storage.clone(), identity).await;
        let prefs = SizePrefs::new(storage.clone());
        let coordinator = CheckoutCoordinator::new(backend.clone(), backend.clone());
        let redirect = PaymentRedirectHandler::new(
            backend.clone(),
            storage.clone(),
            notifier.clone(),
            config.deep_link_scheme.clone(),
        );

        Self {
            config,
            backend,
            session,
            storage,
            notifier,
            cart,
            recents,
            prefs,
            coordinator,
            redirect,
        }
    }

    /// Returns the cart for rendering.
    pub fn cart(&self) -> &CartStore {
        &self.cart
    }

    /// Returns the cart for user-triggered mutations.
    pub fn cart_mut(&mut self) -> &mut CartStore {
        &mut self.cart
    }

    /// Returns the recently-viewed list.
    pub fn recently_viewed(&self) -> &RecentlyViewed {
        &self.recents
    }

    /// Returns the size-preference helper.
    pub fn size_prefs(&self) -> &SizePrefs {
        &self.prefs
    }

    /// Returns the backend handle for catalog reads.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Returns the local storage handle.
    pub fn storage(&self) -> &Arc<dyn LocalStore> {
        &self.storage
    }

    /// Subscribes to auth state changes; feed each event back through
    /// [`Storefront::on_auth_event`].
    pub fn auth_events(&self) -> AuthEventStream {
        self.session.auth_events()
    }

    /// Re-scopes per-identity state after an auth state change.
    ///
    /// Must run before the cart is rendered again so a stale or
    /// wrong-user cart is never shown.
    pub async fn on_auth_event(&mut self, event: AuthEvent) {
        match event {
            AuthEvent::SignedIn(user) => {
                self.cart.switch_identity(Identity::User(user)).await;
                self.recents.switch_identity(Identity::User(user)).await;
            }
            AuthEvent::SignedOut => {
                self.cart.switch_identity(Identity::Guest).await;
                self.recents.switch_identity(Identity::Guest).await;
            }
            AuthEvent::UserUpdated(_) => {}
        }
    }

    /// Adds a product/size to the cart.
    pub async fn add_to_cart(
        &mut self,
        product: &ProductRecord,
        size: Size,
        quantity: u32,
        max_quantity: u32,
    ) {
        self.cart
            .add_item(
                NewCartLine::new(
                    product.id,
                    size,
                    product.title.clone(),
                    product.hero_image.clone(),
                    product.price,
                )
                .with_quantity(quantity)
                .with_max_quantity(max_quantity),
            )
            .await;
        self.prefs.remember(product.id, size).await;
    }

    /// Records a product-detail view in the recently-viewed list.
    pub async fn record_product_view(&mut self, product: &ProductRecord) {
        self.recents
            .record(ViewedProduct {
                product_id: product.id,
                title: product.title.clone(),
                hero_image: product.hero_image.clone(),
                price: product.price,
            })
            .await;
    }

    /// Submits the cart as an order with direct (cash-on-delivery)
    /// payment.
    ///
    /// On success the cart is reset and an order-created notice is
    /// delivered; on failure the cart is left untouched and a single
    /// failure notice carries the human-readable reason.
    pub async fn checkout(
        &mut self,
        customer: &CustomerInfo,
    ) -> Result<CheckoutReceipt, CheckoutError> {
        let user = self.require_user().await?;
        let lines = self.cart.lines().to_vec();

        match self.coordinator.submit(user, &lines, customer).await {
            Ok(receipt) => {
                self.cart.reset().await;
                self.notifier.notify(UserNotice::OrderCreated {
                    slug: receipt.slug.clone(),
                });
                Ok(receipt)
            }
            Err(e) => {
                self.notifier.notify(UserNotice::CheckoutFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Submits the cart and opens a gateway payment for it.
    ///
    /// The order is written first; the pending-order marker is persisted
    /// before the handoff so a return after a process restart can still be
    /// resolved. The cart is reset only when the payment later confirms.
    pub async fn begin_gateway_payment(
        &mut self,
        gateway: &dyn PaymentGateway,
        customer: &CustomerInfo,
    ) -> Result<GatewayHandoff, CheckoutError> {
        let user = self.require_user().await?;
        let lines = self.cart.lines().to_vec();

        let receipt = match self.coordinator.submit(user, &lines, customer).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.notifier.notify(UserNotice::CheckoutFailed {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        self.redirect.begin(receipt.order_id).await?;

        let request = PaymentRequest {
            order_id: receipt.order_id,
            amount: receipt.total_price,
        };
        match gateway.payment_url(request).await {
            Ok(payment_url) => Ok(GatewayHandoff {
                receipt,
                payment_url,
            }),
            Err(e) => {
                // The handoff never happened; a stale marker must not
                // resolve a later, unrelated redirect.
                self.redirect.abandon().await;
                self.notifier.notify(UserNotice::CheckoutFailed {
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Resolves a payment-gateway deep-link return.
    pub async fn handle_payment_redirect(
        &mut self,
        url: &str,
    ) -> Result<RedirectResolution, CheckoutError> {
        let resolution = self.redirect.handle_return(url).await?;
        if matches!(resolution, RedirectResolution::PaymentConfirmed { .. }) {
            self.cart.reset().await;
        }
        Ok(resolution)
    }

    /// Requests cancellation of one of the user's orders by slug.
    pub async fn cancel_order(&self, slug: &str) -> Result<CancellationOutcome, CheckoutError> {
        let user = self.require_user().await?;
        let detail = self.backend.order_by_slug(user, slug).await?;

        let outcome = self.coordinator.request_cancellation(&detail.order).await?;

        self.notifier.notify(UserNotice::CancellationRequested {
            slug: slug.to_string(),
        });
        for (product, size) in &outcome.failed {
            self.notifier.notify(UserNotice::RestockFailed {
                product: *product,
                size: *size,
            });
        }
        Ok(outcome)
    }

    /// Spawns the order status watcher for the signed-in user.
    pub async fn spawn_order_watcher(
        &self,
    ) -> Result<(WatcherHandle, OrderFeed), CheckoutError> {
        let user = self.require_user().await?;
        let (watcher, feed) = OrderStatusWatcher::new(
            self.backend.clone(),
            self.session.clone(),
            self.notifier.clone(),
            user,
            self.config.poll_interval,
        );
        Ok((watcher.spawn(), feed))
    }

    async fn require_user(&self) -> Result<UserId, CheckoutError> {
        match self.session.current_session().await? {
            Some(session) => Ok(session.user_id),
            None => Err(BackendError::NotAuthenticated.into()),
        }
    }
}
