//! The cart store.

use std::sync::Arc;

use common::{Identity, Money, ProductId, Size};
use local_store::{LocalStore, LocalStoreExt, keys};

use crate::line::{CartLine, NewCartLine};

/// The authoritative client-side view of what the user intends to buy.
///
/// The store is an explicit context object owned by whoever owns the UI
/// tree; it is mutated only by user-triggered events on the cooperative
/// scheduler, so it takes `&mut self` and needs no internal locking.
///
/// Every mutation persists the full line-item table under the active
/// identity's key. Persistence is best-effort: a failed write is logged and
/// the in-memory state remains authoritative for the session.
pub struct CartStore {
    identity: Identity,
    lines: Vec<CartLine>,
    storage: Arc<dyn LocalStore>,
}

impl CartStore {
    /// Opens the cart for `identity`, hydrating persisted lines before the
    /// cart is first rendered.
    pub async fn open(storage: Arc<dyn LocalStore>, identity: Identity) -> Self {
        let mut store = Self {
            identity,
            lines: Vec::new(),
            storage,
        };
        store.hydrate().await;
        store
    }

    /// Switches to a new identity and reloads its persisted cart.
    ///
    /// Called on every sign-in/sign-out event so one user's cart never
    /// renders under another identity.
    pub async fn switch_identity(&mut self, identity: Identity) {
        if identity == self.identity {
            return;
        }
        self.identity = identity;
        self.hydrate().await;
    }

    /// Returns the identity this cart is scoped to.
    pub fn identity(&self) -> Identity {
        self.identity
    }

    /// Returns the cart's line items in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    /// Returns the line for a product/size pair, if present.
    pub fn find(&self, product: ProductId, size: Size) -> Option<&CartLine> {
        self.lines
            .iter()
            .find(|l| l.product_id == product && l.size == size)
    }

    /// Returns true when the cart has no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Adds units of a product/size to the cart.
    ///
    /// If a line with the same `(product, size)` exists its quantity grows
    /// by the requested amount, clamped to the existing line's cap (the
    /// cap recorded at first add is authoritative). Otherwise a new line is
    /// inserted.
    #[tracing::instrument(skip(self, new), fields(product = %new.product_id, size = %new.size))]
    pub async fn add_item(&mut self, new: NewCartLine) {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.product_id == new.product_id && l.size == new.size)
        {
            line.quantity = line
                .quantity
                .saturating_add(new.quantity.max(1))
                .min(line.max_quantity);
        } else {
            self.lines.push(new.into_line());
        }
        self.persist().await;
    }

    /// Removes the line for a product/size pair. No-op if absent.
    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&mut self, product: ProductId, size: Size) {
        let before = self.lines.len();
        self.lines
            .retain(|l| !(l.product_id == product && l.size == size));
        if self.lines.len() != before {
            self.persist().await;
        }
    }

    /// Adds one unit to every line of a product, each clamped to its cap.
    #[tracing::instrument(skip(self))]
    pub async fn increment_item(&mut self, product: ProductId) {
        for line in self.lines.iter_mut().filter(|l| l.product_id == product) {
            if line.quantity < line.max_quantity {
                line.quantity += 1;
            }
        }
        self.persist().await;
    }

    /// Removes one unit from every line of a product, floored at 1.
    ///
    /// Decrementing at quantity 1 is a no-op; dropping a line entirely is
    /// the explicit removal action, not a side effect of this one.
    #[tracing::instrument(skip(self))]
    pub async fn decrement_item(&mut self, product: ProductId) {
        for line in self.lines.iter_mut().filter(|l| l.product_id == product) {
            if line.quantity > 1 {
                line.quantity -= 1;
            }
        }
        self.persist().await;
    }

    /// Returns the sum of `unit_price * quantity` over all lines.
    pub fn total_price(&self) -> Money {
        self.lines
            .iter()
            .fold(Money::zero(), |total, line| total + line.line_total())
    }

    /// Returns the sum of quantities over all lines.
    pub fn item_count(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    /// Clears all lines and the persisted copy for the current identity.
    #[tracing::instrument(skip(self))]
    pub async fn reset(&mut self) {
        self.lines.clear();
        let key = keys::cart_items(&self.identity);
        if let Err(e) = self.storage.remove(&key).await {
            tracing::warn!(error = %e, key, "failed to clear persisted cart");
        }
    }

    async fn hydrate(&mut self) {
        let key = keys::cart_items(&self.identity);
        match self.storage.get_json::<Vec<CartLine>>(&key).await {
            Ok(Some(lines)) => self.lines = lines,
            Ok(None) => self.lines = Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, key, "failed to hydrate cart, starting empty");
                self.lines = Vec::new();
            }
        }
    }

    async fn persist(&self) {
        let key = keys::cart_items(&self.identity);
        if let Err(e) = self.storage.put_json(&key, &self.lines).await {
            tracing::warn!(error = %e, key, "failed to persist cart, in-memory state stands");
        }
    }
}
