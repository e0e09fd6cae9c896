//! Recently-viewed product list.

use std::sync::Arc;

use common::{Identity, Money, ProductId};
use local_store::{LocalStore, LocalStoreExt, keys};
use serde::{Deserialize, Serialize};

/// Maximum number of products kept in the recently-viewed list.
pub const RECENTLY_VIEWED_CAP: usize = 10;

/// A product summary kept for the recently-viewed shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewedProduct {
    /// The viewed product.
    pub product_id: ProductId,
    /// Display title.
    pub title: String,
    /// Display image URL.
    pub hero_image: String,
    /// Unit price at view time.
    pub price: Money,
}

/// Bounded, per-identity list of recently viewed products, newest first.
pub struct RecentlyViewed {
    identity: Identity,
    entries: Vec<ViewedProduct>,
    storage: Arc<dyn LocalStore>,
}

impl RecentlyViewed {
    /// Opens the list for `identity`, hydrating persisted entries.
    pub async fn open(storage: Arc<dyn LocalStore>, identity: Identity) -> Self {
        let mut list = Self {
            identity,
            entries: Vec::new(),
            storage,
        };
        list.hydrate().await;
        list
    }

    /// Switches to a new identity and reloads its persisted list.
    pub async fn switch_identity(&mut self, identity: Identity) {
        if identity == self.identity {
            return;
        }
        self.identity = identity;
        self.hydrate().await;
    }

    /// Records a product view: moves the product to the front, dropping any
    /// previous entry for it, and truncates to the cap.
    pub async fn record(&mut self, product: ViewedProduct) {
        self.entries.retain(|p| p.product_id != product.product_id);
        self.entries.insert(0, product);
        self.entries.truncate(RECENTLY_VIEWED_CAP);
        self.persist().await;
    }

    /// Returns the entries, newest first.
    pub fn entries(&self) -> &[ViewedProduct] {
        &self.entries
    }

    async fn hydrate(&mut self) {
        let key = keys::recently_viewed(&self.identity);
        match self.storage.get_json::<Vec<ViewedProduct>>(&key).await {
            Ok(Some(entries)) => self.entries = entries,
            Ok(None) => self.entries = Vec::new(),
            Err(e) => {
                tracing::warn!(error = %e, key, "failed to hydrate recently viewed");
                self.entries = Vec::new();
            }
        }
    }

    async fn persist(&self) {
        let key = keys::recently_viewed(&self.identity);
        if let Err(e) = self.storage.put_json(&key, &self.entries).await {
            tracing::warn!(error = %e, key, "failed to persist recently viewed");
        }
    }
}
