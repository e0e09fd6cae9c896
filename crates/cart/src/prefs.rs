//! Per-product size preference.

use std::sync::Arc;

use common::{ProductId, Size};
use local_store::{LocalStore, LocalStoreExt, keys};

/// Remembers the last size the user chose for each product so the size
/// selector can preselect it on the next visit.
///
/// A UX convenience only; reads and writes are best-effort and a missing or
/// unreadable preference simply means no preselection.
pub struct SizePrefs {
    storage: Arc<dyn LocalStore>,
}

impl SizePrefs {
    /// Creates the preference helper over the given storage.
    pub fn new(storage: Arc<dyn LocalStore>) -> Self {
        Self { storage }
    }

    /// Records the size chosen for a product.
    pub async fn remember(&self, product: ProductId, size: Size) {
        let key = keys::selected_size(product);
        if let Err(e) = self.storage.put_json(&key, &size).await {
            tracing::warn!(error = %e, key, "failed to persist size preference");
        }
    }

    /// Returns the last size chosen for a product, if any.
    pub async fn last_selected(&self, product: ProductId) -> Option<Size> {
        let key = keys::selected_size(product);
        match self.storage.get_json::<Size>(&key).await {
            Ok(size) => size,
            Err(e) => {
                tracing::warn!(error = %e, key, "failed to read size preference");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use local_store::InMemoryLocalStore;

    #[tokio::test]
    async fn remember_and_recall() {
        let prefs = SizePrefs::new(Arc::new(InMemoryLocalStore::new()));

        assert_eq!(prefs.last_selected(ProductId::new(1)).await, None);

        prefs.remember(ProductId::new(1), Size::new(42)).await;
        assert_eq!(
            prefs.last_selected(ProductId::new(1)).await,
            Some(Size::new(42))
        );
    }

    #[tokio::test]
    async fn preferences_are_per_product() {
        let prefs = SizePrefs::new(Arc::new(InMemoryLocalStore::new()));

        prefs.remember(ProductId::new(1), Size::new(42)).await;
        prefs.remember(ProductId::new(2), Size::new(40)).await;

        assert_eq!(
            prefs.last_selected(ProductId::new(1)).await,
            Some(Size::new(42))
        );
        assert_eq!(
            prefs.last_selected(ProductId::new(2)).await,
            Some(Size::new(40))
        );
    }

    #[tokio::test]
    async fn write_failure_is_swallowed() {
        let storage = Arc::new(InMemoryLocalStore::new());
        let prefs = SizePrefs::new(storage.clone());

        storage.set_fail_on_put(true);
        prefs.remember(ProductId::new(1), Size::new(42)).await;

        storage.set_fail_on_put(false);
        assert_eq!(prefs.last_selected(ProductId::new(1)).await, None);
    }
}
