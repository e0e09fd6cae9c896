//! Key schema for persisted local state.
//!
//! User-scoped keys carry the identity's storage suffix so that state never
//! leaks across sign-in boundaries; the guest namespace uses the fixed
//! `guest` suffix.

use common::{Identity, ProductId};

/// Key for the marker bridging an app exit to a payment page and the
/// eventual deep-link return. A single scalar, cleared after resolution.
pub const PENDING_ORDER: &str = "pendingOrderId";

/// Key for the cart line-item table of the given identity.
pub fn cart_items(identity: &Identity) -> String {
    format!("cart_items_{}", identity.storage_suffix())
}

/// Key for the recently-viewed product list of the given identity.
pub fn recently_viewed(identity: &Identity) -> String {
    format!("recently_viewed_{}", identity.storage_suffix())
}

/// Key for the last size the user chose for a product.
pub fn selected_size(product: ProductId) -> String {
    format!("selected_size_{product}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UserId;

    #[test]
    fn cart_key_is_namespaced_per_identity() {
        let user = UserId::new();
        assert_eq!(cart_items(&Identity::Guest), "cart_items_guest");
        assert_eq!(
            cart_items(&Identity::User(user)),
            format!("cart_items_{user}")
        );
    }

    #[test]
    fn distinct_users_get_distinct_cart_keys() {
        let a = cart_items(&Identity::User(UserId::new()));
        let b = cart_items(&Identity::User(UserId::new()));
        assert_ne!(a, b);
    }

    #[test]
    fn selected_size_key_carries_product_id() {
        assert_eq!(selected_size(ProductId::new(15)), "selected_size_15");
    }
}
