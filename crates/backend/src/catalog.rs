//! Catalog, favorites, and review reads.

use async_trait::async_trait;
use common::{ProductId, UserId};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::records::{CategoryRecord, NewReview, ProductRecord, ReviewRecord};

/// The home-screen payload: all products and all categories.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductsAndCategories {
    /// All products.
    pub products: Vec<ProductRecord>,
    /// All categories.
    pub categories: Vec<CategoryRecord>,
}

/// A category together with its products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryWithProducts {
    /// The category.
    pub category: CategoryRecord,
    /// Products belonging to the category.
    pub products: Vec<ProductRecord>,
}

/// Trait for catalog browsing, favorites, and reviews.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetches all products and categories for the home screen.
    async fn products_and_categories(&self) -> Result<ProductsAndCategories>;

    /// Fetches a single product by slug.
    async fn product_by_slug(&self, slug: &str) -> Result<ProductRecord>;

    /// Fetches a category and its products by category slug.
    async fn category_with_products(&self, slug: &str) -> Result<CategoryWithProducts>;

    /// Returns the user's favorite products.
    async fn favorites(&self, user: UserId) -> Result<Vec<ProductRecord>>;

    /// Toggles a product in the user's favorites.
    ///
    /// Returns true if the product is a favorite after the call.
    async fn toggle_favorite(&self, user: UserId, product: ProductId) -> Result<bool>;

    /// Returns a product's reviews, newest first.
    async fn reviews(&self, product: ProductId) -> Result<Vec<ReviewRecord>>;

    /// Adds a review. The rating must be between 1 and 5.
    async fn add_review(&self, user: UserId, review: NewReview) -> Result<ReviewRecord>;
}

/// Validates a review's rating bounds before it goes on the wire.
pub(crate) fn validate_rating(rating: u8) -> Result<()> {
    if (1..=5).contains(&rating) {
        Ok(())
    } else {
        Err(crate::BackendError::Api {
            message: format!("rating must be between 1 and 5, got {rating}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_bounds() {
        assert!(validate_rating(1).is_ok());
        assert!(validate_rating(5).is_ok());
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
    }
}
