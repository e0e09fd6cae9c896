//! Cart line items.

use common::{Money, ProductId, Size};
use serde::{Deserialize, Serialize};

/// Per-line quantity cap applied when the caller supplies none.
pub const DEFAULT_MAX_QUANTITY: u32 = 10;

/// One `(product, size)` entry in the cart.
///
/// Invariant: `1 <= quantity <= max_quantity` after every mutation. Inputs
/// outside the range are clamped, never silently dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    /// The product this line refers to.
    pub product_id: ProductId,

    /// The chosen size; part of the line's identity.
    pub size: Size,

    /// Display title.
    pub title: String,

    /// Display image URL.
    pub hero_image: String,

    /// Price per unit.
    pub unit_price: Money,

    /// Units in the cart.
    pub quantity: u32,

    /// Soft cap supplied at add time. Not re-validated against live stock
    /// on later mutations; the checkout sequence is where stock is enforced.
    pub max_quantity: u32,
}

impl CartLine {
    /// Returns the total price for this line (`unit_price * quantity`).
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// Parameters for adding a product to the cart.
#[derive(Debug, Clone, PartialEq)]
pub struct NewCartLine {
    /// The product to add.
    pub product_id: ProductId,
    /// The chosen size.
    pub size: Size,
    /// Display title.
    pub title: String,
    /// Display image URL.
    pub hero_image: String,
    /// Price per unit.
    pub unit_price: Money,
    /// Units to add.
    pub quantity: u32,
    /// Quantity cap for a newly created line.
    pub max_quantity: u32,
}

impl NewCartLine {
    /// Creates add-to-cart parameters with quantity 1 and the default cap.
    pub fn new(
        product_id: ProductId,
        size: Size,
        title: impl Into<String>,
        hero_image: impl Into<String>,
        unit_price: Money,
    ) -> Self {
        Self {
            product_id,
            size,
            title: title.into(),
            hero_image: hero_image.into(),
            unit_price,
            quantity: 1,
            max_quantity: DEFAULT_MAX_QUANTITY,
        }
    }

    /// Sets the number of units to add.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity;
        self
    }

    /// Sets the quantity cap used if this add creates a new line.
    pub fn with_max_quantity(mut self, max_quantity: u32) -> Self {
        self.max_quantity = max_quantity;
        self
    }

    /// Builds the cart line for a first-time add, clamping the quantity
    /// into `[1, max_quantity]`.
    pub(crate) fn into_line(self) -> CartLine {
        let max_quantity = self.max_quantity.max(1);
        CartLine {
            product_id: self.product_id,
            size: self.size,
            title: self.title,
            hero_image: self.hero_image,
            unit_price: self.unit_price,
            quantity: self.quantity.clamp(1, max_quantity),
            max_quantity,
        }
    }
}
