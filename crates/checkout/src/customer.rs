//! Customer contact fields collected at checkout.

use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;

/// Name, phone, and delivery address for an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    /// Recipient name.
    pub name: String,
    /// Recipient phone number.
    pub phone: String,
    /// Delivery address.
    pub address: String,
}

impl CustomerInfo {
    /// Creates customer info from the checkout form fields.
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            address: address.into(),
        }
    }

    /// Rejects blank required fields before any remote call is attempted.
    pub fn validate(&self) -> Result<(), CheckoutError> {
        if self.name.trim().is_empty() {
            return Err(CheckoutError::MissingField { field: "name" });
        }
        if self.phone.trim().is_empty() {
            return Err(CheckoutError::MissingField { field: "phone" });
        }
        if self.address.trim().is_empty() {
            return Err(CheckoutError::MissingField { field: "address" });
        }
        Ok(())
    }
}
