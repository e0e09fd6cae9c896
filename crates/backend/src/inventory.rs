//! Inventory adjustment operations.

use async_trait::async_trait;
use common::{ProductId, Size};

use crate::Result;

/// Trait for per-size stock adjustments.
///
/// Stock is a shared resource across all shoppers and must be mutated only
/// through these two adjustments, never a direct set. Both RPCs are atomic
/// on the backend side; the client never reads-then-writes.
#[async_trait]
pub trait InventoryApi: Send + Sync {
    /// Atomically decrements stock for a product/size pair.
    ///
    /// Fails with [`crate::BackendError::OutOfStock`] if the decrement would
    /// take the stock negative.
    async fn decrement(&self, product: ProductId, size: Size, quantity: u32) -> Result<()>;

    /// Atomically increments stock for a product/size pair.
    async fn increment(&self, product: ProductId, size: Size, quantity: u32) -> Result<()>;

    /// Re-reads the units currently available for a product/size pair.
    async fn quantity_available(&self, product: ProductId, size: Size) -> Result<u32>;
}
