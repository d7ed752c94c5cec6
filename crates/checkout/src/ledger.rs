//! Inventory ledger: stock reservation inside an open store transaction.

use domain::{ProductId, ReservedLine};
use store::Transaction;

use crate::error::{CheckoutError, Result};

/// Reserves stock against the rows of one transaction.
///
/// There is no release operation. Reservations disappear when the
/// transaction rolls back.
pub struct InventoryLedger<'tx, T: Transaction + ?Sized> {
    tx: &'tx mut T,
}

impl<'tx, T: Transaction + ?Sized> InventoryLedger<'tx, T> {
    pub fn new(tx: &'tx mut T) -> Self {
        Self { tx }
    }

    /// Locks the given products up front, in ascending id order.
    pub async fn lock(&mut self, product_ids: &[ProductId]) -> Result<()> {
        self.tx.lock_products(product_ids).await?;
        Ok(())
    }

    /// Takes `quantity` units of a product out of stock.
    ///
    /// Returns the line with the unit price read under the lock. On
    /// `InsufficientStock` the stock is left untouched.
    pub async fn reserve(&mut self, product_id: &ProductId, quantity: u32) -> Result<ReservedLine> {
        let product = self
            .tx
            .product_for_update(product_id)
            .await?
            .ok_or_else(|| CheckoutError::ProductNotFound(product_id.clone()))?;

        if !product.has_stock_for(quantity) {
            return Err(CheckoutError::InsufficientStock {
                product_id: product_id.clone(),
                requested: quantity,
                available: product.stock,
            });
        }

        self.tx
            .set_stock(product_id, product.stock - quantity)
            .await?;

        tracing::debug!(
            product_id = %product_id,
            quantity,
            remaining = product.stock - quantity,
            "stock reserved"
        );

        Ok(ReservedLine::new(product.id, quantity, product.unit_price))
    }
}
