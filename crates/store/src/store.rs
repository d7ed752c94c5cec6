use async_trait::async_trait;
use domain::{CustomerId, Order, OrderId, OrderLine, Product, ProductId};

use crate::Result;

/// Core trait for store implementations.
///
/// A store hands out transactions for writes and answers committed-state
/// reads. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Store: Send + Sync {
    /// Opens a new transaction.
    ///
    /// Every checkout read and write goes through the returned handle. The
    /// handle must end in [`Transaction::commit`] or [`Transaction::rollback`];
    /// dropping it without either rolls back and releases its locks, which is
    /// what happens when a caller abandons a checkout mid-flight.
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    /// Reads a product as of the last commit.
    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>>;

    /// Reads an order as of the last commit.
    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>>;

    /// Reads the lines of an order in the order they were written.
    async fn get_order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>>;

    /// Lists a customer's orders, newest first.
    async fn list_orders_for_customer(
        &self,
        customer_id: CustomerId,
        limit: usize,
    ) -> Result<Vec<Order>>;
}

/// An open unit of work against the store.
///
/// Writes are invisible to other readers until `commit` succeeds. Row locks
/// taken through `lock_products` or `product_for_update` are held until the
/// transaction ends.
#[async_trait]
pub trait Transaction: Send {
    /// Locks the given product rows, in ascending id order, waiting at most
    /// the store's lock timeout for each.
    ///
    /// Ids that match no product are skipped.
    async fn lock_products(&mut self, product_ids: &[ProductId]) -> Result<()>;

    /// Reads a product under a row lock, seeing this transaction's own
    /// uncommitted stock writes.
    async fn product_for_update(&mut self, product_id: &ProductId) -> Result<Option<Product>>;

    /// Overwrites the stock of a locked product.
    async fn set_stock(&mut self, product_id: &ProductId, stock: u32) -> Result<()>;

    /// Writes a new order.
    async fn insert_order(&mut self, order: &Order) -> Result<()>;

    /// Writes the lines of an order inserted earlier in this transaction.
    async fn insert_order_lines(&mut self, lines: &[OrderLine]) -> Result<()>;

    /// Makes every write durable and visible at once, then releases locks.
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Discards every write and releases locks.
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Extension trait providing convenience methods for stores.
#[async_trait]
pub trait StoreExt: Store {
    /// Loads an order together with its lines.
    async fn get_order_with_lines(
        &self,
        order_id: OrderId,
    ) -> Result<Option<(Order, Vec<OrderLine>)>> {
        match self.get_order(order_id).await? {
            Some(order) => {
                let lines = self.get_order_lines(order_id).await?;
                Ok(Some((order, lines)))
            }
            None => Ok(None),
        }
    }

    /// Returns the committed stock of a product, if it exists.
    async fn stock_of(&self, product_id: &ProductId) -> Result<Option<u32>> {
        Ok(self.get_product(product_id).await?.map(|p| p.stock))
    }
}

// Blanket implementation for all Store implementations
impl<T: Store + ?Sized> StoreExt for T {}
