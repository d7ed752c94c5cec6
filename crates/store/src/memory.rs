use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use domain::{CustomerId, Order, OrderId, OrderLine, Product, ProductId};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{
    Result, StoreError,
    store::{Store, Transaction},
};

/// Default bound on how long a transaction waits for a single row lock.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// Smallest lock bound a store accepts. PostgreSQL reads zero as "no limit".
pub const MIN_LOCK_TIMEOUT: Duration = Duration::from_millis(1);

#[derive(Debug, Default)]
struct MemoryState {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    order_lines: Vec<OrderLine>,
}

#[derive(Debug, Default)]
struct Faults {
    fail_begins: AtomicU32,
    fail_commits: AtomicU32,
}

impl Faults {
    fn take(counter: &AtomicU32) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

/// In-memory store implementation for testing and local runs.
///
/// Committed state sits behind one read/write lock. Each product row has its
/// own async mutex standing in for a database row lock; a transaction keeps
/// the guards it acquired until it commits, rolls back or is dropped.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    state: Arc<RwLock<MemoryState>>,
    row_locks: Arc<Mutex<HashMap<ProductId, Arc<Mutex<()>>>>>,
    lock_timeout: Duration,
    faults: Arc<Faults>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self {
            state: Arc::default(),
            row_locks: Arc::default(),
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
            faults: Arc::default(),
        }
    }
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the bound on each row lock wait, raised to [`MIN_LOCK_TIMEOUT`].
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout.max(MIN_LOCK_TIMEOUT);
        self
    }

    /// Returns the bound on each row lock wait.
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Adds or replaces a catalog product.
    ///
    /// The row lock is registered before the row becomes visible.
    pub async fn insert_product(&self, product: Product) {
        self.row_locks
            .lock()
            .await
            .entry(product.id.clone())
            .or_default();
        self.state
            .write()
            .await
            .products
            .insert(product.id.clone(), product);
    }

    /// Returns the number of committed orders.
    pub async fn order_count(&self) -> usize {
        self.state.read().await.orders.len()
    }

    /// Returns the number of committed order lines.
    pub async fn order_line_count(&self) -> usize {
        self.state.read().await.order_lines.len()
    }

    /// Makes the next `n` calls to `begin` fail as unavailable.
    pub fn fail_next_begins(&self, n: u32) {
        self.faults.fail_begins.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` commits fail after all writes were staged.
    pub fn fail_next_commits(&self, n: u32) {
        self.faults.fail_commits.store(n, Ordering::SeqCst);
    }

    /// Row lock of a catalog product; unknown ids have none.
    async fn row_lock(&self, product_id: &ProductId) -> Option<Arc<Mutex<()>>> {
        self.row_locks.lock().await.get(product_id).cloned()
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        if Faults::take(&self.faults.fail_begins) {
            return Err(StoreError::Unavailable("injected begin failure".to_string()));
        }

        Ok(Box::new(InMemoryTransaction {
            store: self.clone(),
            held: BTreeMap::new(),
            stock_writes: HashMap::new(),
            orders: Vec::new(),
            lines: Vec::new(),
        }))
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        Ok(self.state.read().await.products.get(product_id).cloned())
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        Ok(self.state.read().await.orders.get(&order_id).cloned())
    }

    async fn get_order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let state = self.state.read().await;
        Ok(state
            .order_lines
            .iter()
            .filter(|l| l.order_id == order_id)
            .cloned()
            .collect())
    }

    async fn list_orders_for_customer(
        &self,
        customer_id: CustomerId,
        limit: usize,
    ) -> Result<Vec<Order>> {
        let state = self.state.read().await;
        let mut orders: Vec<_> = state
            .orders
            .values()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders.truncate(limit);
        Ok(orders)
    }
}

/// Transaction over an [`InMemoryStore`].
///
/// Writes are staged locally and applied under the state lock on commit.
struct InMemoryTransaction {
    store: InMemoryStore,
    held: BTreeMap<ProductId, OwnedMutexGuard<()>>,
    stock_writes: HashMap<ProductId, u32>,
    orders: Vec<Order>,
    lines: Vec<OrderLine>,
}

impl InMemoryTransaction {
    async fn lock_one(&mut self, product_id: &ProductId) -> Result<()> {
        if self.held.contains_key(product_id) {
            return Ok(());
        }

        let Some(row) = self.store.row_lock(product_id).await else {
            return Ok(());
        };
        let timeout = self.store.lock_timeout;
        let guard = tokio::time::timeout(timeout, row.lock_owned())
            .await
            .map_err(|_| {
                tracing::warn!(product_id = %product_id, ?timeout, "row lock wait timed out");
                StoreError::LockTimeout(timeout)
            })?;
        self.held.insert(product_id.clone(), guard);
        Ok(())
    }

    fn order_known(&self, order_id: OrderId, state: &MemoryState) -> bool {
        self.orders.iter().any(|o| o.id == order_id) || state.orders.contains_key(&order_id)
    }
}

#[async_trait]
impl Transaction for InMemoryTransaction {
    async fn lock_products(&mut self, product_ids: &[ProductId]) -> Result<()> {
        let mut ordered = product_ids.to_vec();
        ordered.sort();
        ordered.dedup();

        for product_id in &ordered {
            self.lock_one(product_id).await?;
        }
        Ok(())
    }

    async fn product_for_update(&mut self, product_id: &ProductId) -> Result<Option<Product>> {
        self.lock_one(product_id).await?;

        let state = self.store.state.read().await;
        Ok(state.products.get(product_id).cloned().map(|mut product| {
            if let Some(stock) = self.stock_writes.get(product_id) {
                product.stock = *stock;
            }
            product
        }))
    }

    async fn set_stock(&mut self, product_id: &ProductId, stock: u32) -> Result<()> {
        self.lock_one(product_id).await?;

        if !self
            .store
            .state
            .read()
            .await
            .products
            .contains_key(product_id)
        {
            return Err(StoreError::Integrity(format!(
                "cannot update stock of unknown product {product_id}"
            )));
        }

        self.stock_writes.insert(product_id.clone(), stock);
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        let state = self.store.state.read().await;
        if self.order_known(order.id, &state) {
            return Err(StoreError::Integrity(format!(
                "order {} already exists",
                order.id
            )));
        }
        drop(state);

        self.orders.push(order.clone());
        Ok(())
    }

    async fn insert_order_lines(&mut self, lines: &[OrderLine]) -> Result<()> {
        let state = self.store.state.read().await;
        for line in lines {
            if !self.order_known(line.order_id, &state) {
                return Err(StoreError::Integrity(format!(
                    "order line {} references unknown order {}",
                    line.id, line.order_id
                )));
            }
            if !state.products.contains_key(&line.product_id) {
                return Err(StoreError::Integrity(format!(
                    "order line {} references unknown product {}",
                    line.id, line.product_id
                )));
            }
        }
        drop(state);

        self.lines.extend_from_slice(lines);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        if Faults::take(&self.store.faults.fail_commits) {
            return Err(StoreError::CommitFailed(
                "injected commit failure".to_string(),
            ));
        }

        let this = *self;
        let mut state = this.store.state.write().await;
        for (product_id, stock) in this.stock_writes {
            if let Some(product) = state.products.get_mut(&product_id) {
                product.stock = stock;
            }
        }
        for order in this.orders {
            state.orders.insert(order.id, order);
        }
        state.order_lines.extend(this.lines);
        drop(state);

        // Row locks are released only once the writes are visible.
        drop(this.held);
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
