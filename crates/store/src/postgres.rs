use std::time::Duration;

use async_trait::async_trait;
use domain::{
    CategoryId, CustomerId, Money, Order, OrderId, OrderLine, OrderLineId, OrderStatus,
    PaymentStatus, Product, ProductId,
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    memory::{DEFAULT_LOCK_TIMEOUT, MIN_LOCK_TIMEOUT},
    store::{Store, Transaction},
};

/// PostgreSQL-backed store implementation.
///
/// Row locks are `SELECT ... FOR UPDATE`; the lock and statement timeouts are
/// set per transaction with `SET LOCAL`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    lock_timeout: Duration,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    /// Sets the bound on lock waits and statements inside a transaction,
    /// raised to [`MIN_LOCK_TIMEOUT`] so it never reaches PostgreSQL as 0.
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout.max(MIN_LOCK_TIMEOUT);
        self
    }

    /// Returns the bound on lock waits and statements.
    pub fn lock_timeout(&self) -> Duration {
        self.lock_timeout
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    /// Adds or replaces a catalog category and product.
    ///
    /// Catalog management owns these rows; this exists for seeding and tests.
    pub async fn upsert_product(&self, product: &Product) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO categories (id, name)
            VALUES ($1, $1)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(product.category_id.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO products (id, name, price, stock, category_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                price = EXCLUDED.price,
                stock = EXCLUDED.stock,
                category_id = EXCLUDED.category_id
            "#,
        )
        .bind(product.id.as_str())
        .bind(&product.name)
        .bind(product.unit_price.amount())
        .bind(stock_to_db(product.stock)?)
        .bind(product.category_id.as_str())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        let stock: i32 = row.try_get("stock")?;
        let id: String = row.try_get("id")?;
        let stock = u32::try_from(stock)
            .map_err(|_| StoreError::Corrupt(format!("product {id} has stock {stock}")))?;

        Ok(Product {
            id: ProductId::new(id),
            name: row.try_get("name")?,
            unit_price: Money::new(row.try_get::<Decimal, _>("price")?),
            stock,
            category_id: CategoryId::new(row.try_get::<String, _>("category_id")?),
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let status: String = row.try_get("status")?;
        let payment_status: String = row.try_get("payment_status")?;

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            customer_id: CustomerId::from_uuid(row.try_get::<Uuid, _>("customer_id")?),
            status: status
                .parse::<OrderStatus>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            payment_status: payment_status
                .parse::<PaymentStatus>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            shipping_address: row.try_get("shipping_address")?,
            total_amount: Money::new(row.try_get::<Decimal, _>("total_amount")?),
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_line(row: PgRow) -> Result<OrderLine> {
        let quantity: i32 = row.try_get("quantity")?;
        let id = OrderLineId::from_uuid(row.try_get::<Uuid, _>("id")?);
        let quantity = u32::try_from(quantity)
            .map_err(|_| StoreError::Corrupt(format!("order line {id} has quantity {quantity}")))?;

        Ok(OrderLine {
            id,
            order_id: OrderId::from_uuid(row.try_get::<Uuid, _>("order_id")?),
            product_id: ProductId::new(row.try_get::<String, _>("product_id")?),
            quantity,
            unit_price: Money::new(row.try_get::<Decimal, _>("unit_price")?),
        })
    }
}

fn stock_to_db(stock: u32) -> Result<i32> {
    i32::try_from(stock).map_err(|_| StoreError::Integrity(format!("stock {stock} out of range")))
}

/// Maps constraint violations on writes to `Integrity`; everything else stays
/// a database error so transient codes are still recognised.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(ref db_err) = err
        && (db_err.is_foreign_key_violation()
            || db_err.is_unique_violation()
            || db_err.is_check_violation())
    {
        return StoreError::Integrity(db_err.message().to_string());
    }
    StoreError::Database(err)
}

/// Maps a failed `COMMIT`.
///
/// A database error is the server refusing the commit, so nothing became
/// durable. Anything else (a dropped connection, an io error) leaves the
/// outcome unknown and must not be retried.
fn map_commit_error(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(_) => StoreError::Database(err),
        other => {
            tracing::warn!(error = %other, "commit outcome unknown");
            StoreError::CommitUnknown(other.to_string())
        }
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let mut tx = self.pool.begin().await?;

        // SET does not take bind parameters; the value is an integer we own.
        let millis = self.lock_timeout.as_millis();
        sqlx::query(&format!("SET LOCAL lock_timeout = {millis}"))
            .execute(&mut *tx)
            .await?;
        sqlx::query(&format!("SET LOCAL statement_timeout = {millis}"))
            .execute(&mut *tx)
            .await?;

        Ok(Box::new(PostgresTransaction { tx }))
    }

    async fn get_product(&self, product_id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, price, stock, category_id
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(
            r#"
            SELECT id, customer_id, status, payment_status, shipping_address, total_amount, created_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn get_order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>> {
        let rows = sqlx::query(
            r#"
            SELECT id, order_id, product_id, quantity, unit_price
            FROM order_lines
            WHERE order_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_line).collect()
    }

    async fn list_orders_for_customer(
        &self,
        customer_id: CustomerId,
        limit: usize,
    ) -> Result<Vec<Order>> {
        let rows = sqlx::query(
            r#"
            SELECT id, customer_id, status, payment_status, shipping_address, total_amount, created_at
            FROM orders
            WHERE customer_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(customer_id.as_uuid())
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }
}

/// Transaction over a [`PostgresStore`].
///
/// Dropping the inner `sqlx::Transaction` without committing rolls it back.
struct PostgresTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

#[async_trait]
impl Transaction for PostgresTransaction {
    async fn lock_products(&mut self, product_ids: &[ProductId]) -> Result<()> {
        let ids: Vec<String> = product_ids.iter().map(|id| id.to_string()).collect();

        // Rows are locked in ORDER BY order, so every checkout takes the same
        // sequence regardless of how its cart was submitted.
        sqlx::query(
            r#"
            SELECT id
            FROM products
            WHERE id = ANY($1)
            ORDER BY id
            FOR UPDATE
            "#,
        )
        .bind(ids)
        .fetch_all(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn product_for_update(&mut self, product_id: &ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, price, stock, category_id
            FROM products
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(product_id.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.map(PostgresStore::row_to_product).transpose()
    }

    async fn set_stock(&mut self, product_id: &ProductId, stock: u32) -> Result<()> {
        let result = sqlx::query("UPDATE products SET stock = $2 WHERE id = $1")
            .bind(product_id.as_str())
            .bind(stock_to_db(stock)?)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Integrity(format!(
                "cannot update stock of unknown product {product_id}"
            )));
        }
        Ok(())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, customer_id, status, payment_status, shipping_address, total_amount, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.customer_id.as_uuid())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(&order.shipping_address)
        .bind(order.total_amount.amount())
        .bind(order.created_at)
        .execute(&mut *self.tx)
        .await
        .map_err(map_write_error)?;

        Ok(())
    }

    async fn insert_order_lines(&mut self, lines: &[OrderLine]) -> Result<()> {
        for (position, line) in lines.iter().enumerate() {
            let quantity = i32::try_from(line.quantity).map_err(|_| {
                StoreError::Integrity(format!("quantity {} out of range", line.quantity))
            })?;
            let position = i32::try_from(position)
                .map_err(|_| StoreError::Integrity("too many order lines".to_string()))?;

            sqlx::query(
                r#"
                INSERT INTO order_lines (id, order_id, product_id, quantity, unit_price, position)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(line.id.as_uuid())
            .bind(line.order_id.as_uuid())
            .bind(line.product_id.as_str())
            .bind(quantity)
            .bind(line.unit_price.amount())
            .bind(position)
            .execute(&mut *self.tx)
            .await
            .map_err(map_write_error)?;
        }

        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(map_commit_error)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
