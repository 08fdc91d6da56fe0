//! PostgreSQL order store on `sqlx`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{debug, info, instrument, warn};

use super::{AccessMode, IsolationLevel, OrderDeleter, OrderProvider, OrderSaver, OrderTx, StoreError, TransactionManager, TxWork};
use crate::model::{Order, OrderId, PackageType, RecipientId};

const ORDER_COLUMNS: &str =
    "id, recipient_id, storage_until, issued_at, returned_at, hash, weight, order_cost, package_cost, package_type";

const UPDATE_ORDER: &str = r#"
    UPDATE orders
    SET recipient_id = $2, storage_until = $3, issued_at = $4, returned_at = $5,
        hash = $6, weight = $7, order_cost = $8, package_cost = $9, package_type = $10
    WHERE id = $1
"#;

const DELETE_ORDER: &str = "DELETE FROM orders WHERE id = $1";

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Backend(Box::new(other)),
        }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    recipient_id: i64,
    storage_until: DateTime<Utc>,
    issued_at: Option<DateTime<Utc>>,
    returned_at: Option<DateTime<Utc>>,
    hash: String,
    weight: f64,
    order_cost: f64,
    package_cost: f64,
    package_type: String,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let package_type: PackageType = row.package_type.parse().map_err(StoreError::backend)?;
        Ok(Order {
            id: OrderId(row.id),
            recipient_id: RecipientId(row.recipient_id),
            weight: row.weight,
            cost: row.order_cost,
            package_cost: row.package_cost,
            package_type,
            storage_until: row.storage_until,
            issued_at: row.issued_at,
            returned_at: row.returned_at,
            hash: row.hash,
        })
    }
}

fn into_orders(rows: Vec<OrderRow>) -> Result<Vec<Order>, StoreError> {
    rows.into_iter().map(Order::try_from).collect()
}

fn bind_update<'q>(order: &'q Order) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    sqlx::query(UPDATE_ORDER)
        .bind(order.id.0)
        .bind(order.recipient_id.0)
        .bind(order.storage_until)
        .bind(order.issued_at)
        .bind(order.returned_at)
        .bind(&order.hash)
        .bind(order.weight)
        .bind(order.cost)
        .bind(order.package_cost)
        .bind(order.package_type.as_str())
}

fn expect_one_row(affected: u64) -> Result<(), StoreError> {
    if affected == 0 {
        Err(StoreError::NotFound)
    } else {
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(url)
            .await?;
        info!("Connected to PostgreSQL");
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(StoreError::backend)
    }
}

struct PgTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl OrderTx for PgTx {
    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let result = bind_update(order).execute(&mut *self.tx).await?;
        expect_one_row(result.rows_affected())
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<(), StoreError> {
        let result = sqlx::query(DELETE_ORDER).bind(id.0).execute(&mut *self.tx).await?;
        expect_one_row(result.rows_affected())
    }
}

#[async_trait]
impl OrderSaver for PgStore {
    async fn create_order(&self, order: &Order) -> Result<(), StoreError> {
        let sql = format!(
            "INSERT INTO orders ({ORDER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        );
        let result = sqlx::query(&sql)
            .bind(order.id.0)
            .bind(order.recipient_id.0)
            .bind(order.storage_until)
            .bind(order.issued_at)
            .bind(order.returned_at)
            .bind(&order.hash)
            .bind(order.weight)
            .bind(order.cost)
            .bind(order.package_cost)
            .bind(order.package_type.as_str())
            .execute(&self.pool)
            .await;

        match result {
            Ok(done) if done.rows_affected() == 0 => Err(StoreError::NotCreated(order.id)),
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(StoreError::AlreadyExists(order.id)),
            Err(err) => Err(err.into()),
        }
    }

    async fn update_order(&self, order: &Order) -> Result<(), StoreError> {
        let result = bind_update(order).execute(&self.pool).await?;
        expect_one_row(result.rows_affected())
    }
}

#[async_trait]
impl OrderDeleter for PgStore {
    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError> {
        let result = sqlx::query(DELETE_ORDER).bind(id.0).execute(&self.pool).await?;
        expect_one_row(result.rows_affected())
    }

    async fn delete_returned_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<OrderId>, StoreError> {
        let rows: Vec<(i64,)> =
            sqlx::query_as("DELETE FROM orders WHERE returned_at IS NOT NULL AND returned_at < $1 RETURNING id")
                .bind(cutoff)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| OrderId(id)).collect())
    }
}

#[async_trait]
impl OrderProvider for PgStore {
    async fn find_order_by_id(&self, id: OrderId) -> Result<Order, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        let row: OrderRow = sqlx::query_as(&sql).bind(id.0).fetch_one(&self.pool).await?;
        row.try_into()
    }

    async fn find_orders_by_ids(&self, ids: &[OrderId]) -> Result<Vec<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ANY($1)");
        let raw: Vec<i64> = ids.iter().map(|id| id.0).collect();
        let rows: Vec<OrderRow> = sqlx::query_as(&sql).bind(&raw).fetch_all(&self.pool).await?;
        into_orders(rows)
    }

    async fn find_orders_by_recipient_id(&self, recipient_id: RecipientId) -> Result<Vec<Order>, StoreError> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE recipient_id = $1 ORDER BY storage_until DESC");
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(recipient_id.0)
            .fetch_all(&self.pool)
            .await?;
        into_orders(rows)
    }

    async fn find_returned_orders(&self, limit: u32, offset: u32) -> Result<Vec<Order>, StoreError> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE returned_at IS NOT NULL \
             ORDER BY returned_at DESC, id LIMIT $1 OFFSET $2"
        );
        let rows: Vec<OrderRow> = sqlx::query_as(&sql)
            .bind(i64::from(limit))
            .bind(i64::from(offset))
            .fetch_all(&self.pool)
            .await?;
        into_orders(rows)
    }
}

#[async_trait]
impl TransactionManager for PgStore {
    #[instrument(skip(self, work))]
    async fn run_transactional_query(
        &self,
        isolation: IsolationLevel,
        mode: AccessMode,
        work: Box<dyn TxWork>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let set = format!("SET TRANSACTION ISOLATION LEVEL {}, {}", isolation.as_sql(), mode.as_sql());
        sqlx::query(&set).execute(&mut *tx).await?;

        let mut handle = PgTx { tx };
        match work.run(&mut handle).await {
            Ok(()) => {
                handle.tx.commit().await?;
                debug!("Transaction committed");
                Ok(())
            }
            Err(err) => match handle.tx.rollback().await {
                Ok(()) => {
                    debug!(error = %err, "Transaction rolled back");
                    Err(err)
                }
                Err(rollback) => {
                    warn!(error = %err, %rollback, "Rollback failed");
                    Err(StoreError::Rollback {
                        source: Box::new(err),
                        rollback: rollback.to_string(),
                    })
                }
            },
        }
    }
}
