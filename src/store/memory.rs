//! In-process order store.
//!
//! One table guarded by a `tokio` mutex. A transaction holds the lock for its
//! whole run and works on a copy of the table; the copy replaces the table only
//! on commit, so a failed unit of work leaves no trace.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use super::{AccessMode, IsolationLevel, OrderDeleter, OrderProvider, OrderSaver, OrderTx, StoreError, TransactionManager, TxWork};
use crate::model::{Order, OrderId, RecipientId};

type Table = BTreeMap<OrderId, Order>;

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    rows: Arc<Mutex<Table>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored rows.
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

fn update_row(rows: &mut Table, order: &Order) -> Result<(), StoreError> {
    match rows.get_mut(&order.id) {
        Some(row) => {
            *row = order.clone();
            Ok(())
        }
        None => Err(StoreError::NotFound),
    }
}

fn delete_row(rows: &mut Table, id: OrderId) -> Result<(), StoreError> {
    rows.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
}

struct MemoryTx {
    rows: Table,
    mode: AccessMode,
}

impl MemoryTx {
    fn writable(&mut self) -> Result<&mut Table, StoreError> {
        match self.mode {
            AccessMode::ReadWrite => Ok(&mut self.rows),
            AccessMode::ReadOnly => Err(StoreError::ReadOnlyTransaction),
        }
    }
}

#[async_trait]
impl OrderTx for MemoryTx {
    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        update_row(self.writable()?, order)
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<(), StoreError> {
        delete_row(self.writable()?, id)
    }
}

#[async_trait]
impl OrderSaver for MemoryStore {
    async fn create_order(&self, order: &Order) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        if rows.contains_key(&order.id) {
            return Err(StoreError::AlreadyExists(order.id));
        }
        rows.insert(order.id, order.clone());
        Ok(())
    }

    async fn update_order(&self, order: &Order) -> Result<(), StoreError> {
        update_row(&mut *self.rows.lock().await, order)
    }
}

#[async_trait]
impl OrderDeleter for MemoryStore {
    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError> {
        delete_row(&mut *self.rows.lock().await, id)
    }

    async fn delete_returned_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<OrderId>, StoreError> {
        let mut rows = self.rows.lock().await;
        let expired: Vec<OrderId> = rows
            .values()
            .filter(|order| order.returned_at.is_some_and(|at| at < cutoff))
            .map(|order| order.id)
            .collect();
        for id in &expired {
            rows.remove(id);
        }
        Ok(expired)
    }
}

#[async_trait]
impl OrderProvider for MemoryStore {
    async fn find_order_by_id(&self, id: OrderId) -> Result<Order, StoreError> {
        self.rows.lock().await.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn find_orders_by_ids(&self, ids: &[OrderId]) -> Result<Vec<Order>, StoreError> {
        let rows = self.rows.lock().await;
        Ok(ids.iter().filter_map(|id| rows.get(id).cloned()).collect())
    }

    async fn find_orders_by_recipient_id(&self, recipient_id: RecipientId) -> Result<Vec<Order>, StoreError> {
        let rows = self.rows.lock().await;
        let mut orders: Vec<Order> = rows
            .values()
            .filter(|order| order.recipient_id == recipient_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.storage_until.cmp(&a.storage_until));
        Ok(orders)
    }

    async fn find_returned_orders(&self, limit: u32, offset: u32) -> Result<Vec<Order>, StoreError> {
        let rows = self.rows.lock().await;
        let mut returned: Vec<Order> = rows.values().filter(|order| order.is_returned()).cloned().collect();
        returned.sort_by(|a, b| b.returned_at.cmp(&a.returned_at).then(a.id.cmp(&b.id)));
        Ok(returned
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }
}

#[async_trait]
impl TransactionManager for MemoryStore {
    #[instrument(skip(self, work))]
    async fn run_transactional_query(
        &self,
        isolation: IsolationLevel,
        mode: AccessMode,
        work: Box<dyn TxWork>,
    ) -> Result<(), StoreError> {
        // The lock is held for the whole run: every level behaves as serializable.
        let mut rows = self.rows.lock().await;
        debug!(%isolation, %mode, "Transaction started");
        let mut tx = MemoryTx {
            rows: rows.clone(),
            mode,
        };

        match work.run(&mut tx).await {
            Ok(()) => {
                *rows = tx.rows;
                debug!("Transaction committed");
                Ok(())
            }
            Err(err) => {
                debug!(error = %err, "Transaction rolled back");
                Err(err)
            }
        }
    }
}
