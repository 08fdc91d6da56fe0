use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::cache::Cache;
use crate::clock::Clock;
use crate::model::{AcceptOrder, Order, OrderId, RecipientId, ReturnRequest};
use crate::service::OrderError;
use crate::store::{
    AccessMode, IsolationLevel, OrderDeleter, OrderProvider, OrderSaver, OrderStore, OrderTx, StoreError,
    TransactionManager, TxWork,
};

/// How long after issue a client may still bring an order back.
pub const RETURN_WINDOW: Duration = Duration::hours(48);

/// How long returned orders are kept before the cleanup sweep deletes them.
pub const RETURN_RETENTION: Duration = Duration::days(2);

/// Marks a batch of orders issued, attempting every row before reporting.
///
/// Rows that no longer exist are listed in `vanished` so the caller can tell
/// a concurrent delete from a failed transaction.
struct IssueBatch {
    orders: Vec<Order>,
    vanished: Arc<Mutex<Vec<OrderId>>>,
}

#[async_trait]
impl TxWork for IssueBatch {
    async fn run(self: Box<Self>, tx: &mut dyn OrderTx) -> Result<(), StoreError> {
        let mut failures = Vec::new();
        for order in &self.orders {
            if let Err(err) = tx.update_order(order).await {
                warn!(id = %order.id, error = %err, "Row update failed");
                if err.is_not_found() {
                    self.vanished.lock().push(order.id);
                }
                failures.push(err);
            }
        }

        match failures.len() {
            0 => Ok(()),
            1 => Err(failures.remove(0)),
            _ => Err(StoreError::Batch(failures)),
        }
    }
}

/// The order orchestrator.
///
/// Every operation reads through the cache where it looks up single orders and
/// writes every successful mutation back into it, so the cache never holds a
/// state the store has not committed.
#[derive(Clone)]
pub struct OrderService {
    saver: Arc<dyn OrderSaver>,
    deleter: Arc<dyn OrderDeleter>,
    provider: Arc<dyn OrderProvider>,
    transactions: Arc<dyn TransactionManager>,
    cache: Arc<dyn Cache>,
    clock: Arc<dyn Clock>,
}

impl OrderService {
    pub fn new<S>(store: Arc<S>, cache: Arc<dyn Cache>, clock: Arc<dyn Clock>) -> Self
    where
        S: OrderStore + 'static,
    {
        Self {
            saver: store.clone(),
            deleter: store.clone(),
            provider: store.clone(),
            transactions: store,
            cache,
            clock,
        }
    }

    /// Takes an order from a courier and puts it into storage.
    #[instrument(skip(self, params), fields(id = %params.order_id, recipient = %params.recipient_id))]
    pub async fn accept_order_courier(&self, params: AcceptOrder) -> Result<Order, OrderError> {
        debug!(?params, "accept_order_courier called");

        if params.storage_until < self.clock.now() {
            warn!(storage_until = %params.storage_until, "Storage time is in the past");
            return Err(OrderError::StorageExpired {
                order_id: params.order_id,
                storage_until: params.storage_until,
            });
        }

        let order = Order::accept(params).inspect_err(|err| warn!(error = %err, "Package check failed"))?;

        match self.saver.create_order(&order).await {
            Ok(()) => {}
            Err(StoreError::AlreadyExists(_)) => return Err(OrderError::OrderExists(order.id)),
            Err(err) => return Err(OrderError::store("accept_order_courier", err)),
        }

        self.cache.set(order.id, order.clone());
        info!(package = %order.package_type, total = order.total_cost(), "Order accepted");
        Ok(order)
    }

    /// Hands an unclaimed order back to the courier and deletes it.
    #[instrument(skip(self))]
    pub async fn return_order_courier(&self, id: OrderId) -> Result<(), OrderError> {
        let order = self.fetch_order("return_order_courier", id).await?;

        if order.storage_until > self.clock.now() || order.is_issued() {
            warn!(storage_until = %order.storage_until, issued = order.is_issued(), "Order cannot go back to courier");
            return Err(OrderError::NotExpiredOrIssued(id));
        }

        let result = self.deleter.delete_order(id).await;
        if matches!(result, Ok(()) | Err(StoreError::NotFound)) {
            self.cache.invalidate(id);
        }
        match result {
            Ok(()) => {
                info!("Order returned to courier");
                Ok(())
            }
            Err(StoreError::NotFound) => Err(OrderError::OrderVanished(id)),
            Err(err) => Err(OrderError::store("return_order_courier", err)),
        }
    }

    /// Issues a batch of orders to their recipient in one transaction.
    #[instrument(skip(self, ids), fields(count = ids.len()))]
    pub async fn issue_order_client(&self, ids: &[OrderId]) -> Result<Vec<Order>, OrderError> {
        debug!(?ids, "issue_order_client called");

        let mut seen = HashSet::with_capacity(ids.len());
        let ids: Vec<OrderId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if ids.is_empty() {
            return Err(OrderError::EmptyBatch);
        }

        let mut orders = self.fetch_orders(&ids).await?;

        let recipient_id = orders[0].recipient_id;
        if let Some(other) = orders.iter().find(|order| order.recipient_id != recipient_id) {
            warn!(expected = %recipient_id, found = %other.recipient_id, "Batch spans several clients");
            return Err(OrderError::DifferentClients {
                expected: recipient_id,
                found: other.recipient_id,
            });
        }

        let now = self.clock.now();
        for order in &orders {
            if order.is_issued() {
                return Err(OrderError::AlreadyIssued(order.id));
            }
            if order.storage_until < now {
                return Err(OrderError::StoragePeriodOver(order.id));
            }
        }

        for order in &mut orders {
            order.issue(now);
        }

        let vanished = Arc::new(Mutex::new(Vec::new()));
        let work = IssueBatch {
            orders: orders.clone(),
            vanished: vanished.clone(),
        };
        let committed = self
            .transactions
            .run_transactional_query(IsolationLevel::RepeatableRead, AccessMode::ReadWrite, Box::new(work))
            .await;

        if let Err(err) = committed {
            let vanished = std::mem::take(&mut *vanished.lock());
            if let Some(&first) = vanished.first() {
                for id in &vanished {
                    self.cache.invalidate(*id);
                }
                warn!(?vanished, "Orders deleted while being issued");
                return Err(OrderError::OrderVanished(first));
            }
            warn!(error = %err, "Issue transaction rolled back");
            return Err(OrderError::Transaction(err));
        }

        for order in &orders {
            self.cache.set(order.id, order.clone());
        }
        info!(recipient = %recipient_id, "Orders issued");
        Ok(orders)
    }

    /// Takes an issued order back from its recipient.
    #[instrument(skip(self, request), fields(id = %request.order_id, recipient = %request.recipient_id))]
    pub async fn accept_return_client(&self, request: ReturnRequest) -> Result<Order, OrderError> {
        let mut order = self.fetch_order("accept_return_client", request.order_id).await?;

        if order.recipient_id != request.recipient_id {
            warn!(owner = %order.recipient_id, "Order belongs to another client");
            return Err(OrderError::RecipientNotFound {
                order_id: request.order_id,
                recipient_id: request.recipient_id,
            });
        }

        let now = self.clock.now();
        if !within_return_window(order.issued_at, now) {
            warn!(issued_at = ?order.issued_at, "Return window closed");
            return Err(OrderError::NotIssuedOrExpired(order.id));
        }

        order.accept_return(now);
        match self.saver.update_order(&order).await {
            Ok(()) => {}
            Err(StoreError::NotFound) => {
                self.cache.invalidate(order.id);
                return Err(OrderError::OrderVanished(order.id));
            }
            Err(err) => return Err(OrderError::store("accept_return_client", err)),
        }

        self.cache.set(order.id, order.clone());
        info!("Return accepted");
        Ok(order)
    }

    /// Orders still waiting for `recipient_id`, latest storage deadline first.
    ///
    /// `limit` of `None` returns all of them.
    #[instrument(skip(self))]
    pub async fn list_orders(&self, recipient_id: RecipientId, limit: Option<usize>) -> Result<Vec<Order>, OrderError> {
        let mut orders = self
            .provider
            .find_orders_by_recipient_id(recipient_id)
            .await
            .or_else(|err| match err {
                StoreError::NotFound => Ok(Vec::new()),
                err => Err(OrderError::store("list_orders", err)),
            })?;

        orders.sort_by(|a, b| b.storage_until.cmp(&a.storage_until));
        let waiting: Vec<Order> = orders
            .into_iter()
            .filter(|order| order.recipient_id == recipient_id && !order.is_issued())
            .take(limit.unwrap_or(usize::MAX))
            .collect();

        if waiting.is_empty() {
            debug!("Nothing to list");
            return Err(OrderError::NoOrdersForRecipient(recipient_id));
        }
        debug!(found = waiting.len(), "Orders listed");
        Ok(waiting)
    }

    /// One page of returned orders. Pages start at 1.
    #[instrument(skip(self))]
    pub async fn list_return_orders(&self, page: u32, limit: u32) -> Result<Vec<Order>, OrderError> {
        let invalid = || OrderError::InvalidPage { page, limit };
        if page == 0 || limit == 0 {
            return Err(invalid());
        }
        let offset = (page - 1).checked_mul(limit).ok_or_else(invalid)?;

        let orders = self
            .provider
            .find_returned_orders(limit, offset)
            .await
            .map_err(|err| OrderError::store("list_return_orders", err))?;
        debug!(offset, found = orders.len(), "Returned orders listed");
        Ok(orders)
    }

    /// Deletes returned orders past the retention window and drops them from
    /// the cache. Returns how many were deleted.
    #[instrument(skip(self))]
    pub async fn delete_issued_orders(&self) -> Result<u64, OrderError> {
        let cutoff = self.clock.now() - RETURN_RETENTION;
        let deleted = self
            .deleter
            .delete_returned_orders(cutoff)
            .await
            .map_err(|err| OrderError::store("delete_issued_orders", err))?;

        for id in &deleted {
            self.cache.invalidate(*id);
        }
        info!(%cutoff, deleted = deleted.len(), "Old returns purged");
        Ok(deleted.len() as u64)
    }

    async fn fetch_order(&self, op: &'static str, id: OrderId) -> Result<Order, OrderError> {
        if let Some(order) = self.cache.get(id) {
            return Ok(order);
        }

        match self.provider.find_order_by_id(id).await {
            Ok(order) => {
                self.cache.set(id, order.clone());
                Ok(order)
            }
            Err(StoreError::NotFound) => Err(OrderError::OrderNotFound(id)),
            Err(err) => Err(OrderError::store(op, err)),
        }
    }

    /// Resolves `ids` (already de-duplicated) in request order: cache first,
    /// then one batch query for the rest.
    async fn fetch_orders(&self, ids: &[OrderId]) -> Result<Vec<Order>, OrderError> {
        let mut resolved: Vec<Option<Order>> = ids.iter().map(|id| self.cache.get(*id)).collect();
        let missing: Vec<OrderId> = ids
            .iter()
            .zip(&resolved)
            .filter(|(_, hit)| hit.is_none())
            .map(|(id, _)| *id)
            .collect();

        if !missing.is_empty() {
            let fetched = self
                .provider
                .find_orders_by_ids(&missing)
                .await
                .map_err(|err| OrderError::store("issue_order_client", err))?;
            for order in fetched {
                if let Some(pos) = ids.iter().position(|id| *id == order.id) {
                    self.cache.set(order.id, order.clone());
                    resolved[pos] = Some(order);
                }
            }
        }

        ids.iter()
            .zip(resolved)
            .map(|(id, order)| order.ok_or(OrderError::OrderNotFound(*id)))
            .collect()
    }
}

fn within_return_window(issued_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    issued_at.is_some_and(|at| now - at <= RETURN_WINDOW)
}
