//! # Mock Store
//!
//! [`MockStore`] implements every storage trait on top of an ordered queue of
//! expectations. Each call pops the next expectation, checks that it is the call
//! the test announced (same method, same arguments) and returns the canned
//! response. Anything unexpected panics, which fails the test.
//!
//! Use it to unit-test the orchestrator without a real store, and to inject
//! failures that are hard to provoke otherwise (a row update failing halfway
//! through a transaction, a backend outage on delete).
//!
//! ```rust
//! use pickup_point::model::OrderId;
//! use pickup_point::store::mock::MockStore;
//! use pickup_point::store::{OrderProvider, StoreError};
//!
//! #[tokio::main]
//! async fn main() {
//!     let mock = MockStore::new();
//!     mock.expect_find_order_by_id(OrderId(7)).return_err(StoreError::NotFound);
//!
//!     let result = mock.find_order_by_id(OrderId(7)).await;
//!     assert!(matches!(result, Err(StoreError::NotFound)));
//!
//!     mock.verify();
//! }
//! ```
//!
//! Transactions are announced with [`MockStore::expect_transaction`]; the row
//! operations the unit of work performs are announced right after it with
//! [`MockStore::expect_tx_update`] / [`MockStore::expect_tx_delete`]. The
//! transaction's result is whatever the unit of work returns.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::{AccessMode, IsolationLevel, OrderDeleter, OrderProvider, OrderSaver, OrderTx, StoreError, TransactionManager, TxWork};
use crate::model::{Order, OrderId, RecipientId};

/// An announced call and the response to give it.
enum Expectation {
    CreateOrder {
        id: OrderId,
        response: Result<(), StoreError>,
    },
    UpdateOrder {
        id: OrderId,
        response: Result<(), StoreError>,
    },
    DeleteOrder {
        id: OrderId,
        response: Result<(), StoreError>,
    },
    DeleteReturnedOrders {
        response: Result<Vec<OrderId>, StoreError>,
    },
    FindOrderById {
        id: OrderId,
        response: Result<Order, StoreError>,
    },
    FindOrdersByIds {
        ids: Vec<OrderId>,
        response: Result<Vec<Order>, StoreError>,
    },
    FindOrdersByRecipientId {
        recipient_id: RecipientId,
        response: Result<Vec<Order>, StoreError>,
    },
    FindReturnedOrders {
        limit: u32,
        offset: u32,
        response: Result<Vec<Order>, StoreError>,
    },
    Transaction {
        isolation: IsolationLevel,
        mode: AccessMode,
    },
    TxUpdateOrder {
        id: OrderId,
        response: Result<(), StoreError>,
    },
    TxDeleteOrder {
        id: OrderId,
        response: Result<(), StoreError>,
    },
}

impl Expectation {
    fn name(&self) -> &'static str {
        match self {
            Expectation::CreateOrder { .. } => "create_order",
            Expectation::UpdateOrder { .. } => "update_order",
            Expectation::DeleteOrder { .. } => "delete_order",
            Expectation::DeleteReturnedOrders { .. } => "delete_returned_orders",
            Expectation::FindOrderById { .. } => "find_order_by_id",
            Expectation::FindOrdersByIds { .. } => "find_orders_by_ids",
            Expectation::FindOrdersByRecipientId { .. } => "find_orders_by_recipient_id",
            Expectation::FindReturnedOrders { .. } => "find_returned_orders",
            Expectation::Transaction { .. } => "run_transactional_query",
            Expectation::TxUpdateOrder { .. } => "tx.update_order",
            Expectation::TxDeleteOrder { .. } => "tx.delete_order",
        }
    }
}

type Queue = Arc<Mutex<VecDeque<Expectation>>>;

fn pop(queue: &Queue, call: &str) -> Expectation {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| panic!("Unexpected call to {call}: no expectations left"))
}

fn mismatch(expected: &Expectation, call: &str) -> ! {
    panic!("Expected {}, got {call}", expected.name())
}

/// Completes an expectation with the response the mock should give.
pub struct ExpectationBuilder<T> {
    queue: Queue,
    make: Box<dyn FnOnce(Result<T, StoreError>) -> Expectation + Send>,
}

impl<T> ExpectationBuilder<T> {
    fn new(queue: &Queue, make: impl FnOnce(Result<T, StoreError>) -> Expectation + Send + 'static) -> Self {
        Self {
            queue: queue.clone(),
            make: Box::new(make),
        }
    }

    pub fn return_ok(self, value: T) {
        let expectation = (self.make)(Ok(value));
        self.queue.lock().unwrap().push_back(expectation);
    }

    pub fn return_err(self, error: StoreError) {
        let expectation = (self.make)(Err(error));
        self.queue.lock().unwrap().push_back(expectation);
    }
}

/// A store double driven by an expectation queue.
#[derive(Clone, Default)]
pub struct MockStore {
    expectations: Queue,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn expect_create_order(&self, id: OrderId) -> ExpectationBuilder<()> {
        ExpectationBuilder::new(&self.expectations, move |response| Expectation::CreateOrder { id, response })
    }

    pub fn expect_update_order(&self, id: OrderId) -> ExpectationBuilder<()> {
        ExpectationBuilder::new(&self.expectations, move |response| Expectation::UpdateOrder { id, response })
    }

    pub fn expect_delete_order(&self, id: OrderId) -> ExpectationBuilder<()> {
        ExpectationBuilder::new(&self.expectations, move |response| Expectation::DeleteOrder { id, response })
    }

    pub fn expect_delete_returned_orders(&self) -> ExpectationBuilder<Vec<OrderId>> {
        ExpectationBuilder::new(&self.expectations, |response| Expectation::DeleteReturnedOrders { response })
    }

    pub fn expect_find_order_by_id(&self, id: OrderId) -> ExpectationBuilder<Order> {
        ExpectationBuilder::new(&self.expectations, move |response| Expectation::FindOrderById { id, response })
    }

    pub fn expect_find_orders_by_ids(&self, ids: Vec<OrderId>) -> ExpectationBuilder<Vec<Order>> {
        ExpectationBuilder::new(&self.expectations, move |response| Expectation::FindOrdersByIds { ids, response })
    }

    pub fn expect_find_orders_by_recipient_id(&self, recipient_id: RecipientId) -> ExpectationBuilder<Vec<Order>> {
        ExpectationBuilder::new(&self.expectations, move |response| Expectation::FindOrdersByRecipientId {
            recipient_id,
            response,
        })
    }

    pub fn expect_find_returned_orders(&self, limit: u32, offset: u32) -> ExpectationBuilder<Vec<Order>> {
        ExpectationBuilder::new(&self.expectations, move |response| Expectation::FindReturnedOrders {
            limit,
            offset,
            response,
        })
    }

    /// Announces a transaction opened with exactly this isolation and mode.
    pub fn expect_transaction(&self, isolation: IsolationLevel, mode: AccessMode) {
        self.expectations
            .lock()
            .unwrap()
            .push_back(Expectation::Transaction { isolation, mode });
    }

    pub fn expect_tx_update(&self, id: OrderId) -> ExpectationBuilder<()> {
        ExpectationBuilder::new(&self.expectations, move |response| Expectation::TxUpdateOrder { id, response })
    }

    pub fn expect_tx_delete(&self, id: OrderId) -> ExpectationBuilder<()> {
        ExpectationBuilder::new(&self.expectations, move |response| Expectation::TxDeleteOrder { id, response })
    }

    /// Panics if any announced call was never made.
    pub fn verify(&self) {
        let remaining = self.expectations.lock().unwrap();
        if let Some(next) = remaining.front() {
            panic!(
                "{} expectation(s) not met, next one: {}",
                remaining.len(),
                next.name()
            );
        }
    }
}

struct MockTx {
    expectations: Queue,
}

#[async_trait]
impl OrderTx for MockTx {
    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let call = format!("tx.update_order({})", order.id);
        match pop(&self.expectations, &call) {
            Expectation::TxUpdateOrder { id, response } if id == order.id => response,
            other => mismatch(&other, &call),
        }
    }

    async fn delete_order(&mut self, id: OrderId) -> Result<(), StoreError> {
        let call = format!("tx.delete_order({id})");
        match pop(&self.expectations, &call) {
            Expectation::TxDeleteOrder { id: expected, response } if expected == id => response,
            other => mismatch(&other, &call),
        }
    }
}

#[async_trait]
impl OrderSaver for MockStore {
    async fn create_order(&self, order: &Order) -> Result<(), StoreError> {
        let call = format!("create_order({})", order.id);
        match pop(&self.expectations, &call) {
            Expectation::CreateOrder { id, response } if id == order.id => response,
            other => mismatch(&other, &call),
        }
    }

    async fn update_order(&self, order: &Order) -> Result<(), StoreError> {
        let call = format!("update_order({})", order.id);
        match pop(&self.expectations, &call) {
            Expectation::UpdateOrder { id, response } if id == order.id => response,
            other => mismatch(&other, &call),
        }
    }
}

#[async_trait]
impl OrderDeleter for MockStore {
    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError> {
        let call = format!("delete_order({id})");
        match pop(&self.expectations, &call) {
            Expectation::DeleteOrder { id: expected, response } if expected == id => response,
            other => mismatch(&other, &call),
        }
    }

    async fn delete_returned_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<OrderId>, StoreError> {
        let call = format!("delete_returned_orders({cutoff})");
        match pop(&self.expectations, &call) {
            Expectation::DeleteReturnedOrders { response } => response,
            other => mismatch(&other, &call),
        }
    }
}

#[async_trait]
impl OrderProvider for MockStore {
    async fn find_order_by_id(&self, id: OrderId) -> Result<Order, StoreError> {
        let call = format!("find_order_by_id({id})");
        match pop(&self.expectations, &call) {
            Expectation::FindOrderById { id: expected, response } if expected == id => response,
            other => mismatch(&other, &call),
        }
    }

    async fn find_orders_by_ids(&self, ids: &[OrderId]) -> Result<Vec<Order>, StoreError> {
        let call = format!("find_orders_by_ids({ids:?})");
        match pop(&self.expectations, &call) {
            Expectation::FindOrdersByIds { ids: expected, response } if expected == ids => response,
            other => mismatch(&other, &call),
        }
    }

    async fn find_orders_by_recipient_id(&self, recipient_id: RecipientId) -> Result<Vec<Order>, StoreError> {
        let call = format!("find_orders_by_recipient_id({recipient_id})");
        match pop(&self.expectations, &call) {
            Expectation::FindOrdersByRecipientId {
                recipient_id: expected,
                response,
            } if expected == recipient_id => response,
            other => mismatch(&other, &call),
        }
    }

    async fn find_returned_orders(&self, limit: u32, offset: u32) -> Result<Vec<Order>, StoreError> {
        let call = format!("find_returned_orders({limit}, {offset})");
        match pop(&self.expectations, &call) {
            Expectation::FindReturnedOrders {
                limit: l,
                offset: o,
                response,
            } if l == limit && o == offset => response,
            other => mismatch(&other, &call),
        }
    }
}

#[async_trait]
impl TransactionManager for MockStore {
    async fn run_transactional_query(
        &self,
        isolation: IsolationLevel,
        mode: AccessMode,
        work: Box<dyn TxWork>,
    ) -> Result<(), StoreError> {
        let call = format!("run_transactional_query({isolation}, {mode})");
        match pop(&self.expectations, &call) {
            Expectation::Transaction {
                isolation: i,
                mode: m,
            } if i == isolation && m == mode => {}
            other => mismatch(&other, &call),
        }

        let mut tx = MockTx {
            expectations: self.expectations.clone(),
        };
        work.run(&mut tx).await
    }
}
