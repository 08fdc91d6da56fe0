//! # Order Storage
//!
//! Durable persistence sits behind four narrow traits so the orchestrator only
//! depends on what it calls:
//!
//! | Trait | Responsibility |
//! |-------|----------------|
//! | [`OrderSaver`] | insert and update single orders |
//! | [`OrderDeleter`] | delete single orders, purge old returns |
//! | [`OrderProvider`] | lookups by id, recipient and return status |
//! | [`TransactionManager`] | run a unit of work atomically |
//!
//! [`OrderStore`] is implemented for anything that provides all four.
//!
//! ## Transactions
//!
//! Multi-row changes are expressed as a [`TxWork`] value. The runner opens a
//! transaction with the requested [`IsolationLevel`] and [`AccessMode`], hands the
//! work a [`OrderTx`] handle, then commits if the work returned `Ok` and rolls
//! back otherwise:
//!
//! ```rust,ignore
//! struct MarkIssued(Vec<Order>);
//!
//! #[async_trait]
//! impl TxWork for MarkIssued {
//!     async fn run(self: Box<Self>, tx: &mut dyn OrderTx) -> Result<(), StoreError> {
//!         for order in &self.0 {
//!             tx.update_order(order).await?;
//!         }
//!         Ok(())
//!     }
//! }
//!
//! store
//!     .run_transactional_query(IsolationLevel::RepeatableRead, AccessMode::ReadWrite, Box::new(MarkIssued(orders)))
//!     .await?;
//! ```
//!
//! ## Implementations
//!
//! - [`MemoryStore`]: in-process tables, the default for tests and the demo.
//! - [`mock::MockStore`]: expectation queue for unit tests of the orchestrator.
//! - `PgStore` (feature `postgres`): `sqlx` over PostgreSQL.

pub mod error;
pub mod memory;
pub mod mock;
#[cfg(feature = "postgres")]
pub mod postgres;

pub use error::StoreError;
pub use memory::MemoryStore;
#[cfg(feature = "postgres")]
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;

use crate::model::{Order, OrderId, RecipientId};

/// Transaction isolation levels understood by the stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    Serializable,
    RepeatableRead,
    ReadCommitted,
    ReadUncommitted,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::Serializable => "SERIALIZABLE",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
        }
    }
}

impl fmt::Display for IsolationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadWrite,
    ReadOnly,
}

impl AccessMode {
    pub fn as_sql(&self) -> &'static str {
        match self {
            AccessMode::ReadWrite => "READ WRITE",
            AccessMode::ReadOnly => "READ ONLY",
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[async_trait]
pub trait OrderSaver: Send + Sync {
    /// Fails with [`StoreError::AlreadyExists`] if the id is taken.
    async fn create_order(&self, order: &Order) -> Result<(), StoreError>;
    /// Fails with [`StoreError::NotFound`] if no row matched.
    async fn update_order(&self, order: &Order) -> Result<(), StoreError>;
}

#[async_trait]
pub trait OrderDeleter: Send + Sync {
    /// Fails with [`StoreError::NotFound`] if no row matched.
    async fn delete_order(&self, id: OrderId) -> Result<(), StoreError>;
    /// Deletes every returned order whose `returned_at` is before `cutoff` and
    /// reports which ids went away.
    async fn delete_returned_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<OrderId>, StoreError>;
}

#[async_trait]
pub trait OrderProvider: Send + Sync {
    async fn find_order_by_id(&self, id: OrderId) -> Result<Order, StoreError>;
    /// Returns the orders that exist among `ids`; missing ids are skipped.
    async fn find_orders_by_ids(&self, ids: &[OrderId]) -> Result<Vec<Order>, StoreError>;
    async fn find_orders_by_recipient_id(&self, recipient_id: RecipientId) -> Result<Vec<Order>, StoreError>;
    /// Returned orders, most recently returned first.
    async fn find_returned_orders(&self, limit: u32, offset: u32) -> Result<Vec<Order>, StoreError>;
}

/// Row operations available inside a transaction.
#[async_trait]
pub trait OrderTx: Send {
    async fn update_order(&mut self, order: &Order) -> Result<(), StoreError>;
    async fn delete_order(&mut self, id: OrderId) -> Result<(), StoreError>;
}

/// A unit of work run inside one transaction.
#[async_trait]
pub trait TxWork: Send {
    async fn run(self: Box<Self>, tx: &mut dyn OrderTx) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TransactionManager: Send + Sync {
    /// Commits iff `work` returns `Ok`; otherwise rolls back and returns the
    /// work's error, or [`StoreError::Rollback`] if the rollback failed too.
    async fn run_transactional_query(
        &self,
        isolation: IsolationLevel,
        mode: AccessMode,
        work: Box<dyn TxWork>,
    ) -> Result<(), StoreError>;
}

/// Everything the orchestrator needs from persistence.
pub trait OrderStore: OrderSaver + OrderDeleter + OrderProvider + TransactionManager {}

impl<T> OrderStore for T where T: OrderSaver + OrderDeleter + OrderProvider + TransactionManager {}
