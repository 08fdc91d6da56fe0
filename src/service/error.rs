//! Error types for the order orchestrator.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::{OrderId, PackageError, RecipientId};
use crate::store::StoreError;

/// Coarse classification callers can branch on without matching every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    ValidationFailed,
    StateConflict,
    Transactional,
    Unavailable,
}

impl ErrorKind {
    pub fn is_retryable(&self) -> bool {
        matches!(self, ErrorKind::Transactional | ErrorKind::Unavailable)
    }
}

/// Errors returned by [`OrderService`](crate::service::OrderService) operations.
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    /// The order disappeared between lookup and mutation.
    #[error("order {0} was deleted concurrently")]
    OrderVanished(OrderId),

    #[error("recipient {recipient_id} has no order {order_id}")]
    RecipientNotFound {
        order_id: OrderId,
        recipient_id: RecipientId,
    },

    #[error("no orders found for {0}")]
    NoOrdersForRecipient(RecipientId),

    #[error("order {0} already exists")]
    OrderExists(OrderId),

    #[error("storage time of order {order_id} is in the past: {storage_until}")]
    StorageExpired {
        order_id: OrderId,
        storage_until: DateTime<Utc>,
    },

    #[error(transparent)]
    Package(#[from] PackageError),

    #[error("no orders given")]
    EmptyBatch,

    #[error("page and limit must be at least 1: got page {page}, limit {limit}")]
    InvalidPage { page: u32, limit: u32 },

    #[error("order {0} has not expired or has been issued to the client")]
    NotExpiredOrIssued(OrderId),

    #[error("order {0} was not issued or more than 2 days passed")]
    NotIssuedOrExpired(OrderId),

    #[error("orders belong to different clients: {expected} and {found}")]
    DifferentClients {
        expected: RecipientId,
        found: RecipientId,
    },

    #[error("order {0} is already issued")]
    AlreadyIssued(OrderId),

    #[error("storage period of order {0} is over")]
    StoragePeriodOver(OrderId),

    #[error("transaction failed: {0}")]
    Transaction(#[source] StoreError),

    #[error("{op}: {source}")]
    Store {
        op: &'static str,
        #[source]
        source: StoreError,
    },
}

impl OrderError {
    pub fn store(op: &'static str, source: StoreError) -> Self {
        OrderError::Store { op, source }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            OrderError::OrderNotFound(_)
            | OrderError::OrderVanished(_)
            | OrderError::RecipientNotFound { .. }
            | OrderError::NoOrdersForRecipient(_) => ErrorKind::NotFound,
            OrderError::OrderExists(_) => ErrorKind::AlreadyExists,
            OrderError::StorageExpired { .. }
            | OrderError::Package(_)
            | OrderError::EmptyBatch
            | OrderError::InvalidPage { .. } => ErrorKind::ValidationFailed,
            OrderError::NotExpiredOrIssued(_)
            | OrderError::NotIssuedOrExpired(_)
            | OrderError::DifferentClients { .. }
            | OrderError::AlreadyIssued(_)
            | OrderError::StoragePeriodOver(_) => ErrorKind::StateConflict,
            OrderError::Transaction(_) => ErrorKind::Transactional,
            OrderError::Store { .. } => ErrorKind::Unavailable,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn package_errors_are_validation_failures() {
        let err = OrderError::from(PackageError::Unsupported("crate".into()));
        assert_eq!(err.kind(), ErrorKind::ValidationFailed);
        assert!(!err.kind().is_retryable());
    }

    #[test]
    fn store_failures_are_retryable() {
        let err = OrderError::store("list_orders", StoreError::backend("connection reset"));
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(err.kind().is_retryable());
        assert_eq!(
            err.to_string(),
            "list_orders: storage backend error: connection reset"
        );
    }
}
