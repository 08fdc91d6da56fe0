//! Error types for the storage layer.

use thiserror::Error;

use crate::model::OrderId;

/// Errors reported by an order store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched the query or mutation.
    #[error("order not found")]
    NotFound,

    /// Insert hit the primary key.
    #[error("order {0} already exists")]
    AlreadyExists(OrderId),

    /// Insert reported success but touched no row.
    #[error("order {0} was not created")]
    NotCreated(OrderId),

    #[error("write attempted in a read-only transaction")]
    ReadOnlyTransaction,

    /// Several row operations failed inside one unit of work.
    #[error("{} row operations failed: {}", .0.len(), join(.0))]
    Batch(Vec<StoreError>),

    #[error("{source}; rollback also failed: {rollback}")]
    Rollback {
        #[source]
        source: Box<StoreError>,
        rollback: String,
    },

    /// Connection, driver or decoding failure.
    #[error("storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    pub fn backend(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        StoreError::Backend(err.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound)
    }
}

fn join(errors: &[StoreError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
