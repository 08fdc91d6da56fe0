//! # Order Orchestration
//!
//! [`OrderService`] is the only component that mutates orders. It combines the
//! [`Cache`](crate::cache::Cache), the storage traits and the order state
//! machine:
//!
//! ```text
//!             accept_order_courier
//!                     │
//!                     ▼
//!   ┌────────────► Stored ──── return_order_courier ───► (deleted)
//!   │                 │           (storage time over, never issued)
//!   │      issue_order_client
//!   │       (one recipient, one transaction)
//!   │                 ▼
//!   │              Issued
//!   │                 │
//!   │     accept_return_client
//!   │      (same recipient, within 48h)
//!   │                 ▼
//!   └── issue ──── Returned ──── delete_issued_orders ──► (deleted)
//!                                  (returned over 2 days ago)
//! ```
//!
//! ## Cache discipline
//!
//! - Single-order lookups read through the cache and backfill it from the store.
//! - Every committed mutation is written into the cache before the operation
//!   returns; every delete invalidates.
//! - Listing operations always go to the store.
//! - Store I/O never happens while the cache lock is held.
//!
//! ## Errors
//!
//! Each [`OrderError`] maps to one [`ErrorKind`]. Store failures other than
//! "not found" are wrapped with the operation name and never retried here.

pub mod error;
pub mod orders;

pub use error::{ErrorKind, OrderError};
pub use orders::{OrderService, RETURN_RETENTION, RETURN_WINDOW};
