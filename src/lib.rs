//! # Pickup Point
//!
//! > **Order orchestration for a parcel pickup point, with a TTL cache in front of a transactional store.**
//!
//! A courier drops off a parcel, the point stores it, a client collects it or brings it
//! back. This crate enforces that lifecycle and keeps a bounded, time-limited cache of
//! orders consistent with durable storage.
//!
//! ## 🏗️ Design
//!
//! ### Read-through, write-through
//! Single-order lookups hit the cache first and backfill it from the store. Every
//! committed mutation is written back into the cache before the call returns, and
//! every delete invalidates. The cache never sees a state the store has not committed.
//!
//! ### Transactions for batches
//! Issuing several orders to a client is one unit of work at `REPEATABLE READ`:
//! either every order is marked issued or none is.
//!
//! ### Typed errors
//! Each layer has its own `thiserror` enum (`CacheError`, `StoreError`, `OrderError`,
//! `ConfigError`). [`OrderError::kind`](service::OrderError::kind) collapses the
//! orchestrator's errors into six kinds an API layer can map to status codes.
//!
//! ## 🗺️ Module Tour
//!
//! ### 1. The Engine (`ttl-cache` crate)
//! Generic bounded cache with per-entry TTL, LRU or LFU eviction and a background sweeper.
//!
//! ### 2. The Adapter ([`cache`])
//! [`OrderCache`](cache::OrderCache) specializes the engine for orders and implements
//! the [`Cache`](cache::Cache) trait the orchestrator depends on.
//!
//! ### 3. Persistence ([`store`])
//! Storage traits plus three implementations: [`MemoryStore`](store::MemoryStore),
//! [`MockStore`](store::mock::MockStore) for tests and `PgStore` behind the `postgres`
//! feature.
//!
//! ### 4. The Orchestrator ([`service`])
//! [`OrderService`](service::OrderService): the seven order operations and the state
//! machine behind them.
//!
//! ### 5. Wiring ([`lifecycle`], [`config`], [`clock`])
//! [`PickupSystem`](lifecycle::PickupSystem) builds everything from an
//! [`AppConfig`](config::AppConfig), runs the cache sweeper and shuts it down.
//!
//! ### 6. Commands and audit ([`command`], [`audit`])
//! [`command::execute`] runs one CLI command and reports it as an
//! [`AuditEvent`](audit::AuditEvent) to the configured sink.
//!
//! ## 🚀 Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use chrono::{Duration, Utc};
//! use pickup_point::config::AppConfig;
//! use pickup_point::lifecycle::PickupSystem;
//! use pickup_point::model::{AcceptOrder, OrderId, RecipientId};
//! use pickup_point::store::MemoryStore;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = AppConfig::default();
//!     let system = PickupSystem::new(config.cache_config(), Arc::new(MemoryStore::new())).unwrap();
//!
//!     let order = system
//!         .orders
//!         .accept_order_courier(AcceptOrder {
//!             order_id: OrderId(10),
//!             recipient_id: RecipientId(1),
//!             storage_until: Utc::now() + Duration::hours(1),
//!             package_type: "box".into(),
//!             weight: 5.0,
//!             cost: 100.0,
//!         })
//!         .await
//!         .unwrap();
//!     assert_eq!(order.package_cost, 20.0);
//!
//!     let issued = system.orders.issue_order_client(&[OrderId(10)]).await.unwrap();
//!     assert!(issued[0].issued_at.is_some());
//!
//!     system.shutdown().await.unwrap();
//! }
//! ```

pub mod audit;
pub mod cache;
pub mod clock;
pub mod command;
pub mod config;
pub mod lifecycle;
pub mod model;
pub mod service;
pub mod store;
