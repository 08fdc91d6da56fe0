//! # System Lifecycle
//!
//! Individual components are simple; wiring them is where the care goes.
//! [`PickupSystem`] owns that wiring:
//!
//! 1. **Cache creation**: one [`OrderCache`](crate::cache::OrderCache) built from
//!    the configured capacity, strategy and TTL.
//! 2. **Dependency injection**: the store, the cache and a
//!    [`Clock`](crate::clock::Clock) are handed to the
//!    [`OrderService`](crate::service::OrderService) as trait objects.
//! 3. **Background work**: the cache sweeper runs on its own task, bound to a
//!    child of the system's cancellation token.
//! 4. **Graceful shutdown**: [`PickupSystem::shutdown`] cancels the token and
//!    awaits every task, surfacing panics as errors.
//!
//! [`setup_tracing`] initializes structured logging; see the [`tracing`] module.

pub mod pickup_system;
pub mod tracing;

pub use self::pickup_system::*;
pub use self::tracing::*;
