//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered by
//! `RUST_LOG` (default `info`).
//!
//! ```bash
//! RUST_LOG=info  pickup-point demo    # state changes only
//! RUST_LOG=debug pickup-point demo    # request payloads, cache sweeps, transactions
//! RUST_LOG=pickup_point=trace,ttl_cache=debug pickup-point demo
//! ```
//!
//! Every orchestrator operation runs inside a span named after it, with the
//! order and recipient ids as fields, so a single line carries its context:
//!
//! ```text
//! INFO accept_order_courier{id=order_10 recipient=recipient_1}: Order accepted package=box total=120.0
//! WARN return_order_courier{id=OrderId(10)}: Order cannot go back to courier storage_until=.. issued=false
//! INFO issue_order_client{count=2}: Orders issued recipient=recipient_1
//! ```
//!
//! Levels follow one rule: `debug!` for payloads at entry, `info!` for committed
//! state changes, `warn!` for rejected requests and failed store calls, `trace!`
//! for cache hits and misses.

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber. Call once, at process start.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
