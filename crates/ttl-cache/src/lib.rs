//! # TTL Cache
//!
//! A bounded, thread-safe key/value cache where every entry expires a fixed
//! time-to-live after it was last written.
//!
//! The crate knows nothing about the values it stores. Domain crates wrap a
//! [`TtlCache`] in a narrow, typed adapter (see the `pickup-point` crate's
//! `OrderCache`) and never expose the engine directly.
//!
//! ## Core Concepts
//!
//! 1. **[`TtlCache`]**: the engine. All state sits behind a single mutex, so every
//!    operation is linearized and the type can be shared through an `Arc`.
//! 2. **[`EvictionStrategy`]**: chosen once at construction. When a new key is
//!    inserted into a full cache exactly one resident entry is evicted:
//!    - `Lru` evicts the entry untouched for the longest time.
//!    - `Lfu` evicts the entry with the fewest read hits, oldest first on ties.
//! 3. **Expiry**: reads treat an entry as absent from `written_at + ttl` onward and
//!    drop it on the spot. [`spawn_sweeper`] runs a background task that purges
//!    expired entries nobody reads.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use ttl_cache::{CacheConfig, EvictionStrategy, TtlCache};
//!
//! let cache = TtlCache::new(CacheConfig::new(2, EvictionStrategy::Lru, Duration::from_secs(60)))
//!     .expect("valid config");
//!
//! cache.set("a", 1);
//! cache.set("b", 2);
//! assert_eq!(cache.get(&"a"), Some(1)); // "a" is now most recently used
//!
//! cache.set("c", 3); // evicts "b"
//! assert_eq!(cache.get(&"b"), None);
//! assert_eq!(cache.len(), 2);
//! ```
//!
//! ## Background Sweep
//!
//! ```rust,ignore
//! let cache = Arc::new(TtlCache::new(config)?);
//! let shutdown = CancellationToken::new();
//! let handle = ttl_cache::spawn_sweeper(cache.clone(), shutdown.clone());
//!
//! // ... later
//! shutdown.cancel();
//! handle.await?;
//! ```
//!
//! The engine reads time from `tokio::time::Instant`, so tests can freeze and
//! advance the clock with `#[tokio::test(start_paused = true)]`.

pub mod cache;
pub mod config;
pub mod error;
mod item;
pub mod strategy;
pub mod sweeper;

pub use cache::TtlCache;
pub use config::{CacheConfig, SweepPolicy};
pub use error::CacheError;
pub use strategy::EvictionStrategy;
pub use sweeper::spawn_sweeper;
