//! Errors raised while building a cache.
//!
//! Cache operations themselves never fail: a miss is `None`, not an error.

/// Errors that can occur when constructing a [`TtlCache`](crate::TtlCache).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cache capacity must be greater than zero")]
    ZeroCapacity,
    #[error("cache ttl must be greater than zero")]
    ZeroTtl,
    #[error("unknown eviction strategy: {0}")]
    UnknownStrategy(String),
}
