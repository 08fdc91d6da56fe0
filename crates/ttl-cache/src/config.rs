use std::time::Duration;

use serde::Deserialize;

use crate::error::CacheError;
use crate::strategy::EvictionStrategy;

/// How far a sweep pass walks the recency order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepPolicy {
    /// Walk from the least recently used entry and stop at the first one that
    /// has not expired yet. An entry that was read after its last write sits
    /// ahead of fresher writes and can outlive a pass.
    #[default]
    StopAtFirstFresh,
    /// Check every resident entry.
    FullScan,
}

/// Construction-time settings of a [`TtlCache`](crate::TtlCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub capacity: usize,
    pub strategy: EvictionStrategy,
    pub ttl: Duration,
    pub sweep: SweepPolicy,
}

impl CacheConfig {
    pub fn new(capacity: usize, strategy: EvictionStrategy, ttl: Duration) -> Self {
        Self {
            capacity,
            strategy,
            ttl,
            sweep: SweepPolicy::default(),
        }
    }

    pub fn with_sweep(mut self, sweep: SweepPolicy) -> Self {
        self.sweep = sweep;
        self
    }

    pub fn validate(&self) -> Result<(), CacheError> {
        if self.capacity == 0 {
            return Err(CacheError::ZeroCapacity);
        }
        if self.ttl.is_zero() {
            return Err(CacheError::ZeroTtl);
        }
        Ok(())
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new(1000, EvictionStrategy::Lru, Duration::from_secs(300))
    }
}
