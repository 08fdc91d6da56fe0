//! Order cache: a typed front for the generic TTL engine.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::trace;
use ttl_cache::{CacheConfig, CacheError, TtlCache};

use crate::model::{Order, OrderId};

/// What the orchestrator needs from a cache. Misses are not errors.
pub trait Cache: Send + Sync {
    fn set(&self, id: OrderId, order: Order);
    fn get(&self, id: OrderId) -> Option<Order>;
    fn invalidate(&self, id: OrderId);
}

/// Orders keyed by id, backed by one [`TtlCache`].
pub struct OrderCache {
    inner: Arc<TtlCache<OrderId, Order>>,
}

impl OrderCache {
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        Ok(Self {
            inner: Arc::new(TtlCache::new(config)?),
        })
    }

    /// Starts the background expiry task for this cache.
    pub fn spawn_sweeper(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        ttl_cache::spawn_sweeper(self.inner.clone(), shutdown)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn config(&self) -> &CacheConfig {
        self.inner.config()
    }
}

impl Cache for OrderCache {
    fn set(&self, id: OrderId, order: Order) {
        trace!(%id, "Cache set");
        self.inner.set(id, order);
    }

    fn get(&self, id: OrderId) -> Option<Order> {
        let hit = self.inner.get(&id);
        trace!(%id, hit = hit.is_some(), "Cache get");
        hit
    }

    fn invalidate(&self, id: OrderId) {
        if self.inner.invalidate(&id) {
            trace!(%id, "Cache invalidate");
        }
    }
}
