use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use ttl_cache::{CacheConfig, CacheError};

use crate::cache::{Cache, OrderCache};
use crate::clock::{Clock, SystemClock};
use crate::service::OrderService;
use crate::store::OrderStore;

/// The running pickup point: store, cache, clock and orchestrator wired
/// together, plus the background tasks they need.
///
/// # Example
///
/// ```ignore
/// let system = PickupSystem::new(config.cache_config(), Arc::new(MemoryStore::new()))?;
///
/// let order = system.orders.accept_order_courier(params).await?;
/// system.orders.issue_order_client(&[order.id]).await?;
///
/// system.shutdown().await?;
/// ```
pub struct PickupSystem {
    /// The orchestrator; clone it freely.
    pub orders: OrderService,

    /// The cache the orchestrator reads through. Exposed for inspection.
    pub cache: Arc<OrderCache>,

    shutdown: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl PickupSystem {
    /// Builds the system on the wall clock and starts the cache sweeper.
    ///
    /// Must be called from inside a tokio runtime.
    pub fn new<S>(cache_config: CacheConfig, store: Arc<S>) -> Result<Self, CacheError>
    where
        S: OrderStore + 'static,
    {
        Self::with_clock(cache_config, store, Arc::new(SystemClock))
    }

    pub fn with_clock<S>(cache_config: CacheConfig, store: Arc<S>, clock: Arc<dyn Clock>) -> Result<Self, CacheError>
    where
        S: OrderStore + 'static,
    {
        let cache = Arc::new(OrderCache::new(cache_config)?);
        let shutdown = CancellationToken::new();

        let sweeper = cache.spawn_sweeper(shutdown.child_token());
        let orders = OrderService::new(store, cache.clone() as Arc<dyn Cache>, clock);

        info!(
            capacity = cache.config().capacity,
            strategy = %cache.config().strategy,
            ttl = ?cache.config().ttl,
            "Pickup system started"
        );

        Ok(Self {
            orders,
            cache,
            shutdown,
            handles: vec![sweeper],
        })
    }

    /// Stops background tasks and waits for them to finish.
    ///
    /// Returns an error if any task panicked.
    pub async fn shutdown(self) -> Result<(), String> {
        info!("Shutting down pickup system...");
        self.shutdown.cancel();

        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Background task failed: {:?}", e);
                return Err(format!("Background task failed: {:?}", e));
            }
        }

        info!("Pickup system shutdown complete.");
        Ok(())
    }
}
