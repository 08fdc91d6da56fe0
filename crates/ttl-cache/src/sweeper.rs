//! Background expiry.
//!
//! Reads already drop expired entries lazily; the sweeper reclaims the ones
//! nobody reads again.

use std::hash::Hash;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::TtlCache;

/// Spawns a task that runs [`TtlCache::sweep_expired`] once every `ttl`.
///
/// The task exits when `shutdown` is cancelled; await the returned handle to
/// make sure it has stopped.
pub fn spawn_sweeper<K, V>(cache: Arc<TtlCache<K, V>>, shutdown: CancellationToken) -> JoinHandle<()>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    let period = cache.config().ttl;
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(?period, "Cache sweeper started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Cache sweeper stopped");
                    return;
                }
                _ = ticker.tick() => {
                    let removed = cache.sweep_expired();
                    if removed > 0 {
                        debug!(removed, remaining = cache.len(), "Swept expired entries");
                    }
                }
            }
        }
    })
}
