//! The cache engine.
//!
//! Entries live in a hash map; a second ordered map from a monotonically
//! increasing "tick" to key records recency. Promoting an entry means moving it
//! to a fresh tick, so the smallest tick is always the least recently used key.

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::{CacheConfig, SweepPolicy};
use crate::error::CacheError;
use crate::item::Item;
use crate::strategy::EvictionStrategy;

type VictimFn<K, V> = fn(&Inner<K, V>) -> Option<K>;

/// A bounded key/value cache with per-entry expiry and pluggable eviction.
///
/// Values are cloned out on [`get`](TtlCache::get); callers never hold a
/// reference into the cache.
pub struct TtlCache<K, V> {
    config: CacheConfig,
    victim: VictimFn<K, V>,
    inner: Mutex<Inner<K, V>>,
}

struct Inner<K, V> {
    items: HashMap<K, Item<V>>,
    recency: BTreeMap<u64, K>,
    next_tick: u64,
}

impl<K, V> Inner<K, V>
where
    K: Eq + Hash + Clone,
{
    fn new(capacity: usize) -> Self {
        Self {
            items: HashMap::with_capacity(capacity),
            recency: BTreeMap::new(),
            next_tick: 0,
        }
    }

    fn bump(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    fn promote(&mut self, key: &K) {
        let tick = self.bump();
        if let Some(item) = self.items.get_mut(key) {
            self.recency.remove(&item.tick);
            item.tick = tick;
            self.recency.insert(tick, key.clone());
        }
    }

    fn insert(&mut self, key: K, value: V, expires_at: Instant) {
        let tick = self.bump();
        self.recency.insert(tick, key.clone());
        self.items.insert(
            key,
            Item {
                value,
                expires_at,
                hits: 0,
                tick,
            },
        );
    }

    fn remove(&mut self, key: &K) -> Option<Item<V>> {
        let item = self.items.remove(key)?;
        self.recency.remove(&item.tick);
        Some(item)
    }

    fn lru_victim(&self) -> Option<K> {
        self.recency.values().next().cloned()
    }

    // Walks oldest first; `min_by_key` keeps the first minimum, so ties evict
    // the least recently used entry.
    fn lfu_victim(&self) -> Option<K> {
        self.recency
            .values()
            .filter_map(|key| self.items.get(key).map(|item| (key, item.hits)))
            .min_by_key(|(_, hits)| *hits)
            .map(|(key, _)| key.clone())
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Builds an empty cache. Fails on zero capacity or zero TTL.
    pub fn new(config: CacheConfig) -> Result<Self, CacheError> {
        config.validate()?;
        let victim: VictimFn<K, V> = match config.strategy {
            EvictionStrategy::Lru => Inner::lru_victim,
            EvictionStrategy::Lfu => Inner::lfu_victim,
        };
        Ok(Self {
            inner: Mutex::new(Inner::new(config.capacity)),
            victim,
            config,
        })
    }

    /// Returns a clone of the value if present and not expired.
    ///
    /// A hit promotes the entry and counts towards its LFU frequency. An
    /// expired entry is removed and reported as a miss.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let expired = inner.items.get(key)?.is_expired(now);
        if expired {
            inner.remove(key);
            trace!("Dropped expired entry on read");
            return None;
        }

        inner.promote(key);
        let item = inner.items.get_mut(key)?;
        item.hits = item.hits.saturating_add(1);
        Some(item.value.clone())
    }

    /// Inserts or refreshes an entry; it expires `ttl` from now.
    ///
    /// Refreshing an existing key never evicts. Inserting a new key into a full
    /// cache evicts exactly one entry first.
    pub fn set(&self, key: K, value: V) {
        let expires_at = Instant::now() + self.config.ttl;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        if let Some(item) = inner.items.get_mut(&key) {
            item.value = value;
            item.expires_at = expires_at;
            inner.promote(&key);
            return;
        }

        if inner.items.len() >= self.config.capacity {
            if let Some(victim) = (self.victim)(inner) {
                inner.remove(&victim);
                debug!(strategy = %self.config.strategy, "Evicted entry");
            }
        }
        inner.insert(key, value, expires_at);
    }

    /// Removes the entry if present. Returns whether anything was removed.
    pub fn invalidate(&self, key: &K) -> bool {
        self.inner.lock().remove(key).is_some()
    }

    /// Runs one expiry pass and returns how many entries it removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let mut expired = Vec::new();
        for key in inner.recency.values() {
            match inner.items.get(key) {
                Some(item) if item.is_expired(now) => expired.push(key.clone()),
                _ if self.config.sweep == SweepPolicy::StopAtFirstFresh => break,
                _ => {}
            }
        }

        for key in &expired {
            inner.remove(key);
        }
        expired.len()
    }

    /// Number of resident entries, expired ones included until they are swept
    /// or read.
    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }
}
