use tokio::time::Instant;

/// A resident cache entry.
#[derive(Debug)]
pub(crate) struct Item<V> {
    pub value: V,
    pub expires_at: Instant,
    /// Read hits since the entry was inserted.
    pub hits: u64,
    /// Position in the recency index; larger is more recent.
    pub tick: u64,
}

impl<V> Item<V> {
    pub fn is_expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }
}
