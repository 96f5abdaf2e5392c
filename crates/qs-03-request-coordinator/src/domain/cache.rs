//! Cache entries.

use std::sync::Arc;
use std::time::Duration;

/// A successful fetch result. Replaced wholesale, never mutated.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub value: Arc<T>,
    pub created_at_ms: u64,
    pub ttl: Duration,
}

impl<T> CacheEntry<T> {
    pub fn new(value: Arc<T>, created_at_ms: u64, ttl: Duration) -> Self {
        Self {
            value,
            created_at_ms,
            ttl,
        }
    }

    /// Expired once `now - created_at > ttl`.
    #[must_use]
    pub fn is_expired(&self, now_ms: u64) -> bool {
        let age = now_ms.saturating_sub(self.created_at_ms);
        u128::from(age) > self.ttl.as_millis()
    }

    #[must_use]
    pub fn age(&self, now_ms: u64) -> Duration {
        Duration::from_millis(now_ms.saturating_sub(self.created_at_ms))
    }
}
