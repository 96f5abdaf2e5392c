//! Coordinator configuration.

use std::time::Duration;

/// Default lifetime of a cache entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Default bound on cached fingerprints.
pub const DEFAULT_MAX_ENTRIES: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// TTL applied when a call does not override it. Zero disables caching.
    pub default_ttl: Duration,
    /// LRU bound on live cache entries.
    pub max_entries: usize,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            default_ttl: DEFAULT_TTL,
            max_entries: DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CoordinatorConfig {
    /// Config that never caches; concurrent callers still share one fetch.
    #[must_use]
    pub fn uncached() -> Self {
        Self {
            default_ttl: Duration::ZERO,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }
}
