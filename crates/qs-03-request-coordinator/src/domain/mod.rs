//! Domain Layer - cache entries, configuration and counters

pub mod cache;
pub mod config;
pub mod stats;

pub use cache::CacheEntry;
pub use config::{CoordinatorConfig, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
pub use stats::{CoordinatorStats, StatsSnapshot};
