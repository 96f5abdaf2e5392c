//! Time source port.
//!
//! Cache expiry and message timestamps read time through [`TimeSource`] so
//! tests can drive the clock by hand.

use std::time::{SystemTime, UNIX_EPOCH};

/// Abstract interface for reading the current time.
pub trait TimeSource: Send + Sync {
    /// Milliseconds since the Unix epoch.
    fn now_millis(&self) -> u64;
}

/// Wall-clock time source.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl SystemTimeSource {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl TimeSource for SystemTimeSource {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Hand-driven time source for tests.
#[cfg(feature = "test-utils")]
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    now: std::sync::atomic::AtomicU64,
}

#[cfg(feature = "test-utils")]
impl ManualTimeSource {
    #[must_use]
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: std::sync::atomic::AtomicU64::new(start_millis),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: std::time::Duration) {
        self.now.fetch_add(
            by.as_millis() as u64,
            std::sync::atomic::Ordering::SeqCst,
        );
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, std::sync::atomic::Ordering::SeqCst);
    }
}

#[cfg(feature = "test-utils")]
impl TimeSource for ManualTimeSource {
    fn now_millis(&self) -> u64 {
        self.now.load(std::sync::atomic::Ordering::SeqCst)
    }
}
