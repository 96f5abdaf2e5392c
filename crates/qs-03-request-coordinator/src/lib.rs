//! # Request Coordinator
//!
//! **Component:** qs-03
//!
//! Generic at-most-one-in-flight-per-key fetch executor with cooperative
//! cancellation, an in-memory TTL cache and concurrent-caller fan-out.
//!
//! ## Guarantees
//!
//! | Property | Mechanism |
//! |----------|-----------|
//! | Single-flight | one `InFlightRequest` per fingerprint, callers join it |
//! | Cache correctness | entry live while `now - created_at <= ttl` |
//! | No negative caching | failures reject subscribers, write nothing |
//! | Last fingerprint wins | `supersede` rejects callers; late results are discarded by request id |
//!
//! ## Example
//!
//! ```rust
//! use qs_03_request_coordinator::{CoordinatorConfig, RequestCoordinator};
//! use shared_types::Fingerprint;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let coordinator: RequestCoordinator<u64> = RequestCoordinator::new(CoordinatorConfig::default());
//! let fp = Fingerprint::new("vehicles?f:page=1|h:");
//!
//! let total = coordinator.resolve(&fp, |_cancel| async { Ok(234) }).await.unwrap();
//! assert_eq!(*total, 234);
//! assert!(coordinator.resolve(&fp, |_| async { Ok(0) }).is_cache_hit());
//! # }
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod error;
pub mod resolution;
pub mod service;

pub use domain::{CoordinatorConfig, StatsSnapshot, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
pub use error::CoordinatorError;
pub use resolution::{Resolution, ResolutionSource};
pub use service::{cleanup_task, RequestCoordinator};
pub use tokio_util::sync::CancellationToken;
