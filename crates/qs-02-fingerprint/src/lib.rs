//! # Fingerprint Builder
//!
//! **Component:** qs-02
//!
//! Pure function from a domain's typed filters (plus the highlight overlay)
//! to a stable string key. Two semantically equal states always produce the
//! same [`Fingerprint`](shared_types::Fingerprint); any semantic difference
//! produces a different one.
//!
//! ## Example
//!
//! ```rust
//! use qs_02_fingerprint::FingerprintBuilder;
//! use shared_types::{FilterMap, FilterValue};
//!
//! let mut filters = FilterMap::new();
//! filters.insert("page".into(), FilterValue::Integer(1));
//! filters.insert("manufacturer".into(), FilterValue::text("Toyota"));
//!
//! let fp = FingerprintBuilder::for_domain("vehicles").build(&filters, &FilterMap::new());
//! assert_eq!(fp.as_str(), "vehicles?f:manufacturer=Toyota&page=1|h:");
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;

pub use domain::{build, escape, FingerprintBuilder, RESERVED};
