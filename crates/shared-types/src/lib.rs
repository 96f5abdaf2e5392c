//! # Shared Types Crate
//!
//! This crate contains the state model, the typed filter representation,
//! fingerprints, resource pages and the cross-context message envelope.
//!
//! ## Design Principles
//!
//! - **Address is authoritative**: every piece of query state is a
//!   [`StateSnapshot`] derived from the address bar. Snapshots are replaced
//!   wholesale, never mutated in place.
//! - **Disjoint namespaces**: filter parameters use plain names, highlight
//!   parameters carry the [`HIGHLIGHT_PREFIX`].
//! - **Copied, not shared**: everything crossing a browsing context boundary
//!   travels by value inside a [`SyncEnvelope`].

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod context;
pub mod errors;
pub mod filters;
pub mod fingerprint;
pub mod resource;
pub mod snapshot;
pub mod sync;
pub mod time;

pub use context::{ContextRole, PanelId};
pub use errors::*;
pub use filters::{FilterMap, FilterState, FilterValue};
pub use fingerprint::Fingerprint;
pub use resource::{
    LoadPhase, ResolvedState, ResourcePage, SortOrder, StatBucket, Statistics, WireResponse,
    PAGE_KEY, SIZE_KEY, SORT_BY_KEY, SORT_ORDER_KEY,
};
pub use snapshot::{StateDelta, StateSnapshot, HIGHLIGHT_PREFIX};
pub use sync::{MessageKind, StampedState, SyncEnvelope, SyncMessage};
pub use time::{SystemTimeSource, TimeSource};

#[cfg(feature = "test-utils")]
pub use time::ManualTimeSource;
