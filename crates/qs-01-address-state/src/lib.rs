//! # Address State Store
//!
//! **Component:** qs-01
//!
//! The address bar is the single authoritative representation of query
//! state: filters, highlights, pagination and sort. Every read and write of
//! application state passes through the [`AddressStateStore`].
//!
//! ## Architecture
//!
//! - **Domain Layer:** query string codec, entry address parsing
//! - **Ports Layer:** [`AddressLocation`] (the address bar) and
//!   [`WriteRedirect`] (secondary-context writes)
//! - **Adapters Layer:** [`InMemoryLocation`]
//! - **Service Layer:** [`AddressStateStore`]
//!
//! ## Example
//!
//! ```rust
//! use qs_01_address_state::{AddressStateStore, InMemoryLocation, WriteOutcome};
//! use shared_types::StateDelta;
//! use std::sync::Arc;
//!
//! let location = Arc::new(InMemoryLocation::new("manufacturer=Toyota"));
//! let store = AddressStateStore::primary(location.clone());
//!
//! let outcome = store.write(StateDelta::new().with("page", "1"));
//! assert_eq!(outcome, WriteOutcome::Applied);
//! assert_eq!(location.push_count(), 1);
//! ```

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::InMemoryLocation;
pub use domain::{query, EntryPoint, DEFAULT_POPOUT_SEGMENT};
pub use ports::{AddressLocation, WriteRedirect};
pub use service::{AddressStateStore, WriteOutcome};
