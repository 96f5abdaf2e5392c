//! # Resource Orchestrator
//!
//! **Component:** qs-04
//!
//! Glues the Address State Store through a pluggable [`DomainAdapter`] into
//! the Fingerprint Builder and the Request Coordinator, and exposes the
//! outcome as reactive streams: result, loading, error, highlights and
//! statistics.
//!
//! ## Architecture
//!
//! - **Domain Layer:** [`AdapterDescriptor`], descriptor-driven mapping,
//!   [`DomainRegistry`], [`FilterEditor`]
//! - **Ports Layer:** [`DomainAdapter`] (driven port, one per domain)
//! - **Service Layer:** [`ResourceOrchestrator`]
//!
//! ## Failure Semantics
//!
//! | Failure | Effect |
//! |---------|--------|
//! | Transport error | published on `errors()`, last `results()` value kept |
//! | Superseded request | discarded silently |
//! | Invalid adapter | `ConfigurationError` at registration |

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use domain::{mapping, AdapterDescriptor, DomainRegistry, FilterEditor};
pub use error::OrchestratorError;
pub use ports::{DomainAdapter, SharedAdapter};
pub use service::ResourceOrchestrator;
