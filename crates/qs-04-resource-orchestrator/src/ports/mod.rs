//! # Ports Layer - Resource Orchestrator boundaries
//!
//! - **Driven Ports (Outbound):** [`DomainAdapter`], the per-domain
//!   capability bundle the orchestrator is polymorphic over.

pub mod outbound;

pub use outbound::{DomainAdapter, SharedAdapter};
