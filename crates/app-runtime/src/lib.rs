//! # Query-State App Runtime
//!
//! Boots browsing contexts and wires the components together. The
//! `query-state-demo` binary is a thin shell around this library.
//!
//! ## Modular Structure
//!
//! - `config/` - TOML configuration with environment overrides
//! - `context/` - primary and secondary context wiring
//! - `vehicles/` - demo vehicle-search domain and in-memory backend
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (from file/env)
//! 2. Parse the entry address to pick the role
//! 3. Register domain adapters
//! 4. Primary: coordinator, orchestrator, synchronizer, panel channels
//! 5. Secondary: redirecting store, synchronizer, `ready` handshake

#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod context;
pub mod vehicles;

pub use config::{ConfigError, RuntimeConfig};
pub use context::{BrowsingContext, ContextError, PrimaryContext, SecondaryContext};
