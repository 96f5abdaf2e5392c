//! # Query-State Test Suite
//!
//! Unified test crate for behavior that spans several components.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs       # gated vehicle adapter, pipeline harness
//!     ├── flows.rs          # address → fetch → result scenarios
//!     ├── coordination.rs   # single-flight and cache lifetime
//!     └── cross_context.rs  # primary/secondary mirroring
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p qs-tests
//! cargo test -p qs-tests integration::cross_context
//! ```

#![allow(dead_code)]

pub mod integration;
