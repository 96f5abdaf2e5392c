//! # Ports Layer - Address State Store boundaries
//!
//! - **Driven Ports (Outbound):** the addressable location the store
//!   persists to, and the redirect a secondary context forwards writes to.

pub mod outbound;

pub use outbound::{AddressLocation, WriteRedirect};
