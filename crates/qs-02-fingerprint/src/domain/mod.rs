//! Domain Layer - pure fingerprint construction

pub mod builder;
pub mod escape;

pub use builder::{build, FingerprintBuilder};
pub use escape::{escape, RESERVED};
