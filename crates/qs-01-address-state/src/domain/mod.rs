//! Domain Layer - pure address handling with no I/O
//!
//! - Query string codec (snapshot <-> query string)
//! - Entry address parsing (context role from the entry address)

pub mod entry;
pub mod query;

pub use entry::{EntryPoint, DEFAULT_POPOUT_SEGMENT};
