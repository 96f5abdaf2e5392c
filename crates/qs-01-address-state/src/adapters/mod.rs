//! Concrete adapters for the Address State Store ports.

pub mod memory;

pub use memory::InMemoryLocation;
