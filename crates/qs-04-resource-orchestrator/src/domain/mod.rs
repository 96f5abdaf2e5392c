//! Domain Layer - descriptors, mapping helpers, registry and filter editing

pub mod descriptor;
pub mod editor;
pub mod mapping;
pub mod registry;

pub use descriptor::AdapterDescriptor;
pub use editor::FilterEditor;
pub use registry::DomainRegistry;
