//! # Vehicle Search Domain
//!
//! Demo domain: a paginated vehicle listing with filters on manufacturer,
//! model, body class and model year, highlight overlays on manufacturer
//! and body class, and per-dimension statistics.
//!
//! - `model` - row and query types
//! - `backend` - the `VehicleBackend` port
//! - `catalog` - in-memory backend over a fixed catalog
//! - `adapter` - the `DomainAdapter` bridging snapshots to backend queries

pub mod adapter;
pub mod backend;
pub mod catalog;
pub mod model;

pub use adapter::{VehicleAdapter, DOMAIN_NAME};
pub use backend::VehicleBackend;
pub use catalog::InMemoryCatalog;
pub use model::{Vehicle, VehicleQuery};
