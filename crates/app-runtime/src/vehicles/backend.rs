//! Outbound port to the vehicle search backend.

use crate::vehicles::model::{Vehicle, VehicleQuery};
use async_trait::async_trait;
use shared_types::{TransportError, WireResponse};

/// Search backend answering in the wire response shape.
///
/// An HTTP client and the in-memory catalog both sit behind this trait.
#[async_trait]
pub trait VehicleBackend: Send + Sync {
    async fn search(&self, query: &VehicleQuery) -> Result<WireResponse<Vehicle>, TransportError>;
}
