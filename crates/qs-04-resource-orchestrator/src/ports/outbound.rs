//! Driven ports required by the Resource Orchestrator.

use crate::domain::{mapping, AdapterDescriptor};
use async_trait::async_trait;
use qs_02_fingerprint::FingerprintBuilder;
use shared_types::{
    FilterState, Fingerprint, ResourcePage, StateDelta, StateSnapshot, TransportError,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Capability bundle supplied by one business domain.
///
/// The orchestrator holds no domain knowledge: it maps snapshots, builds
/// fingerprints and fetches exclusively through this trait. This is the
/// seam where backend and query-language concerns plug in.
#[async_trait]
pub trait DomainAdapter: Send + Sync {
    /// Name, declared keys and TTL override. Validated at registration.
    fn descriptor(&self) -> &AdapterDescriptor;

    /// Parse the raw snapshot into typed filters and highlights.
    ///
    /// Must not fail: unparseable values are dropped or defaulted.
    fn map_state_to_filters(&self, snapshot: &StateSnapshot) -> FilterState {
        mapping::split_snapshot(self.descriptor(), snapshot)
    }

    /// Delta that writes `state` back to the address.
    fn map_filters_to_state(&self, state: &FilterState) -> StateDelta {
        mapping::state_delta(self.descriptor(), state)
    }

    /// Canonical key for `state`, prefixed with the domain name.
    fn build_fingerprint(&self, state: &FilterState) -> Fingerprint {
        FingerprintBuilder::for_domain(&self.descriptor().name).build_state(state)
    }

    /// Fetch one page of results plus statistics.
    ///
    /// Implementations should return early with
    /// [`TransportError::cancelled`] once `cancel` fires; correctness does
    /// not depend on it. Timeouts are the adapter's concern.
    async fn fetch(
        &self,
        state: &FilterState,
        cancel: CancellationToken,
    ) -> Result<ResourcePage, TransportError>;
}

/// Adapters are shared between the registry and in-flight fetches.
pub type SharedAdapter = Arc<dyn DomainAdapter>;
