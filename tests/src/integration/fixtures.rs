//! # Test Fixtures
//!
//! A vehicle adapter whose fetches can be held per manufacturer, so tests
//! decide the order in which responses land.

use app_runtime::vehicles::{InMemoryCatalog, VehicleAdapter};
use async_trait::async_trait;
use parking_lot::Mutex;
use qs_01_address_state::{AddressStateStore, InMemoryLocation};
use qs_03_request_coordinator::{CancellationToken, CoordinatorConfig, RequestCoordinator};
use qs_04_resource_orchestrator::{
    AdapterDescriptor, DomainAdapter, DomainRegistry, FilterEditor, ResourceOrchestrator,
};
use shared_types::{FilterState, ResolvedState, ResourcePage, StateSnapshot, TransportError};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};

/// Vehicle adapter with per-manufacturer gates and a fetch counter.
pub struct GatedAdapter {
    inner: VehicleAdapter,
    catalog: Arc<InMemoryCatalog>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    fetches: AtomicUsize,
}

impl GatedAdapter {
    pub fn new() -> Arc<Self> {
        let catalog = Arc::new(InMemoryCatalog::sample());
        Arc::new(Self {
            inner: VehicleAdapter::new(catalog.clone()),
            catalog,
            gates: Mutex::new(HashMap::new()),
            fetches: AtomicUsize::new(0),
        })
    }

    /// Hold every fetch filtered on `manufacturer` until released.
    pub fn hold(&self, manufacturer: &str) -> Arc<Notify> {
        self.gates
            .lock()
            .entry(manufacturer.to_string())
            .or_insert_with(|| Arc::new(Notify::new()))
            .clone()
    }

    /// Let one held fetch for `manufacturer` through.
    pub fn release(&self, manufacturer: &str) {
        self.hold(manufacturer).notify_one();
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn catalog(&self) -> &Arc<InMemoryCatalog> {
        &self.catalog
    }
}

#[async_trait]
impl DomainAdapter for GatedAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        self.inner.descriptor()
    }

    fn map_state_to_filters(&self, snapshot: &StateSnapshot) -> FilterState {
        self.inner.map_state_to_filters(snapshot)
    }

    /// Ignores cancellation, so a superseded fetch still completes late.
    async fn fetch(
        &self,
        state: &FilterState,
        _cancel: CancellationToken,
    ) -> Result<ResourcePage, TransportError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let gate = state
            .filter("manufacturer")
            .and_then(|m| m.as_text())
            .and_then(|m| self.gates.lock().get(m).cloned());
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.inner.fetch(state, CancellationToken::new()).await
    }
}

/// Store, registry, coordinator and orchestrator for one primary.
pub struct Pipeline {
    pub location: Arc<InMemoryLocation>,
    pub store: Arc<AddressStateStore>,
    pub registry: Arc<DomainRegistry>,
    pub orchestrator: ResourceOrchestrator,
    pub adapter: Arc<GatedAdapter>,
}

impl Pipeline {
    pub fn start(query: &str, adapter: Arc<GatedAdapter>) -> Self {
        Self::with_config(query, adapter, CoordinatorConfig::default())
    }

    pub fn with_config(query: &str, adapter: Arc<GatedAdapter>, config: CoordinatorConfig) -> Self {
        let location = Arc::new(InMemoryLocation::new(query));
        let store = Arc::new(AddressStateStore::primary(location.clone()));
        let registry = Arc::new(DomainRegistry::new());
        registry
            .register(adapter.clone())
            .expect("vehicle descriptor is valid");
        let orchestrator = ResourceOrchestrator::spawn(
            store.clone(),
            registry.clone(),
            RequestCoordinator::new(config),
        );
        Self {
            location,
            store,
            registry,
            orchestrator,
            adapter,
        }
    }

    pub fn editor(&self) -> FilterEditor {
        FilterEditor::new(self.store.clone(), self.registry.clone())
    }
}

pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("timed out")
}

/// Wait until the resolved state is `Ready` with `total` results.
pub async fn ready_with_total(state: &mut watch::Receiver<ResolvedState>, total: u64) -> ResolvedState {
    within(state.wait_for(|s| {
        s.phase == shared_types::LoadPhase::Ready
            && s.result.as_ref().is_some_and(|r| r.total == total)
    }))
    .await
    .expect("orchestrator dropped")
    .clone()
}

/// Let spawned tasks run.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
