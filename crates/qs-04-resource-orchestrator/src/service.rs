//! # Resource Orchestrator Service
//!
//! Wires Address State Store → DomainAdapter → Fingerprint Builder →
//! Request Coordinator and publishes the outcome as watch streams.
//!
//! ## State Machine
//!
//! ```text
//!            new fingerprint           fetch ok
//!   Idle ─────────────────────► Loading ────────► Ready
//!                                  ▲  │
//!                                  │  └─────────► Error
//!                                  │   fetch err
//!        new fingerprint (from Ready or Error)
//! ```
//!
//! A cache hit goes straight to `Ready`. Only the latest fingerprint's
//! result is ever published: completions carry a generation number and
//! anything older than the current generation is discarded.

use crate::domain::DomainRegistry;
use crate::error::OrchestratorError;
use crate::ports::SharedAdapter;
use parking_lot::Mutex;
use qs_01_address_state::AddressStateStore;
use qs_03_request_coordinator::{CoordinatorError, Resolution, RequestCoordinator};
use shared_types::{
    FilterMap, FilterState, Fingerprint, LoadPhase, ResolvedState, ResourcePage, StateSnapshot,
    Statistics, TransportError,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// What the orchestrator last asked the coordinator for.
struct Tracking {
    fingerprint: Fingerprint,
    generation: u64,
    filters: FilterState,
    adapter: SharedAdapter,
}

/// Publishers for the derived streams.
struct Outputs {
    state: watch::Sender<ResolvedState>,
    results: watch::Sender<Option<Arc<ResourcePage>>>,
    loading: watch::Sender<bool>,
    phase: watch::Sender<LoadPhase>,
    errors: watch::Sender<Option<TransportError>>,
    highlights: watch::Sender<FilterMap>,
    statistics: watch::Sender<Option<Statistics>>,
}

impl Outputs {
    fn new() -> Self {
        Self {
            state: watch::channel(ResolvedState::default()).0,
            results: watch::channel(None).0,
            loading: watch::channel(false).0,
            phase: watch::channel(LoadPhase::Idle).0,
            errors: watch::channel(None).0,
            highlights: watch::channel(FilterMap::new()).0,
            statistics: watch::channel(None).0,
        }
    }

    /// Update the combined state, then every derived stream whose value
    /// actually changed.
    fn publish<F>(&self, update: F)
    where
        F: FnOnce(&mut ResolvedState),
    {
        let changed = self.state.send_if_modified(|state| {
            let before = state.clone();
            update(state);
            *state != before
        });
        if !changed {
            return;
        }
        let state = self.state.borrow().clone();

        set_if_changed(&self.loading, state.is_loading());
        set_if_changed(&self.phase, state.phase);
        set_if_changed(&self.errors, state.error.clone());
        set_if_changed(&self.highlights, state.highlights.clone());
        self.results.send_if_modified(|current| {
            let same = match (current.as_ref(), state.result.as_ref()) {
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                (None, None) => true,
                _ => false,
            };
            if same {
                return false;
            }
            *current = state.result.clone();
            true
        });
        set_if_changed(
            &self.statistics,
            state.result.as_ref().map(|page| page.statistics.clone()),
        );
    }
}

fn set_if_changed<T: PartialEq>(sender: &watch::Sender<T>, next: T) {
    sender.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        *current = next;
        true
    });
}

struct Inner {
    store: Arc<AddressStateStore>,
    registry: Arc<DomainRegistry>,
    coordinator: RequestCoordinator<ResourcePage>,
    outputs: Outputs,
    /// Guards the decision of what to fetch and every publish, so that
    /// publishes are strictly ordered.
    tracking: Mutex<Option<Tracking>>,
    generation: AtomicU64,
    shutdown: CancellationToken,
}

/// Reactive glue between the address and the fetch pipeline.
///
/// Cheap to clone; clones drive the same pipeline.
#[derive(Clone)]
pub struct ResourceOrchestrator {
    inner: Arc<Inner>,
}

impl ResourceOrchestrator {
    /// Create an orchestrator and start following the store.
    ///
    /// The current snapshot is evaluated before this returns, so a
    /// `Loading` (or cache-hit `Ready`) state is observable immediately.
    /// Must be called within a Tokio runtime.
    pub fn spawn(
        store: Arc<AddressStateStore>,
        registry: Arc<DomainRegistry>,
        coordinator: RequestCoordinator<ResourcePage>,
    ) -> Self {
        let orchestrator = Self {
            inner: Arc::new(Inner {
                store,
                registry,
                coordinator,
                outputs: Outputs::new(),
                tracking: Mutex::new(None),
                generation: AtomicU64::new(0),
                shutdown: CancellationToken::new(),
            }),
        };

        let snapshots = orchestrator.inner.store.subscribe();
        let domains = orchestrator.inner.registry.active_changes();
        orchestrator.evaluate(&orchestrator.inner.store.read());

        let follower = orchestrator.clone();
        tokio::spawn(async move { follower.follow(snapshots, domains).await });

        orchestrator
    }

    async fn follow(
        &self,
        mut snapshots: watch::Receiver<StateSnapshot>,
        mut domains: watch::Receiver<Option<String>>,
    ) {
        loop {
            tokio::select! {
                biased;
                () = self.inner.shutdown.cancelled() => break,
                changed = snapshots.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshots.borrow_and_update().clone();
                    self.evaluate(&snapshot);
                }
                changed = domains.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    domains.borrow_and_update();
                    self.evaluate(&self.inner.store.read());
                }
            }
        }
        debug!("Orchestrator stopped following the address");
    }

    /// React to one snapshot.
    ///
    /// Returns the fingerprint computed for it, or `None` when no domain is
    /// active or the orchestrator is shut down.
    pub fn evaluate(&self, snapshot: &StateSnapshot) -> Option<Fingerprint> {
        if self.inner.shutdown.is_cancelled() {
            return None;
        }
        let adapter = match self.inner.registry.get_active() {
            Ok(adapter) => adapter,
            Err(e) => {
                warn!(error = %e, "No domain adapter to evaluate snapshot");
                return None;
            }
        };

        let filters = adapter.map_state_to_filters(snapshot);
        let fingerprint = adapter.build_fingerprint(&filters);

        let mut tracking = self.inner.tracking.lock();
        let unchanged = tracking
            .as_ref()
            .is_some_and(|t| t.fingerprint == fingerprint);
        if unchanged {
            // Undeclared parameters may still have changed.
            let snapshot = snapshot.clone();
            self.inner.outputs.publish(|state| state.snapshot = snapshot);
            return Some(fingerprint);
        }

        if let Some(previous) = tracking.as_ref() {
            if self.inner.coordinator.supersede(&previous.fingerprint) {
                debug!(
                    old = %previous.fingerprint.digest(),
                    new = %fingerprint.digest(),
                    "Superseded previous fingerprint"
                );
            }
        }

        let current = Tracking {
            fingerprint: fingerprint.clone(),
            generation: self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1,
            filters,
            adapter,
        };
        self.issue(&current, snapshot.clone());
        *tracking = Some(current);
        Some(fingerprint)
    }

    /// Start (or join, or hit the cache for) the tracked request.
    ///
    /// Called with the tracking lock held.
    fn issue(&self, current: &Tracking, snapshot: StateSnapshot) {
        let generation = current.generation;
        let adapter = current.adapter.clone();
        let filters = current.filters.clone();
        let fingerprint = current.fingerprint.clone();
        let ttl = adapter
            .descriptor()
            .ttl
            .unwrap_or(self.inner.coordinator.config().default_ttl);
        let highlights = filters.highlights.clone();

        let resolution = self.inner.coordinator.resolve_with_ttl(&fingerprint, ttl, {
            let adapter = adapter.clone();
            let filters = filters.clone();
            move |cancel| async move { adapter.fetch(&filters, cancel).await }
        });

        if let Some(page) = resolution.cached() {
            debug!(fingerprint = %fingerprint.digest(), "Resolved from cache");
            self.inner.outputs.publish(|state| {
                state.snapshot = snapshot;
                state.fingerprint = Some(fingerprint);
                state.phase = LoadPhase::Ready;
                state.result = Some(page);
                state.error = None;
                state.highlights = highlights;
            });
            return;
        }

        debug!(
            domain = %adapter.descriptor().name,
            fingerprint = %fingerprint.digest(),
            generation,
            source = ?resolution.source(),
            "Loading"
        );
        self.inner.outputs.publish(|state| {
            state.snapshot = snapshot;
            state.fingerprint = Some(fingerprint.clone());
            state.phase = LoadPhase::Loading;
            state.highlights = highlights;
        });

        let this = self.clone();
        tokio::spawn(async move { this.complete(resolution, fingerprint, generation).await });
    }

    async fn complete(
        &self,
        resolution: Resolution<ResourcePage>,
        fingerprint: Fingerprint,
        generation: u64,
    ) {
        let outcome = resolution.await;

        let tracking = self.inner.tracking.lock();
        let is_current = tracking
            .as_ref()
            .is_some_and(|t| t.generation == generation);
        if !is_current || self.inner.shutdown.is_cancelled() {
            debug!(
                fingerprint = %fingerprint.digest(),
                generation,
                "Stale result discarded"
            );
            return;
        }

        match outcome {
            Ok(page) => {
                debug!(
                    fingerprint = %fingerprint.digest(),
                    total = page.total,
                    rows = page.rows.len(),
                    "Ready"
                );
                self.inner.outputs.publish(|state| {
                    state.phase = LoadPhase::Ready;
                    state.result = Some(page);
                    state.error = None;
                });
            }
            Err(CoordinatorError::Transport(error)) => {
                warn!(
                    fingerprint = %fingerprint.digest(),
                    error = %error,
                    "Fetch failed, keeping last result"
                );
                self.inner.outputs.publish(|state| {
                    state.phase = LoadPhase::Error;
                    state.error = Some(error);
                });
            }
            Err(CoordinatorError::Abandoned) => {
                warn!(
                    fingerprint = %fingerprint.digest(),
                    "Fetch abandoned, keeping last result"
                );
                self.inner.outputs.publish(|state| {
                    state.phase = LoadPhase::Error;
                    state.error = Some(TransportError::network("request abandoned before settling"));
                });
            }
            Err(CoordinatorError::Superseded) => {
                // A newer generation owns the outputs.
                debug!(fingerprint = %fingerprint.digest(), "Request superseded without result");
            }
        }
    }

    /// Re-issue the current fingerprint after an error.
    ///
    /// Returns `false` when the current request is not in `Error`.
    ///
    /// # Errors
    ///
    /// `NoCurrentRequest` before the first evaluation, `Shutdown` after
    /// [`ResourceOrchestrator::shutdown`].
    pub fn retry(&self) -> Result<bool, OrchestratorError> {
        if self.phase_now() != LoadPhase::Error {
            return Ok(false);
        }
        self.reissue(false)?;
        Ok(true)
    }

    /// Drop the cached entry for the current fingerprint and fetch again.
    ///
    /// # Errors
    ///
    /// Same as [`ResourceOrchestrator::retry`].
    pub fn refresh(&self) -> Result<(), OrchestratorError> {
        self.reissue(true)
    }

    fn reissue(&self, purge: bool) -> Result<(), OrchestratorError> {
        if self.inner.shutdown.is_cancelled() {
            return Err(OrchestratorError::Shutdown);
        }
        let mut tracking = self.inner.tracking.lock();
        let Some(current) = tracking.as_mut() else {
            return Err(OrchestratorError::NoCurrentRequest);
        };
        if purge {
            self.inner.coordinator.supersede(&current.fingerprint);
            self.inner.coordinator.purge(Some(&current.fingerprint));
        }
        current.generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        info!(fingerprint = %current.fingerprint.digest(), purge, "Re-issuing request");

        let snapshot = self.inner.outputs.state.borrow().snapshot.clone();
        self.issue(current, snapshot);
        Ok(())
    }

    /// Stop following the address and supersede in-flight work.
    pub fn shutdown(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.shutdown.cancel();
        if let Some(current) = self.inner.tracking.lock().as_ref() {
            self.inner.coordinator.supersede(&current.fingerprint);
        }
        info!("Resource orchestrator shut down");
    }

    /// Combined view, published on every transition.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<ResolvedState> {
        self.inner.outputs.state.subscribe()
    }

    #[must_use]
    pub fn current_state(&self) -> ResolvedState {
        self.inner.outputs.state.borrow().clone()
    }

    /// Latest successful payload. Retained across errors.
    #[must_use]
    pub fn results(&self) -> watch::Receiver<Option<Arc<ResourcePage>>> {
        self.inner.outputs.results.subscribe()
    }

    #[must_use]
    pub fn loading(&self) -> watch::Receiver<bool> {
        self.inner.outputs.loading.subscribe()
    }

    /// Last error, cleared on the next successful resolution.
    #[must_use]
    pub fn errors(&self) -> watch::Receiver<Option<TransportError>> {
        self.inner.outputs.errors.subscribe()
    }

    /// Highlight sub-state of the current snapshot.
    #[must_use]
    pub fn highlights(&self) -> watch::Receiver<FilterMap> {
        self.inner.outputs.highlights.subscribe()
    }

    #[must_use]
    pub fn statistics(&self) -> watch::Receiver<Option<Statistics>> {
        self.inner.outputs.statistics.subscribe()
    }

    #[must_use]
    pub fn phase(&self) -> watch::Receiver<LoadPhase> {
        self.inner.outputs.phase.subscribe()
    }

    fn phase_now(&self) -> LoadPhase {
        *self.inner.outputs.phase.borrow()
    }

    #[must_use]
    pub fn store(&self) -> &Arc<AddressStateStore> {
        &self.inner.store
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<DomainRegistry> {
        &self.inner.registry
    }

    #[must_use]
    pub fn coordinator(&self) -> &RequestCoordinator<ResourcePage> {
        &self.inner.coordinator
    }
}
