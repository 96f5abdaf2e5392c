//! # Browsing Contexts
//!
//! Wiring for the two kinds of browsing context.
//!
//! ```text
//! primary:   location ─► store ─► orchestrator ─► coordinator ─► adapter.fetch
//!                           ▲          │
//!                           │          ▼ resolved state
//!                  state-request   PrimarySynchronizer ─► panel channels
//!
//! secondary: store ─(redirect)─► SecondarySynchronizer ─► state-request
//!              ▲                        │
//!              └──── mirrored snapshot ─┘◄── state-broadcast
//! ```
//!
//! A secondary has no orchestrator and no coordinator: it never fetches.

use crate::config::RuntimeConfig;
use qs_01_address_state::{AddressStateStore, EntryPoint, InMemoryLocation};
use qs_03_request_coordinator::{cleanup_task, RequestCoordinator};
use qs_04_resource_orchestrator::{
    DomainRegistry, FilterEditor, ResourceOrchestrator, SharedAdapter,
};
use qs_05_cross_context_sync::{PrimarySynchronizer, SecondarySynchronizer, SyncError};
use qs_telemetry::component_span;
use shared_bus::{ChannelHub, ChannelName};
use shared_types::{ConfigurationError, ContextRole, PanelId, ResolvedState};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

/// Errors while booting a browsing context.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Sync(#[from] SyncError),
}

fn registry_with<I>(adapters: I) -> Result<Arc<DomainRegistry>, ConfigurationError>
where
    I: IntoIterator<Item = SharedAdapter>,
{
    let registry = Arc::new(DomainRegistry::new());
    for adapter in adapters {
        registry.register(adapter)?;
    }
    registry.get_active()?;
    Ok(registry)
}

/// The context that owns the address bar and performs every fetch.
pub struct PrimaryContext {
    location: Arc<InMemoryLocation>,
    store: Arc<AddressStateStore>,
    registry: Arc<DomainRegistry>,
    orchestrator: ResourceOrchestrator,
    sync: PrimarySynchronizer,
    cleanup: JoinHandle<()>,
}

impl PrimaryContext {
    /// Boot a primary at `query`.
    ///
    /// Startup order:
    /// 1. Location and store
    /// 2. Registry (the first adapter becomes active)
    /// 3. Coordinator and its cleanup task
    /// 4. Orchestrator (evaluates `query` right away)
    /// 5. Synchronizer, with one channel per configured panel
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// `Configuration` for an invalid or empty adapter set, `Sync` if a
    /// panel channel cannot be attached.
    pub fn boot<I>(
        config: &RuntimeConfig,
        hub: Arc<dyn ChannelHub>,
        query: &str,
        adapters: I,
    ) -> Result<Self, ContextError>
    where
        I: IntoIterator<Item = SharedAdapter>,
    {
        let _span = component_span!("context", role = %ContextRole::Primary).entered();
        let location = Arc::new(InMemoryLocation::new(query));
        let store = Arc::new(AddressStateStore::primary(location.clone()));
        let registry = registry_with(adapters)?;

        let coordinator = RequestCoordinator::new(config.coordinator_config());
        let cleanup = tokio::spawn(cleanup_task(coordinator.clone(), config.cleanup_interval()));
        let orchestrator =
            ResourceOrchestrator::spawn(store.clone(), registry.clone(), coordinator);
        let sync = PrimarySynchronizer::spawn(
            hub,
            store.clone(),
            orchestrator.state(),
            config.sync_config(),
        );

        let context = Self {
            location,
            store,
            registry,
            orchestrator,
            sync,
            cleanup,
        };
        for panel in &config.sync.panels {
            context.sync.attach(PanelId::new(panel.as_str()))?;
        }

        info!(
            domain = ?context.registry.active_name(),
            panels = config.sync.panels.len(),
            "Primary context booted"
        );
        Ok(context)
    }

    /// Open one more panel channel.
    ///
    /// # Errors
    ///
    /// `AlreadyAttached` for a panel that is already open.
    pub fn attach_panel(&self, panel: PanelId) -> Result<ChannelName, SyncError> {
        self.sync.attach(panel)
    }

    /// User navigation (back/forward or a typed address).
    ///
    /// Returns whether the snapshot changed.
    pub fn navigate(&self, query: &str) -> bool {
        self.location.navigate(query);
        self.store.sync_from_location()
    }

    /// Browser "back". Returns whether the snapshot changed.
    pub fn back(&self) -> bool {
        self.location.back() && self.store.sync_from_location()
    }

    #[must_use]
    pub fn editor(&self) -> FilterEditor {
        FilterEditor::new(self.store.clone(), self.registry.clone())
    }

    #[must_use]
    pub fn state(&self) -> watch::Receiver<ResolvedState> {
        self.orchestrator.state()
    }

    #[must_use]
    pub fn location(&self) -> &Arc<InMemoryLocation> {
        &self.location
    }

    #[must_use]
    pub fn store(&self) -> &Arc<AddressStateStore> {
        &self.store
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<DomainRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn orchestrator(&self) -> &ResourceOrchestrator {
        &self.orchestrator
    }

    #[must_use]
    pub fn synchronizer(&self) -> &PrimarySynchronizer {
        &self.sync
    }

    /// Close every panel, stop the pipeline and the cleanup task.
    pub fn shutdown(&self) {
        self.sync.shutdown();
        self.orchestrator.shutdown();
        self.orchestrator.coordinator().cancel_all();
        self.cleanup.abort();
    }
}

impl Drop for PrimaryContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// A pop-out mirroring one panel of the primary.
pub struct SecondaryContext {
    store: Arc<AddressStateStore>,
    registry: Arc<DomainRegistry>,
    sync: SecondarySynchronizer,
}

impl SecondaryContext {
    /// Attach to `panel`. The adapters are only used to type local edits.
    ///
    /// Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// `Configuration` for an invalid or empty adapter set, `Sync` if the
    /// channel cannot be subscribed.
    pub fn attach<I>(
        config: &RuntimeConfig,
        hub: &dyn ChannelHub,
        panel: PanelId,
        query: &str,
        adapters: I,
    ) -> Result<Self, ContextError>
    where
        I: IntoIterator<Item = SharedAdapter>,
    {
        let _span =
            component_span!("context", role = %ContextRole::Secondary, panel = %panel).entered();
        let location = Arc::new(InMemoryLocation::new(query));
        let store = Arc::new(AddressStateStore::secondary(location));
        let registry = registry_with(adapters)?;
        let sync = SecondarySynchronizer::attach(hub, panel, store.clone(), &config.sync_config())?;

        info!(panel = %sync.panel(), "Secondary context attached");
        Ok(Self {
            store,
            registry,
            sync,
        })
    }

    /// Edits here become state-requests to the primary.
    #[must_use]
    pub fn editor(&self) -> FilterEditor {
        FilterEditor::new(self.store.clone(), self.registry.clone())
    }

    /// Mirrored state: `None` until the primary has answered.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<Option<ResolvedState>> {
        self.sync.state()
    }

    /// Wait for the first mirrored state.
    pub async fn ready(&self) -> Option<ResolvedState> {
        self.sync.ready().await
    }

    #[must_use]
    pub fn panel(&self) -> &PanelId {
        self.sync.panel()
    }

    #[must_use]
    pub fn store(&self) -> &Arc<AddressStateStore> {
        &self.store
    }

    #[must_use]
    pub fn synchronizer(&self) -> &SecondarySynchronizer {
        &self.sync
    }

    pub fn close(&self) {
        self.sync.close();
    }
}

/// Either kind of context, chosen from the entry address.
pub enum BrowsingContext {
    Primary(PrimaryContext),
    Secondary(SecondaryContext),
}

impl BrowsingContext {
    /// Boot the context an entry address asks for: a pop-out path yields
    /// a secondary for its panel, anything else a primary.
    ///
    /// # Errors
    ///
    /// See [`PrimaryContext::boot`] and [`SecondaryContext::attach`].
    pub fn from_entry<I>(
        config: &RuntimeConfig,
        hub: Arc<dyn ChannelHub>,
        address: &str,
        adapters: I,
    ) -> Result<Self, ContextError>
    where
        I: IntoIterator<Item = SharedAdapter>,
    {
        let entry = EntryPoint::parse_with_segment(address, &config.sync.popout_segment);
        match entry.panel {
            Some(panel) => SecondaryContext::attach(
                config,
                hub.as_ref(),
                panel,
                &entry.query,
                adapters,
            )
            .map(Self::Secondary),
            None => PrimaryContext::boot(config, hub, &entry.query, adapters).map(Self::Primary),
        }
    }

    #[must_use]
    pub fn role(&self) -> ContextRole {
        match self {
            Self::Primary(_) => ContextRole::Primary,
            Self::Secondary(_) => ContextRole::Secondary,
        }
    }
}
