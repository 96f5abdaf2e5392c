//! # Primary Synchronizer
//!
//! Runs in the context that owns the address bar.
//!
//! ```text
//! orchestrator state ──► broadcast loop ──► state-broadcast ──► every panel channel
//!
//! panel channel ──► ready          ──► state-broadcast (reply, current state)
//!               ──► state-request  ──► AddressStateStore::write(delta)
//!               ──► close          ──► forget the secondary
//! ```
//!
//! A state-request is the only way a secondary influences application
//! state. Conflicting requests resolve last-write-wins at the store.

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::outbox;
use parking_lot::{Mutex, RwLock};
use qs_01_address_state::{AddressStateStore, WriteOutcome};
use shared_bus::{Channel, ChannelHub, ChannelName, MessageStream};
use shared_types::{
    ContextRole, PanelId, ResolvedState, StampedState, StateDelta, SyncMessage, SystemTimeSource,
    TimeSource,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

struct PrimaryInner {
    context_id: Uuid,
    config: SyncConfig,
    hub: Arc<dyn ChannelHub>,
    store: Arc<AddressStateStore>,
    resolved: watch::Receiver<ResolvedState>,
    /// Last revision handed out. Held while reading `resolved`, so
    /// revision order follows the order states were published.
    revision: Mutex<u64>,
    clock: Arc<dyn TimeSource>,
    panels: RwLock<HashMap<PanelId, Arc<dyn Channel>>>,
    secondaries: RwLock<HashSet<Uuid>>,
    requests_applied: AtomicU64,
    broadcasts: AtomicU64,
    shutdown: CancellationToken,
}

/// Fans resolved state out to secondaries and applies their requests.
pub struct PrimarySynchronizer {
    inner: Arc<PrimaryInner>,
}

impl PrimarySynchronizer {
    /// Start broadcasting every change of `resolved`.
    ///
    /// Must be called within a Tokio runtime.
    pub fn spawn(
        hub: Arc<dyn ChannelHub>,
        store: Arc<AddressStateStore>,
        resolved: watch::Receiver<ResolvedState>,
        config: SyncConfig,
    ) -> Self {
        Self::with_time_source(hub, store, resolved, config, Arc::new(SystemTimeSource::new()))
    }

    pub fn with_time_source(
        hub: Arc<dyn ChannelHub>,
        store: Arc<AddressStateStore>,
        resolved: watch::Receiver<ResolvedState>,
        config: SyncConfig,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        if store.role() != ContextRole::Primary {
            warn!("Primary synchronizer attached to a secondary store");
        }
        let inner = Arc::new(PrimaryInner {
            context_id: Uuid::new_v4(),
            config,
            hub,
            store,
            resolved,
            revision: Mutex::new(0),
            clock,
            panels: RwLock::new(HashMap::new()),
            secondaries: RwLock::new(HashSet::new()),
            requests_applied: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        });

        let mut resolved = inner.resolved.clone();
        resolved.borrow_and_update();
        tokio::spawn(broadcast_loop(inner.clone(), resolved));

        info!(context = %inner.context_id, "Primary synchronizer started");
        Self { inner }
    }

    /// Open the channel for a panel and start listening on it.
    ///
    /// The current state is broadcast right away when
    /// [`SyncConfig::announce_on_attach`] is set, so secondaries that
    /// attached before the primary still converge.
    ///
    /// # Errors
    ///
    /// `AlreadyAttached` for a panel that is already open, or a channel
    /// error if the new endpoint cannot be subscribed.
    pub fn attach(&self, panel: PanelId) -> Result<ChannelName, SyncError> {
        let inner = &self.inner;
        if inner.panels.read().contains_key(&panel) {
            return Err(SyncError::AlreadyAttached(panel));
        }

        let name = inner.config.channel_name(&panel);
        let channel = inner.hub.open(&name);
        let stream = channel.subscribe()?;
        inner.panels.write().insert(panel.clone(), channel.clone());

        tokio::spawn(listen(inner.clone(), panel.clone(), channel.clone(), stream));
        info!(%panel, channel = %name, "Panel channel attached");

        if inner.config.announce_on_attach {
            inner.send_current(channel.as_ref());
        }
        Ok(name)
    }

    /// Tell a panel's secondaries the primary is leaving, then close it.
    ///
    /// # Errors
    ///
    /// `NotAttached` if the panel was never attached.
    pub fn detach(&self, panel: &PanelId) -> Result<(), SyncError> {
        let channel = self
            .inner
            .panels
            .write()
            .remove(panel)
            .ok_or_else(|| SyncError::NotAttached(panel.clone()))?;
        self.inner.close_channel(channel.as_ref());
        info!(%panel, "Panel channel detached");
        Ok(())
    }

    /// Broadcast the current state to every panel now.
    ///
    /// Returns the number of secondary endpoints reached.
    pub fn broadcast(&self) -> usize {
        let stamped = self.inner.stamp(&mut self.inner.resolved.clone());
        self.inner.broadcast_all(&stamped)
    }

    #[must_use]
    pub fn panels(&self) -> Vec<PanelId> {
        let mut panels: Vec<PanelId> = self.inner.panels.read().keys().cloned().collect();
        panels.sort();
        panels
    }

    /// Secondaries that announced themselves and have not closed.
    #[must_use]
    pub fn secondary_count(&self) -> usize {
        self.inner.secondaries.read().len()
    }

    /// State-requests that changed the address.
    #[must_use]
    pub fn requests_applied(&self) -> u64 {
        self.inner.requests_applied.load(Ordering::Relaxed)
    }

    /// State-broadcasts sent, replies to `ready` included.
    #[must_use]
    pub fn broadcasts_sent(&self) -> u64 {
        self.inner.broadcasts.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn context_id(&self) -> Uuid {
        self.inner.context_id
    }

    /// Send `close` on every panel, close the channels and stop all tasks.
    pub fn shutdown(&self) {
        if self.inner.shutdown.is_cancelled() {
            return;
        }
        self.inner.shutdown.cancel();
        let channels: Vec<_> = self.inner.panels.write().drain().map(|(_, c)| c).collect();
        for channel in &channels {
            self.inner.close_channel(channel.as_ref());
        }
        info!(context = %self.inner.context_id, "Primary synchronizer shut down");
    }
}

impl Drop for PrimarySynchronizer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl PrimaryInner {
    /// Read the latest state and give it the next revision.
    fn stamp(&self, resolved: &mut watch::Receiver<ResolvedState>) -> StampedState {
        let mut revision = self.revision.lock();
        let state = resolved.borrow_and_update().clone();
        *revision += 1;
        StampedState {
            origin: self.context_id,
            revision: *revision,
            state,
        }
    }

    fn send_current(&self, channel: &dyn Channel) -> usize {
        let stamped = self.stamp(&mut self.resolved.clone());
        self.send_state(channel, stamped)
    }

    fn send_state(&self, channel: &dyn Channel, stamped: StampedState) -> usize {
        let message = SyncMessage::StateBroadcast(Box::new(stamped));
        match outbox::send(channel, self.clock.as_ref(), &message) {
            Ok(peers) => {
                self.broadcasts.fetch_add(1, Ordering::Relaxed);
                peers
            }
            Err(e) => {
                warn!(channel = %channel.name(), error = %e, "State broadcast failed");
                0
            }
        }
    }

    fn broadcast_all(&self, stamped: &StampedState) -> usize {
        let channels: Vec<_> = self.panels.read().values().cloned().collect();
        let reached = channels
            .iter()
            .map(|channel| self.send_state(channel.as_ref(), stamped.clone()))
            .sum();
        debug!(
            phase = %stamped.state.phase,
            revision = stamped.revision,
            panels = channels.len(),
            reached,
            "State broadcast"
        );
        reached
    }

    fn apply_request(&self, panel: &PanelId, delta: StateDelta) {
        let keys = delta.len();
        match self.store.write(delta) {
            WriteOutcome::Applied => {
                self.requests_applied.fetch_add(1, Ordering::Relaxed);
                info!(%panel, keys, "State request applied");
            }
            outcome => debug!(%panel, keys, ?outcome, "State request had no effect"),
        }
    }

    fn close_channel(&self, channel: &dyn Channel) {
        let message = SyncMessage::Close {
            context_id: self.context_id,
            role: ContextRole::Primary,
        };
        if let Err(e) = outbox::send(channel, self.clock.as_ref(), &message) {
            debug!(channel = %channel.name(), error = %e, "Close notice not sent");
        }
        channel.close();
    }
}

async fn broadcast_loop(inner: Arc<PrimaryInner>, mut resolved: watch::Receiver<ResolvedState>) {
    loop {
        tokio::select! {
            biased;
            () = inner.shutdown.cancelled() => break,
            changed = resolved.changed() => {
                if changed.is_err() {
                    debug!("Resolved state source dropped");
                    break;
                }
                let stamped = inner.stamp(&mut resolved);
                inner.broadcast_all(&stamped);
            }
        }
    }
}

async fn listen(
    inner: Arc<PrimaryInner>,
    panel: PanelId,
    channel: Arc<dyn Channel>,
    mut stream: MessageStream,
) {
    loop {
        let envelope = tokio::select! {
            biased;
            () = inner.shutdown.cancelled() => break,
            envelope = stream.recv() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
        };

        let message = match envelope.open() {
            Ok(message) => message,
            Err(e) => {
                warn!(%panel, error = %e, "Undecodable message ignored");
                continue;
            }
        };

        match message {
            SyncMessage::Ready { context_id } => {
                inner.secondaries.write().insert(context_id);
                let reached = inner.send_current(channel.as_ref());
                debug!(%panel, %context_id, reached, "Secondary ready, current state sent");
            }
            SyncMessage::StateRequest(delta) => inner.apply_request(&panel, delta),
            SyncMessage::Close { context_id, role } => {
                inner.secondaries.write().remove(&context_id);
                debug!(%panel, %context_id, %role, "Context closed");
            }
            SyncMessage::StateBroadcast(_) => {
                warn!(%panel, "Ignoring state broadcast from another primary");
            }
        }
    }
    debug!(%panel, "Panel listener stopped");
}
