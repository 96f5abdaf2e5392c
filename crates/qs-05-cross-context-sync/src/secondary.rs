//! # Secondary Synchronizer
//!
//! Runs in a pop-out context. It never fetches and never pushes its own
//! address: it mirrors the primary's state-broadcasts and turns every local
//! write into a state-request.
//!
//! ```text
//! attach ──► install write redirect ──► send ready
//!                                          │
//!                 state-broadcast ◄────────┘  (primary replies with current state)
//!                       │
//!                       ▼
//!               mirrored state (None until the first broadcast)
//!               + store snapshot (location untouched)
//!
//! store.write(delta) ──► redirect ──► state-request ──► primary
//! ```

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::outbox;
use qs_01_address_state::{AddressStateStore, WriteRedirect};
use shared_bus::{Channel, ChannelHub, MessageStream};
use shared_types::{
    ContextRole, PanelId, ResolvedState, StampedState, StateDelta, SyncMessage, SystemTimeSource,
    TimeSource,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Sends state-requests for one secondary. Never fails into the caller.
struct RequestSender {
    channel: Arc<dyn Channel>,
    clock: Arc<dyn TimeSource>,
    /// Set while the last send found nobody listening.
    unavailable: AtomicBool,
}

impl RequestSender {
    fn send(&self, message: &SyncMessage) -> Result<usize, SyncError> {
        let peers = outbox::send(self.channel.as_ref(), self.clock.as_ref(), message)?;
        if peers == 0 {
            return Err(SyncError::Unavailable(self.channel.name().clone()));
        }
        Ok(peers)
    }

    /// Send and swallow the failure. Returns whether anyone was listening.
    fn send_quietly(&self, message: &SyncMessage) -> bool {
        match self.send(message) {
            Ok(_) => {
                self.unavailable.store(false, Ordering::Relaxed);
                true
            }
            Err(e) => {
                // Warn once per outage, not once per click.
                if !self.unavailable.swap(true, Ordering::Relaxed) {
                    warn!(channel = %self.channel.name(), kind = %message.kind(), error = %e, "Primary unreachable");
                } else {
                    debug!(channel = %self.channel.name(), kind = %message.kind(), "Primary still unreachable");
                }
                false
            }
        }
    }
}

impl WriteRedirect for RequestSender {
    fn forward(&self, delta: StateDelta) {
        self.send_quietly(&SyncMessage::StateRequest(delta));
    }
}

struct SecondaryInner {
    context_id: Uuid,
    panel: PanelId,
    store: Arc<AddressStateStore>,
    sender: Arc<RequestSender>,
    mirrored: watch::Sender<Option<ResolvedState>>,
    /// Origin and revision of the last applied broadcast.
    applied: Mutex<Option<(Uuid, u64)>>,
    primary_closed: AtomicBool,
    closed: CancellationToken,
}

/// Mirror of the primary's resolved state for one panel.
///
/// Closes its channel when dropped.
pub struct SecondarySynchronizer {
    inner: Arc<SecondaryInner>,
}

impl SecondarySynchronizer {
    /// Attach to a panel's channel and announce readiness.
    ///
    /// Installs a write redirect on `store`, so every write in this context
    /// becomes a state-request. Must be called within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// A channel error if the new endpoint cannot be subscribed. An absent
    /// primary is not an error: the mirror simply stays empty.
    pub fn attach(
        hub: &dyn ChannelHub,
        panel: PanelId,
        store: Arc<AddressStateStore>,
        config: &SyncConfig,
    ) -> Result<Self, SyncError> {
        Self::attach_with_time_source(hub, panel, store, config, Arc::new(SystemTimeSource::new()))
    }

    pub fn attach_with_time_source(
        hub: &dyn ChannelHub,
        panel: PanelId,
        store: Arc<AddressStateStore>,
        config: &SyncConfig,
        clock: Arc<dyn TimeSource>,
    ) -> Result<Self, SyncError> {
        if store.role() != ContextRole::Secondary {
            warn!(%panel, "Secondary synchronizer attached to a primary store");
        }

        let name = config.channel_name(&panel);
        let channel = hub.open(&name);
        let stream = channel.subscribe()?;

        let sender = Arc::new(RequestSender {
            channel,
            clock,
            unavailable: AtomicBool::new(false),
        });
        store.set_redirect(sender.clone());

        let inner = Arc::new(SecondaryInner {
            context_id: Uuid::new_v4(),
            panel,
            store,
            sender,
            mirrored: watch::channel(None).0,
            applied: Mutex::new(None),
            primary_closed: AtomicBool::new(false),
            closed: CancellationToken::new(),
        });

        tokio::spawn(listen(inner.clone(), stream));

        let announced = inner.sender.send_quietly(&SyncMessage::Ready {
            context_id: inner.context_id,
        });
        info!(
            panel = %inner.panel,
            channel = %name,
            context = %inner.context_id,
            announced,
            "Secondary attached"
        );

        Ok(Self { inner })
    }

    /// Ask the primary to apply `delta`.
    ///
    /// Returns `false` when no primary was listening; the request is then
    /// lost and the mirror keeps its last-known state.
    pub fn request(&self, delta: StateDelta) -> bool {
        if self.inner.closed.is_cancelled() {
            debug!(panel = %self.inner.panel, "Request on closed secondary ignored");
            return false;
        }
        self.inner
            .sender
            .send_quietly(&SyncMessage::StateRequest(delta))
    }

    /// Mirrored state: `None` until the first broadcast arrives.
    #[must_use]
    pub fn state(&self) -> watch::Receiver<Option<ResolvedState>> {
        self.inner.mirrored.subscribe()
    }

    #[must_use]
    pub fn current(&self) -> Option<ResolvedState> {
        self.inner.mirrored.borrow().clone()
    }

    /// Whether a broadcast has been received, i.e. whether to render.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.inner.mirrored.borrow().is_some()
    }

    /// Wait for the first broadcast.
    ///
    /// Returns `None` if this secondary is closed first.
    pub async fn ready(&self) -> Option<ResolvedState> {
        let mut state = self.state();
        tokio::select! {
            () = self.inner.closed.cancelled() => None,
            ready = state.wait_for(Option::is_some) => ready.ok().and_then(|s| s.clone()),
        }
    }

    /// The primary announced it is going away.
    #[must_use]
    pub fn is_primary_closed(&self) -> bool {
        self.inner.primary_closed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn context_id(&self) -> Uuid {
        self.inner.context_id
    }

    #[must_use]
    pub fn panel(&self) -> &PanelId {
        &self.inner.panel
    }

    /// Announce `close`, remove the redirect and close the channel.
    /// Idempotent.
    pub fn close(&self) {
        let inner = &self.inner;
        if inner.closed.is_cancelled() {
            return;
        }
        inner.closed.cancel();
        inner.store.clear_redirect();

        let notice = SyncMessage::Close {
            context_id: inner.context_id,
            role: ContextRole::Secondary,
        };
        if let Err(e) = outbox::send(inner.sender.channel.as_ref(), inner.sender.clock.as_ref(), &notice) {
            debug!(panel = %inner.panel, error = %e, "Close notice not sent");
        }
        inner.sender.channel.close();
        info!(panel = %inner.panel, context = %inner.context_id, "Secondary closed");
    }
}

impl Drop for SecondarySynchronizer {
    fn drop(&mut self) {
        self.close();
    }
}

async fn listen(inner: Arc<SecondaryInner>, mut stream: MessageStream) {
    loop {
        let envelope = tokio::select! {
            biased;
            () = inner.closed.cancelled() => break,
            envelope = stream.recv() => match envelope {
                Some(envelope) => envelope,
                None => break,
            },
        };

        let message = match envelope.open() {
            Ok(message) => message,
            Err(e) => {
                warn!(panel = %inner.panel, error = %e, "Undecodable message ignored");
                continue;
            }
        };

        match message {
            SyncMessage::StateBroadcast(stamped) => {
                {
                    let mut applied = inner.applied.lock();
                    if let Some((origin, revision)) = *applied {
                        if !stamped.supersedes(origin, revision) {
                            debug!(
                                panel = %inner.panel,
                                revision = stamped.revision,
                                last = revision,
                                "Out-of-order broadcast ignored"
                            );
                            continue;
                        }
                    }
                    *applied = Some((stamped.origin, stamped.revision));
                }
                let StampedState { state, revision, .. } = *stamped;
                inner.primary_closed.store(false, Ordering::Relaxed);
                debug!(panel = %inner.panel, phase = %state.phase, revision, "Mirrored state updated");
                // Local edits are computed against the store, so it follows the primary.
                inner.store.mirror(state.snapshot.clone());
                inner.mirrored.send_replace(Some(state));
            }
            SyncMessage::Close {
                role: ContextRole::Primary,
                ..
            } => {
                inner.primary_closed.store(true, Ordering::Relaxed);
                info!(panel = %inner.panel, "Primary closed, keeping last-known state");
            }
            // Other secondaries share the channel; their traffic is not ours.
            SyncMessage::Close { .. } | SyncMessage::Ready { .. } | SyncMessage::StateRequest(_) => {}
        }
    }
    debug!(panel = %inner.panel, "Secondary listener stopped");
}
