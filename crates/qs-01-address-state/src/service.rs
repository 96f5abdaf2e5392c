//! # Address State Store Service
//!
//! Wires the query codec to the [`AddressLocation`] port and publishes the
//! current [`StateSnapshot`] through a `tokio::sync::watch` channel.
//!
//! ## Write Flow (primary)
//!
//! ```text
//! write(delta) ──► current.apply(delta) ──► unchanged? ──► Unchanged
//!                                              │
//!                                              ▼
//!                        location.push(encode(next)) ──► emit(next)
//! ```
//!
//! In a secondary context the location is never pushed: `write` hands the
//! delta to the installed [`WriteRedirect`].

use crate::domain::query;
use crate::ports::{AddressLocation, WriteRedirect};
use parking_lot::RwLock;
use shared_types::{ContextRole, StateDelta, StateSnapshot};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, warn};

/// Result of a [`AddressStateStore::write`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Snapshot replaced, location pushed, subscribers notified.
    Applied,
    /// The delta produced an identical snapshot; nothing happened.
    Unchanged,
    /// Secondary context: forwarded to the primary.
    Redirected,
    /// Secondary context with no redirect installed.
    Dropped,
}

/// Single source of truth for query state within one browsing context.
pub struct AddressStateStore {
    role: ContextRole,
    location: Arc<dyn AddressLocation>,
    state: watch::Sender<StateSnapshot>,
    redirect: RwLock<Option<Arc<dyn WriteRedirect>>>,
    emissions: AtomicU64,
}

impl AddressStateStore {
    /// Create a store seeded from the location's current query.
    pub fn new(role: ContextRole, location: Arc<dyn AddressLocation>) -> Self {
        let initial = query::decode(&location.read());
        debug!(%role, params = initial.len(), "Address state store created");
        let (state, _) = watch::channel(initial);
        Self {
            role,
            location,
            state,
            redirect: RwLock::new(None),
            emissions: AtomicU64::new(0),
        }
    }

    /// Primary store over the given location.
    pub fn primary(location: Arc<dyn AddressLocation>) -> Self {
        Self::new(ContextRole::Primary, location)
    }

    /// Secondary store over the given location.
    pub fn secondary(location: Arc<dyn AddressLocation>) -> Self {
        Self::new(ContextRole::Secondary, location)
    }

    #[must_use]
    pub fn role(&self) -> ContextRole {
        self.role
    }

    /// Current snapshot.
    #[must_use]
    pub fn read(&self) -> StateSnapshot {
        self.state.borrow().clone()
    }

    /// Merge a delta into the current snapshot.
    ///
    /// `None` (or an empty string) removes a key. Values are stored as raw
    /// strings; typed parsing belongs to the domain adapter.
    pub fn write(&self, delta: StateDelta) -> WriteOutcome {
        if delta.is_empty() {
            return WriteOutcome::Unchanged;
        }
        match self.role {
            ContextRole::Primary => self.apply(&delta),
            ContextRole::Secondary => self.redirect_write(delta),
        }
    }

    /// Build one delta from several logical edits and write it once.
    ///
    /// Subscribers see a single emission however many keys are touched.
    pub fn batch<F>(&self, edit: F) -> WriteOutcome
    where
        F: FnOnce(&mut StateDelta),
    {
        let mut delta = StateDelta::new();
        edit(&mut delta);
        self.write(delta)
    }

    /// Merge several deltas (later ones win) into a single write.
    pub fn write_all<I>(&self, deltas: I) -> WriteOutcome
    where
        I: IntoIterator<Item = StateDelta>,
    {
        let mut merged = StateDelta::new();
        for delta in deltas {
            merged.merge(delta);
        }
        self.write(merged)
    }

    /// Re-read the location after an environment-driven change
    /// (back/forward navigation, manual edit). Emits if it differs.
    pub fn sync_from_location(&self) -> bool {
        let changed = self.replace(query::decode(&self.location.read()));
        if changed {
            debug!(role = %self.role, "Snapshot reloaded from location");
        }
        changed
    }

    /// Adopt the snapshot a primary broadcast. Secondary only.
    ///
    /// The location is left untouched. Emits if it differs.
    pub fn mirror(&self, snapshot: StateSnapshot) -> bool {
        if self.role.is_primary() {
            warn!("Ignoring mirrored snapshot on a primary store");
            return false;
        }
        let changed = self.replace(snapshot);
        if changed {
            debug!("Snapshot mirrored from primary");
        }
        changed
    }

    fn replace(&self, next: StateSnapshot) -> bool {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            self.emissions.fetch_add(1, Ordering::Relaxed);
        }
        changed
    }

    /// Stream of snapshots: the current one first, then every change.
    ///
    /// Consecutive changes the consumer has not polled yet collapse into the
    /// latest snapshot.
    #[must_use]
    pub fn observe(&self) -> WatchStream<StateSnapshot> {
        WatchStream::new(self.state.subscribe())
    }

    /// Raw watch receiver, for `select!` loops.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<StateSnapshot> {
        self.state.subscribe()
    }

    /// Install the redirect used by a secondary store.
    pub fn set_redirect(&self, redirect: Arc<dyn WriteRedirect>) {
        if self.role.is_primary() {
            warn!("Ignoring write redirect on a primary store");
            return;
        }
        *self.redirect.write() = Some(redirect);
    }

    pub fn clear_redirect(&self) {
        self.redirect.write().take();
    }

    #[must_use]
    pub fn has_redirect(&self) -> bool {
        self.redirect.read().is_some()
    }

    /// Number of snapshots emitted after the initial one.
    #[must_use]
    pub fn emission_count(&self) -> u64 {
        self.emissions.load(Ordering::Relaxed)
    }

    fn apply(&self, delta: &StateDelta) -> WriteOutcome {
        let location = &self.location;
        let changed = self.state.send_if_modified(|current| {
            let next = current.apply(delta);
            if next == *current {
                return false;
            }
            location.push(&query::encode(&next));
            *current = next;
            true
        });

        if changed {
            self.emissions.fetch_add(1, Ordering::Relaxed);
            debug!(keys = delta.len(), "Snapshot written");
            WriteOutcome::Applied
        } else {
            WriteOutcome::Unchanged
        }
    }

    fn redirect_write(&self, delta: StateDelta) -> WriteOutcome {
        let redirect = self.redirect.read().clone();
        match redirect {
            Some(redirect) => {
                debug!(keys = delta.len(), "Secondary write redirected to primary");
                redirect.forward(delta);
                WriteOutcome::Redirected
            }
            None => {
                warn!(keys = delta.len(), "Secondary write dropped: no redirect installed");
                WriteOutcome::Dropped
            }
        }
    }
}
