//! # In-Memory Channel Hub
//!
//! Uses `tokio::sync::broadcast` per channel name for multi-producer,
//! multi-consumer delivery inside one process. Suitable for tests and for
//! hosts that run several logical contexts in-process; a browser host would
//! provide a different [`Channel`] implementation.

use crate::channel::{Channel, ChannelHub, ChannelName};
use crate::subscriber::MessageStream;
use crate::DEFAULT_CHANNEL_CAPACITY;
use parking_lot::RwLock;
use shared_types::{ChannelError, SyncEnvelope};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use uuid::Uuid;

/// Envelope tagged with the sending endpoint.
#[derive(Debug, Clone)]
struct Delivery {
    from: Uuid,
    envelope: SyncEnvelope,
}

/// Shared medium for one channel name.
struct ChannelSlot {
    sender: broadcast::Sender<Delivery>,
    endpoints: HashSet<Uuid>,
}

type Slots = Arc<RwLock<HashMap<ChannelName, ChannelSlot>>>;

/// In-process hub handing out [`InMemoryChannel`] endpoints by name.
pub struct InMemoryChannelHub {
    slots: Slots,
    capacity: usize,
    messages_sent: Arc<AtomicU64>,
}

impl InMemoryChannelHub {
    /// Create a hub with default per-channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create a hub with the given per-channel capacity.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
            messages_sent: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Attach a new endpoint to the named channel.
    #[must_use]
    pub fn open_channel(&self, name: &ChannelName) -> InMemoryChannel {
        let id = Uuid::new_v4();
        let sender = {
            let mut slots = self.slots.write();
            let slot = slots.entry(name.clone()).or_insert_with(|| ChannelSlot {
                sender: broadcast::channel(self.capacity).0,
                endpoints: HashSet::new(),
            });
            slot.endpoints.insert(id);
            slot.sender.clone()
        };

        debug!(channel = %name, endpoint = %id, "Channel endpoint attached");

        InMemoryChannel {
            id,
            name: name.clone(),
            sender,
            slots: self.slots.clone(),
            closed: CancellationToken::new(),
            messages_sent: self.messages_sent.clone(),
        }
    }

    /// Number of endpoints attached to a channel.
    #[must_use]
    pub fn endpoint_count(&self, name: &ChannelName) -> usize {
        self.slots
            .read()
            .get(name)
            .map_or(0, |slot| slot.endpoints.len())
    }

    /// Number of channel names with at least one endpoint.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        self.slots.read().len()
    }

    /// Total envelopes sent through this hub.
    #[must_use]
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for InMemoryChannelHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelHub for InMemoryChannelHub {
    fn open(&self, name: &ChannelName) -> Arc<dyn Channel> {
        Arc::new(self.open_channel(name))
    }
}

/// One endpoint on an in-memory channel. Closed on drop.
pub struct InMemoryChannel {
    id: Uuid,
    name: ChannelName,
    sender: broadcast::Sender<Delivery>,
    slots: Slots,
    closed: CancellationToken,
    messages_sent: Arc<AtomicU64>,
}

impl InMemoryChannel {
    fn peer_count(&self) -> usize {
        self.slots
            .read()
            .get(&self.name)
            .map_or(0, |slot| slot.endpoints.len().saturating_sub(1))
    }
}

impl Channel for InMemoryChannel {
    fn name(&self) -> &ChannelName {
        &self.name
    }

    fn endpoint_id(&self) -> Uuid {
        self.id
    }

    fn send(&self, envelope: SyncEnvelope) -> Result<usize, ChannelError> {
        if self.closed.is_cancelled() {
            return Err(ChannelError::Closed(self.name.to_string()));
        }

        let kind = envelope.kind;
        let peers = self.peer_count();
        self.messages_sent.fetch_add(1, Ordering::Relaxed);

        // No live receivers is not an error: the message just has no audience.
        if self
            .sender
            .send(Delivery {
                from: self.id,
                envelope,
            })
            .is_err()
        {
            debug!(channel = %self.name, %kind, "Envelope dropped (no receivers)");
        } else {
            debug!(channel = %self.name, %kind, peers, "Envelope sent");
        }

        Ok(peers)
    }

    fn subscribe(&self) -> Result<MessageStream, ChannelError> {
        if self.closed.is_cancelled() {
            return Err(ChannelError::Closed(self.name.to_string()));
        }

        let inbound = Inbound {
            receiver: self.sender.subscribe(),
            own_id: self.id,
            closed: self.closed.clone(),
            name: self.name.clone(),
        };

        Ok(MessageStream::new(futures::stream::unfold(
            inbound,
            |mut inbound| async move {
                let envelope = inbound.next_envelope().await?;
                Some((envelope, inbound))
            },
        )))
    }

    fn close(&self) {
        if self.closed.is_cancelled() {
            return;
        }
        self.closed.cancel();

        let mut slots = self.slots.write();
        let Some(slot) = slots.get_mut(&self.name) else {
            return;
        };
        slot.endpoints.remove(&self.id);
        if slot.endpoints.is_empty() {
            slots.remove(&self.name);
        }
        debug!(channel = %self.name, endpoint = %self.id, "Channel endpoint closed");
    }

    fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }
}

impl Drop for InMemoryChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Receive state behind a [`MessageStream`].
struct Inbound {
    receiver: broadcast::Receiver<Delivery>,
    own_id: Uuid,
    closed: CancellationToken,
    name: ChannelName,
}

impl Inbound {
    async fn next_envelope(&mut self) -> Option<SyncEnvelope> {
        loop {
            let delivery = tokio::select! {
                biased;
                () = self.closed.cancelled() => return None,
                received = self.receiver.recv() => match received {
                    Ok(delivery) => delivery,
                    Err(broadcast::error::RecvError::Closed) => return None,
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        warn!(channel = %self.name, lagged = count, "Endpoint lagged, messages dropped");
                        continue;
                    }
                },
            };

            if delivery.from != self.own_id {
                return Some(delivery.envelope);
            }
        }
    }
}
