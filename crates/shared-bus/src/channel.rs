//! # Channel Abstraction
//!
//! `send` / `subscribe` (the `onMessage` side) / `close`, plus a hub that
//! hands out endpoints by name.

use crate::subscriber::MessageStream;
use shared_types::{ChannelError, PanelId, SyncEnvelope};
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Stable channel name, derived from a panel identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelName(String);

impl ChannelName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// `"<prefix>.<panel>"`.
    #[must_use]
    pub fn for_panel(prefix: &str, panel: &PanelId) -> Self {
        Self(format!("{prefix}.{panel}"))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One endpoint on a named broadcast channel.
///
/// An endpoint never receives the messages it sent itself.
pub trait Channel: Send + Sync {
    fn name(&self) -> &ChannelName;

    /// Unique identifier of this endpoint.
    fn endpoint_id(&self) -> Uuid;

    /// Broadcast an envelope to every other endpoint on the channel.
    ///
    /// # Returns
    ///
    /// The number of other endpoints attached when the message was sent.
    ///
    /// # Errors
    ///
    /// `ChannelError::Closed` if this endpoint was closed.
    fn send(&self, envelope: SyncEnvelope) -> Result<usize, ChannelError>;

    /// Stream of envelopes sent by other endpoints from now on.
    ///
    /// # Errors
    ///
    /// `ChannelError::Closed` if this endpoint was closed.
    fn subscribe(&self) -> Result<MessageStream, ChannelError>;

    /// Detach this endpoint. Idempotent; ends every stream it handed out.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// Factory for channel endpoints.
pub trait ChannelHub: Send + Sync {
    fn open(&self, name: &ChannelName) -> Arc<dyn Channel>;
}
