//! Synchronizer error types.
//!
//! None of these reach UI code: the synchronizer logs and swallows them,
//! and a secondary simply keeps its last-known state.

use shared_bus::ChannelName;
use shared_types::{ChannelError, EnvelopeError, PanelId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Envelope(#[from] EnvelopeError),

    /// A secondary sent into a channel nobody else is attached to.
    #[error("No primary context listening on '{0}'")]
    Unavailable(ChannelName),

    #[error("Panel '{0}' is already attached")]
    AlreadyAttached(PanelId),

    #[error("Panel '{0}' is not attached")]
    NotAttached(PanelId),
}

impl SyncError {
    /// Whether the other side is gone (as opposed to a local bug).
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::Unavailable(_) | Self::Channel(ChannelError::Closed(_) | ChannelError::Unavailable(_))
        )
    }
}
