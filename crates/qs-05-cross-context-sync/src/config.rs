//! Synchronizer configuration.

use shared_bus::{ChannelName, DEFAULT_CHANNEL_PREFIX};
use shared_types::PanelId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Prefix of every channel name; the panel id is appended.
    pub channel_prefix: String,
    /// Broadcast the current state as soon as a panel channel attaches.
    pub announce_on_attach: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            channel_prefix: DEFAULT_CHANNEL_PREFIX.to_string(),
            announce_on_attach: true,
        }
    }
}

impl SyncConfig {
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.channel_prefix = prefix.into();
        self
    }

    #[must_use]
    pub fn channel_name(&self, panel: &PanelId) -> ChannelName {
        ChannelName::for_panel(&self.channel_prefix, panel)
    }
}
