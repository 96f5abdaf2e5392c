//! Sealing and sending messages.

use crate::error::SyncError;
use shared_bus::Channel;
use shared_types::{SyncMessage, TimeSource};

/// Seal `message` with the current time and send it.
///
/// Returns the number of other endpoints attached at send time.
pub(crate) fn send(
    channel: &dyn Channel,
    clock: &dyn TimeSource,
    message: &SyncMessage,
) -> Result<usize, SyncError> {
    let envelope = message.seal(clock.now_millis())?;
    Ok(channel.send(envelope)?)
}
