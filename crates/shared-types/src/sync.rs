//! # Cross-Context Messages
//!
//! Typed [`SyncMessage`]s are sealed into a [`SyncEnvelope`] for transport.
//! The envelope is the wire shape `{kind, payload, timestamp}`; it carries
//! values only, so both sides may apply it idempotently.
//!
//! The envelope timestamp is informational. Broadcasts are ordered by the
//! [`StampedState::revision`] their primary assigns, since wall clocks can
//! step backwards.

use crate::context::ContextRole;
use crate::errors::EnvelopeError;
use crate::resource::ResolvedState;
use crate::snapshot::StateDelta;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Envelope discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    /// Primary → secondaries: resolved state.
    StateBroadcast,
    /// Secondary → primary: partial snapshot delta.
    StateRequest,
    /// Secondary → primary: channel attached, send current state.
    Ready,
    /// Either direction: endpoint is going away.
    Close,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::StateBroadcast => "state-broadcast",
            Self::StateRequest => "state-request",
            Self::Ready => "ready",
            Self::Close => "close",
        };
        f.write_str(s)
    }
}

/// Wire envelope exchanged over a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncEnvelope {
    pub kind: MessageKind,
    pub payload: serde_json::Value,
    /// Milliseconds since the Unix epoch at the sender.
    pub timestamp: u64,
}

impl SyncEnvelope {
    /// Decode the payload according to `kind`.
    pub fn open(&self) -> Result<SyncMessage, EnvelopeError> {
        let payload_err = |source| EnvelopeError::Payload {
            kind: self.kind.to_string(),
            source,
        };
        let message = match self.kind {
            MessageKind::StateBroadcast => SyncMessage::StateBroadcast(Box::new(
                serde_json::from_value(self.payload.clone()).map_err(payload_err)?,
            )),
            MessageKind::StateRequest => SyncMessage::StateRequest(
                serde_json::from_value(self.payload.clone()).map_err(payload_err)?,
            ),
            MessageKind::Ready => {
                let notice: ContextNotice =
                    serde_json::from_value(self.payload.clone()).map_err(payload_err)?;
                SyncMessage::Ready {
                    context_id: notice.context_id,
                }
            }
            MessageKind::Close => {
                let notice: ContextNotice =
                    serde_json::from_value(self.payload.clone()).map_err(payload_err)?;
                SyncMessage::Close {
                    context_id: notice.context_id,
                    role: notice.role.unwrap_or(ContextRole::Secondary),
                }
            }
        };
        Ok(message)
    }

    /// Serialize to a JSON string for string-only transports.
    pub fn to_json(&self) -> Result<String, EnvelopeError> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse from a JSON string.
    pub fn from_json(raw: &str) -> Result<Self, EnvelopeError> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ContextNotice {
    context_id: Uuid,
    /// Only carried by `close`; a missing role reads as secondary.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<ContextRole>,
}

/// Resolved state as broadcast by one primary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StampedState {
    /// Context id of the broadcasting primary.
    pub origin: Uuid,
    /// Strictly increasing per origin, in the order states were read.
    pub revision: u64,
    pub state: ResolvedState,
}

impl StampedState {
    /// Whether this broadcast should replace one already applied from
    /// `(origin, revision)`. A different origin always wins.
    #[must_use]
    pub fn supersedes(&self, origin: Uuid, revision: u64) -> bool {
        self.origin != origin || self.revision > revision
    }
}

/// Typed cross-context message.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage {
    StateBroadcast(Box<StampedState>),
    StateRequest(StateDelta),
    Ready { context_id: Uuid },
    Close { context_id: Uuid, role: ContextRole },
}

impl SyncMessage {
    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::StateBroadcast(_) => MessageKind::StateBroadcast,
            Self::StateRequest(_) => MessageKind::StateRequest,
            Self::Ready { .. } => MessageKind::Ready,
            Self::Close { .. } => MessageKind::Close,
        }
    }

    /// Wrap into a wire envelope stamped with `timestamp`.
    pub fn seal(&self, timestamp: u64) -> Result<SyncEnvelope, EnvelopeError> {
        let payload = match self {
            Self::StateBroadcast(state) => serde_json::to_value(state.as_ref())?,
            Self::StateRequest(delta) => serde_json::to_value(delta)?,
            Self::Ready { context_id } => serde_json::to_value(ContextNotice {
                context_id: *context_id,
                role: None,
            })?,
            Self::Close { context_id, role } => serde_json::to_value(ContextNotice {
                context_id: *context_id,
                role: Some(*role),
            })?,
        };
        Ok(SyncEnvelope {
            kind: self.kind(),
            payload,
            timestamp,
        })
    }
}
