//! # Error Types
//!
//! Defines error types used across components.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Category of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportErrorKind {
    /// Connection failed or was reset.
    Network,
    /// Backend answered with a non-success status.
    Status,
    /// Response body could not be decoded.
    Decode,
    /// The fetch honored a cancellation signal.
    Cancelled,
}

/// A fetch failed (network or server).
///
/// Recoverable by a subsequent state change or an explicit retry. Never
/// written to the cache.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{kind:?} transport error: {message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    /// HTTP-style status code, when the backend provided one.
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn network(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Network,
            status: None,
            message: message.into(),
        }
    }

    pub fn status(code: u16, message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Status,
            status: Some(code),
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Decode,
            status: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn cancelled() -> Self {
        Self {
            kind: TransportErrorKind::Cancelled,
            status: None,
            message: "fetch cancelled".to_string(),
        }
    }
}

/// An adapter bundle is unusable (fatal at registration time), or an edit
/// names a key the active adapter does not declare.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("Domain adapter has an empty name")]
    EmptyName,

    #[error("Domain '{0}' is already registered")]
    DuplicateDomain(String),

    #[error("Domain '{domain}' declares key '{key}' more than once")]
    DuplicateKey { domain: String, key: String },

    #[error("Domain '{domain}' declares filter key '{key}' inside the highlight namespace")]
    KeyInHighlightNamespace { domain: String, key: String },

    #[error("Domain '{domain}' declares no filter keys")]
    NoFilterKeys { domain: String },

    #[error("Domain '{domain}' does not declare {namespace} key '{key}'")]
    UndeclaredKey {
        domain: String,
        namespace: &'static str,
        key: String,
    },

    #[error("Unknown domain: {0}")]
    UnknownDomain(String),

    #[error("No active domain registered")]
    NoActiveDomain,
}

/// Channel transport failures. Swallowed at the synchronizer boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// This endpoint was closed.
    #[error("Channel '{0}' is closed")]
    Closed(String),

    /// No peer is listening on the channel.
    #[error("Channel '{0}' has no reachable peer")]
    Unavailable(String),
}

/// A received envelope could not be opened.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("Envelope kind '{kind}' with undecodable payload: {source}")]
    Payload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Malformed envelope: {0}")]
    Malformed(#[from] serde_json::Error),
}
