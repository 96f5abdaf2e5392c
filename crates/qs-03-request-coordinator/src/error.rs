//! Coordinator error types.

use shared_types::TransportError;
use thiserror::Error;

/// Why a [`Resolution`](crate::Resolution) did not yield a value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordinatorError {
    /// The fetch failed. Nothing was cached.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// The fingerprint was superseded before its fetch settled.
    #[error("request superseded")]
    Superseded,

    /// The fetch task went away without settling (runtime shutdown).
    #[error("request abandoned before settling")]
    Abandoned,
}

impl CoordinatorError {
    /// Superseded and abandoned requests are not user-visible failures.
    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    #[must_use]
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(e) => Some(e),
            _ => None,
        }
    }
}
