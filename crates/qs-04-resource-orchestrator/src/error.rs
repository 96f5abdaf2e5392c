//! Orchestrator error types.

use shared_types::ConfigurationError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrchestratorError {
    /// No usable domain adapter.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    /// `retry` / `refresh` before any fingerprint was computed.
    #[error("no request has been issued yet")]
    NoCurrentRequest,

    /// The orchestrator was shut down.
    #[error("orchestrator is shut down")]
    Shutdown,
}
