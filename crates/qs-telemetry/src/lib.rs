//! # Query-State Telemetry
//!
//! Structured logging for every browsing context: a `tracing-subscriber`
//! registry with an `EnvFilter` and either a human-readable or a JSON
//! formatter.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qs_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::from_env())?;
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QS_SERVICE_NAME` | `query-state` | Service name in log lines |
//! | `QS_LOG_LEVEL` | `info` | Log level filter (`RUST_LOG` also honored) |
//! | `QS_CONSOLE_OUTPUT` | `true` | Write logs to the console |
//! | `QS_JSON_LOGS` | `false` | JSON lines instead of pretty output |

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod logging;

pub use config::TelemetryConfig;
pub use logging::init_logging;

use thiserror::Error;

/// Telemetry initialization errors
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid log filter: {0}")]
    Filter(String),

    #[error("Global subscriber already installed: {0}")]
    AlreadyInitialized(String),
}

/// Initialize logging for this process.
///
/// # Errors
///
/// See [`init_logging`].
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    init_logging(config)
}

/// Convenience macro for creating a span with component context.
///
/// ```rust,ignore
/// let _span = component_span!("context", role = "secondary", panel = "results").entered();
/// ```
#[macro_export]
macro_rules! component_span {
    ($name:expr, $($field:tt)*) => {
        tracing::info_span!($name, $($field)*)
    };
}
