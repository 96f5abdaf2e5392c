//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for structured logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Role of the browsing context (`primary` / `secondary`)
    pub context_role: String,

    /// Log level filter (trace, debug, info, warn, error) or a full
    /// `EnvFilter` directive
    pub log_level: String,

    /// Whether to write logs to the console at all
    pub console_output: bool,

    /// Whether to emit JSON lines instead of the human-readable format
    pub json_logs: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "query-state".to_string(),
            context_role: "primary".to_string(),
            log_level: "info".to_string(),
            console_output: true,
            json_logs: false,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `QS_SERVICE_NAME`: Service name (default: query-state)
    /// - `QS_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `QS_CONSOLE_OUTPUT`: Enable console output (default: true)
    /// - `QS_JSON_LOGS`: Enable JSON logs (default: false, true in containers)
    pub fn from_env() -> Self {
        let is_container =
            env::var("KUBERNETES_SERVICE_HOST").is_ok() || env::var("DOCKER_CONTAINER").is_ok();

        Self {
            service_name: env::var("QS_SERVICE_NAME")
                .unwrap_or_else(|_| "query-state".to_string()),

            context_role: "primary".to_string(),

            log_level: env::var("QS_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            console_output: env::var("QS_CONSOLE_OUTPUT")
                .map(|v| v.to_lowercase() != "false" && v != "0")
                .unwrap_or(true),

            json_logs: env::var("QS_JSON_LOGS")
                .map(|v| v.to_lowercase() == "true" || v == "1")
                .unwrap_or(is_container),
        }
    }

    /// Configuration for one browsing context.
    pub fn for_context(role: &str) -> Self {
        let mut config = Self::from_env();
        config.context_role = role.to_string();
        config
    }

    /// Service name including the context role, e.g. `query-state-secondary`.
    pub fn full_service_name(&self) -> String {
        if self.context_role == "primary" {
            self.service_name.clone()
        } else {
            format!("{}-{}", self.service_name, self.context_role)
        }
    }
}
