//! # Runtime Configuration
//!
//! Unified configuration for one browsing context, loaded from TOML with
//! environment overrides on top.
//!
//! ```toml
//! [coordinator]
//! cache_ttl_secs = 300
//! max_entries = 256
//! cleanup_interval_secs = 60
//!
//! [sync]
//! channel_prefix = "query-state"
//! channel_capacity = 64
//! popout_segment = "popout"
//! panels = ["results"]
//! ```
//!
//! Every field has a default, so an empty file is a valid configuration.

use qs_01_address_state::DEFAULT_POPOUT_SEGMENT;
use qs_03_request_coordinator::{CoordinatorConfig, DEFAULT_MAX_ENTRIES, DEFAULT_TTL};
use qs_05_cross_context_sync::SyncConfig;
use serde::Deserialize;
use shared_bus::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_CHANNEL_PREFIX};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Cache TTL override, in seconds.
pub const ENV_CACHE_TTL_SECS: &str = "QS_CACHE_TTL_SECS";
/// Cache bound override.
pub const ENV_CACHE_MAX_ENTRIES: &str = "QS_CACHE_MAX_ENTRIES";
/// Channel prefix override.
pub const ENV_CHANNEL_PREFIX: &str = "QS_CHANNEL_PREFIX";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value {value:?} for {var}")]
    Env { var: &'static str, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub coordinator: CoordinatorSection,
    pub sync: SyncSection,
}

/// Request coordinator settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoordinatorSection {
    /// Lifetime of a cache entry. Zero disables caching.
    pub cache_ttl_secs: u64,
    /// LRU bound on cached fingerprints.
    pub max_entries: usize,
    /// Period of the expired-entry sweep.
    pub cleanup_interval_secs: u64,
}

impl Default for CoordinatorSection {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_TTL.as_secs(),
            max_entries: DEFAULT_MAX_ENTRIES,
            cleanup_interval_secs: 60,
        }
    }
}

/// Cross-context channel settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct SyncSection {
    pub channel_prefix: String,
    /// Per-channel buffer of the in-process hub.
    pub channel_capacity: usize,
    /// Path segment marking a pop-out entry address.
    pub popout_segment: String,
    /// Panels the primary opens a channel for at boot.
    pub panels: Vec<String>,
    pub announce_on_attach: bool,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            channel_prefix: DEFAULT_CHANNEL_PREFIX.to_string(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            popout_segment: DEFAULT_POPOUT_SEGMENT.to_string(),
            panels: vec!["results".to_string()],
            announce_on_attach: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// `Parse` for malformed TOML or mistyped fields.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load from a TOML file, apply environment overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed, an override
    /// is malformed, or the result fails [`validate`](Self::validate).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|source| ConfigError::Io {
            path: path.as_ref().display().to_string(),
            source,
        })?;

        let mut config = Self::from_toml_str(&content)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus environment overrides.
    ///
    /// # Errors
    ///
    /// As [`load`](Self::load), minus the file.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `QS_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// `Env` when an override does not parse.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|var| std::env::var(var).ok())
    }

    /// Apply overrides from any variable lookup.
    ///
    /// # Errors
    ///
    /// `Env` when an override does not parse.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_CACHE_TTL_SECS) {
            self.coordinator.cache_ttl_secs = parse_env(ENV_CACHE_TTL_SECS, value)?;
        }
        if let Some(value) = lookup(ENV_CACHE_MAX_ENTRIES) {
            self.coordinator.max_entries = parse_env(ENV_CACHE_MAX_ENTRIES, value)?;
        }
        if let Some(value) = lookup(ENV_CHANNEL_PREFIX) {
            self.sync.channel_prefix = value;
        }
        Ok(())
    }

    /// Reject values no component can run with.
    ///
    /// # Errors
    ///
    /// `Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.coordinator.max_entries == 0 {
            return Err(ConfigError::Invalid("coordinator.max_entries must be > 0".into()));
        }
        if self.coordinator.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "coordinator.cleanup_interval_secs must be > 0".into(),
            ));
        }
        if self.sync.channel_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("sync.channel_prefix is empty".into()));
        }
        if self.sync.channel_capacity == 0 {
            return Err(ConfigError::Invalid("sync.channel_capacity must be > 0".into()));
        }
        let segment = &self.sync.popout_segment;
        if segment.is_empty() || segment.contains('/') {
            return Err(ConfigError::Invalid(format!(
                "sync.popout_segment {segment:?} must be a single path segment"
            )));
        }
        if let Some(panel) = self.sync.panels.iter().find(|p| p.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!("sync.panels contains {panel:?}")));
        }
        Ok(())
    }

    #[must_use]
    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig::default()
            .with_ttl(Duration::from_secs(self.coordinator.cache_ttl_secs))
            .with_max_entries(self.coordinator.max_entries)
    }

    #[must_use]
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.coordinator.cleanup_interval_secs)
    }

    #[must_use]
    pub fn sync_config(&self) -> SyncConfig {
        SyncConfig {
            channel_prefix: self.sync.channel_prefix.clone(),
            announce_on_attach: self.sync.announce_on_attach,
        }
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::Env { var, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.coordinator.cache_ttl_secs, 300);
        assert_eq!(config.coordinator.max_entries, 256);
        assert_eq!(config.cleanup_interval(), Duration::from_secs(60));
        assert_eq!(config.sync.channel_prefix, "query-state");
        assert_eq!(config.sync.channel_capacity, 64);
        assert_eq!(config.sync.popout_segment, "popout");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = RuntimeConfig::from_toml_str("").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            [coordinator]
            cache_ttl_secs = 30

            [sync]
            panels = ["results", "chart"]
            "#,
        )
        .unwrap();

        assert_eq!(config.coordinator.cache_ttl_secs, 30);
        assert_eq!(config.coordinator.max_entries, 256);
        assert_eq!(config.sync.panels, vec!["results", "chart"]);
        assert_eq!(
            config.coordinator_config().default_ttl,
            Duration::from_secs(30)
        );
    }

    #[test]
    fn test_malformed_toml_rejected() {
        let err = RuntimeConfig::from_toml_str("[coordinator]\nmax_entries = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            (ENV_CACHE_TTL_SECS, "5"),
            (ENV_CACHE_MAX_ENTRIES, "10"),
            (ENV_CHANNEL_PREFIX, "app"),
        ]
        .into_iter()
        .collect();

        let mut config = RuntimeConfig::default();
        config
            .apply_overrides(|var| vars.get(var).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.coordinator.cache_ttl_secs, 5);
        assert_eq!(config.coordinator.max_entries, 10);
        assert_eq!(config.sync_config().channel_prefix, "app");
    }

    #[test]
    fn test_bad_env_override_names_variable() {
        let mut config = RuntimeConfig::default();
        let err = config
            .apply_overrides(|var| (var == ENV_CACHE_TTL_SECS).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: ENV_CACHE_TTL_SECS, .. }));
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        let mut config = RuntimeConfig::default();
        config.coordinator.max_entries = 0;
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.sync.popout_segment = "pop/out".to_string();
        assert!(config.validate().is_err());

        let mut config = RuntimeConfig::default();
        config.sync.channel_prefix = " ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_ttl_is_valid() {
        let mut config = RuntimeConfig::default();
        config.coordinator.cache_ttl_secs = 0;
        assert!(config.validate().is_ok());
        assert_eq!(config.coordinator_config().default_ttl, Duration::ZERO);
    }

    #[test]
    fn test_load_missing_file() {
        let err = RuntimeConfig::load("/nonexistent/query-state.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
