//! # Domain Registry
//!
//! Lets several domains coexist. Created once at startup and passed by
//! reference into the orchestrator; never torn down during normal
//! operation.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              DomainRegistry              │
//! │  ┌──────────┐  ┌──────────┐  ┌────────┐  │
//! │  │ vehicles │  │  dealers │  │  ...   │  │
//! │  │  ACTIVE  │  │          │  │        │  │
//! │  └────┬─────┘  └──────────┘  └────────┘  │
//! └───────┼──────────────────────────────────┘
//!         ▼
//!   ResourceOrchestrator (re-evaluates on active change)
//! ```

use crate::ports::SharedAdapter;
use parking_lot::RwLock;
use shared_types::ConfigurationError;
use tokio::sync::watch;
use tracing::{info, warn};

/// Registered adapters plus the active selection.
pub struct DomainRegistry {
    /// Registration order is kept for `names()`.
    adapters: RwLock<Vec<SharedAdapter>>,
    active: watch::Sender<Option<String>>,
}

impl DomainRegistry {
    #[must_use]
    pub fn new() -> Self {
        let (active, _) = watch::channel(None);
        Self {
            adapters: RwLock::new(Vec::new()),
            active,
        }
    }

    /// Register an adapter bundle.
    ///
    /// The first adapter registered becomes active.
    ///
    /// # Errors
    ///
    /// Any descriptor validation failure, or `DuplicateDomain` if the name
    /// is taken. Configuration errors are meant to fail fast at startup.
    pub fn register(&self, adapter: SharedAdapter) -> Result<(), ConfigurationError> {
        let descriptor = adapter.descriptor();
        if let Err(e) = descriptor.validate() {
            warn!(domain = %descriptor.name, error = %e, "Adapter rejected");
            return Err(e);
        }
        let name = descriptor.name.clone();

        let mut adapters = self.adapters.write();
        if adapters.iter().any(|a| a.descriptor().name == name) {
            return Err(ConfigurationError::DuplicateDomain(name));
        }
        adapters.push(adapter);
        let first = adapters.len() == 1;
        drop(adapters);

        info!(domain = %name, "Domain adapter registered");
        if first {
            self.active.send_replace(Some(name));
        }
        Ok(())
    }

    /// The active adapter.
    ///
    /// # Errors
    ///
    /// `NoActiveDomain` before anything is registered.
    pub fn get_active(&self) -> Result<SharedAdapter, ConfigurationError> {
        let active = self.active.borrow().clone();
        let name = active.ok_or(ConfigurationError::NoActiveDomain)?;
        self.get(&name)
            .ok_or(ConfigurationError::UnknownDomain(name))
    }

    /// Switch the active domain. Setting the already-active name is a no-op.
    ///
    /// # Errors
    ///
    /// `UnknownDomain` if `name` was never registered.
    pub fn set_active(&self, name: &str) -> Result<(), ConfigurationError> {
        if self.get(name).is_none() {
            return Err(ConfigurationError::UnknownDomain(name.to_string()));
        }
        let changed = self.active.send_if_modified(|active| {
            if active.as_deref() == Some(name) {
                return false;
            }
            *active = Some(name.to_string());
            true
        });
        if changed {
            info!(domain = %name, "Active domain changed");
        }
        Ok(())
    }

    /// Adapter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<SharedAdapter> {
        self.adapters
            .read()
            .iter()
            .find(|a| a.descriptor().name == name)
            .cloned()
    }

    #[must_use]
    pub fn active_name(&self) -> Option<String> {
        self.active.borrow().clone()
    }

    /// Registered names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.adapters
            .read()
            .iter()
            .map(|a| a.descriptor().name.clone())
            .collect()
    }

    /// Notified whenever the active domain changes.
    #[must_use]
    pub fn active_changes(&self) -> watch::Receiver<Option<String>> {
        self.active.subscribe()
    }
}

impl Default for DomainRegistry {
    fn default() -> Self {
        Self::new()
    }
}
