//! Typed edits written back through the Address State Store.
//!
//! Read the snapshot, map it to the active domain's typed filters, mutate,
//! then write the adapter's delta. Works in both roles: a secondary store
//! redirects the write to the primary.

use crate::domain::DomainRegistry;
use crate::error::OrchestratorError;
use qs_01_address_state::{AddressStateStore, WriteOutcome};
use shared_types::{
    ConfigurationError, FilterState, FilterValue, SortOrder, PAGE_KEY, SORT_BY_KEY, SORT_ORDER_KEY,
};
use std::sync::Arc;
use tracing::debug;

pub struct FilterEditor {
    store: Arc<AddressStateStore>,
    registry: Arc<DomainRegistry>,
}

impl FilterEditor {
    pub fn new(store: Arc<AddressStateStore>, registry: Arc<DomainRegistry>) -> Self {
        Self { store, registry }
    }

    /// Typed view of the current snapshot for the active domain.
    ///
    /// # Errors
    ///
    /// `Configuration` when no domain is active.
    pub fn current(&self) -> Result<FilterState, OrchestratorError> {
        let adapter = self.registry.get_active()?;
        Ok(adapter.map_state_to_filters(&self.store.read()))
    }

    /// Apply an arbitrary edit as one write.
    ///
    /// When the edit narrows or widens the result set (any filter other
    /// than the page changes) and the domain declares a page key, the page
    /// goes back to 1.
    ///
    /// # Errors
    ///
    /// `Configuration` when no domain is active.
    pub fn edit<F>(&self, edit: F) -> Result<WriteOutcome, OrchestratorError>
    where
        F: FnOnce(&mut FilterState),
    {
        let adapter = self.registry.get_active()?;
        let descriptor = adapter.descriptor();
        let mut state = adapter.map_state_to_filters(&self.store.read());
        let before = state.filters.clone();

        edit(&mut state);

        if descriptor.declares_filter(PAGE_KEY) && filters_changed_besides_page(&before, &state) {
            state
                .filters
                .insert(PAGE_KEY.to_string(), FilterValue::Integer(1));
        }

        let delta = adapter.map_filters_to_state(&state);
        let outcome = self.store.write(delta);
        debug!(domain = %descriptor.name, ?outcome, "Filter edit written");
        Ok(outcome)
    }

    /// Fails unless the active adapter declares `key` in the namespace.
    /// An undeclared key would never reach the address.
    fn require_declared(&self, key: &str, highlight: bool) -> Result<(), OrchestratorError> {
        let adapter = self.registry.get_active()?;
        let descriptor = adapter.descriptor();
        let declared = if highlight {
            descriptor.declares_highlight(key)
        } else {
            descriptor.declares_filter(key)
        };
        if declared {
            return Ok(());
        }
        let namespace = if highlight { "highlight" } else { "filter" };
        debug!(domain = %descriptor.name, key, namespace, "Edit of undeclared key rejected");
        Err(ConfigurationError::UndeclaredKey {
            domain: descriptor.name.clone(),
            namespace,
            key: key.to_string(),
        }
        .into())
    }

    /// Set one filter value. An empty value clears it.
    ///
    /// # Errors
    ///
    /// `Configuration` when no domain is active or `key` is not one of its
    /// filter keys.
    pub fn set_filter(
        &self,
        key: &str,
        value: impl Into<FilterValue>,
    ) -> Result<WriteOutcome, OrchestratorError> {
        self.require_declared(key, false)?;
        let value = value.into();
        self.edit(|state| {
            state.filters.insert(key.to_string(), value);
        })
    }

    pub fn clear_filter(&self, key: &str) -> Result<WriteOutcome, OrchestratorError> {
        self.require_declared(key, false)?;
        self.edit(|state| {
            state.filters.remove(key);
        })
    }

    /// Set one highlight. Highlights segment results and keep the page.
    pub fn set_highlight(
        &self,
        key: &str,
        value: impl Into<FilterValue>,
    ) -> Result<WriteOutcome, OrchestratorError> {
        self.require_declared(key, true)?;
        let value = value.into();
        self.edit(|state| {
            state.highlights.insert(key.to_string(), value);
        })
    }

    pub fn clear_highlights(&self) -> Result<WriteOutcome, OrchestratorError> {
        self.edit(|state| state.highlights.clear())
    }

    /// Go to a 1-indexed page. Page 0 is treated as page 1.
    pub fn set_page(&self, page: u32) -> Result<WriteOutcome, OrchestratorError> {
        self.edit(|state| {
            state
                .filters
                .insert(PAGE_KEY.to_string(), FilterValue::Integer(i64::from(page.max(1))));
        })
    }

    pub fn set_sort(&self, column: &str, order: SortOrder) -> Result<WriteOutcome, OrchestratorError> {
        self.edit(|state| {
            state
                .filters
                .insert(SORT_BY_KEY.to_string(), FilterValue::text(column));
            state
                .filters
                .insert(SORT_ORDER_KEY.to_string(), FilterValue::text(order.as_str()));
        })
    }
}

fn filters_changed_besides_page(before: &shared_types::FilterMap, after: &FilterState) -> bool {
    let strip = |map: &shared_types::FilterMap| {
        map.iter()
            .filter(|(k, v)| k.as_str() != PAGE_KEY && !v.is_empty())
            .map(|(k, v)| (k.clone(), v.to_param()))
            .collect::<Vec<_>>()
    };
    strip(before) != strip(&after.filters)
}
