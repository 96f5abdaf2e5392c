//! DomainAdapter for the vehicle listing.

use crate::vehicles::backend::VehicleBackend;
use crate::vehicles::model::{keys, VehicleQuery};
use async_trait::async_trait;
use qs_04_resource_orchestrator::{mapping, AdapterDescriptor, DomainAdapter};
use shared_types::{
    FilterState, FilterValue, ResourcePage, StateSnapshot, TransportError, PAGE_KEY, SIZE_KEY,
    SORT_BY_KEY, SORT_ORDER_KEY,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Registry name of the vehicle domain.
pub const DOMAIN_NAME: &str = "vehicles";

const INTEGER_KEYS: &[&str] = &[keys::YEAR_MIN, keys::YEAR_MAX, PAGE_KEY, SIZE_KEY];

pub struct VehicleAdapter {
    descriptor: AdapterDescriptor,
    backend: Arc<dyn VehicleBackend>,
}

impl VehicleAdapter {
    pub fn new(backend: Arc<dyn VehicleBackend>) -> Self {
        Self {
            descriptor: Self::describe(),
            backend,
        }
    }

    /// Declared keys of the vehicle domain.
    #[must_use]
    pub fn describe() -> AdapterDescriptor {
        AdapterDescriptor::new(DOMAIN_NAME)
            .with_filter_keys([
                keys::MANUFACTURER,
                keys::MODEL,
                keys::BODY_CLASS,
                keys::YEAR_MIN,
                keys::YEAR_MAX,
                PAGE_KEY,
                SIZE_KEY,
                SORT_BY_KEY,
                SORT_ORDER_KEY,
            ])
            .with_highlight_keys([keys::MANUFACTURER, keys::BODY_CLASS])
    }
}

#[async_trait]
impl DomainAdapter for VehicleAdapter {
    fn descriptor(&self) -> &AdapterDescriptor {
        &self.descriptor
    }

    /// Years and pagination become integers (unparseable values are
    /// dropped); `bodyClass` is a comma-separated multi-select.
    fn map_state_to_filters(&self, snapshot: &StateSnapshot) -> FilterState {
        let mut state = mapping::split_snapshot(&self.descriptor, snapshot);

        state.filters.retain(|key, value| {
            if !INTEGER_KEYS.contains(&key.as_str()) {
                return true;
            }
            match value.as_text().map(|s| s.parse::<i64>()) {
                Some(Ok(n)) => {
                    *value = FilterValue::Integer(n);
                    true
                }
                _ => {
                    debug!(key = %key, "Dropping non-numeric parameter");
                    false
                }
            }
        });

        if let Some(value) = state.filters.get_mut(keys::BODY_CLASS) {
            if let Some(text) = value.as_text() {
                *value = FilterValue::list(text.split(',')).normalized();
            }
        }
        state.filters.retain(|_, value| !value.is_empty());
        state
    }

    async fn fetch(
        &self,
        state: &FilterState,
        cancel: CancellationToken,
    ) -> Result<ResourcePage, TransportError> {
        let query = VehicleQuery::from_state(state);
        let response = tokio::select! {
            () = cancel.cancelled() => return Err(TransportError::cancelled()),
            response = self.backend.search(&query) => response?,
        };
        response
            .into_page()
            .map_err(|e| TransportError::decode(e.to_string()))
    }
}
