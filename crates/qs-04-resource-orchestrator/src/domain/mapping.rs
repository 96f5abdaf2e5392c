//! Descriptor-driven snapshot mapping.
//!
//! Most adapters only need to parse a few declared keys. These helpers do
//! the namespace split and the reverse delta so that adapters can focus on
//! typing the values.

use crate::domain::AdapterDescriptor;
use shared_types::{FilterValue, FilterState, StateDelta, StateSnapshot};

/// Declared keys of `snapshot` as untyped text values.
///
/// Undeclared parameters are ignored; they never reach a fingerprint.
#[must_use]
pub fn split_snapshot(descriptor: &AdapterDescriptor, snapshot: &StateSnapshot) -> FilterState {
    let mut state = FilterState::new();
    for (key, value) in snapshot.filter_params() {
        if descriptor.declares_filter(key) {
            state.filters.insert(key.to_string(), FilterValue::text(value));
        }
    }
    for (key, value) in snapshot.highlight_params() {
        if descriptor.declares_highlight(key) {
            state.highlights.insert(key.to_string(), FilterValue::text(value));
        }
    }
    state
}

/// Delta writing `state` back to the address.
///
/// Every declared key is covered: present non-empty values are set, every
/// other declared key is removed, so applying the delta yields exactly the
/// state's parameters.
#[must_use]
pub fn state_delta(descriptor: &AdapterDescriptor, state: &FilterState) -> StateDelta {
    let mut delta = StateDelta::new();
    for key in &descriptor.filter_keys {
        match state.filter(key) {
            Some(value) => delta.set(key.clone(), value.to_param()),
            None => delta.remove(key.clone()),
        };
    }
    for key in &descriptor.highlight_keys {
        let param = AdapterDescriptor::highlight_param(key);
        match state.highlight(key) {
            Some(value) => delta.set(param, value.to_param()),
            None => delta.remove(param),
        };
    }
    delta
}
