//! # State Snapshots
//!
//! The canonical key/value representation of application state as it
//! appears in the address bar.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Prefix that moves a parameter into the highlight namespace.
///
/// `manufacturer` narrows the result set; `h_manufacturer` only segments it.
pub const HIGHLIGHT_PREFIX: &str = "h_";

/// Immutable, ordered parameter set derived from the address.
///
/// A snapshot is never edited in place: [`StateSnapshot::apply`] returns a
/// new one and the store replaces the old snapshot wholesale.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateSnapshot {
    params: BTreeMap<String, String>,
}

impl StateSnapshot {
    /// Create an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from key/value pairs. Later duplicates win and
    /// empty values are dropped.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = BTreeMap::new();
        for (key, value) in pairs {
            let key = key.into();
            let value = value.into();
            if key.is_empty() || value.is_empty() {
                params.remove(&key);
                continue;
            }
            params.insert(key, value);
        }
        Self { params }
    }

    /// Raw value for a key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Raw value for a highlight key, given without its prefix.
    #[must_use]
    pub fn highlight(&self, key: &str) -> Option<&str> {
        self.get(&format!("{HIGHLIGHT_PREFIX}{key}"))
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate over all parameters in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Parameters in the filter namespace.
    pub fn filter_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(k, _)| !k.starts_with(HIGHLIGHT_PREFIX))
    }

    /// Parameters in the highlight namespace, with the prefix stripped.
    pub fn highlight_params(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter()
            .filter_map(|(k, v)| k.strip_prefix(HIGHLIGHT_PREFIX).map(|name| (name, v)))
    }

    /// Return a new snapshot with `delta` merged in.
    ///
    /// `None` and empty-string values remove the key.
    #[must_use]
    pub fn apply(&self, delta: &StateDelta) -> Self {
        let mut params = self.params.clone();
        for (key, value) in delta.iter() {
            match value {
                Some(v) if !v.is_empty() => {
                    params.insert(key.to_string(), v.to_string());
                }
                _ => {
                    params.remove(key);
                }
            }
        }
        Self { params }
    }

    /// Delta that turns `self` into `other`.
    #[must_use]
    pub fn diff(&self, other: &StateSnapshot) -> StateDelta {
        let mut delta = StateDelta::new();
        for (key, value) in other.iter() {
            if self.get(key) != Some(value) {
                delta.set(key, value);
            }
        }
        for key in self.params.keys() {
            if !other.contains_key(key) {
                delta.remove(key.as_str());
            }
        }
        delta
    }

    /// Borrow the underlying map.
    #[must_use]
    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for StateSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

/// Partial update to a snapshot. `None` removes the key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDelta {
    changes: BTreeMap<String, Option<String>>,
}

impl StateDelta {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a key to a value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.changes.insert(key.into(), Some(value.into()));
        self
    }

    /// Remove a key.
    pub fn remove(&mut self, key: impl Into<String>) -> &mut Self {
        self.changes.insert(key.into(), None);
        self
    }

    /// Builder-style [`StateDelta::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder-style [`StateDelta::remove`].
    #[must_use]
    pub fn without(mut self, key: impl Into<String>) -> Self {
        self.remove(key);
        self
    }

    /// Merge another delta into this one; entries from `other` win.
    pub fn merge(&mut self, other: StateDelta) {
        self.changes.extend(other.changes);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.changes.get(key).map(Option::as_deref)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.changes
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_deref()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Option<String>)> for StateDelta {
    fn from_iter<I: IntoIterator<Item = (K, Option<String>)>>(iter: I) -> Self {
        Self {
            changes: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}
