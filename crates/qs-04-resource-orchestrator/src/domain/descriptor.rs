//! Adapter descriptors and their registration-time validation.

use shared_types::{ConfigurationError, HIGHLIGHT_PREFIX};
use std::collections::HashSet;
use std::time::Duration;

/// Static description of a domain adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterDescriptor {
    /// Registry key and fingerprint prefix.
    pub name: String,
    /// Plain parameter names this domain reads from the snapshot.
    pub filter_keys: Vec<String>,
    /// Highlightable keys, without the `h_` prefix.
    pub highlight_keys: Vec<String>,
    /// Cache TTL override for this domain.
    pub ttl: Option<Duration>,
}

impl AdapterDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filter_keys: Vec::new(),
            highlight_keys: Vec::new(),
            ttl: None,
        }
    }

    #[must_use]
    pub fn with_filter_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_highlight_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.highlight_keys.extend(keys.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    #[must_use]
    pub fn declares_filter(&self, key: &str) -> bool {
        self.filter_keys.iter().any(|k| k == key)
    }

    #[must_use]
    pub fn declares_highlight(&self, key: &str) -> bool {
        self.highlight_keys.iter().any(|k| k == key)
    }

    /// Address parameter name for a highlight key.
    #[must_use]
    pub fn highlight_param(key: &str) -> String {
        format!("{HIGHLIGHT_PREFIX}{key}")
    }

    /// Check the descriptor can be registered.
    ///
    /// # Errors
    ///
    /// - `EmptyName` for a blank name
    /// - `NoFilterKeys` when nothing is declared
    /// - `DuplicateKey` when a key is declared twice in one namespace
    /// - `KeyInHighlightNamespace` when a filter key carries the highlight
    ///   prefix (the namespaces would no longer be disjoint)
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyName);
        }
        if self.filter_keys.is_empty() {
            return Err(ConfigurationError::NoFilterKeys {
                domain: self.name.clone(),
            });
        }

        for keys in [&self.filter_keys, &self.highlight_keys] {
            let mut seen = HashSet::new();
            for key in keys {
                if key.is_empty() || !seen.insert(key.as_str()) {
                    return Err(ConfigurationError::DuplicateKey {
                        domain: self.name.clone(),
                        key: key.clone(),
                    });
                }
            }
        }

        if let Some(key) = self
            .filter_keys
            .iter()
            .chain(&self.highlight_keys)
            .find(|key| key.starts_with(HIGHLIGHT_PREFIX))
        {
            return Err(ConfigurationError::KeyInHighlightNamespace {
                domain: self.name.clone(),
                key: key.clone(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicles() -> AdapterDescriptor {
        AdapterDescriptor::new("vehicles")
            .with_filter_keys(["manufacturer", "model", "page"])
            .with_highlight_keys(["manufacturer"])
    }

    #[test]
    fn test_valid_descriptor() {
        assert_eq!(vehicles().validate(), Ok(()));
        assert!(vehicles().declares_filter("model"));
        assert!(vehicles().declares_highlight("manufacturer"));
        assert_eq!(AdapterDescriptor::highlight_param("manufacturer"), "h_manufacturer");
    }

    #[test]
    fn test_empty_name_rejected() {
        let descriptor = AdapterDescriptor::new("  ").with_filter_keys(["page"]);
        assert_eq!(descriptor.validate(), Err(ConfigurationError::EmptyName));
    }

    #[test]
    fn test_no_filter_keys_rejected() {
        assert!(matches!(
            AdapterDescriptor::new("empty").validate(),
            Err(ConfigurationError::NoFilterKeys { .. })
        ));
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let descriptor = vehicles().with_filter_keys(["model"]);
        assert!(matches!(
            descriptor.validate(),
            Err(ConfigurationError::DuplicateKey { key, .. }) if key == "model"
        ));
    }

    #[test]
    fn test_prefixed_key_rejected() {
        let descriptor = vehicles().with_filter_keys(["h_color"]);
        assert!(matches!(
            descriptor.validate(),
            Err(ConfigurationError::KeyInHighlightNamespace { key, .. }) if key == "h_color"
        ));
    }
}
