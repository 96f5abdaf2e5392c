//! # Typed Filters
//!
//! The domain-facing representation of a snapshot. DomainAdapters parse raw
//! snapshot strings into [`FilterValue`]s; the fingerprint builder and the
//! fetch pipeline only ever see this typed form.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single typed filter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Flag(bool),
    Integer(i64),
    Text(String),
    /// Multi-select value. Order carries no meaning.
    List(Vec<String>),
}

impl FilterValue {
    /// Text value, trimmed.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into().trim().to_string())
    }

    /// List value from any iterator of strings.
    pub fn list<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::List(values.into_iter().map(Into::into).collect())
    }

    /// Whether this value should be treated as absent.
    ///
    /// Absent and explicitly-empty fields must fingerprint identically.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.trim().is_empty(),
            Self::List(items) => items.iter().all(|s| s.trim().is_empty()),
            Self::Flag(_) | Self::Integer(_) => false,
        }
    }

    /// Normalized copy: lists sorted, de-duplicated and stripped of blanks.
    #[must_use]
    pub fn normalized(&self) -> Self {
        match self {
            Self::Text(s) => Self::Text(s.trim().to_string()),
            Self::List(items) => {
                let mut items: Vec<String> = items
                    .iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect();
                items.sort();
                items.dedup();
                Self::List(items)
            }
            other => other.clone(),
        }
    }

    /// Value as it is written back to the address.
    ///
    /// Lists are joined with commas after normalization.
    #[must_use]
    pub fn to_param(&self) -> String {
        match self.normalized() {
            Self::Text(s) => s,
            Self::Integer(n) => n.to_string(),
            Self::Flag(b) => b.to_string(),
            Self::List(items) => items.join(","),
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        Self::text(value)
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        Self::text(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        Self::Flag(value)
    }
}

/// Key-ordered map of typed filter values.
pub type FilterMap = BTreeMap<String, FilterValue>;

/// Typed filters plus highlight overlay for one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    /// Narrow the result set.
    pub filters: FilterMap,
    /// Segment the result set without removing rows.
    pub highlights: FilterMap,
}

impl FilterState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_filter(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.filters.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn with_highlight(mut self, key: impl Into<String>, value: impl Into<FilterValue>) -> Self {
        self.highlights.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn filter(&self, key: &str) -> Option<&FilterValue> {
        self.filters.get(key).filter(|v| !v.is_empty())
    }

    #[must_use]
    pub fn highlight(&self, key: &str) -> Option<&FilterValue> {
        self.highlights.get(key).filter(|v| !v.is_empty())
    }

    /// Whether any highlight value is present.
    #[must_use]
    pub fn has_highlights(&self) -> bool {
        self.highlights.values().any(|v| !v.is_empty())
    }
}
