//! Canonical fingerprint serialization.
//!
//! Layout: `[<domain>?]f:<k>=<v>&<k>=<v>|h:<k>=<v>`
//!
//! - keys sorted lexicographically within each namespace
//! - empty values omitted (absent == explicitly empty)
//! - list values trimmed, sorted and de-duplicated, then joined with `,`
//! - reserved characters escaped in keys and values

use super::escape::escape_into;
use shared_types::{FilterMap, FilterState, FilterValue, Fingerprint};

const FILTER_MARKER: &str = "f:";
const HIGHLIGHT_MARKER: &str = "|h:";
const DOMAIN_MARKER: char = '?';

/// Builds fingerprints, optionally scoped to one domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintBuilder {
    domain: Option<String>,
}

impl FingerprintBuilder {
    /// Builder without a domain prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder whose keys cannot collide with other domains' keys.
    #[must_use]
    pub fn for_domain(name: impl Into<String>) -> Self {
        Self {
            domain: Some(name.into()),
        }
    }

    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    /// Canonical key for a filter map and a highlight map.
    #[must_use]
    pub fn build(&self, filters: &FilterMap, highlights: &FilterMap) -> Fingerprint {
        let mut out = String::new();
        if let Some(domain) = &self.domain {
            escape_into(domain, &mut out);
            out.push(DOMAIN_MARKER);
        }
        out.push_str(FILTER_MARKER);
        write_segment(filters, &mut out);
        out.push_str(HIGHLIGHT_MARKER);
        write_segment(highlights, &mut out);
        Fingerprint::new(out)
    }

    #[must_use]
    pub fn build_state(&self, state: &FilterState) -> Fingerprint {
        self.build(&state.filters, &state.highlights)
    }
}

/// Fingerprint without a domain prefix.
#[must_use]
pub fn build(filters: &FilterMap, highlights: &FilterMap) -> Fingerprint {
    FingerprintBuilder::new().build(filters, highlights)
}

fn write_segment(values: &FilterMap, out: &mut String) {
    let mut first = true;
    // FilterMap is a BTreeMap: iteration is already key-sorted.
    for (key, value) in values {
        if key.is_empty() || value.is_empty() {
            continue;
        }
        if !first {
            out.push('&');
        }
        first = false;
        escape_into(key, out);
        out.push('=');
        write_value(value, out);
    }
}

fn write_value(value: &FilterValue, out: &mut String) {
    match value.normalized() {
        FilterValue::List(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                escape_into(item, out);
            }
        }
        FilterValue::Text(text) => escape_into(&text, out),
        FilterValue::Integer(n) => out.push_str(&n.to_string()),
        FilterValue::Flag(b) => out.push_str(if b { "true" } else { "false" }),
    }
}
