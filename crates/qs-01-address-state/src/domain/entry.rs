//! Entry address parsing.
//!
//! A browsing context's role is fixed at creation from the address it was
//! opened with. A `/<segment>/<panel>` path (segment `popout` by default)
//! marks a secondary context mirroring `<panel>`; anything else is primary.

use shared_types::{ContextRole, PanelId};

/// Default path segment that marks a pop-out entry address.
pub const DEFAULT_POPOUT_SEGMENT: &str = "popout";

/// Parsed entry address of a browsing context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub role: ContextRole,
    /// Panel mirrored by a secondary context. Always `None` for a primary.
    pub panel: Option<PanelId>,
    /// Path component, without query or fragment.
    pub path: String,
    /// Query string, without the leading `?`.
    pub query: String,
}

impl EntryPoint {
    /// Parse with the default pop-out segment.
    #[must_use]
    pub fn parse(address: &str) -> Self {
        Self::parse_with_segment(address, DEFAULT_POPOUT_SEGMENT)
    }

    /// Parse an absolute URL or a path-and-query.
    #[must_use]
    pub fn parse_with_segment(address: &str, popout_segment: &str) -> Self {
        let without_fragment = address.split_once('#').map_or(address, |(head, _)| head);
        let (location, query) = without_fragment
            .split_once('?')
            .unwrap_or((without_fragment, ""));
        let path = strip_origin(location);

        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let panel = loop {
            match segments.next() {
                Some(segment) if segment == popout_segment => {
                    break segments.next().map(PanelId::new);
                }
                Some(_) => continue,
                None => break None,
            }
        };

        let role = if panel.is_some() {
            ContextRole::Secondary
        } else {
            ContextRole::Primary
        };

        Self {
            role,
            panel,
            path: path.to_string(),
            query: query.to_string(),
        }
    }

    #[must_use]
    pub fn is_secondary(&self) -> bool {
        self.role == ContextRole::Secondary
    }
}

/// `https://host:port/a/b` -> `/a/b`; paths pass through.
fn strip_origin(location: &str) -> &str {
    match location.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("/", |idx| &rest[idx..]),
        None => location,
    }
}
