//! Vehicle rows and backend queries.

use serde::{Deserialize, Serialize};
use shared_types::{FilterState, FilterValue, SortOrder};

/// Parameter keys of the vehicle domain.
pub mod keys {
    pub const MANUFACTURER: &str = "manufacturer";
    pub const MODEL: &str = "model";
    pub const BODY_CLASS: &str = "bodyClass";
    pub const YEAR_MIN: &str = "yearMin";
    pub const YEAR_MAX: &str = "yearMax";
}

/// Page size used when the address does not carry one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Largest page size the backend serves.
pub const MAX_PAGE_SIZE: u32 = 100;

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: u32,
    pub manufacturer: String,
    pub model: String,
    pub year: i64,
    pub body_class: String,
}

/// Backend query derived from typed filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleQuery {
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    /// Multi-select; empty means any body class.
    pub body_classes: Vec<String>,
    pub year_min: Option<i64>,
    pub year_max: Option<i64>,
    /// 1-indexed.
    pub page: u32,
    pub size: u32,
    pub sort_by: Option<String>,
    pub sort_order: SortOrder,
    pub highlight_manufacturer: Option<String>,
    pub highlight_body_class: Option<String>,
}

impl Default for VehicleQuery {
    fn default() -> Self {
        Self {
            manufacturer: None,
            model: None,
            body_classes: Vec::new(),
            year_min: None,
            year_max: None,
            page: 1,
            size: DEFAULT_PAGE_SIZE,
            sort_by: None,
            sort_order: SortOrder::Asc,
            highlight_manufacturer: None,
            highlight_body_class: None,
        }
    }
}

impl VehicleQuery {
    /// Build from typed filters. Missing values take defaults; out-of-range
    /// page numbers and sizes are clamped.
    #[must_use]
    pub fn from_state(state: &FilterState) -> Self {
        let text = |value: Option<&FilterValue>| {
            value
                .and_then(FilterValue::as_text)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        let integer = |key: &str| state.filter(key).and_then(FilterValue::as_integer);

        let body_classes = match state.filter(keys::BODY_CLASS).map(FilterValue::normalized) {
            Some(FilterValue::List(items)) => items,
            Some(FilterValue::Text(s)) if !s.is_empty() => vec![s],
            _ => Vec::new(),
        };

        let page = integer(shared_types::PAGE_KEY)
            .map_or(1, |p| u32::try_from(p.max(1)).unwrap_or(u32::MAX));
        let size = integer(shared_types::SIZE_KEY).map_or(DEFAULT_PAGE_SIZE, |s| {
            u32::try_from(s.clamp(1, i64::from(MAX_PAGE_SIZE))).unwrap_or(DEFAULT_PAGE_SIZE)
        });
        let sort_order = text(state.filter(shared_types::SORT_ORDER_KEY))
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();

        Self {
            manufacturer: text(state.filter(keys::MANUFACTURER)),
            model: text(state.filter(keys::MODEL)),
            body_classes,
            year_min: integer(keys::YEAR_MIN),
            year_max: integer(keys::YEAR_MAX),
            page,
            size,
            sort_by: text(state.filter(shared_types::SORT_BY_KEY)),
            sort_order,
            highlight_manufacturer: text(state.highlight(keys::MANUFACTURER)),
            highlight_body_class: text(state.highlight(keys::BODY_CLASS)),
        }
    }

    /// Whether `vehicle` passes every filter.
    #[must_use]
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        self.matches_facet(vehicle, None)
    }

    /// Like [`matches`](Self::matches), but ignoring the filter on
    /// `facet`. Facet statistics count every category of a dimension the
    /// other filters allow, not only the selected one.
    #[must_use]
    pub fn matches_facet(&self, vehicle: &Vehicle, facet: Option<&str>) -> bool {
        let ignored = |key: &str| facet == Some(key);
        (ignored(keys::MANUFACTURER)
            || self
                .manufacturer
                .as_deref()
                .map_or(true, |m| vehicle.manufacturer.eq_ignore_ascii_case(m)))
            && self
                .model
                .as_deref()
                .map_or(true, |m| vehicle.model.eq_ignore_ascii_case(m))
            && (ignored(keys::BODY_CLASS)
                || self.body_classes.is_empty()
                || self
                    .body_classes
                    .iter()
                    .any(|b| vehicle.body_class.eq_ignore_ascii_case(b)))
            && self.year_min.map_or(true, |y| vehicle.year >= y)
            && self.year_max.map_or(true, |y| vehicle.year <= y)
    }

    #[must_use]
    pub fn has_highlights(&self) -> bool {
        self.highlight_manufacturer.is_some() || self.highlight_body_class.is_some()
    }

    /// Whether `vehicle` falls inside the highlight overlay.
    ///
    /// With no overlay every row counts as highlighted.
    #[must_use]
    pub fn is_highlighted(&self, vehicle: &Vehicle) -> bool {
        self.highlight_manufacturer
            .as_deref()
            .map_or(true, |m| vehicle.manufacturer.eq_ignore_ascii_case(m))
            && self
                .highlight_body_class
                .as_deref()
                .map_or(true, |b| vehicle.body_class.eq_ignore_ascii_case(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(manufacturer: &str, body_class: &str, year: i64) -> Vehicle {
        Vehicle {
            id: 1,
            manufacturer: manufacturer.to_string(),
            model: "Any".to_string(),
            year,
            body_class: body_class.to_string(),
        }
    }

    #[test]
    fn test_defaults_for_empty_state() {
        let query = VehicleQuery::from_state(&FilterState::new());
        assert_eq!(query, VehicleQuery::default());
        assert!(query.matches(&vehicle("Ford", "SUV", 2020)));
    }

    #[test]
    fn test_page_and_size_are_clamped() {
        let state = FilterState::new()
            .with_filter("page", 0i64)
            .with_filter("size", 10_000i64);
        let query = VehicleQuery::from_state(&state);
        assert_eq!(query.page, 1);
        assert_eq!(query.size, MAX_PAGE_SIZE);
    }

    #[test]
    fn test_body_class_multi_select() {
        let state = FilterState::new().with_filter("bodyClass", FilterValue::list(["SUV", "Sedan"]));
        let query = VehicleQuery::from_state(&state);
        assert!(query.matches(&vehicle("Ford", "suv", 2020)));
        assert!(query.matches(&vehicle("Ford", "Sedan", 2020)));
        assert!(!query.matches(&vehicle("Ford", "Pickup", 2020)));
    }

    #[test]
    fn test_facet_ignores_own_filter_only() {
        let state = FilterState::new()
            .with_filter("manufacturer", "Toyota")
            .with_filter("yearMin", 2020i64);
        let query = VehicleQuery::from_state(&state);
        let ford = vehicle("Ford", "SUV", 2021);

        assert!(!query.matches(&ford));
        assert!(query.matches_facet(&ford, Some("manufacturer")));
        assert!(!query.matches_facet(&vehicle("Ford", "SUV", 2019), Some("manufacturer")));
    }

    #[test]
    fn test_year_range() {
        let state = FilterState::new()
            .with_filter("yearMin", 2018i64)
            .with_filter("yearMax", 2020i64);
        let query = VehicleQuery::from_state(&state);
        assert!(!query.matches(&vehicle("Ford", "SUV", 2017)));
        assert!(query.matches(&vehicle("Ford", "SUV", 2018)));
        assert!(!query.matches(&vehicle("Ford", "SUV", 2021)));
    }

    #[test]
    fn test_highlight_overlay() {
        let state = FilterState::new().with_highlight("manufacturer", "Ford");
        let query = VehicleQuery::from_state(&state);
        assert!(query.has_highlights());
        assert!(query.is_highlighted(&vehicle("Ford", "SUV", 2020)));
        assert!(!query.is_highlighted(&vehicle("Honda", "SUV", 2020)));
    }
}
