//! In-memory vehicle catalog.
//!
//! Serves the same wire shape a real backend would: one page of rows,
//! totals, and `{total, highlighted}` facet statistics per manufacturer and
//! body class. A dimension's statistics ignore that dimension's own filter,
//! so every selectable category keeps its count.

use crate::vehicles::backend::VehicleBackend;
use crate::vehicles::model::{keys, Vehicle, VehicleQuery};
use async_trait::async_trait;
use shared_types::{SortOrder, StatBucket, Statistics, TransportError, WireResponse};
use std::cmp::Ordering as CmpOrdering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tracing::debug;

/// Manufacturer, row count, then (model, body class) pairs cycled over rows.
const SAMPLE_LINEUP: &[(&str, u32, &[(&str, &str)])] = &[
    (
        "Toyota",
        234,
        &[
            ("Camry", "Sedan"),
            ("RAV4", "SUV"),
            ("Tacoma", "Pickup"),
            ("Prius", "Hatchback"),
        ],
    ),
    (
        "Ford",
        120,
        &[("F-150", "Pickup"), ("Explorer", "SUV"), ("Focus", "Sedan")],
    ),
    ("Honda", 80, &[("Civic", "Sedan"), ("CR-V", "SUV")]),
    ("Tesla", 36, &[("Model 3", "Sedan"), ("Model Y", "SUV")]),
];

const FIRST_MODEL_YEAR: i64 = 2015;
const MODEL_YEARS: u32 = 10;

pub struct InMemoryCatalog {
    vehicles: Vec<Vehicle>,
    latency: Duration,
    failing: AtomicBool,
    searches: AtomicU64,
}

impl InMemoryCatalog {
    #[must_use]
    pub fn new(vehicles: Vec<Vehicle>) -> Self {
        Self {
            vehicles,
            latency: Duration::ZERO,
            failing: AtomicBool::new(false),
            searches: AtomicU64::new(0),
        }
    }

    /// Deterministic demo catalog: 234 Toyota, 120 Ford, 80 Honda and 36
    /// Tesla rows spread over model years 2015 to 2024.
    #[must_use]
    pub fn sample() -> Self {
        let mut vehicles = Vec::new();
        let mut id = 0u32;
        for (manufacturer, count, lineup) in SAMPLE_LINEUP {
            for n in 0..*count {
                let (model, body_class) = lineup[n as usize % lineup.len()];
                id += 1;
                vehicles.push(Vehicle {
                    id,
                    manufacturer: (*manufacturer).to_string(),
                    model: model.to_string(),
                    year: FIRST_MODEL_YEAR + i64::from(n % MODEL_YEARS),
                    body_class: body_class.to_string(),
                });
            }
        }
        Self::new(vehicles)
    }

    /// Simulated round-trip time per search.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every following search fail with a 503 until switched back.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::Relaxed);
    }

    /// Searches served, failed ones included.
    #[must_use]
    pub fn search_count(&self) -> u64 {
        self.searches.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Run `query` synchronously.
    #[must_use]
    pub fn query(&self, query: &VehicleQuery) -> WireResponse<Vehicle> {
        let mut matched: Vec<&Vehicle> = self.vehicles.iter().filter(|v| query.matches(v)).collect();
        sort_rows(&mut matched, query);

        let statistics = statistics(&self.vehicles, query);
        let total = matched.len() as u64;
        let size = query.size.max(1);
        let total_pages = u32::try_from(total.div_ceil(u64::from(size))).unwrap_or(u32::MAX);

        let start = (query.page.saturating_sub(1) as usize).saturating_mul(size as usize);
        let results = matched
            .into_iter()
            .skip(start)
            .take(size as usize)
            .cloned()
            .collect();

        WireResponse {
            results,
            total,
            page: query.page,
            size,
            total_pages,
            statistics: Some(statistics),
        }
    }
}

#[async_trait]
impl VehicleBackend for InMemoryCatalog {
    async fn search(&self, query: &VehicleQuery) -> Result<WireResponse<Vehicle>, TransportError> {
        self.searches.fetch_add(1, Ordering::Relaxed);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing.load(Ordering::Relaxed) {
            return Err(TransportError::status(503, "catalog unavailable"));
        }
        let response = self.query(query);
        debug!(total = response.total, page = response.page, "Catalog search served");
        Ok(response)
    }
}

fn sort_rows(rows: &mut [&Vehicle], query: &VehicleQuery) {
    let Some(column) = query.sort_by.as_deref() else {
        return;
    };
    let compare: fn(&Vehicle, &Vehicle) -> CmpOrdering = match column {
        keys::MANUFACTURER => |a, b| a.manufacturer.cmp(&b.manufacturer),
        keys::MODEL => |a, b| a.model.cmp(&b.model),
        keys::BODY_CLASS => |a, b| a.body_class.cmp(&b.body_class),
        "year" => |a, b| a.year.cmp(&b.year),
        _ => return,
    };
    // Stable sort with id as the tiebreaker keeps pages deterministic.
    rows.sort_by(|a, b| {
        let ordering = compare(a, b).then(a.id.cmp(&b.id));
        match query.sort_order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

fn statistics(vehicles: &[Vehicle], query: &VehicleQuery) -> Statistics {
    let mut statistics = Statistics::new();
    // No overlay: every bucket reports highlighted == total.
    let overlay = query.has_highlights();
    for dimension in [keys::MANUFACTURER, keys::BODY_CLASS] {
        let mut buckets: BTreeMap<&str, StatBucket> = BTreeMap::new();
        for vehicle in vehicles
            .iter()
            .filter(|v| query.matches_facet(v, Some(dimension)))
        {
            let bucket = buckets.entry(category(vehicle, dimension)).or_default();
            bucket.total += 1;
            bucket.highlighted += u64::from(!overlay || query.is_highlighted(vehicle));
        }
        for (name, bucket) in buckets {
            statistics.insert(dimension, name, bucket);
        }
    }
    statistics
}

fn category<'a>(vehicle: &'a Vehicle, dimension: &str) -> &'a str {
    match dimension {
        keys::BODY_CLASS => &vehicle.body_class,
        _ => &vehicle.manufacturer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query() -> VehicleQuery {
        VehicleQuery::default()
    }

    #[test]
    fn test_sample_counts() {
        let catalog = InMemoryCatalog::sample();
        assert_eq!(catalog.len(), 470);

        let response = catalog.query(&VehicleQuery {
            manufacturer: Some("Toyota".to_string()),
            ..query()
        });
        assert_eq!(response.total, 234);
        assert_eq!(response.total_pages, 12);
        assert_eq!(response.results.len(), 20);
    }

    #[test]
    fn test_last_page_is_partial() {
        let catalog = InMemoryCatalog::sample();
        let response = catalog.query(&VehicleQuery {
            manufacturer: Some("Toyota".to_string()),
            page: 12,
            ..query()
        });
        assert_eq!(response.results.len(), 14);

        let beyond = catalog.query(&VehicleQuery {
            manufacturer: Some("Toyota".to_string()),
            page: 13,
            ..query()
        });
        assert!(beyond.results.is_empty());
        assert_eq!(beyond.total, 234);
    }

    #[test]
    fn test_statistics_without_highlight() {
        let catalog = InMemoryCatalog::sample();
        let response = catalog.query(&query());
        let stats = response.statistics.unwrap();

        assert_eq!(stats.bucket("manufacturer", "Ford"), Some(StatBucket::unhighlighted(120)));
        assert_eq!(stats.bucket("manufacturer", "Toyota"), Some(StatBucket::unhighlighted(234)));
    }

    #[test]
    fn test_statistics_with_highlight() {
        let catalog = InMemoryCatalog::sample();
        let response = catalog.query(&VehicleQuery {
            highlight_manufacturer: Some("Ford".to_string()),
            ..query()
        });
        let stats = response.statistics.unwrap();

        assert_eq!(
            stats.bucket("manufacturer", "Ford"),
            Some(StatBucket { total: 120, highlighted: 120 })
        );
        assert_eq!(
            stats.bucket("manufacturer", "Honda"),
            Some(StatBucket { total: 80, highlighted: 0 })
        );
        // Ford has 40 SUVs: Explorer is every third row.
        assert_eq!(
            stats.bucket("bodyClass", "SUV"),
            Some(StatBucket { total: 59 + 40 + 40 + 18, highlighted: 40 })
        );
        // Highlights never change the filtered total.
        assert_eq!(response.total, 470);
    }

    #[test]
    fn test_manufacturer_facet_under_filter() {
        let catalog = InMemoryCatalog::sample();
        let response = catalog.query(&VehicleQuery {
            manufacturer: Some("Toyota".to_string()),
            highlight_manufacturer: Some("Ford".to_string()),
            ..query()
        });
        let stats = response.statistics.unwrap();

        assert_eq!(response.total, 234);
        assert_eq!(
            stats.bucket("manufacturer", "Ford"),
            Some(StatBucket { total: 120, highlighted: 120 })
        );
        assert_eq!(
            stats.bucket("manufacturer", "Toyota"),
            Some(StatBucket { total: 234, highlighted: 0 })
        );
        // Body classes are counted within the Toyota filter.
        assert_eq!(stats.bucket("bodyClass", "Pickup").map(|b| b.total), Some(58));
    }

    #[test]
    fn test_sort_descending_by_year() {
        let catalog = InMemoryCatalog::sample();
        let response = catalog.query(&VehicleQuery {
            manufacturer: Some("Honda".to_string()),
            sort_by: Some("year".to_string()),
            sort_order: SortOrder::Desc,
            ..query()
        });
        assert_eq!(response.results[0].year, 2024);
        assert!(response.results.windows(2).all(|w| w[0].year >= w[1].year));
    }

    #[tokio::test]
    async fn test_failing_backend_reports_status() {
        let catalog = InMemoryCatalog::sample();
        catalog.set_failing(true);

        let err = catalog.search(&query()).await.unwrap_err();
        assert_eq!(err.status, Some(503));
        assert_eq!(catalog.search_count(), 1);
    }
}
