//! # Resource Pages
//!
//! Result payloads produced by `DomainAdapter::fetch` and the resolved state
//! the orchestrator publishes to presentation and to secondary contexts.

use crate::errors::TransportError;
use crate::filters::FilterMap;
use crate::fingerprint::Fingerprint;
use crate::snapshot::StateSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 1-indexed page number key.
pub const PAGE_KEY: &str = "page";
/// Page size key.
pub const SIZE_KEY: &str = "size";
/// Sort column key.
pub const SORT_BY_KEY: &str = "sortBy";
/// Sort direction key (`asc` / `desc`).
pub const SORT_ORDER_KEY: &str = "sortOrder";

/// Sort direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            other => Err(format!("unknown sort order: {other}")),
        }
    }
}

/// Count pair for one statistics bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatBucket {
    pub total: u64,
    pub highlighted: u64,
}

impl StatBucket {
    /// Bucket with no highlight overlay: `highlighted == total`.
    #[must_use]
    pub fn unhighlighted(total: u64) -> Self {
        Self {
            total,
            highlighted: total,
        }
    }
}

/// Statistics keyed by dimension, then by category.
///
/// `{"manufacturer": {"Ford": {"total": 12, "highlighted": 12}}}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Statistics {
    dimensions: BTreeMap<String, BTreeMap<String, StatBucket>>,
}

impl Statistics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace one bucket.
    pub fn insert(&mut self, dimension: &str, category: &str, bucket: StatBucket) {
        self.dimensions
            .entry(dimension.to_string())
            .or_default()
            .insert(category.to_string(), bucket);
    }

    #[must_use]
    pub fn bucket(&self, dimension: &str, category: &str) -> Option<StatBucket> {
        self.dimensions.get(dimension)?.get(category).copied()
    }

    #[must_use]
    pub fn dimension(&self, dimension: &str) -> Option<&BTreeMap<String, StatBucket>> {
        self.dimensions.get(dimension)
    }

    pub fn dimensions(&self) -> impl Iterator<Item = (&str, &BTreeMap<String, StatBucket>)> {
        self.dimensions.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }
}

/// Backend response shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireResponse<T> {
    pub results: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub total_pages: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statistics: Option<Statistics>,
}

impl<T: Serialize> WireResponse<T> {
    /// Convert into a [`ResourcePage`], serializing rows to JSON values.
    pub fn into_page(self) -> Result<ResourcePage, serde_json::Error> {
        let rows = self
            .results
            .into_iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResourcePage {
            rows,
            total: self.total,
            page: self.page,
            size: self.size,
            total_pages: self.total_pages,
            statistics: self.statistics.unwrap_or_default(),
        })
    }
}

/// One page of results plus statistics, as published by `result$`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcePage {
    pub rows: Vec<serde_json::Value>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
    pub total_pages: u32,
    #[serde(default)]
    pub statistics: Statistics,
}

/// Orchestrator lifecycle: `Idle → Loading → Ready | Error`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Ready,
    Error,
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// Everything a presentation layer needs to render one domain view.
///
/// Published by the orchestrator on every transition and copied by value
/// into state-broadcast messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedState {
    pub snapshot: StateSnapshot,
    pub fingerprint: Option<Fingerprint>,
    pub phase: LoadPhase,
    /// Latest successful payload. Retained across errors.
    pub result: Option<Arc<ResourcePage>>,
    pub error: Option<TransportError>,
    pub highlights: FilterMap,
}

impl ResolvedState {
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.phase == LoadPhase::Loading
    }
}
