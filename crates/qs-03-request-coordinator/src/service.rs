//! # Request Coordinator Service
//!
//! At most one in-flight fetch per fingerprint, an LRU-bounded TTL cache,
//! and fan-out of one result to every concurrent caller.
//!
//! ## Resolve Flow
//!
//! ```text
//! resolve(fp, fetch)
//!   ├─ live cache entry ──────────────► CacheHit (no fetch)
//!   ├─ in-flight request ─────────────► Joined   (add subscriber)
//!   └─ otherwise ── spawn fetch(token) ► Fetched
//!                        │
//!                        ▼
//!            settle(fp, request_id, result)
//!              ├─ request_id no longer current ──► discard (stale)
//!              ├─ Ok  ──► cache (ttl > 0), resolve all subscribers
//!              └─ Err ──► reject all subscribers, cache untouched
//! ```
//!
//! The cache and in-flight maps live behind one mutex owned by the
//! coordinator; nothing outside this module touches them.

use crate::domain::{CacheEntry, CoordinatorConfig, CoordinatorStats, StatsSnapshot};
use crate::error::CoordinatorError;
use crate::resolution::{Outcome, Resolution, ResolutionSource};
use futures::FutureExt;
use lru::LruCache;
use parking_lot::Mutex;
use shared_types::{Fingerprint, SystemTimeSource, TimeSource, TransportError};
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

type Subscriber<T> = oneshot::Sender<Outcome<T>>;

/// A fetch that has started and not yet settled.
struct InFlightRequest<T> {
    /// Distinguishes a re-issued fingerprint from a superseded one.
    request_id: u64,
    subscribers: Vec<Subscriber<T>>,
    cancel: CancellationToken,
    ttl: Duration,
}

struct CoordinatorState<T> {
    cache: LruCache<Fingerprint, CacheEntry<T>>,
    in_flight: HashMap<Fingerprint, InFlightRequest<T>>,
}

struct Inner<T> {
    config: CoordinatorConfig,
    clock: Arc<dyn TimeSource>,
    state: Mutex<CoordinatorState<T>>,
    stats: CoordinatorStats,
    next_request_id: AtomicU64,
}

/// Single-flight, cached executor of asynchronous fetches keyed by
/// fingerprint. Cheap to clone; clones share state.
pub struct RequestCoordinator<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for RequestCoordinator<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Send + Sync + 'static> RequestCoordinator<T> {
    /// Create a coordinator on the wall clock.
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::with_time_source(config, Arc::new(SystemTimeSource::new()))
    }

    /// Create a coordinator reading time from `clock`.
    pub fn with_time_source(config: CoordinatorConfig, clock: Arc<dyn TimeSource>) -> Self {
        let capacity = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Inner {
                config,
                clock,
                state: Mutex::new(CoordinatorState {
                    cache: LruCache::new(capacity),
                    in_flight: HashMap::new(),
                }),
                stats: CoordinatorStats::default(),
                next_request_id: AtomicU64::new(1),
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CoordinatorConfig {
        &self.inner.config
    }

    /// Resolve with the configured default TTL.
    ///
    /// Must be called within a Tokio runtime: a new fetch runs on a spawned
    /// task so that it settles even if every caller stops waiting.
    pub fn resolve<F, Fut>(&self, fingerprint: &Fingerprint, fetch: F) -> Resolution<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
    {
        self.resolve_with_ttl(fingerprint, self.inner.config.default_ttl, fetch)
    }

    /// Resolve with a per-call TTL. A zero TTL skips caching; concurrent
    /// callers still share one fetch.
    ///
    /// `fetch` is invoked at most once, and only when there is neither a
    /// live cache entry nor an in-flight request for `fingerprint`. The
    /// token it receives is cancelled if the fingerprint is superseded.
    pub fn resolve_with_ttl<F, Fut>(
        &self,
        fingerprint: &Fingerprint,
        ttl: Duration,
        fetch: F,
    ) -> Resolution<T>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, TransportError>> + Send + 'static,
    {
        let inner = &self.inner;
        let now = inner.clock.now_millis();
        let mut state = inner.state.lock();

        let cached = state
            .cache
            .get(fingerprint)
            .map(|entry| (entry.is_expired(now), entry.value.clone()));
        match cached {
            Some((false, value)) => {
                drop(state);
                CoordinatorStats::incr(&inner.stats.cache_hits);
                debug!(fingerprint = %fingerprint.digest(), "Cache hit");
                return Resolution::ready(value);
            }
            Some((true, _)) => {
                state.cache.pop(fingerprint);
                CoordinatorStats::incr(&inner.stats.expired);
                debug!(fingerprint = %fingerprint.digest(), "Cache entry expired");
            }
            None => {}
        }

        let (tx, rx) = oneshot::channel();

        if let Some(request) = state.in_flight.get_mut(fingerprint) {
            request.subscribers.push(tx);
            let subscribers = request.subscribers.len();
            drop(state);
            CoordinatorStats::incr(&inner.stats.joins);
            debug!(
                fingerprint = %fingerprint.digest(),
                subscribers,
                "Joined in-flight request"
            );
            return Resolution::pending(rx, ResolutionSource::Joined);
        }

        let request_id = inner.next_request_id.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        state.in_flight.insert(
            fingerprint.clone(),
            InFlightRequest {
                request_id,
                subscribers: vec![tx],
                cancel: cancel.clone(),
                ttl,
            },
        );
        drop(state);

        CoordinatorStats::incr(&inner.stats.fetches);
        debug!(
            fingerprint = %fingerprint.digest(),
            request_id,
            ttl_ms = ttl.as_millis(),
            "Fetch started"
        );

        let future = fetch(cancel.clone());
        let task_inner = inner.clone();
        let task_fingerprint = fingerprint.clone();
        tokio::spawn(async move {
            // A panicking fetch still settles, as a transport failure.
            let guarded = AssertUnwindSafe(future).catch_unwind().map(|result| {
                result.unwrap_or_else(|_| Err(TransportError::network("fetch panicked")))
            });
            let outcome = tokio::select! {
                biased;
                () = cancel.cancelled() => None,
                result = guarded => Some(result),
            };
            task_inner.settle(&task_fingerprint, request_id, outcome);
        });

        Resolution::pending(rx, ResolutionSource::Fetched)
    }

    /// Abandon the in-flight request for a fingerprint.
    ///
    /// Cancels the fetch token and rejects every attached caller with
    /// [`CoordinatorError::Superseded`]. A result arriving later is
    /// discarded and never cached. Returns `false` if nothing was in flight.
    pub fn supersede(&self, fingerprint: &Fingerprint) -> bool {
        let removed = self.inner.state.lock().in_flight.remove(fingerprint);
        let Some(request) = removed else {
            return false;
        };

        request.cancel.cancel();
        let detached = request.subscribers.len();
        for subscriber in request.subscribers {
            let _ = subscriber.send(Err(CoordinatorError::Superseded));
        }
        CoordinatorStats::incr(&self.inner.stats.superseded);
        debug!(
            fingerprint = %fingerprint.digest(),
            request_id = request.request_id,
            detached,
            "Request superseded"
        );
        true
    }

    /// Remove one cache entry, or all of them. In-flight work is untouched.
    pub fn purge(&self, fingerprint: Option<&Fingerprint>) -> usize {
        let mut state = self.inner.state.lock();
        let removed = match fingerprint {
            Some(fp) => usize::from(state.cache.pop(fp).is_some()),
            None => {
                let len = state.cache.len();
                state.cache.clear();
                len
            }
        };
        drop(state);
        if removed > 0 {
            debug!(removed, "Cache purged");
        }
        removed
    }

    /// Drop every expired cache entry.
    ///
    /// Returns the number of entries removed.
    pub fn evict_expired(&self) -> usize {
        let now = self.inner.clock.now_millis();
        let mut state = self.inner.state.lock();
        let expired: Vec<Fingerprint> = state
            .cache
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(fp, _)| fp.clone())
            .collect();
        for fp in &expired {
            state.cache.pop(fp);
        }
        drop(state);

        for _ in &expired {
            CoordinatorStats::incr(&self.inner.stats.expired);
        }
        expired.len()
    }

    /// Supersede everything in flight.
    pub fn cancel_all(&self) -> usize {
        let fingerprints: Vec<Fingerprint> =
            self.inner.state.lock().in_flight.keys().cloned().collect();
        fingerprints
            .iter()
            .filter(|fp| self.supersede(fp))
            .count()
    }

    #[must_use]
    pub fn is_in_flight(&self, fingerprint: &Fingerprint) -> bool {
        self.inner.state.lock().in_flight.contains_key(fingerprint)
    }

    #[must_use]
    pub fn in_flight_count(&self) -> usize {
        self.inner.state.lock().in_flight.len()
    }

    /// Callers attached to the in-flight request for a fingerprint.
    #[must_use]
    pub fn subscriber_count(&self, fingerprint: &Fingerprint) -> usize {
        self.inner
            .state
            .lock()
            .in_flight
            .get(fingerprint)
            .map_or(0, |request| {
                request
                    .subscribers
                    .iter()
                    .filter(|subscriber| !subscriber.is_closed())
                    .count()
            })
    }

    /// Live cached value, without touching LRU order.
    #[must_use]
    pub fn cached(&self, fingerprint: &Fingerprint) -> Option<Arc<T>> {
        let now = self.inner.clock.now_millis();
        self.inner
            .state
            .lock()
            .cache
            .peek(fingerprint)
            .filter(|entry| !entry.is_expired(now))
            .map(|entry| entry.value.clone())
    }

    /// Cache entries held, including expired ones not yet evicted.
    #[must_use]
    pub fn cache_len(&self) -> usize {
        self.inner.state.lock().cache.len()
    }

    #[must_use]
    pub fn stats(&self) -> StatsSnapshot {
        self.inner.stats.snapshot()
    }
}

impl<T> Inner<T> {
    fn settle(
        &self,
        fingerprint: &Fingerprint,
        request_id: u64,
        outcome: Option<Result<T, TransportError>>,
    ) {
        let mut state = self.state.lock();
        let is_current = state
            .in_flight
            .get(fingerprint)
            .is_some_and(|request| request.request_id == request_id);
        if !is_current {
            drop(state);
            if outcome.is_some() {
                CoordinatorStats::incr(&self.stats.stale_discarded);
                debug!(
                    fingerprint = %fingerprint.digest(),
                    request_id,
                    "Stale result discarded"
                );
            }
            return;
        }
        let Some(request) = state.in_flight.remove(fingerprint) else {
            return;
        };

        match outcome {
            Some(Ok(value)) => {
                let value = Arc::new(value);
                if !request.ttl.is_zero() {
                    let now = self.clock.now_millis();
                    state.cache.put(
                        fingerprint.clone(),
                        CacheEntry::new(value.clone(), now, request.ttl),
                    );
                }
                drop(state);
                debug!(
                    fingerprint = %fingerprint.digest(),
                    request_id,
                    subscribers = request.subscribers.len(),
                    "Fetch settled"
                );
                for subscriber in request.subscribers {
                    let _ = subscriber.send(Ok(value.clone()));
                }
            }
            Some(Err(error)) => {
                drop(state);
                CoordinatorStats::incr(&self.stats.failures);
                warn!(
                    fingerprint = %fingerprint.digest(),
                    request_id,
                    error = %error,
                    "Fetch failed"
                );
                for subscriber in request.subscribers {
                    let _ = subscriber.send(Err(CoordinatorError::Transport(error.clone())));
                }
            }
            None => {
                drop(state);
                for subscriber in request.subscribers {
                    let _ = subscriber.send(Err(CoordinatorError::Superseded));
                }
            }
        }
    }
}

/// Background task evicting expired cache entries.
pub async fn cleanup_task<T: Send + Sync + 'static>(
    coordinator: RequestCoordinator<T>,
    interval: Duration,
) {
    let mut cleanup_interval = tokio::time::interval(interval);
    cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        cleanup_interval.tick().await;
        let removed = coordinator.evict_expired();
        if removed > 0 {
            debug!(removed, "Evicted expired cache entries");
        }
    }
}
