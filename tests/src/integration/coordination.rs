//! # Single-Flight and Cache Lifetime
//!
//! Request coordinator behavior with real vehicle fetches behind it.

use super::fixtures::{within, GatedAdapter};
use futures::future::join_all;
use qs_03_request_coordinator::{CoordinatorConfig, RequestCoordinator, ResolutionSource};
use qs_04_resource_orchestrator::DomainAdapter;
use shared_types::{FilterState, Fingerprint, ManualTimeSource, ResourcePage, TransportError};
use std::sync::Arc;
use std::time::Duration;

fn toyota() -> FilterState {
    FilterState::new().with_filter("manufacturer", "Toyota")
}

fn resolve(
    coordinator: &RequestCoordinator<ResourcePage>,
    adapter: &Arc<GatedAdapter>,
    state: FilterState,
) -> qs_03_request_coordinator::Resolution<ResourcePage> {
    let fingerprint: Fingerprint = adapter.build_fingerprint(&state);
    let adapter = adapter.clone();
    coordinator.resolve(&fingerprint, move |cancel| async move {
        adapter.fetch(&state, cancel).await
    })
}

#[tokio::test]
async fn test_concurrent_resolves_share_one_fetch() {
    let adapter = GatedAdapter::new();
    adapter.hold("Toyota");
    let coordinator = RequestCoordinator::new(CoordinatorConfig::default());

    let resolutions: Vec<_> = (0..8)
        .map(|_| resolve(&coordinator, &adapter, toyota()))
        .collect();
    assert_eq!(resolutions[0].source(), ResolutionSource::Fetched);
    assert!(resolutions[1..]
        .iter()
        .all(|r| r.source() == ResolutionSource::Joined));

    let fingerprint = adapter.build_fingerprint(&toyota());
    assert_eq!(coordinator.subscriber_count(&fingerprint), 8);

    adapter.release("Toyota");
    let pages: Vec<Arc<ResourcePage>> = within(join_all(resolutions))
        .await
        .into_iter()
        .collect::<Result<_, _>>()
        .unwrap();

    assert_eq!(adapter.fetches(), 1);
    assert!(pages.iter().all(|p| Arc::ptr_eq(p, &pages[0])));
    assert_eq!(pages[0].total, 234);
    assert_eq!(coordinator.stats().joins, 7);
}

#[tokio::test]
async fn test_cache_entry_lives_for_ttl() {
    let adapter = GatedAdapter::new();
    let clock = Arc::new(ManualTimeSource::new(1_000));
    let coordinator = RequestCoordinator::with_time_source(
        CoordinatorConfig::default().with_ttl(Duration::from_secs(10)),
        clock.clone(),
    );

    within(resolve(&coordinator, &adapter, toyota())).await.unwrap();
    assert_eq!(adapter.fetches(), 1);

    clock.advance(Duration::from_secs(9));
    let hit = resolve(&coordinator, &adapter, toyota());
    assert!(hit.is_cache_hit());
    assert_eq!(within(hit).await.unwrap().total, 234);
    assert_eq!(adapter.fetches(), 1);

    clock.advance(Duration::from_secs(2));
    let refetch = resolve(&coordinator, &adapter, toyota());
    assert_eq!(refetch.source(), ResolutionSource::Fetched);
    within(refetch).await.unwrap();
    assert_eq!(adapter.fetches(), 2);
}

#[tokio::test]
async fn test_zero_ttl_refetches_but_still_single_flights() {
    let adapter = GatedAdapter::new();
    let coordinator = RequestCoordinator::new(CoordinatorConfig::uncached());

    within(resolve(&coordinator, &adapter, toyota())).await.unwrap();
    within(resolve(&coordinator, &adapter, toyota())).await.unwrap();
    assert_eq!(adapter.fetches(), 2);
    assert_eq!(coordinator.cache_len(), 0);

    adapter.hold("Toyota");
    let first = resolve(&coordinator, &adapter, toyota());
    let second = resolve(&coordinator, &adapter, toyota());
    adapter.release("Toyota");
    let (a, b) = within(futures::future::join(first, second)).await;
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
    assert_eq!(adapter.fetches(), 3);
}

#[tokio::test]
async fn test_failures_are_not_cached() {
    let adapter = GatedAdapter::new();
    let coordinator = RequestCoordinator::new(CoordinatorConfig::default());

    adapter.catalog().set_failing(true);
    let err = within(resolve(&coordinator, &adapter, toyota()))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        qs_03_request_coordinator::CoordinatorError::Transport(TransportError { status: Some(503), .. })
    ));
    assert_eq!(coordinator.cache_len(), 0);

    adapter.catalog().set_failing(false);
    within(resolve(&coordinator, &adapter, toyota())).await.unwrap();
    assert_eq!(adapter.fetches(), 2);
    assert_eq!(coordinator.stats().failures, 1);
}

#[test]
fn test_domains_share_a_coordinator_without_collisions() {
    let adapter = GatedAdapter::new();
    let other = qs_02_fingerprint::FingerprintBuilder::for_domain("dealers")
        .build_state(&toyota());
    assert_ne!(adapter.build_fingerprint(&toyota()), other);
}
