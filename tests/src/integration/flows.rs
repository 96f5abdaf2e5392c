//! # Address → Result Flows
//!
//! The primary pipeline end to end: address state, typed mapping,
//! fingerprint, coordinator and the orchestrator's streams.

use super::fixtures::{ready_with_total, settle, within, GatedAdapter, Pipeline};
use qs_04_resource_orchestrator::DomainAdapter;
use shared_types::{LoadPhase, StatBucket, StateSnapshot};

#[tokio::test]
async fn test_basic_flow_toyota() {
    let adapter = GatedAdapter::new();
    adapter.hold("Toyota");
    let pipeline = Pipeline::start("manufacturer=Toyota&page=1", adapter.clone());

    let mut loading = pipeline.orchestrator.loading();
    let mut results = pipeline.orchestrator.results();
    assert!(*loading.borrow_and_update());
    assert!(results.borrow_and_update().is_none());

    let fingerprint = pipeline.orchestrator.current_state().fingerprint.unwrap();
    assert!(fingerprint.as_str().starts_with("vehicles?"));

    adapter.release("Toyota");
    within(loading.changed()).await.unwrap();
    assert!(!*loading.borrow_and_update());

    let page = results.borrow_and_update().clone().unwrap();
    assert_eq!(page.total, 234);
    assert_eq!(page.page, 1);
    assert_eq!(page.rows.len(), 20);
    assert_eq!(adapter.fetches(), 1);
}

#[tokio::test]
async fn test_highlight_segmentation() {
    let adapter = GatedAdapter::new();
    let pipeline = Pipeline::start("manufacturer=Toyota&page=1", adapter.clone());
    let mut state = pipeline.orchestrator.state();
    let first = ready_with_total(&mut state, 234).await;

    pipeline.editor().set_highlight("manufacturer", "Ford").unwrap();

    let second = within(state.wait_for(|s| {
        s.phase == LoadPhase::Ready && s.fingerprint != first.fingerprint
    }))
    .await
    .unwrap()
    .clone();

    // Filter kept, page kept, highlight added.
    assert_eq!(pipeline.store.read().get("manufacturer"), Some("Toyota"));
    assert_eq!(pipeline.store.read().get("h_manufacturer"), Some("Ford"));
    assert_eq!(pipeline.store.read().get("page"), Some("1"));

    let page = second.result.unwrap();
    assert_eq!(page.total, 234);
    assert_eq!(
        page.statistics.bucket("manufacturer", "Ford"),
        Some(StatBucket { total: 120, highlighted: 120 })
    );
    assert_eq!(
        page.statistics.bucket("manufacturer", "Toyota"),
        Some(StatBucket { total: 234, highlighted: 0 })
    );
    assert_eq!(
        first.result.unwrap().statistics.bucket("manufacturer", "Toyota"),
        Some(StatBucket::unhighlighted(234))
    );
    assert_eq!(second.highlights.len(), 1);
}

#[tokio::test]
async fn test_latest_fingerprint_wins_under_reordering() {
    let adapter = GatedAdapter::new();
    adapter.hold("Toyota");
    let pipeline = Pipeline::start("manufacturer=Toyota", adapter.clone());
    let mut state = pipeline.orchestrator.state();
    settle().await;

    // B supersedes A and resolves first.
    pipeline.editor().set_filter("manufacturer", "Ford").unwrap();
    ready_with_total(&mut state, 120).await;

    // Releasing A afterwards must not change what is observable.
    adapter.release("Toyota");
    settle().await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let current = pipeline.orchestrator.current_state();
    assert_eq!(current.result.unwrap().total, 120);
    assert_eq!(current.phase, LoadPhase::Ready);
    assert_eq!(adapter.fetches(), 2);

    let stats = pipeline.orchestrator.coordinator().stats();
    assert_eq!(stats.superseded, 1);
    // The late result was never cached either.
    assert_eq!(pipeline.orchestrator.coordinator().cache_len(), 1);
}

#[tokio::test]
async fn test_error_keeps_last_result_until_retry() {
    let adapter = GatedAdapter::new();
    let pipeline = Pipeline::start("manufacturer=Honda", adapter.clone());
    let mut state = pipeline.orchestrator.state();
    ready_with_total(&mut state, 80).await;

    adapter.catalog().set_failing(true);
    pipeline.editor().set_filter("manufacturer", "Tesla").unwrap();
    let failed = within(state.wait_for(|s| s.phase == LoadPhase::Error))
        .await
        .unwrap()
        .clone();
    assert_eq!(failed.error.unwrap().status, Some(503));
    assert_eq!(failed.result.unwrap().total, 80);
    assert_eq!(pipeline.orchestrator.coordinator().cache_len(), 1);

    adapter.catalog().set_failing(false);
    assert!(pipeline.orchestrator.retry().unwrap());
    let recovered = ready_with_total(&mut state, 36).await;
    assert!(recovered.error.is_none());
}

#[tokio::test]
async fn test_back_navigation_is_served_from_cache() {
    let adapter = GatedAdapter::new();
    let pipeline = Pipeline::start("manufacturer=Toyota", adapter.clone());
    let mut state = pipeline.orchestrator.state();
    ready_with_total(&mut state, 234).await;

    pipeline.editor().set_filter("manufacturer", "Ford").unwrap();
    ready_with_total(&mut state, 120).await;

    assert!(pipeline.location.back());
    assert!(pipeline.store.sync_from_location());
    ready_with_total(&mut state, 234).await;

    assert_eq!(adapter.fetches(), 2);
    assert_eq!(pipeline.orchestrator.coordinator().stats().cache_hits, 1);
}

#[test]
fn test_mapping_round_trip() {
    let adapter = GatedAdapter::new();
    let snapshots = [
        StateSnapshot::from_pairs([("manufacturer", "Toyota"), ("page", "1")]),
        StateSnapshot::from_pairs([
            ("bodyClass", "SUV,Sedan"),
            ("yearMin", "2018"),
            ("sortBy", "year"),
            ("sortOrder", "desc"),
            ("h_manufacturer", "Ford"),
        ]),
        StateSnapshot::from_pairs([("model", "Model 3"), ("h_bodyClass", "SUV")]),
    ];

    for snapshot in snapshots {
        let produced =
            StateSnapshot::new().apply(&adapter.map_filters_to_state(&adapter.map_state_to_filters(&snapshot)));
        let again = StateSnapshot::new()
            .apply(&adapter.map_filters_to_state(&adapter.map_state_to_filters(&produced)));
        assert_eq!(again, produced);
        assert_eq!(
            adapter.build_fingerprint(&adapter.map_state_to_filters(&produced)),
            adapter.build_fingerprint(&adapter.map_state_to_filters(&snapshot))
        );
    }
}
