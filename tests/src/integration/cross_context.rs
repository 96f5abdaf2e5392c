//! # Primary / Secondary Mirroring
//!
//! Full contexts from `app-runtime` on one in-process hub.

use super::fixtures::{ready_with_total, settle, within, GatedAdapter};
use app_runtime::{PrimaryContext, RuntimeConfig, SecondaryContext};
use qs_01_address_state::AddressLocation;
use qs_04_resource_orchestrator::SharedAdapter;
use shared_bus::{ChannelHub, InMemoryChannelHub};
use shared_types::{LoadPhase, PanelId, ResolvedState, StateDelta};
use std::sync::Arc;
use tokio::sync::watch;

fn results_panel() -> PanelId {
    PanelId::new("results")
}

fn boot(query: &str, adapter: &Arc<GatedAdapter>) -> (Arc<dyn ChannelHub>, PrimaryContext) {
    let hub: Arc<dyn ChannelHub> = Arc::new(InMemoryChannelHub::new());
    let adapters: Vec<SharedAdapter> = vec![adapter.clone()];
    let primary = PrimaryContext::boot(&RuntimeConfig::default(), hub.clone(), query, adapters)
        .unwrap();
    (hub, primary)
}

fn pop_out(hub: &Arc<dyn ChannelHub>, adapter: &Arc<GatedAdapter>, query: &str) -> SecondaryContext {
    let adapters: Vec<SharedAdapter> = vec![adapter.clone()];
    SecondaryContext::attach(
        &RuntimeConfig::default(),
        hub.as_ref(),
        results_panel(),
        query,
        adapters,
    )
    .unwrap()
}

async fn mirrored_total(state: &mut watch::Receiver<Option<ResolvedState>>, total: u64) -> ResolvedState {
    within(state.wait_for(|s| {
        s.as_ref().is_some_and(|s| {
            s.phase == LoadPhase::Ready && s.result.as_ref().is_some_and(|r| r.total == total)
        })
    }))
    .await
    .unwrap()
    .clone()
    .unwrap()
}

async fn primary_on_page(primary: &PrimaryContext, page: u32) -> ResolvedState {
    within(primary.state().wait_for(|s| {
        s.phase == LoadPhase::Ready && s.result.as_ref().is_some_and(|r| r.page == page)
    }))
    .await
    .unwrap()
    .clone()
}

#[tokio::test]
async fn test_late_secondary_receives_current_result_on_ready() {
    let adapter = GatedAdapter::new();
    let (hub, primary) = boot("manufacturer=Toyota&page=1", &adapter);
    let resolved = ready_with_total(&mut primary.state(), 234).await;

    // Several broadcasts went out before the pop-out existed.
    primary.editor().set_page(2).unwrap();
    primary_on_page(&primary, 2).await;
    primary.editor().set_page(1).unwrap();
    primary_on_page(&primary, 1).await;
    settle().await;

    let secondary = pop_out(&hub, &adapter, "");
    let first = within(secondary.ready()).await.unwrap();

    assert_eq!(first.fingerprint, resolved.fingerprint);
    assert_eq!(first.result.unwrap().total, 234);
    assert_eq!(primary.synchronizer().secondary_count(), 1);
    // Page 1 came back from the cache.
    assert_eq!(adapter.fetches(), 2);
}

#[tokio::test]
async fn test_secondary_initiated_change() {
    let adapter = GatedAdapter::new();
    let (hub, primary) = boot("manufacturer=Toyota", &adapter);
    let mut primary_state = primary.state();
    ready_with_total(&mut primary_state, 234).await;

    let secondary = pop_out(&hub, &adapter, "");
    let mut mirrored = secondary.state();
    within(secondary.ready()).await.unwrap();

    let pushes_before = primary.location().push_count();
    secondary.editor().set_filter("bodyClass", "SUV").unwrap();

    // Primary owns the address, fetches and broadcasts.
    ready_with_total(&mut primary_state, 59).await;
    assert_eq!(primary.store().read().get("bodyClass"), Some("SUV"));
    assert_eq!(primary.store().read().get("manufacturer"), Some("Toyota"));
    assert_eq!(primary.location().push_count(), pushes_before + 1);

    let update = mirrored_total(&mut mirrored, 59).await;
    assert_eq!(update.snapshot.get("bodyClass"), Some("SUV"));
    assert_eq!(secondary.store().read().get("bodyClass"), Some("SUV"));
    assert_eq!(primary.synchronizer().requests_applied(), 1);
}

#[tokio::test]
async fn test_secondary_address_is_never_pushed() {
    let adapter = GatedAdapter::new();
    let (hub, primary) = boot("manufacturer=Ford", &adapter);
    ready_with_total(&mut primary.state(), 120).await;

    let location = Arc::new(qs_01_address_state::InMemoryLocation::new("manufacturer=Ford"));
    let store = Arc::new(qs_01_address_state::AddressStateStore::secondary(location.clone()));
    let secondary = qs_05_cross_context_sync::SecondarySynchronizer::attach(
        hub.as_ref(),
        results_panel(),
        store.clone(),
        &RuntimeConfig::default().sync_config(),
    )
    .unwrap();
    within(secondary.ready()).await.unwrap();

    store.write(StateDelta::new().with("bodyClass", "Pickup"));
    ready_with_total(&mut primary.state(), 40).await;

    assert_eq!(location.push_count(), 0);
    assert_eq!(location.read(), "manufacturer=Ford");
}

#[tokio::test]
async fn test_conflicting_requests_resolve_last_write_wins() {
    let adapter = GatedAdapter::new();
    let (hub, primary) = boot("manufacturer=Toyota", &adapter);
    ready_with_total(&mut primary.state(), 234).await;

    let left = pop_out(&hub, &adapter, "");
    let right = pop_out(&hub, &adapter, "");
    within(left.ready()).await.unwrap();
    within(right.ready()).await.unwrap();

    assert!(left
        .synchronizer()
        .request(StateDelta::new().with("bodyClass", "SUV")));
    assert!(right
        .synchronizer()
        .request(StateDelta::new().with("bodyClass", "Sedan")));

    let mut primary_address = primary.store().subscribe();
    within(primary_address.wait_for(|s| s.get("bodyClass") == Some("Sedan")))
        .await
        .unwrap();

    // Both mirrors converge on the winner.
    let settled_on_sedan = |s: &Option<ResolvedState>| {
        s.as_ref().is_some_and(|s| {
            s.phase == LoadPhase::Ready && s.snapshot.get("bodyClass") == Some("Sedan")
        })
    };
    let left_final = within(left.state().wait_for(settled_on_sedan))
        .await
        .unwrap()
        .clone()
        .unwrap();
    let right_final = within(right.state().wait_for(settled_on_sedan))
        .await
        .unwrap()
        .clone()
        .unwrap();
    assert_eq!(left_final.result.unwrap().total, 59);
    assert_eq!(left_final.fingerprint, right_final.fingerprint);
}

#[tokio::test]
async fn test_secondary_keeps_last_state_when_primary_closes() {
    let adapter = GatedAdapter::new();
    let (hub, primary) = boot("manufacturer=Honda", &adapter);
    ready_with_total(&mut primary.state(), 80).await;

    let secondary = pop_out(&hub, &adapter, "");
    within(secondary.ready()).await.unwrap();

    primary.shutdown();
    drop(primary);
    within(async {
        while !secondary.synchronizer().is_primary_closed() {
            tokio::task::yield_now().await;
        }
    })
    .await;

    // Requests are swallowed; the mirror stays on the last-known state.
    assert!(!secondary
        .synchronizer()
        .request(StateDelta::new().with("manufacturer", "Ford")));
    secondary.editor().set_filter("manufacturer", "Tesla").unwrap();

    let last = secondary.state().borrow().clone().unwrap();
    assert_eq!(last.result.unwrap().total, 80);
    assert_eq!(adapter.fetches(), 1);
}
