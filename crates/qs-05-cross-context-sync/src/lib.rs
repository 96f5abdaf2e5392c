//! # Cross-Context Synchronizer
//!
//! **Component:** qs-05
//!
//! Makes secondary contexts (pop-outs) read-mostly mirrors of the primary
//! context without a fetch pipeline or an address of their own.
//!
//! ## Protocol
//!
//! | Kind | Direction | Effect |
//! |------|-----------|--------|
//! | `ready` | secondary → primary | primary replies with a fresh state-broadcast |
//! | `state-broadcast` | primary → secondaries | mirror replaced (older revisions ignored) |
//! | `state-request` | secondary → primary | delta written to the primary's store |
//! | `close` | either | primary forgets the secondary; secondary keeps last-known state |
//!
//! ## Failure Semantics
//!
//! An unreachable primary is never an error for UI code: requests return
//! `false`, the mirror stops updating, and one warning is logged per outage.

// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod config;
pub mod error;
mod outbox;
pub mod primary;
pub mod secondary;

pub use config::SyncConfig;
pub use error::SyncError;
pub use primary::PrimarySynchronizer;
pub use secondary::SecondarySynchronizer;

#[cfg(test)]
mod tests {
    use super::*;
    use qs_01_address_state::{AddressStateStore, InMemoryLocation, WriteOutcome};
    use shared_bus::{Channel, ChannelHub, InMemoryChannelHub};
    use shared_types::{
        LoadPhase, ManualTimeSource, PanelId, ResolvedState, ResourcePage, StampedState,
        StateDelta, StateSnapshot, SyncMessage,
    };
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::watch;
    use uuid::Uuid;

    struct Primary {
        hub: Arc<InMemoryChannelHub>,
        store: Arc<AddressStateStore>,
        resolved: watch::Sender<ResolvedState>,
        sync: PrimarySynchronizer,
    }

    fn ready_state(total: u64) -> ResolvedState {
        ResolvedState {
            phase: LoadPhase::Ready,
            result: Some(Arc::new(ResourcePage {
                total,
                ..ResourcePage::default()
            })),
            ..ResolvedState::default()
        }
    }

    fn primary(query: &str) -> Primary {
        let hub = Arc::new(InMemoryChannelHub::new());
        let store = Arc::new(AddressStateStore::primary(Arc::new(InMemoryLocation::new(query))));
        let (resolved, rx) = watch::channel(ResolvedState::default());
        let sync = PrimarySynchronizer::spawn(hub.clone(), store.clone(), rx, SyncConfig::default());
        Primary {
            hub,
            store,
            resolved,
            sync,
        }
    }

    fn secondary_store() -> (Arc<InMemoryLocation>, Arc<AddressStateStore>) {
        let location = Arc::new(InMemoryLocation::new("popout=1"));
        let store = Arc::new(AddressStateStore::secondary(location.clone()));
        (location, store)
    }

    fn panel() -> PanelId {
        PanelId::new("statistics")
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    async fn within<F: std::future::Future>(future: F) -> F::Output {
        tokio::time::timeout(Duration::from_secs(5), future)
            .await
            .expect("timed out")
    }

    #[tokio::test]
    async fn test_late_secondary_receives_current_state_on_ready() {
        let p = primary("manufacturer=Toyota");
        p.sync.attach(panel()).unwrap();
        p.resolved.send_replace(ready_state(234));
        settle().await;

        let (_, store) = secondary_store();
        let secondary =
            SecondarySynchronizer::attach(p.hub.as_ref(), panel(), store, &SyncConfig::default())
                .unwrap();
        assert!(!secondary.is_ready());

        let mirrored = within(secondary.ready()).await.unwrap();
        assert_eq!(mirrored.result.unwrap().total, 234);
        assert_eq!(p.sync.secondary_count(), 1);
    }

    #[tokio::test]
    async fn test_secondary_store_follows_mirrored_snapshot() {
        let p = primary("manufacturer=Toyota");
        p.sync.attach(panel()).unwrap();
        p.resolved.send_replace(ResolvedState {
            snapshot: StateSnapshot::from_pairs([("manufacturer", "Toyota")]),
            ..ready_state(234)
        });
        settle().await;

        let (location, store) = secondary_store();
        let secondary = SecondarySynchronizer::attach(
            p.hub.as_ref(),
            panel(),
            store.clone(),
            &SyncConfig::default(),
        )
        .unwrap();
        within(secondary.ready()).await;

        assert_eq!(store.read().get("manufacturer"), Some("Toyota"));
        assert_eq!(location.push_count(), 0);
    }

    #[tokio::test]
    async fn test_every_change_is_broadcast() {
        let p = primary("");
        p.sync.attach(panel()).unwrap();
        let (_, store) = secondary_store();
        let secondary =
            SecondarySynchronizer::attach(p.hub.as_ref(), panel(), store, &SyncConfig::default())
                .unwrap();
        within(secondary.ready()).await;

        p.resolved.send_replace(ready_state(120));
        let mut state = secondary.state();
        within(state.wait_for(|s| {
            s.as_ref()
                .and_then(|s| s.result.as_ref())
                .is_some_and(|r| r.total == 120)
        }))
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_secondary_write_becomes_request_on_primary() {
        let p = primary("manufacturer=Toyota");
        p.sync.attach(panel()).unwrap();
        let (location, store) = secondary_store();
        let secondary = SecondarySynchronizer::attach(
            p.hub.as_ref(),
            panel(),
            store.clone(),
            &SyncConfig::default(),
        )
        .unwrap();
        within(secondary.ready()).await;

        let outcome = store.write(StateDelta::new().with("bodyClass", "SUV"));
        assert_eq!(outcome, WriteOutcome::Redirected);

        let mut primary_state = p.store.subscribe();
        within(primary_state.wait_for(|s| s.get("bodyClass") == Some("SUV")))
            .await
            .unwrap();
        assert_eq!(p.store.read().get("manufacturer"), Some("Toyota"));
        assert_eq!(p.sync.requests_applied(), 1);

        assert_eq!(location.push_count(), 0);
        assert!(store.read().get("bodyClass").is_none());
    }

    #[tokio::test]
    async fn test_conflicting_requests_last_write_wins() {
        let p = primary("");
        p.sync.attach(panel()).unwrap();
        let (_, first_store) = secondary_store();
        let (_, second_store) = secondary_store();
        let config = SyncConfig::default();
        let first = SecondarySynchronizer::attach(p.hub.as_ref(), panel(), first_store, &config).unwrap();
        let second = SecondarySynchronizer::attach(p.hub.as_ref(), panel(), second_store, &config).unwrap();
        within(first.ready()).await;
        within(second.ready()).await;

        assert!(first.request(StateDelta::new().with("bodyClass", "SUV")));
        assert!(second.request(StateDelta::new().with("bodyClass", "Sedan")));

        let mut primary_state = p.store.subscribe();
        within(primary_state.wait_for(|s| s.get("bodyClass") == Some("Sedan")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_request_without_primary_is_swallowed() {
        let hub = InMemoryChannelHub::new();
        let (_, store) = secondary_store();
        let secondary =
            SecondarySynchronizer::attach(&hub, panel(), store.clone(), &SyncConfig::default())
                .unwrap();

        assert!(!secondary.request(StateDelta::new().with("page", "2")));
        assert_eq!(
            store.write(StateDelta::new().with("page", "3")),
            WriteOutcome::Redirected
        );
        assert!(secondary.current().is_none());
    }

    #[tokio::test]
    async fn test_primary_close_keeps_last_known_state() {
        let p = primary("");
        p.resolved.send_replace(ready_state(7));
        p.sync.attach(panel()).unwrap();
        let (_, store) = secondary_store();
        let secondary =
            SecondarySynchronizer::attach(p.hub.as_ref(), panel(), store, &SyncConfig::default())
                .unwrap();
        within(secondary.ready()).await;

        p.sync.detach(&panel()).unwrap();
        settle().await;

        assert!(secondary.is_primary_closed());
        assert_eq!(secondary.current().unwrap().result.unwrap().total, 7);
        assert!(!secondary.request(StateDelta::new().with("page", "2")));
    }

    #[tokio::test]
    async fn test_out_of_order_broadcast_ignored() {
        let hub = Arc::new(InMemoryChannelHub::new());
        let (_, store) = secondary_store();
        let config = SyncConfig::default();
        let secondary = SecondarySynchronizer::attach(hub.as_ref(), panel(), store, &config).unwrap();
        let fake_primary = hub.open(&config.channel_name(&panel()));
        let origin = Uuid::new_v4();

        let send = |origin: Uuid, revision: u64, total: u64| {
            let stamped = StampedState {
                origin,
                revision,
                state: ready_state(total),
            };
            let envelope = SyncMessage::StateBroadcast(Box::new(stamped)).seal(1_000).unwrap();
            fake_primary.send(envelope).unwrap();
        };
        send(origin, 2, 2);
        within(secondary.ready()).await;

        let mut state = secondary.state();
        state.borrow_and_update();
        send(origin, 1, 1);
        settle().await;
        assert!(!state.has_changed().unwrap());

        // A restarted primary counts from scratch and is still applied.
        send(Uuid::new_v4(), 1, 3);
        within(state.wait_for(|s| {
            s.as_ref()
                .and_then(|s| s.result.as_ref())
                .is_some_and(|r| r.total == 3)
        }))
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_mirror_follows_primary_when_clock_steps_back() {
        let hub = Arc::new(InMemoryChannelHub::new());
        let store = Arc::new(AddressStateStore::primary(Arc::new(InMemoryLocation::new(""))));
        let (resolved, rx) = watch::channel(ready_state(1));
        let clock = Arc::new(ManualTimeSource::new(10_000));
        let config = SyncConfig::default();
        let sync = PrimarySynchronizer::with_time_source(
            hub.clone(),
            store,
            rx,
            config.clone(),
            clock.clone(),
        );
        sync.attach(panel()).unwrap();

        let (_, secondary_store) = secondary_store();
        let secondary =
            SecondarySynchronizer::attach(hub.as_ref(), panel(), secondary_store, &config).unwrap();
        let first = within(secondary.ready()).await.unwrap();
        assert_eq!(first.result.unwrap().total, 1);

        clock.set(9_000);
        resolved.send_replace(ready_state(2));

        let mut state = secondary.state();
        within(state.wait_for(|s| {
            s.as_ref()
                .and_then(|s| s.result.as_ref())
                .is_some_and(|r| r.total == 2)
        }))
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_secondary_close_detaches() {
        let p = primary("");
        p.sync.attach(panel()).unwrap();
        let (_, store) = secondary_store();
        let secondary = SecondarySynchronizer::attach(
            p.hub.as_ref(),
            panel(),
            store.clone(),
            &SyncConfig::default(),
        )
        .unwrap();
        within(secondary.ready()).await;
        assert_eq!(p.sync.secondary_count(), 1);

        drop(secondary);
        settle().await;

        assert!(!store.has_redirect());
        assert_eq!(p.sync.secondary_count(), 0);
        assert_eq!(
            p.hub.endpoint_count(&SyncConfig::default().channel_name(&panel())),
            1
        );
    }

    #[tokio::test]
    async fn test_attach_twice_rejected() {
        let p = primary("");
        p.sync.attach(panel()).unwrap();
        assert!(matches!(
            p.sync.attach(panel()),
            Err(SyncError::AlreadyAttached(_))
        ));
        assert!(matches!(
            p.sync.detach(&PanelId::new("missing")),
            Err(SyncError::NotAttached(_))
        ));
        assert_eq!(p.sync.panels(), vec![panel()]);
    }
}
