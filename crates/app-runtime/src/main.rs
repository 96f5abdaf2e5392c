//! `query-state-demo`: a primary and a pop-out secondary on one in-process
//! hub, driving the vehicle domain and logging the mirrored flow.
//!
//! Usage: `query-state-demo [config.toml]`

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use app_runtime::vehicles::{InMemoryCatalog, VehicleAdapter};
use app_runtime::{BrowsingContext, PrimaryContext, RuntimeConfig, SecondaryContext};
use qs_04_resource_orchestrator::SharedAdapter;
use qs_telemetry::{init_telemetry, TelemetryConfig};
use shared_bus::{ChannelHub, InMemoryChannelHub};
use shared_types::{ContextRole, ResolvedState, SortOrder};
use tracing::info;

const PRIMARY_ENTRY: &str = "https://app.example/vehicles?manufacturer=Toyota";
const SECONDARY_ENTRY: &str = "https://app.example/popout/results";

fn load_config() -> Result<RuntimeConfig> {
    match std::env::args().nth(1) {
        Some(path) => {
            RuntimeConfig::load(&path).with_context(|| format!("loading config from {path}"))
        }
        None => RuntimeConfig::from_env().context("reading config from environment"),
    }
}

fn adapters(catalog: &Arc<InMemoryCatalog>) -> Vec<SharedAdapter> {
    vec![Arc::new(VehicleAdapter::new(catalog.clone()))]
}

fn log_state(context: &str, state: &ResolvedState) {
    let result = state.result.as_deref();
    info!(
        context,
        phase = %state.phase,
        query = ?state.snapshot.as_map(),
        total = result.map(|r| r.total),
        page = result.map(|r| r.page),
        highlights = state.highlights.len(),
        "State"
    );
}

async fn settle(primary: &PrimaryContext, secondary: &SecondaryContext) -> Result<()> {
    let mut state = primary.state();
    let address = primary.store().read();
    let ready = tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| !s.is_loading() && s.snapshot == address),
    )
    .await
    .context("primary did not settle")?
    .context("primary state closed")?
    .clone();
    log_state("primary", &ready);

    let fingerprint = ready.fingerprint.clone();
    let mut mirrored = secondary.state();
    let mirror = tokio::time::timeout(
        Duration::from_secs(5),
        mirrored.wait_for(|s| {
            s.as_ref()
                .is_some_and(|s| !s.is_loading() && s.fingerprint == fingerprint)
        }),
    )
    .await
    .context("secondary did not converge")?
    .context("secondary state closed")?
    .clone();
    if let Some(mirror) = mirror {
        log_state("secondary", &mirror);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // This process hosts the primary; the pop-out's lines carry its own span.
    init_telemetry(&TelemetryConfig::for_context(&ContextRole::Primary.to_string()))?;
    let config = load_config()?;

    let hub: Arc<dyn ChannelHub> =
        Arc::new(InMemoryChannelHub::with_capacity(config.sync.channel_capacity));
    let catalog = Arc::new(InMemoryCatalog::sample().with_latency(Duration::from_millis(50)));

    let BrowsingContext::Primary(primary) =
        BrowsingContext::from_entry(&config, hub.clone(), PRIMARY_ENTRY, adapters(&catalog))?
    else {
        bail!("{PRIMARY_ENTRY} did not boot a primary context");
    };
    let BrowsingContext::Secondary(secondary) =
        BrowsingContext::from_entry(&config, hub.clone(), SECONDARY_ENTRY, adapters(&catalog))?
    else {
        bail!("{SECONDARY_ENTRY} did not attach a secondary context");
    };
    secondary.ready().await.context("secondary closed before ready")?;
    settle(&primary, &secondary).await?;

    info!("Highlighting Ford from the primary");
    primary.editor().set_highlight("manufacturer", "Ford")?;
    settle(&primary, &secondary).await?;

    info!("Selecting SUVs from the pop-out");
    secondary.editor().set_filter("bodyClass", "SUV")?;
    tokio::time::timeout(
        Duration::from_secs(5),
        primary
            .store()
            .subscribe()
            .wait_for(|s| s.get("bodyClass") == Some("SUV")),
    )
    .await
    .context("state-request never reached the primary")??;
    settle(&primary, &secondary).await?;

    info!("Sorting by year from the primary");
    primary.editor().set_sort("year", SortOrder::Desc)?;
    settle(&primary, &secondary).await?;

    info!("Navigating back");
    primary.back();
    settle(&primary, &secondary).await?;

    let stats = primary.orchestrator().coordinator().stats();
    info!(
        searches = catalog.search_count(),
        cache_hits = stats.cache_hits,
        fetches = stats.fetches,
        broadcasts = primary.synchronizer().broadcasts_sent(),
        requests = primary.synchronizer().requests_applied(),
        "Demo finished"
    );

    secondary.close();
    primary.shutdown();
    Ok(())
}
