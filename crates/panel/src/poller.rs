//! Fixed-cadence synchronization of panel state with the remote metrics
//! document.
//!
//! All three triggers (startup, interval tick, manual refresh) funnel into
//! `poll_once`, and all of them are consumed by the single `run` task, so
//! two polls are never in flight at once. A failed poll changes nothing but
//! the error slot; the loop simply waits for its next trigger.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::snapshot::MetricsSnapshot;
use crate::state::SharedState;
use crate::store::StoreClient;

// ---------------------------------------------------------------------------
// One poll
// ---------------------------------------------------------------------------

/// Fetch the metrics document once and fold the outcome into shared state.
/// Never fails: every transport/parse problem becomes the fetch-error flag.
/// `manual` only drives the transient refreshing indicator.
pub async fn poll_once(client: &StoreClient, shared: &SharedState, manual: bool) {
    if manual {
        shared.write().await.refreshing = true;
    }

    // Command epochs are captured before the read so a toggle landing while
    // the request is in flight cannot be clobbered by its response.
    let epochs_at_start = shared.read().await.actuators.epochs();

    match client.fetch_metrics().await {
        Ok(doc) => {
            let snapshot = MetricsSnapshot::from_value(&doc);
            let mut st = shared.write().await;
            st.record_poll_success(snapshot, &epochs_at_start);
            debug!(manual, "poll succeeded");
        }
        Err(e) => {
            warn!(manual, "metrics poll failed: {e:#}");
            shared.write().await.record_poll_failure();
        }
    }

    if manual {
        shared.write().await.refreshing = false;
    }
}

// ---------------------------------------------------------------------------
// Poll loop
// ---------------------------------------------------------------------------

/// Run the poll loop: one poll immediately, then one per tick, with manual
/// refresh requests interleaved through `refresh_rx`. Intended to be
/// `tokio::spawn`-ed from main; ends when every refresh sender is gone.
pub async fn run(
    client: StoreClient,
    shared: SharedState,
    interval: Duration,
    mut refresh_rx: mpsc::Receiver<()>,
) {
    poll_once(&client, &shared, false).await;

    let mut ticker = interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => poll_once(&client, &shared, false).await,
            req = refresh_rx.recv() => match req {
                Some(()) => poll_once(&client, &shared, true).await,
                None => break,
            },
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
