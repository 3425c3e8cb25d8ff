mod actuator;
mod config;
mod dispatch;
mod poller;
mod snapshot;
mod state;
mod store;
mod view;
mod web;

use anyhow::Result;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::Config;
use state::{PanelState, SharedState};
use store::StoreClient;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Config ──────────────────────────────────────────────────────
    let cfg = Config::from_env()?;
    info!(
        store = %cfg.store_base,
        path = %cfg.metrics_path,
        poll_ms = cfg.poll_interval.as_millis() as u64,
        "panel starting"
    );

    let store = StoreClient::new(&cfg)?;

    // ── Shared state (ephemeral, reset on every start) ──────────────
    let shared: SharedState = Arc::new(RwLock::new(PanelState::new()));

    // ── Poll loop ───────────────────────────────────────────────────
    let (refresh_tx, refresh_rx) = mpsc::channel(1);
    let poll_loop = tokio::spawn(poller::run(
        store.clone(),
        Arc::clone(&shared),
        cfg.poll_interval,
        refresh_rx,
    ));

    // ── API server (runs until shutdown signal) ─────────────────────
    let ctx = web::AppCtx {
        shared,
        store,
        refresh_tx,
    };
    let served = web::serve(ctx, cfg.web_port).await;

    // The poll loop lives exactly as long as the panel: stop it on every
    // exit path before reporting the server outcome.
    poll_loop.abort();
    let _ = poll_loop.await;

    served
}
