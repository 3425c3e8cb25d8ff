mod doc;
mod sim;
mod web;

use anyhow::Result;
use std::{env, sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // ── Env config ──────────────────────────────────────────────────
    let port: u16 = env::var("PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(9090);
    let metrics_path =
        env::var("METRICS_PATH").unwrap_or_else(|_| "esp32/metrics".to_string());
    let tick_ms: u64 = env::var("SIM_TICK_MS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(2000);

    info!(port, path = %metrics_path, tick_ms, "store-sim starting");

    // ── Document + simulator ────────────────────────────────────────
    let doc = doc::new_doc();
    tokio::spawn(sim::run(
        Arc::clone(&doc),
        metrics_path,
        Duration::from_millis(tick_ms),
    ));

    // ── Store API ───────────────────────────────────────────────────
    web::serve(doc, port).await
}
