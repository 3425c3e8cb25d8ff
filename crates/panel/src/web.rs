use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::info;

use crate::actuator::ActuatorId;
use crate::dispatch;
use crate::state::{PanelEvent, SharedState};
use crate::store::StoreClient;
use crate::view::{self, MetricRow};

// ---------------------------------------------------------------------------
// Shared context
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppCtx {
    pub shared: SharedState,
    pub store: StoreClient,
    pub refresh_tx: mpsc::Sender<()>,
}

// ---------------------------------------------------------------------------
// JSON responses
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct StatusResponse {
    pub rows: Vec<MetricRow>,
    pub actuators: Vec<ActuatorStatus>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_update: Option<OffsetDateTime>,
    pub error: Option<&'static str>,
    pub refreshing: bool,
    pub events: Vec<PanelEvent>,
}

/// `on: null` means no commanded state has ever been observed; the control
/// for that actuator is to be rendered disabled.
#[derive(Serialize)]
pub struct ActuatorStatus {
    pub id: &'static str,
    pub label: &'static str,
    pub on: Option<bool>,
}

#[derive(Deserialize)]
struct ToggleBody {
    on: bool,
}

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn router(ctx: AppCtx) -> Router {
    Router::new()
        .route("/api/status", get(api_status))
        .route("/api/refresh", post(api_refresh))
        .route("/api/actuators/{subpath}", post(api_toggle))
        .with_state(ctx)
}

async fn api_status(State(ctx): State<AppCtx>) -> Json<StatusResponse> {
    let st = ctx.shared.read().await;
    Json(StatusResponse {
        rows: view::derive_rows(st.snapshot.as_ref()),
        actuators: ActuatorId::ALL
            .into_iter()
            .map(|id| ActuatorStatus {
                id: id.subpath(),
                label: id.label(),
                on: st.actuators.commanded(id),
            })
            .collect(),
        last_update: st.last_update,
        error: st.error.map(|e| e.message()),
        refreshing: st.refreshing,
        events: st.events.iter().rev().cloned().collect(),
    })
}

/// Queue a manual refresh. The poll loop owns all polling, so this only
/// nudges it; a refresh already queued is good enough.
async fn api_refresh(State(ctx): State<AppCtx>) -> StatusCode {
    match ctx.refresh_tx.try_send(()) {
        Ok(()) | Err(mpsc::error::TrySendError::Full(())) => StatusCode::ACCEPTED,
        Err(mpsc::error::TrySendError::Closed(())) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Toggle one actuator. Rejected while the actuator's commanded state has
/// never been observed — the same rule that renders the control disabled.
async fn api_toggle(
    State(ctx): State<AppCtx>,
    Path(subpath): Path<String>,
    Json(body): Json<ToggleBody>,
) -> Result<StatusCode, (StatusCode, String)> {
    let id = ActuatorId::from_subpath(&subpath)
        .ok_or((StatusCode::NOT_FOUND, format!("unknown actuator '{subpath}'")))?;

    if ctx.shared.read().await.actuators.commanded(id).is_none() {
        return Err((
            StatusCode::CONFLICT,
            format!("actuator '{id}' has no observed state yet"),
        ));
    }

    // Fire-and-forget: a failed write surfaces through the error slot in
    // /api/status, not through this response.
    dispatch::set_actuator(&ctx.store, &ctx.shared, id, body.on).await;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Server entry-point
// ---------------------------------------------------------------------------

pub async fn serve(ctx: AppCtx, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind panel port {port}"))?;

    info!("panel api listening on http://{addr}");

    axum::serve(listener, router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("panel api server error")
}

async fn shutdown_signal() {
    // Ctrl-C / SIGINT ends the serve future, which in turn lets main tear
    // down the poll loop.
    let _ = tokio::signal::ctrl_c().await;
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::snapshot::MetricsSnapshot;
    use crate::state::PanelState;
    use axum::body::Body;
    use axum::http::{header, Request};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use tokio::sync::RwLock;
    use tower::util::ServiceExt;

    fn test_ctx() -> (AppCtx, mpsc::Receiver<()>) {
        // Store client pointing nowhere; tests that dispatch use their own.
        let cfg = Config::build("http://127.0.0.1:9", "esp32/metrics", 5000, 0);
        let (tx, rx) = mpsc::channel(1);
        (
            AppCtx {
                shared: Arc::new(RwLock::new(PanelState::new())),
                store: StoreClient::new(&cfg).unwrap(),
                refresh_tx: tx,
            },
            rx,
        )
    }

    async fn seed_poll(ctx: &AppCtx, doc: Value) {
        let mut st = ctx.shared.write().await;
        let epochs = st.actuators.epochs();
        st.record_poll_success(MetricsSnapshot::from_value(&doc), &epochs);
    }

    async fn get_status(ctx: &AppCtx) -> Value {
        let res = router(ctx.clone())
            .oneshot(Request::builder().uri("/api/status").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn toggle_request(subpath: &str, on: bool) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/api/actuators/{subpath}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(format!(r#"{{"on": {on}}}"#)))
            .unwrap()
    }

    // -- /api/status --------------------------------------------------------

    #[tokio::test]
    async fn status_before_first_poll() {
        let (ctx, _rx) = test_ctx();
        let body = get_status(&ctx).await;

        assert_eq!(body["rows"].as_array().unwrap().len(), 5);
        assert_eq!(body["rows"][0]["value"], "–");
        assert_eq!(body["rows"][0]["badge"], "sin dato");
        assert_eq!(body["last_update"], Value::Null);
        assert_eq!(body["error"], Value::Null);
        assert_eq!(body["refreshing"], false);
        for a in body["actuators"].as_array().unwrap() {
            assert_eq!(a["on"], Value::Null);
        }
    }

    #[tokio::test]
    async fn status_reflects_polled_state() {
        let (ctx, _rx) = test_ctx();
        seed_poll(
            &ctx,
            json!({
                "air_conditions": {"temperature_c": 24.5, "status": "ok"},
                "grow_light": {"commanded_on": true}
            }),
        )
        .await;

        let body = get_status(&ctx).await;
        assert_eq!(body["rows"][0]["value"], "24.5");
        assert_eq!(body["rows"][0]["badge"], "óptimo");
        assert!(body["last_update"].is_string());

        let grow = body["actuators"]
            .as_array()
            .unwrap()
            .iter()
            .find(|a| a["id"] == "grow_light")
            .unwrap();
        assert_eq!(grow["on"], true);
        assert_eq!(grow["label"], "Luz artificial");
    }

    #[tokio::test]
    async fn status_surfaces_error_banner() {
        let (ctx, _rx) = test_ctx();
        ctx.shared.write().await.record_poll_failure();

        let body = get_status(&ctx).await;
        assert_eq!(body["error"], "Error obteniendo métricas desde el almacén remoto");
    }

    // -- /api/refresh -------------------------------------------------------

    #[tokio::test]
    async fn refresh_queues_a_manual_poll() {
        let (ctx, mut rx) = test_ctx();
        let res = router(ctx.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
        assert!(rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn refresh_with_full_queue_still_accepted() {
        let (ctx, _rx) = test_ctx();
        ctx.refresh_tx.try_send(()).unwrap(); // fill the 1-slot queue

        let res = router(ctx.clone())
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/refresh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::ACCEPTED);
    }

    // -- /api/actuators/{subpath} -------------------------------------------

    #[tokio::test]
    async fn toggle_unknown_actuator_is_404() {
        let (ctx, _rx) = test_ctx();
        let res = router(ctx.clone())
            .oneshot(toggle_request("co2_valve", true))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn toggle_with_unobserved_state_is_409() {
        let (ctx, _rx) = test_ctx();
        let res = router(ctx.clone())
            .oneshot(toggle_request("grow_light", true))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn toggle_dispatches_once_state_is_known() {
        let (ctx, _rx) = test_ctx();
        seed_poll(&ctx, json!({"humidifier": {"commanded_on": false}})).await;

        // The store client points nowhere, so the write fails — but the
        // dispatch is fire-and-forget and the optimistic state must stand.
        let res = router(ctx.clone())
            .oneshot(toggle_request("humidifier", true))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::NO_CONTENT);

        let st = ctx.shared.read().await;
        assert_eq!(st.actuators.commanded(ActuatorId::Humidifier), Some(true));
        assert!(st.error.is_some());
    }
}
