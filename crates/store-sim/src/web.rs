use anyhow::{Context, Result};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use axum::Router;
use serde_json::Value;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{debug, info};

use crate::doc::{self, SharedDoc};

// ---------------------------------------------------------------------------
// Routes
// ---------------------------------------------------------------------------

pub fn router(doc: SharedDoc) -> Router {
    Router::new()
        .route("/{*path}", get(get_node).patch(patch_node))
        .with_state(doc)
}

/// Read any node. Cache-buster query parameters are accepted and ignored.
async fn get_node(State(doc): State<SharedDoc>, Path(path): Path<String>) -> Response {
    let Some(node_path) = path.strip_suffix(".json") else {
        return (StatusCode::NOT_FOUND, "expected a .json path").into_response();
    };

    let root = doc.read().await;
    let node = doc::get_path(&root, node_path).cloned().unwrap_or(Value::Null);
    Json(node).into_response()
}

/// Partial write: shallow-merge an object body into the addressed node.
async fn patch_node(
    State(doc): State<SharedDoc>,
    Path(path): Path<String>,
    Json(body): Json<Value>,
) -> Response {
    let Some(node_path) = path.strip_suffix(".json") else {
        return (StatusCode::NOT_FOUND, "expected a .json path").into_response();
    };
    let Value::Object(update) = body else {
        return (StatusCode::BAD_REQUEST, "PATCH body must be a JSON object").into_response();
    };

    {
        let mut root = doc.write().await;
        doc::patch_path(&mut root, node_path, &update);
    }
    debug!(path = node_path, "patched");

    // The store echoes the written data.
    Json(Value::Object(update)).into_response()
}

// ---------------------------------------------------------------------------
// Server entry-point
// ---------------------------------------------------------------------------

pub async fn serve(doc: SharedDoc, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind store port {port}"))?;

    info!("store-sim listening on http://{addr}");

    axum::serve(listener, router(doc))
        .await
        .context("store-sim server error")
}

// ===========================================================================
// Tests
// ===========================================================================
