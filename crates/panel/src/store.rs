//! HTTP client for the remote document store (Firebase RTDB REST dialect):
//! cache-bypassing reads of the metrics document and single-field PATCH
//! writes to actuator sub-documents.

use anyhow::{bail, Context, Result};
use reqwest::header;
use serde_json::{json, Value};
use std::time::Duration;

use crate::actuator::ActuatorId;
use crate::config::Config;

/// Per-request ceiling; a hung read must not stall the poll loop past the
/// next tick for long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Clone)]
pub struct StoreClient {
    http: reqwest::Client,
    store_base: String,
    metrics_path: String,
}

impl StoreClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            store_base: config.store_base.clone(),
            metrics_path: config.metrics_path.clone(),
        })
    }

    fn metrics_url(&self) -> String {
        format!("{}/{}.json", self.store_base, self.metrics_path)
    }

    fn actuator_url(&self, id: ActuatorId) -> String {
        format!("{}/{}/{}.json", self.store_base, self.metrics_path, id.subpath())
    }

    /// Read the full metrics document. The `ts` query parameter defeats
    /// intermediary caches; `Cache-Control: no-store` covers the rest.
    pub async fn fetch_metrics(&self) -> Result<Value> {
        let res = self
            .http
            .get(self.metrics_url())
            .query(&[("ts", now_unix_ms().to_string())])
            .header(header::CACHE_CONTROL, "no-store")
            .send()
            .await
            .context("metrics request failed")?;

        if !res.status().is_success() {
            bail!("HTTP {}", res.status());
        }

        res.json::<Value>()
            .await
            .context("metrics body is not valid JSON")
    }

    /// Partial write of one actuator's commanded state. The body carries
    /// exactly one field so sibling fields under the sub-document survive.
    pub async fn patch_actuator(&self, id: ActuatorId, on: bool) -> Result<()> {
        let res = self
            .http
            .patch(self.actuator_url(id))
            .json(&json!({ "commanded_on": on }))
            .send()
            .await
            .with_context(|| format!("command write for '{id}' failed"))?;

        if !res.status().is_success() {
            bail!("HTTP {}", res.status());
        }
        Ok(())
    }
}

fn now_unix_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

// ===========================================================================
// Tests
// ===========================================================================
