//! Runtime configuration: compiled-in defaults, optional environment
//! overrides, and validation that reports every violation at once.

use anyhow::{bail, Result};
use std::env;
use std::time::Duration;

// ---------------------------------------------------------------------------
// Compiled-in defaults
// ---------------------------------------------------------------------------

pub const DEFAULT_STORE_BASE: &str =
    "https://greenhousefuture-73514-default-rtdb.firebaseio.com";
pub const DEFAULT_METRICS_PATH: &str = "esp32/metrics";
pub const DEFAULT_POLL_MS: u64 = 5000;
pub const DEFAULT_WEB_PORT: u16 = 8080;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    /// Document-store base URL, no trailing slash.
    pub store_base: String,
    /// Path of the metrics document under the base, no surrounding slashes.
    pub metrics_path: String,
    pub poll_interval: Duration,
    pub web_port: u16,
}

impl Config {
    /// Defaults overlaid with `STORE_BASE`, `METRICS_PATH`, `POLL_MS`, and
    /// `WEB_PORT` from the environment.
    pub fn from_env() -> Result<Self> {
        let store_base = env::var("STORE_BASE").unwrap_or_else(|_| DEFAULT_STORE_BASE.to_string());
        let metrics_path =
            env::var("METRICS_PATH").unwrap_or_else(|_| DEFAULT_METRICS_PATH.to_string());
        let poll_ms: u64 = env::var("POLL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_POLL_MS);
        let web_port: u16 = env::var("WEB_PORT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_WEB_PORT);

        let config = Self::build(&store_base, &metrics_path, poll_ms, web_port);
        config.validate()?;
        Ok(config)
    }

    /// Normalize the raw pieces into a config (slashes trimmed so URL
    /// assembly is uniform).
    pub fn build(store_base: &str, metrics_path: &str, poll_ms: u64, web_port: u16) -> Self {
        Self {
            store_base: store_base.trim().trim_end_matches('/').to_string(),
            metrics_path: metrics_path.trim().trim_matches('/').to_string(),
            poll_interval: Duration::from_millis(poll_ms),
            web_port,
        }
    }

    /// Validate all fields. Returns `Ok(())` or an error describing every
    /// violation found (not just the first one).
    pub fn validate(&self) -> Result<()> {
        let mut errors: Vec<String> = Vec::new();

        if self.store_base.is_empty() {
            errors.push("store base URL is empty".to_string());
        } else if !self.store_base.starts_with("http://") && !self.store_base.starts_with("https://")
        {
            errors.push(format!(
                "store base URL '{}' must start with http:// or https://",
                self.store_base
            ));
        }

        if self.metrics_path.is_empty() {
            errors.push("metrics path is empty".to_string());
        }

        if self.poll_interval.is_zero() {
            errors.push("poll interval must be positive".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            bail!(
                "config validation failed ({} error{}):\n  - {}",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
                errors.join("\n  - ")
            );
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================
