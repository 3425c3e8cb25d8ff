//! Stateful greenhouse conditions simulator for local development.
//!
//! Each metric evolves as a random walk with mean reversion so consecutive
//! documents look like a real greenhouse rather than white noise. Status
//! tags come from fixed bands, the way the firmware writer reports them.
//! The simulator only ever writes the four sensor blocks; actuator
//! sub-documents belong to whoever PATCHes them.

use serde_json::{json, Map, Value};
use std::ops::RangeInclusive;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info};

use crate::doc::{self, SharedDoc};

// ---------------------------------------------------------------------------
// Random-walk helpers
// ---------------------------------------------------------------------------

/// One walk step: uniform noise of at most `step`, pulled back toward
/// `center`, clamped to the physical range.
fn walk(value: f64, step: f64, center: f64, reversion: f64, range: RangeInclusive<f64>) -> f64 {
    let noise = (fastrand::f64() * 2.0 - 1.0) * step;
    let pull = reversion * (center - value);
    (value + noise + pull).clamp(*range.start(), *range.end())
}

/// Band a reading: inside `ok` → "ok", inside `warn` → "warn", else "bad".
fn band_status(v: f64, ok: RangeInclusive<f64>, warn: RangeInclusive<f64>) -> &'static str {
    if ok.contains(&v) {
        "ok"
    } else if warn.contains(&v) {
        "warn"
    } else {
        "bad"
    }
}

fn worse(a: &'static str, b: &'static str) -> &'static str {
    let rank = |s: &str| match s {
        "ok" => 0,
        "warn" => 1,
        _ => 2,
    };
    if rank(a) >= rank(b) {
        a
    } else {
        b
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

// ---------------------------------------------------------------------------
// Simulator
// ---------------------------------------------------------------------------

pub struct GreenhouseSim {
    temperature_c: f64,
    humidity_pct: f64,
    soil_pct: f64,
    light_pct: f64,
    /// Tank fill fraction 0..1; drains slowly and gets "refilled" when it
    /// runs out, so both level statuses show up over a long session.
    tank_frac: f64,
}

impl GreenhouseSim {
    pub fn new() -> Self {
        Self {
            temperature_c: 22.0,
            humidity_pct: 55.0,
            soil_pct: 50.0,
            light_pct: 60.0,
            tank_frac: 0.8,
        }
    }

    /// Advance every metric one step and build the document update.
    pub fn tick(&mut self) -> Map<String, Value> {
        self.temperature_c = walk(self.temperature_c, 0.6, 23.0, 0.02, 5.0..=45.0);
        self.humidity_pct = walk(self.humidity_pct, 1.5, 55.0, 0.02, 0.0..=100.0);
        self.soil_pct = walk(self.soil_pct, 1.0, 45.0, 0.01, 0.0..=100.0);
        self.light_pct = walk(self.light_pct, 3.0, 60.0, 0.03, 0.0..=100.0);

        self.tank_frac -= 0.002 + fastrand::f64() * 0.002;
        if self.tank_frac <= 0.02 {
            self.tank_frac = 1.0;
        }

        let air_status = worse(
            band_status(self.temperature_c, 18.0..=28.0, 10.0..=35.0),
            band_status(self.humidity_pct, 40.0..=70.0, 25.0..=85.0),
        );
        let tank_status = if self.tank_frac < 0.25 {
            "agua_insuficiente"
        } else {
            "nivel_optimo"
        };

        let update = json!({
            "air_conditions": {
                "temperature_c": round1(self.temperature_c),
                "relative_humidity_pct": round1(self.humidity_pct),
                "status": air_status,
            },
            "soil_moisture": {
                "percent": round1(self.soil_pct),
                "status": band_status(self.soil_pct, 35.0..=70.0, 20.0..=85.0),
            },
            "water_tank_level": {
                "status": tank_status,
            },
            "ambient_light": {
                "percent": round1(self.light_pct),
                "status": band_status(self.light_pct, 30.0..=90.0, 10.0..=100.0),
            },
        });
        match update {
            Value::Object(map) => map,
            _ => unreachable!("update literal is an object"),
        }
    }
}

impl Default for GreenhouseSim {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Publishing loop
// ---------------------------------------------------------------------------

/// Keep the sensor blocks of the metrics document alive. Intended to be
/// `tokio::spawn`-ed from main; the first write lands immediately.
pub async fn run(doc: SharedDoc, metrics_path: String, tick_every: Duration) {
    let mut sim = GreenhouseSim::new();
    let mut ticker = interval(tick_every);

    info!(path = %metrics_path, tick_ms = tick_every.as_millis() as u64, "simulator started");

    loop {
        ticker.tick().await;
        let update = sim.tick();
        {
            let mut root = doc.write().await;
            doc::patch_path(&mut root, &metrics_path, &update);
        }
        debug!("sensor document updated");
    }
}

// ===========================================================================
// Tests
// ===========================================================================
