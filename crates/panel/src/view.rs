//! Pure derivation of the five display rows from a snapshot. No side
//! effects and no clock: same snapshot in, same rows out.

use serde::Serialize;

use crate::snapshot::{MetricsSnapshot, StatusTag, TankLevel};

/// Rendered in place of any value the document did not provide.
pub const PLACEHOLDER: &str = "–";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricRow {
    pub label: &'static str,
    pub value: String,
    pub unit: &'static str,
    pub status: StatusTag,
    pub badge: &'static str,
}

/// Derive the five metric rows. `None` (nothing polled yet) renders the
/// same as an empty document: placeholders everywhere.
pub fn derive_rows(snapshot: Option<&MetricsSnapshot>) -> Vec<MetricRow> {
    let empty = MetricsSnapshot::default();
    let snap = snapshot.unwrap_or(&empty);

    let (tank_value, tank_status) = match snap.tank {
        TankLevel::Optimal => ("Óptimo", StatusTag::Ok),
        TankLevel::Insufficient => ("Bajo", StatusTag::Bad),
        TankLevel::Unknown => (PLACEHOLDER, StatusTag::Muted),
    };

    vec![
        row("Temperatura aire", number(snap.air.temperature_c), "°C", snap.air.status),
        // The air block carries one status for both of its readings.
        row(
            "Humedad relativa",
            number(snap.air.relative_humidity_pct),
            "%",
            snap.air.status,
        ),
        row("Humedad suelo", number(snap.soil.percent), "%", snap.soil.status),
        row("Nivel agua de riego", tank_value.to_string(), "", tank_status),
        row("Luz ambiental", number(snap.light.percent), "%", snap.light.status),
    ]
}

fn row(label: &'static str, value: String, unit: &'static str, status: StatusTag) -> MetricRow {
    MetricRow {
        label,
        value,
        unit,
        status,
        badge: status.badge_text(),
    }
}

/// Display a numeric reading, or the placeholder when it was absent or not
/// numeric. Whole numbers drop the fraction (24.0 renders as "24").
fn number(value: Option<f64>) -> String {
    match value {
        Some(v) => format!("{v}"),
        None => PLACEHOLDER.to_string(),
    }
}

// ===========================================================================
// Tests
// ===========================================================================
