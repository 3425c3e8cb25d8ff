//! Tolerant view of the remote metrics document. The store is schemaless:
//! any field may be missing, extra, or carry the wrong type, and none of
//! that may ever abort a poll. Parsing therefore probes a `serde_json::Value`
//! field by field instead of deserializing into a strict shape.

use serde::Serialize;
use serde_json::Value;

use crate::actuator::ActuatorId;

// ---------------------------------------------------------------------------
// Status tags
// ---------------------------------------------------------------------------

/// Qualitative status attached to a metric by the remote writer. The input
/// set is open-ended; anything unrecognized degrades to `Muted`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTag {
    Ok,
    Bad,
    Warn,
    #[default]
    Muted,
}

impl StatusTag {
    pub fn parse(raw: Option<&Value>) -> Self {
        match raw.and_then(Value::as_str) {
            Some("ok") => StatusTag::Ok,
            Some("bad") => StatusTag::Bad,
            Some("warn") => StatusTag::Warn,
            _ => StatusTag::Muted,
        }
    }

    /// Fixed, total badge-text mapping.
    pub fn badge_text(self) -> &'static str {
        match self {
            StatusTag::Ok => "óptimo",
            StatusTag::Bad => "crítico",
            StatusTag::Warn => "alerta",
            StatusTag::Muted => "sin dato",
        }
    }
}

/// Water tank level is categorical, not numeric: the remote writer reports
/// one of two known strings, and everything else renders as no-data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TankLevel {
    Optimal,
    Insufficient,
    #[default]
    Unknown,
}

impl TankLevel {
    pub fn parse(raw: Option<&Value>) -> Self {
        match raw.and_then(Value::as_str) {
            Some("nivel_optimo") => TankLevel::Optimal,
            Some("agua_insuficiente") => TankLevel::Insufficient,
            _ => TankLevel::Unknown,
        }
    }
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AirConditions {
    pub temperature_c: Option<f64>,
    pub relative_humidity_pct: Option<f64>,
    /// One status for the whole air block; drives both air rows.
    pub status: StatusTag,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoilMoisture {
    pub percent: Option<f64>,
    pub status: StatusTag,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AmbientLight {
    pub percent: Option<f64>,
    pub status: StatusTag,
}

/// Full set of readings and actuator commanded-states as of one successful
/// poll. Replaced wholesale; never merged field-by-field with a predecessor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub air: AirConditions,
    pub soil: SoilMoisture,
    pub tank: TankLevel,
    pub light: AmbientLight,
    commanded: [Option<bool>; 4],
}

impl MetricsSnapshot {
    /// Parse any JSON value into a snapshot. Total: wrong shapes yield the
    /// same result as absent fields.
    pub fn from_value(doc: &Value) -> Self {
        let air = doc.get("air_conditions");
        let soil = doc.get("soil_moisture");
        let tank = doc.get("water_tank_level");
        let light = doc.get("ambient_light");

        let mut commanded = [None; 4];
        for id in ActuatorId::ALL {
            commanded[id.index()] = doc
                .get(id.subpath())
                .and_then(|a| a.get("commanded_on"))
                .and_then(Value::as_bool);
        }

        Self {
            air: AirConditions {
                temperature_c: num_field(air, "temperature_c"),
                relative_humidity_pct: num_field(air, "relative_humidity_pct"),
                status: StatusTag::parse(air.and_then(|a| a.get("status"))),
            },
            soil: SoilMoisture {
                percent: num_field(soil, "percent"),
                status: StatusTag::parse(soil.and_then(|s| s.get("status"))),
            },
            tank: TankLevel::parse(tank.and_then(|t| t.get("status"))),
            light: AmbientLight {
                percent: num_field(light, "percent"),
                status: StatusTag::parse(light.and_then(|l| l.get("status"))),
            },
            commanded,
        }
    }

    /// Commanded-on state observed for one actuator, `None` when the field
    /// was absent or not a boolean.
    pub fn commanded(&self, id: ActuatorId) -> Option<bool> {
        self.commanded[id.index()]
    }
}

fn num_field(parent: Option<&Value>, key: &str) -> Option<f64> {
    parent.and_then(|p| p.get(key)).and_then(Value::as_f64)
}

// ===========================================================================
// Tests
// ===========================================================================
