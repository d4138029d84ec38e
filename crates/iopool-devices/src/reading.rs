//! Field mapping from iopool JSON to normalized readings.

use crate::error::{PoolError, PoolResult};
use crate::mode::{normalize_mode, PoolMode};
use chrono::{DateTime, Utc};
use iopool_core::CapabilityValue;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Capability slot names.
pub mod capabilities {
    pub const TEMPERATURE: &str = "measure_temperature";
    pub const PH: &str = "measure_ph";
    pub const ORP: &str = "measure_orp";
    pub const FILTRATION_DURATION: &str = "filtration_duration";
    pub const POOL_MODE: &str = "pool_mode";
    pub const ACTION_REQUIRED: &str = "alarm_generic";
    pub const MEASURED_AT: &str = "measured_at";

    pub const ALL: [&str; 7] = [
        TEMPERATURE,
        PH,
        ORP,
        FILTRATION_DURATION,
        POOL_MODE,
        ACTION_REQUIRED,
        MEASURED_AT,
    ];
}

/// One pool telemetry snapshot.
///
/// Every field is optional; an absent field leaves the previously published
/// value in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reading {
    /// Water temperature (°C)
    pub temperature: Option<f64>,
    pub ph: Option<f64>,
    /// Oxidation-reduction potential (mV)
    pub orp: Option<f64>,
    /// Recommended filtration time (hours)
    pub filtration_duration: Option<f64>,
    pub mode: Option<PoolMode>,
    pub action_required: Option<bool>,
    /// When the pool sensor took the measure
    pub measured_at: Option<DateTime<Utc>>,
}

impl Reading {
    /// Build a reading from a pool object of the iopool API.
    ///
    /// Fields with an unexpected JSON type are treated as absent. The mode
    /// comes from `latestMeasure.mode`, falling back to the top-level `mode`.
    pub fn from_pool(pool: &Value) -> Self {
        let measure = |name: &str| pool.pointer(&format!("/latestMeasure/{}", name));

        let raw_mode = measure("mode")
            .filter(|v| !v.is_null())
            .or_else(|| pool.get("mode").filter(|v| !v.is_null()));
        let mode = raw_mode.and_then(|raw| match raw.as_str().and_then(normalize_mode) {
            Some(mode) => Some(mode),
            None => {
                warn!(
                    raw_mode = %raw,
                    "Unknown pool_mode, ignoring (expects STANDARD|OPENING|WINTER|INITIALIZATION)"
                );
                None
            }
        });

        let measured_at = measure("measuredAt")
            .and_then(Value::as_str)
            .and_then(|s| match DateTime::parse_from_rfc3339(s) {
                Ok(ts) => Some(ts.with_timezone(&Utc)),
                Err(e) => {
                    debug!(measured_at = s, "Unparseable measuredAt: {}", e);
                    None
                }
            });

        Self {
            temperature: measure("temperature").and_then(Value::as_f64),
            ph: measure("ph").and_then(Value::as_f64),
            orp: measure("orp").and_then(Value::as_f64),
            filtration_duration: pool
                .pointer("/advice/filtrationDuration")
                .and_then(Value::as_f64),
            mode,
            action_required: pool.get("hasAnActionRequired").and_then(Value::as_bool),
            measured_at,
        }
    }

    /// True when no field is present.
    pub fn is_empty(&self) -> bool {
        self.capability_values().is_empty()
    }

    /// Present fields paired with their capability slot.
    pub fn capability_values(&self) -> Vec<(&'static str, CapabilityValue)> {
        let mut values = Vec::with_capacity(capabilities::ALL.len());
        if let Some(v) = self.temperature {
            values.push((capabilities::TEMPERATURE, CapabilityValue::Number(v)));
        }
        if let Some(v) = self.ph {
            values.push((capabilities::PH, CapabilityValue::Number(v)));
        }
        if let Some(v) = self.orp {
            values.push((capabilities::ORP, CapabilityValue::Number(v)));
        }
        if let Some(v) = self.filtration_duration {
            values.push((capabilities::FILTRATION_DURATION, CapabilityValue::Number(v)));
        }
        if let Some(mode) = self.mode {
            values.push((capabilities::POOL_MODE, CapabilityValue::from(mode.as_str())));
        }
        if let Some(v) = self.action_required {
            values.push((capabilities::ACTION_REQUIRED, CapabilityValue::Boolean(v)));
        }
        if let Some(ts) = self.measured_at {
            values.push((capabilities::MEASURED_AT, CapabilityValue::Text(ts.to_rfc3339())));
        }
        values
    }
}

/// Pool entry offered during pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSummary {
    pub id: String,
    /// Display name; the id when the pool is unnamed
    pub name: String,
}

impl PoolSummary {
    /// Build a summary from a pool object. `None` when it has no string id.
    pub fn from_pool(pool: &Value) -> Option<Self> {
        let id = pool.get("id").and_then(Value::as_str)?.trim();
        if id.is_empty() {
            return None;
        }
        let name = pool
            .get("name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(id);
        Some(Self {
            id: id.to_string(),
            name: name.to_string(),
        })
    }
}

/// Parse the pool list response.
///
/// The body must be an array; entries without an id are skipped.
pub fn pools_from_json(body: &Value) -> PoolResult<Vec<PoolSummary>> {
    let entries = body
        .as_array()
        .ok_or_else(|| PoolError::Parse("pool list is not an array".to_string()))?;

    Ok(entries
        .iter()
        .filter_map(|entry| {
            let summary = PoolSummary::from_pool(entry);
            if summary.is_none() {
                warn!("Skipping pool entry without id");
            }
            summary
        })
        .collect())
}

/// Parse a pool detail response.
pub fn reading_from_json(body: &Value) -> PoolResult<Reading> {
    if !body.is_object() {
        return Err(PoolError::Parse("pool detail is not an object".to_string()));
    }
    Ok(Reading::from_pool(body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_full_pool_object() {
        let pool = json!({
            "id": "pool-1",
            "name": "Backyard",
            "latestMeasure": {
                "temperature": 24.5,
                "ph": 7.2,
                "orp": 650,
                "mode": "GATEWAY",
                "measuredAt": "2025-07-01T10:15:00.000Z"
            },
            "advice": { "filtrationDuration": 6 },
            "hasAnActionRequired": false
        });

        let reading = Reading::from_pool(&pool);
        assert_eq!(reading.temperature, Some(24.5));
        assert_eq!(reading.ph, Some(7.2));
        assert_eq!(reading.orp, Some(650.0));
        assert_eq!(reading.filtration_duration, Some(6.0));
        assert_eq!(reading.mode, Some(PoolMode::Standard));
        assert_eq!(reading.action_required, Some(false));
        assert_eq!(
            reading.measured_at.map(|ts| ts.to_rfc3339()),
            Some("2025-07-01T10:15:00+00:00".to_string())
        );
        assert_eq!(reading.capability_values().len(), 7);
    }

    #[test]
    fn test_mode_falls_back_to_top_level() {
        let pool = json!({ "mode": "wintering", "latestMeasure": { "temperature": 12.0 } });
        assert_eq!(Reading::from_pool(&pool).mode, Some(PoolMode::Winter));

        let pool = json!({ "mode": "OPEN", "latestMeasure": { "mode": null } });
        assert_eq!(Reading::from_pool(&pool).mode, Some(PoolMode::Opening));
    }

    #[test]
    fn test_unknown_mode_is_dropped() {
        let pool = json!({ "latestMeasure": { "mode": "TURBO", "ph": 7.0 } });
        let reading = Reading::from_pool(&pool);
        assert_eq!(reading.mode, None);
        assert_eq!(reading.ph, Some(7.0));
        assert!(reading
            .capability_values()
            .iter()
            .all(|(name, _)| *name != capabilities::POOL_MODE));
    }

    #[test]
    fn test_wrong_types_are_absent() {
        let pool = json!({
            "latestMeasure": { "temperature": "24.5", "ph": null, "mode": 3 },
            "advice": { "filtrationDuration": "six" },
            "hasAnActionRequired": "yes"
        });
        let reading = Reading::from_pool(&pool);
        assert_eq!(reading, Reading::default());
        assert!(reading.is_empty());
    }

    #[test]
    fn test_pool_summaries() {
        let body = json!([
            { "id": "a", "name": "Main pool" },
            { "id": "b" },
            { "id": "c", "name": "  " },
            { "name": "no id" },
            "garbage"
        ]);
        let pools = pools_from_json(&body).unwrap();
        assert_eq!(
            pools,
            vec![
                PoolSummary { id: "a".to_string(), name: "Main pool".to_string() },
                PoolSummary { id: "b".to_string(), name: "b".to_string() },
                PoolSummary { id: "c".to_string(), name: "c".to_string() },
            ]
        );
    }

    #[test]
    fn test_shape_errors() {
        assert!(matches!(
            pools_from_json(&json!({ "pools": [] })),
            Err(PoolError::Parse(_))
        ));
        assert!(matches!(reading_from_json(&json!([])), Err(PoolError::Parse(_))));
        assert!(reading_from_json(&json!({})).unwrap().is_empty());
    }
}
