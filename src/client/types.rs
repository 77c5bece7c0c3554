//! Splunk Observability API Types
//!
//! These types mirror the JSON payloads of the Splunk Observability Cloud REST API:
//! - `GET /v2/detector` - detector list
//! - `GET /v2/detector/{id}/incidents` - incidents of a detector
//! - `POST /v2/slo/search` - SLO search with alert-trigger filters
//! - `POST /v2/event` - ingest of custom events
//!
//! Only the fields the extension reads are required; everything else is
//! optional so that API additions never break decoding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Convert an epoch-milliseconds timestamp into a UTC datetime
///
/// Out-of-range values clamp to the Unix epoch.
pub fn from_epoch_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Decode a JSON `null` like a missing field
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Paged detector list
/// Endpoint: GET /v2/detector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectorList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<Detector>,
}

/// Detector definition
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detector {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default)]
    pub detector_origin: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_updated: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub teams: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rules: Vec<DetectorRule>,
}

/// Single detection rule of a detector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectorRule {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub detect_label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub disabled: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity: String,
}

/// Incident raised by a detector
/// Endpoint: GET /v2/detector/{id}/incidents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incident {
    #[serde(default, deserialize_with = "null_as_default")]
    pub incident_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub detector_id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub detector_name: String,
    /// ANOMALOUS, OK, MANUALLY_RESOLVED, STOPPED, ...
    #[serde(default, deserialize_with = "null_as_default")]
    pub anomaly_state: String,
    /// Epoch milliseconds of the last anomaly state change
    #[serde(default, deserialize_with = "null_as_default")]
    pub anomaly_state_update_timestamp: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub active: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub detect_label: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub severity: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_muted: bool,
}

impl Incident {
    /// Time of the last anomaly state change
    pub fn updated_at(&self) -> DateTime<Utc> {
        from_epoch_millis(self.anomaly_state_update_timestamp)
    }
}

/// SLO search result
/// Endpoint: POST /v2/slo/search
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SloList {
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: Vec<Slo>,
}

/// Service level objective
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slo {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub indicator: Option<String>,
    #[serde(default)]
    pub creator: Option<String>,
    #[serde(default, rename = "type")]
    pub slo_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub created: i64,
    /// Epoch milliseconds of the last update
    #[serde(default, deserialize_with = "null_as_default")]
    pub last_updated: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub targets: Vec<SloTarget>,
}

impl Slo {
    pub fn updated_at(&self) -> DateTime<Utc> {
        from_epoch_millis(self.last_updated)
    }

    /// Alert rule types (BREACH, BURN_RATE, ...) that currently have triggered alerts
    pub fn triggered_alert_types(&self) -> Vec<&str> {
        self.targets
            .iter()
            .flat_map(|t| t.slo_alert_rules.iter())
            .filter(|r| r.alerts_triggered)
            .map(|r| r.rule_type.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloTarget {
    #[serde(default)]
    pub compliance_period: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slo: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub slo_alert_rules: Vec<SloAlertRule>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloAlertRule {
    #[serde(default, deserialize_with = "null_as_default")]
    pub alerts_triggered: bool,
    #[serde(default, deserialize_with = "null_as_default", rename = "type")]
    pub rule_type: String,
}

/// Body of `POST /v2/slo/search`
///
/// Each alert category is an independent filter flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SloSearchRequest {
    pub breach_alerts_triggered: bool,
    pub burn_rate_alerts_triggered: bool,
    pub error_budget_left_alerts_triggered: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub slo_ids: Vec<String>,
}

/// Custom event accepted by the ingest API
/// Endpoint: POST /v2/event (body is a JSON array of events)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestEvent {
    pub category: String,
    pub event_type: String,
    #[serde(default)]
    pub dimensions: HashMap<String, String>,
    #[serde(default)]
    pub properties: HashMap<String, String>,
    /// Epoch milliseconds
    pub timestamp: i64,
}
