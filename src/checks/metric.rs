//! Display metrics for the state-over-time widget
//!
//! Every classified record becomes one metric. The widget reads the
//! `splunk.metric.id`, `splunk.metric.label`, `state`, `tooltip` and `url`
//! keys; the numeric value is unused.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Widget colour of a metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricState {
    Danger,
    Success,
    Warn,
    Info,
}

impl MetricState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricState::Danger => "danger",
            MetricState::Success => "success",
            MetricState::Warn => "warn",
            MetricState::Info => "info",
        }
    }
}

impl std::fmt::Display for MetricState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metric as consumed by the host
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metric {
    pub name: String,
    pub metric: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Metric {
    pub fn new(
        name: &str,
        id: String,
        label: String,
        state: MetricState,
        tooltip: String,
        url: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let metric = BTreeMap::from([
            ("splunk.metric.id".to_string(), id),
            ("splunk.metric.label".to_string(), label),
            ("state".to_string(), state.to_string()),
            ("tooltip".to_string(), tooltip),
            ("url".to_string(), url),
        ]);
        Self {
            name: name.to_string(),
            metric,
            timestamp,
            value: 0.0,
        }
    }

    /// Value of one of the metric keys
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metric.get(key).map(String::as_str)
    }

    pub fn state(&self) -> Option<&str> {
        self.get("state")
    }
}

/// Web console base URL derived from the API base URL
///
/// `https://api.us1.signalfx.com/` becomes `https://app.us1.signalfx.com`.
pub fn web_console_url(api_base_url: &str) -> String {
    api_base_url
        .replacen("https://api", "https://app", 1)
        .trim_end_matches('/')
        .to_string()
}
