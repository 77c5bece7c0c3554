//! JSON fixtures for Splunk API responses
//!
//! Field names follow the REST API wire format, so fixtures can be served
//! as-is by [`crate::MockSplunkApi`].

use serde_json::{Value, json};

/// Detector as returned by `GET /v2/detector`
pub fn detector(id: &str, name: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "description": format!("{name} detector"),
        "status": "ACTIVE",
        "creator": "GlHA2unAgAA",
        "detectorOrigin": "Standard",
        "created": 1_741_000_000_000_i64,
        "lastUpdated": 1_741_000_000_000_i64,
        "tags": [],
        "teams": [],
        "rules": [{
            "detectLabel": format!("{name} rule"),
            "disabled": false,
            "severity": "Critical"
        }]
    })
}

/// Paged list wrapper used by detector and SLO endpoints
pub fn list(results: Vec<Value>) -> Value {
    json!({
        "count": results.len(),
        "results": results,
    })
}

/// Incident as returned by `GET /v2/detector/{id}/incidents`
///
/// `updated_ms` is the anomaly state change time in epoch milliseconds.
pub fn incident(id: &str, anomaly_state: &str, updated_ms: i64) -> Value {
    json!({
        "incidentId": id,
        "anomalyState": anomaly_state,
        "anomalyStateUpdateTimestamp": updated_ms,
        "active": anomaly_state == "ANOMALOUS",
        "detectLabel": "APM - Sudden change in service request rate",
        "severity": "Critical",
        "isMuted": false,
        "events": []
    })
}

/// SLO as returned by `POST /v2/slo/search`
///
/// Every rule type in `triggered` gets an alert rule with
/// `alertsTriggered: true`.
pub fn slo(id: &str, name: &str, triggered: &[&str], last_updated_ms: i64) -> Value {
    let rules: Vec<Value> = triggered
        .iter()
        .map(|rule_type| json!({"type": rule_type, "alertsTriggered": true}))
        .collect();
    json!({
        "id": id,
        "name": name,
        "description": format!("{name} objective"),
        "type": "RequestBased",
        "creator": "GlHA2unAgAA",
        "created": 1_741_000_000_000_i64,
        "lastUpdated": last_updated_ms,
        "targets": [{
            "compliancePeriod": "30d",
            "slo": 99.5,
            "sloAlertRules": rules
        }]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_counts_results() {
        let value = list(vec![detector("d1", "One"), detector("d2", "Two")]);
        assert_eq!(value["count"], 2);
        assert_eq!(value["results"][1]["id"], "d2");
    }

    #[test]
    fn test_slo_alert_rules() {
        let value = slo("s1", "Latency", &["BREACH", "BURN_RATE"], 0);
        let rules = value["targets"][0]["sloAlertRules"].as_array().unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0]["type"], "BREACH");
        assert_eq!(rules[1]["alertsTriggered"], true);
    }

    #[test]
    fn test_incident_activity_follows_state() {
        assert_eq!(incident("i1", "ANOMALOUS", 0)["active"], true);
        assert_eq!(incident("i1", "OK", 0)["active"], false);
    }
}
