//! Experiment lifecycle event types
//!
//! Bodies the host posts to the event listener endpoints. Only the fields the
//! forwarder reads are modelled; unknown fields are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Body of every event listener call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRequestBody {
    pub id: Uuid,
    pub event_name: String,
    pub event_time: DateTime<Utc>,
    #[serde(default)]
    pub environment: Option<Environment>,
    #[serde(default)]
    pub tenant: Option<Tenant>,
    #[serde(default)]
    pub team: Option<Team>,
    #[serde(default)]
    pub experiment_execution: Option<ExperimentExecution>,
    #[serde(default)]
    pub experiment_step_execution: Option<StepExecution>,
    #[serde(default)]
    pub experiment_step_target_execution: Option<TargetExecution>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Tenant {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Team {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperimentExecution {
    /// Numeric execution id (sent as a JSON number)
    pub execution_id: f64,
    #[serde(default)]
    pub experiment_key: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub started_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Action,
    Wait,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Attack,
    Check,
    LoadTest,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepExecution {
    pub id: Uuid,
    pub execution_id: f64,
    #[serde(default)]
    pub experiment_key: String,
    #[serde(rename = "type")]
    pub step_type: StepType,
    #[serde(default)]
    pub action_id: Option<String>,
    #[serde(default)]
    pub action_name: Option<String>,
    #[serde(default)]
    pub action_kind: Option<ActionKind>,
    #[serde(default)]
    pub custom_label: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetExecution {
    pub id: Uuid,
    pub execution_id: f64,
    #[serde(default)]
    pub experiment_key: String,
    pub step_execution_id: Uuid,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub started_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ended_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub target_name: Option<String>,
    #[serde(default)]
    pub target_attributes: HashMap<String, Vec<String>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_step_started_event() {
        let json = r#"{
            "id": "8d3b2c5e-2f7c-4c51-9b3e-1d9c8e4b7a21",
            "eventName": "experiment.execution.step-started",
            "eventTime": "2025-03-03T16:32:10Z",
            "environment": {"id": "env", "name": "Global"},
            "tenant": {"key": "demo", "name": "Demo"},
            "experimentExecution": {
                "executionId": 42,
                "experimentKey": "ADM-1",
                "name": "Kill pods",
                "startedTime": "2025-03-03T16:32:00Z"
            },
            "experimentStepExecution": {
                "id": "b1c7f4a2-9d3e-4f8a-8c2b-5e6d7f8a9b0c",
                "executionId": 42,
                "experimentKey": "ADM-1",
                "type": "action",
                "actionId": "com.steadybit.extension_kubernetes.delete_pod",
                "actionKind": "attack"
            }
        }"#;
        let event: EventRequestBody = serde_json::from_str(json).unwrap();
        assert!(event.team.is_none());
        let step = event.experiment_step_execution.unwrap();
        assert_eq!(step.step_type, StepType::Action);
        assert_eq!(step.action_kind, Some(ActionKind::Attack));
        assert_eq!(step.execution_id, 42.0);
    }

    #[test]
    fn test_unknown_kinds_decode_as_other() {
        let kind: ActionKind = serde_json::from_str(r#""advice""#).unwrap();
        assert_eq!(kind, ActionKind::Other);
        let step_type: StepType = serde_json::from_str(r#""parallel""#).unwrap();
        assert_eq!(step_type, StepType::Other);
    }
}
