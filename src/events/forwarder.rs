//! Event forwarder
//!
//! Turns experiment lifecycle events into Splunk custom events and posts them
//! to the ingest API. Posting happens in a background task; the host is
//! answered without waiting for Splunk.

use chrono::{SecondsFormat, Utc};
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::store::StepExecutionStore;
use super::types::{
    ActionKind, EventRequestBody, ExperimentExecution, StepExecution, StepType, TargetExecution,
};
use super::{EventError, EventKind, EventResult};
use crate::client::{IngestEvent, SplunkClient};

pub const CATEGORY: &str = "USER_DEFINED";
pub const EVENT_TYPE: &str = "Steadybit_Event";

type Tags = HashMap<String, String>;

fn rfc3339(time: &chrono::DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Numeric ids are sent as JSON numbers; tags carry them without fraction
fn format_id(id: f64) -> String {
    format!("{id:.0}")
}

/// Tags shared by every event
pub fn base_tags(event: &EventRequestBody) -> Tags {
    let mut tags = Tags::from([
        ("source".to_string(), "Steadybit".to_string()),
        ("event".to_string(), event.event_name.clone()),
        ("event_id".to_string(), event.id.to_string()),
        (
            "env".to_string(),
            event
                .environment
                .as_ref()
                .map(|e| e.name.clone())
                .unwrap_or_default(),
        ),
    ]);
    let tenant = event.tenant.clone().unwrap_or_default();
    tags.insert("tenant".into(), tenant.name);
    tags.insert("tenant_key".into(), tenant.key);

    if let Some(team) = &event.team {
        tags.insert("team_name".into(), team.name.clone());
        tags.insert("team_key".into(), team.key.clone());
    }
    tags
}

/// Tags of the experiment execution; `started_time` falls back to now
pub fn execution_tags(execution: Option<&ExperimentExecution>) -> Tags {
    let Some(execution) = execution else {
        return Tags::new();
    };
    let mut tags = Tags::from([
        ("exec_id".to_string(), format_id(execution.execution_id)),
        ("exp_key".to_string(), execution.experiment_key.clone()),
        ("exp_name".to_string(), execution.name.clone()),
        (
            "started_time".to_string(),
            rfc3339(&execution.started_time.unwrap_or_else(Utc::now)),
        ),
    ]);
    if let Some(ended) = &execution.ended_time {
        tags.insert("ended_time".into(), rfc3339(ended));
    }
    tags
}

pub fn step_tags(step: &StepExecution) -> Tags {
    let mut tags = Tags::from([
        ("step_exec_id".to_string(), format_id(step.execution_id)),
        ("step_exp_key".to_string(), step.experiment_key.clone()),
        ("step_id".to_string(), step.id.to_string()),
    ]);
    if step.step_type == StepType::Action {
        if let Some(action_id) = &step.action_id {
            tags.insert("step_action_id".into(), action_id.clone());
        }
    }
    if let Some(name) = &step.action_name {
        tags.insert("step_name".into(), name.clone());
    }
    if let Some(label) = &step.custom_label {
        tags.insert("step_label".into(), label.clone());
    }
    tags
}

pub fn target_tags(target: &TargetExecution) -> Tags {
    let mut tags = Tags::from([
        ("execution_id".to_string(), format_id(target.execution_id)),
        ("execution_state".to_string(), target.state.clone()),
    ]);
    if let Some(started) = &target.started_time {
        tags.insert("started_time".into(), rfc3339(started));
    }
    if let Some(ended) = &target.ended_time {
        tags.insert("ended_time".into(), rfc3339(ended));
    }
    tags
}

/// Copy a single-valued target attribute into a dimension
fn translate(dimensions: &mut Tags, target: &TargetExecution, attribute: &str, dimension: &str) {
    if let Some([value]) = target.target_attributes.get(attribute).map(Vec::as_slice) {
        dimensions.insert(dimension.to_string(), value.clone());
    }
}

/// Splunk dimensions derived from the target attributes
pub fn target_dimensions(target: &TargetExecution) -> Tags {
    let mut dimensions = Tags::new();
    let attributes = &target.target_attributes;

    if attributes.contains_key("k8s.cluster-name") {
        for (attribute, dimension) in [
            ("k8s.cluster-name", "k8s.cluster.name"),
            ("k8s.namespace", "k8s.namespace.name"),
            ("k8s.deployment", "k8s.deployment.name"),
            ("k8s.pod.name", "clustername"),
            ("k8s.container.name", "k8s.container.name"),
        ] {
            translate(&mut dimensions, target, attribute, dimension);
        }
    }

    for attribute in ["container.host", "host.hostname", "application.hostname"] {
        translate(&mut dimensions, target, attribute, "host.name");
    }
    translate(&mut dimensions, target, "container.id.stripped", "container.id");

    if attributes.contains_key("aws.region") {
        dimensions.insert("cloud.provider".into(), "aws".into());
        for (attribute, dimension) in [
            ("aws.region", "cloud.region"),
            ("aws.zone", "cloud.availability_zone"),
            ("aws.account", "cloud.account.id"),
        ] {
            translate(&mut dimensions, target, attribute, dimension);
        }
    }

    dimensions
}

fn ingest_event(event: &EventRequestBody, properties: Tags, dimensions: Tags) -> IngestEvent {
    IngestEvent {
        category: CATEGORY.to_string(),
        event_type: EVENT_TYPE.to_string(),
        dimensions,
        properties,
        timestamp: event.event_time.timestamp_millis(),
    }
}

/// Forwards lifecycle events to the Splunk ingest API
#[derive(Debug, Clone)]
pub struct EventForwarder {
    client: SplunkClient,
    store: StepExecutionStore,
}

impl EventForwarder {
    pub fn new(client: SplunkClient, store: StepExecutionStore) -> Self {
        Self { client, store }
    }

    pub fn store(&self) -> &StepExecutionStore {
        &self.store
    }

    /// Build the ingest event for a lifecycle event, updating the step store
    ///
    /// `Ok(None)` means the event is not forwarded.
    pub fn build(
        &self,
        kind: EventKind,
        event: &EventRequestBody,
    ) -> EventResult<Option<IngestEvent>> {
        match kind {
            EventKind::ExperimentStarted => Ok(Some(self.experiment_event(event))),
            EventKind::ExperimentCompleted => {
                if let Some(execution) = &event.experiment_execution {
                    let removed = self.store.remove_execution(execution.execution_id);
                    debug!(
                        execution_id = %format_id(execution.execution_id),
                        removed,
                        "Step executions removed"
                    );
                }
                Ok(Some(self.experiment_event(event)))
            }
            EventKind::StepStarted => {
                let step = event
                    .experiment_step_execution
                    .as_ref()
                    .ok_or(EventError::MissingField("experimentStepExecution"))?;
                self.store.insert(step.clone());
                Ok(Some(self.step_event(event, step)))
            }
            EventKind::StepCompleted => {
                let step = event
                    .experiment_step_execution
                    .as_ref()
                    .ok_or(EventError::MissingField("experimentStepExecution"))?;
                Ok(Some(self.step_event(event, step)))
            }
            EventKind::TargetStarted | EventKind::TargetCompleted => Ok(self.target_event(event)),
        }
    }

    fn experiment_event(&self, event: &EventRequestBody) -> IngestEvent {
        let mut tags = base_tags(event);
        tags.extend(execution_tags(event.experiment_execution.as_ref()));
        ingest_event(event, tags, Tags::new())
    }

    fn step_event(&self, event: &EventRequestBody, step: &StepExecution) -> IngestEvent {
        let mut tags = base_tags(event);
        tags.extend(execution_tags(event.experiment_execution.as_ref()));
        tags.extend(step_tags(step));
        ingest_event(event, tags, Tags::new())
    }

    fn target_event(&self, event: &EventRequestBody) -> Option<IngestEvent> {
        let target = event.experiment_step_target_execution.as_ref()?;

        let Some(step) = self.store.get(&target.step_execution_id) else {
            warn!(
                step_execution_id = %target.step_execution_id,
                "Could not find step infos for step execution"
            );
            return None;
        };

        if step.action_kind != Some(ActionKind::Attack) {
            return None;
        }

        let mut tags = base_tags(event);
        tags.extend(execution_tags(event.experiment_execution.as_ref()));
        tags.extend(step_tags(&step));
        tags.extend(target_tags(target));
        Some(ingest_event(event, tags, target_dimensions(target)))
    }

    /// Build and post the event in a background task
    ///
    /// Returns the posting task, or `None` when nothing is forwarded.
    pub fn forward(
        &self,
        kind: EventKind,
        event: &EventRequestBody,
    ) -> EventResult<Option<JoinHandle<()>>> {
        let Some(ingest) = self.build(kind, event)? else {
            return Ok(None);
        };

        let client = self.client.clone();
        let event_name = event.event_name.clone();
        Ok(Some(tokio::spawn(async move {
            if let Err(e) = client.post_events(&[ingest]).await {
                error!(event = %event_name, error = %e, "Failed to post event");
            }
        })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::types::{Environment, Team, Tenant};
    use chrono::TimeZone;
    use uuid::Uuid;

    fn forwarder() -> EventForwarder {
        let client = SplunkClient::ingest("http://127.0.0.1:9", "token").unwrap();
        EventForwarder::new(client, StepExecutionStore::new())
    }

    fn execution() -> ExperimentExecution {
        ExperimentExecution {
            execution_id: 42.0,
            experiment_key: "ADM-1".into(),
            name: "Kill pods".into(),
            state: None,
            started_time: Some(Utc.with_ymd_and_hms(2025, 3, 3, 16, 32, 0).unwrap()),
            ended_time: None,
        }
    }

    fn step(kind: ActionKind) -> StepExecution {
        StepExecution {
            id: Uuid::new_v4(),
            execution_id: 42.0,
            experiment_key: "ADM-1".into(),
            step_type: StepType::Action,
            action_id: Some("com.steadybit.extension_container.stop".into()),
            action_name: Some("Stop container".into()),
            action_kind: Some(kind),
            custom_label: None,
            state: None,
        }
    }

    fn event(name: &str) -> EventRequestBody {
        EventRequestBody {
            id: Uuid::new_v4(),
            event_name: name.into(),
            event_time: Utc.with_ymd_and_hms(2025, 3, 3, 16, 33, 0).unwrap(),
            environment: Some(Environment {
                id: None,
                name: "Global".into(),
            }),
            tenant: Some(Tenant {
                key: "demo".into(),
                name: "Demo".into(),
            }),
            team: None,
            experiment_execution: Some(execution()),
            experiment_step_execution: None,
            experiment_step_target_execution: None,
        }
    }

    fn target(step_id: Uuid, attributes: Vec<(&str, Vec<&str>)>) -> TargetExecution {
        TargetExecution {
            id: Uuid::new_v4(),
            execution_id: 42.0,
            experiment_key: "ADM-1".into(),
            step_execution_id: step_id,
            state: "completed".into(),
            started_time: None,
            ended_time: None,
            target_type: None,
            target_name: None,
            target_attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.into_iter().map(String::from).collect()))
                .collect(),
        }
    }

    #[test]
    fn test_experiment_started_tags() {
        let event = event("experiment.execution.created");
        let ingest = forwarder()
            .build(EventKind::ExperimentStarted, &event)
            .unwrap()
            .unwrap();

        assert_eq!(ingest.category, CATEGORY);
        assert_eq!(ingest.event_type, EVENT_TYPE);
        assert_eq!(ingest.timestamp, event.event_time.timestamp_millis());
        assert!(ingest.dimensions.is_empty());
        let p = &ingest.properties;
        assert_eq!(p["source"], "Steadybit");
        assert_eq!(p["env"], "Global");
        assert_eq!(p["tenant_key"], "demo");
        assert_eq!(p["exec_id"], "42");
        assert_eq!(p["exp_name"], "Kill pods");
        assert_eq!(p["started_time"], "2025-03-03T16:32:00Z");
        assert!(!p.contains_key("team_name"));
        assert!(!p.contains_key("ended_time"));
    }

    #[test]
    fn test_team_and_missing_started_time() {
        let mut event = event("experiment.execution.created");
        event.team = Some(Team {
            id: None,
            key: "ops".into(),
            name: "Operations".into(),
        });
        if let Some(execution) = event.experiment_execution.as_mut() {
            execution.started_time = None;
        }

        let tags = base_tags(&event);
        assert_eq!(tags["team_name"], "Operations");
        let tags = execution_tags(event.experiment_execution.as_ref());
        assert!(chrono::DateTime::parse_from_rfc3339(&tags["started_time"]).is_ok());
    }

    #[test]
    fn test_step_started_stores_step() {
        let forwarder = forwarder();
        let step = step(ActionKind::Attack);
        let mut event = event("experiment.execution.step-started");
        event.experiment_step_execution = Some(step.clone());

        let ingest = forwarder
            .build(EventKind::StepStarted, &event)
            .unwrap()
            .unwrap();
        assert_eq!(
            ingest.properties["step_action_id"],
            "com.steadybit.extension_container.stop"
        );
        assert_eq!(ingest.properties["step_id"], step.id.to_string());
        assert!(forwarder.store().get(&step.id).is_some());
    }

    #[test]
    fn test_step_event_without_step_is_rejected() {
        let event = event("experiment.execution.step-started");
        let result = forwarder().build(EventKind::StepStarted, &event);
        assert!(matches!(
            result,
            Err(EventError::MissingField("experimentStepExecution"))
        ));
    }

    #[test]
    fn test_target_event_of_attack_step() {
        let forwarder = forwarder();
        let step = step(ActionKind::Attack);
        forwarder.store().insert(step.clone());

        let mut event = event("experiment.execution.target-completed");
        event.experiment_step_target_execution = Some(target(
            step.id,
            vec![
                ("k8s.cluster-name", vec!["prod"]),
                ("k8s.namespace", vec!["shop"]),
                ("k8s.pod.name", vec!["a", "b"]),
                ("host.hostname", vec!["node-1"]),
            ],
        ));

        let ingest = forwarder
            .build(EventKind::TargetCompleted, &event)
            .unwrap()
            .unwrap();
        assert_eq!(ingest.properties["execution_id"], "42");
        assert_eq!(ingest.properties["execution_state"], "completed");
        assert_eq!(ingest.properties["step_name"], "Stop container");
        assert_eq!(ingest.dimensions["k8s.cluster.name"], "prod");
        assert_eq!(ingest.dimensions["k8s.namespace.name"], "shop");
        assert_eq!(ingest.dimensions["host.name"], "node-1");
        // Multi-valued attributes are not translated
        assert!(!ingest.dimensions.contains_key("clustername"));
    }

    #[test]
    fn test_target_event_of_check_step_is_dropped() {
        let forwarder = forwarder();
        let step = step(ActionKind::Check);
        forwarder.store().insert(step.clone());

        let mut event = event("experiment.execution.target-started");
        event.experiment_step_target_execution = Some(target(step.id, vec![]));
        assert!(
            forwarder
                .build(EventKind::TargetStarted, &event)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_target_event_with_unknown_step_is_dropped() {
        let mut event = event("experiment.execution.target-started");
        event.experiment_step_target_execution = Some(target(Uuid::new_v4(), vec![]));
        assert!(
            forwarder()
                .build(EventKind::TargetStarted, &event)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_experiment_completed_clears_steps_of_execution() {
        let forwarder = forwarder();
        forwarder.store().insert(step(ActionKind::Attack));
        let mut other = step(ActionKind::Attack);
        other.execution_id = 7.0;
        forwarder.store().insert(other);

        let event = event("experiment.execution.completed");
        forwarder
            .build(EventKind::ExperimentCompleted, &event)
            .unwrap();
        assert_eq!(forwarder.store().len(), 1);
    }

    #[test]
    fn test_aws_dimensions() {
        let target = target(
            Uuid::new_v4(),
            vec![
                ("aws.region", vec!["eu-central-1"]),
                ("aws.zone", vec!["eu-central-1a"]),
                ("aws.account", vec!["123456789012"]),
                ("container.id.stripped", vec!["abc123"]),
            ],
        );
        let dimensions = target_dimensions(&target);
        assert_eq!(dimensions["cloud.provider"], "aws");
        assert_eq!(dimensions["cloud.region"], "eu-central-1");
        assert_eq!(dimensions["cloud.availability_zone"], "eu-central-1a");
        assert_eq!(dimensions["cloud.account.id"], "123456789012");
        assert_eq!(dimensions["container.id"], "abc123");
        assert!(!dimensions.contains_key("k8s.cluster.name"));
    }

    #[test]
    fn test_no_dimensions_without_attributes() {
        let target = target(Uuid::new_v4(), vec![("k8s.namespace", vec!["shop"])]);
        assert!(target_dimensions(&target).is_empty());
    }
}
