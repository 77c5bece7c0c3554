//! Detector incident check
//!
//! Polls the incidents of one detector and compares their anomaly state with
//! the expected state.
//!
//! # Classification
//!
//! - `allTheTime`: every incident must carry the expected state. Unless the
//!   expectation is [`NO_INCIDENTS`], an empty incident list fails as well.
//! - `atLeastOnce`: one incident with the expected state anywhere in the
//!   window is enough.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::trace;

use super::metric::{Metric, MetricState};
use super::traits::{
    CheckError, CheckState, Observation, StatusCheck, SubjectAttributes, VerdictError,
};
use crate::api::types::{
    ActionDescription, ActionParameter, ParameterType, TargetSelection, Widget,
};
use crate::client::{Incident, SplunkClient};
use crate::discovery::detector as attrs;

/// Expectation that the detector has no incidents at all
pub const NO_INCIDENTS: &str = "No Incidents";
pub const ANOMALOUS: &str = "ANOMALOUS";
pub const MANUALLY_RESOLVED: &str = "MANUALLY_RESOLVED";
pub const OK: &str = "OK";
pub const STOPPED: &str = "STOPPED";

pub const ACTION_ID: &str = "com.steadybit.extension_splunk.detector.check";
pub const METRIC_NAME: &str = "splunk_detector_incident_state";

/// Widget colour of an anomaly state
pub fn incident_metric_state(anomaly_state: &str) -> MetricState {
    match anomaly_state {
        OK | MANUALLY_RESOLVED => MetricState::Success,
        STOPPED => MetricState::Warn,
        ANOMALOUS => MetricState::Danger,
        _ => MetricState::Info,
    }
}

/// Checks the anomaly state of a detector's incidents
pub struct DetectorCheck {
    client: SplunkClient,
    console_url: String,
}

impl DetectorCheck {
    pub fn new(client: SplunkClient, console_url: impl Into<String>) -> Self {
        Self {
            client,
            console_url: console_url.into(),
        }
    }
}

#[async_trait]
impl StatusCheck for DetectorCheck {
    type Record = Incident;

    fn id(&self) -> &'static str {
        ACTION_ID
    }

    fn describe(&self) -> ActionDescription {
        ActionDescription::check(
            ACTION_ID,
            "Check Detector Incidents",
            "Check if the detector has active incidents.",
            TargetSelection::by_attribute(attrs::TARGET_TYPE, attrs::ID, "Find Detector by id"),
            "1s",
        )
        .with_parameters(vec![
            ActionParameter::new("duration", "Duration", ParameterType::Duration)
                .with_default("30s")
                .required(),
            ActionParameter::new(
                "checkNewIncidentsOnly",
                "Check New Incidents Only",
                ParameterType::Boolean,
            )
            .with_default("false"),
            ActionParameter::new(
                "expectedStateList",
                "Expected Incident Anomaly State",
                ParameterType::String,
            )
            .with_option("No Incidents At All", NO_INCIDENTS)
            .with_option("Anomalous", ANOMALOUS)
            .with_option("Manually resolved", MANUALLY_RESOLVED)
            .with_option("Ok", OK)
            .with_option("Stopped", STOPPED)
            .with_order(2)
            .required(),
            super::state_check_mode_parameter(),
        ])
        .with_widget(Widget::state_over_time("Splunk Detector Incidents State"))
    }

    fn subject_attributes(&self) -> SubjectAttributes {
        SubjectAttributes {
            id: attrs::ID,
            name: attrs::NAME,
        }
    }

    async fn fetch(&self, state: &CheckState) -> Result<Observation<Incident>, CheckError> {
        let incidents = self
            .client
            .incidents(&state.subject_id)
            .await
            .map_err(|e| {
                CheckError::client(
                    format!(
                        "Failed to retrieve detector incidents from Splunk for detector {}",
                        state.subject_id
                    ),
                    e,
                )
            })?;
        trace!(detector = %state.subject_id, incidents = incidents.len(), "Incidents fetched");
        Ok(Observation::new(incidents))
    }

    fn updated_at(&self, incident: &Incident) -> DateTime<Utc> {
        incident.updated_at()
    }

    fn verify_all_the_time(
        &self,
        observation: &Observation<Incident>,
        state: &CheckState,
    ) -> Option<VerdictError> {
        if let Some(incident) = observation
            .records
            .iter()
            .find(|incident| incident.anomaly_state != state.expected_state)
        {
            return Some(VerdictError::failed(format!(
                "One of the incidents of the detector '{}' has state '{}' whereas '{}' is expected.",
                state.subject_name, incident.anomaly_state, state.expected_state
            )));
        }

        if state.expected_state != NO_INCIDENTS && observation.records.is_empty() {
            return Some(VerdictError::failed(format!(
                "No incidents found for detector '{}' whereas incident(s) with '{}' state is expected.",
                state.subject_name, state.expected_state
            )));
        }

        None
    }

    fn observed(&self, observation: &Observation<Incident>, state: &CheckState) -> bool {
        if state.expected_state == NO_INCIDENTS && observation.records.is_empty() {
            return true;
        }
        observation
            .records
            .iter()
            .any(|incident| incident.anomaly_state == state.expected_state)
    }

    fn never_observed(&self, state: &CheckState) -> VerdictError {
        VerdictError::failed(format!(
            "Detector '{}' incidents didn't have status '{}' at least once.",
            state.subject_name, state.expected_state
        ))
    }

    fn to_metric(&self, state: &CheckState, incident: &Incident, now: DateTime<Utc>) -> Metric {
        Metric::new(
            METRIC_NAME,
            state.subject_id.clone(),
            state.subject_name.clone(),
            incident_metric_state(&incident.anomaly_state),
            format!("Detector incident state is: {}", incident.anomaly_state),
            format!("{}/#/detector-wizard/{}/edit", self.console_url, state.subject_id),
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::traits::{CheckMode, evaluate};
    use chrono::Duration;

    fn check() -> DetectorCheck {
        let client = SplunkClient::api("http://127.0.0.1:9", "token").unwrap();
        DetectorCheck::new(client, "https://app.us1.signalfx.com")
    }

    fn state(expected: &str, mode: CheckMode) -> CheckState {
        let now = Utc::now();
        CheckState {
            subject_id: "det1".into(),
            subject_name: "Checkout errors".into(),
            check_new_only: false,
            start: now,
            end: now + Duration::seconds(30),
            expected_state: expected.into(),
            check_mode: mode,
            success: false,
        }
    }

    fn incident(anomaly_state: &str) -> Incident {
        Incident {
            incident_id: format!("inc-{anomaly_state}"),
            detector_id: "det1".into(),
            anomaly_state: anomaly_state.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_metric_states() {
        assert_eq!(incident_metric_state(ANOMALOUS), MetricState::Danger);
        assert_eq!(incident_metric_state(OK), MetricState::Success);
        assert_eq!(incident_metric_state(MANUALLY_RESOLVED), MetricState::Success);
        assert_eq!(incident_metric_state(STOPPED), MetricState::Warn);
        assert_eq!(incident_metric_state("SOMETHING_NEW"), MetricState::Info);
    }

    #[test]
    fn test_all_the_time_matching_incidents_pass() {
        let observation = Observation::new(vec![incident(ANOMALOUS), incident(ANOMALOUS)]);
        let state = state(ANOMALOUS, CheckMode::AllTheTime);
        assert!(check().verify_all_the_time(&observation, &state).is_none());
    }

    #[test]
    fn test_all_the_time_reports_first_mismatch() {
        let observation = Observation::new(vec![
            incident(ANOMALOUS),
            incident(OK),
            incident(STOPPED),
        ]);
        let state = state(ANOMALOUS, CheckMode::AllTheTime);
        let error = check().verify_all_the_time(&observation, &state).unwrap();
        assert_eq!(
            error.title,
            "One of the incidents of the detector 'Checkout errors' has state 'OK' whereas 'ANOMALOUS' is expected."
        );
    }

    #[test]
    fn test_all_the_time_empty_fails_unless_no_incidents_expected() {
        let empty = Observation::new(Vec::new());

        let error = check()
            .verify_all_the_time(&empty, &state(ANOMALOUS, CheckMode::AllTheTime))
            .unwrap();
        assert!(error.title.starts_with("No incidents found for detector 'Checkout errors'"));

        assert!(
            check()
                .verify_all_the_time(&empty, &state(NO_INCIDENTS, CheckMode::AllTheTime))
                .is_none()
        );
    }

    #[test]
    fn test_no_incidents_expected_but_incident_present() {
        let observation = Observation::new(vec![incident(OK)]);
        let state = state(NO_INCIDENTS, CheckMode::AllTheTime);
        let error = check().verify_all_the_time(&observation, &state).unwrap();
        assert!(error.title.contains("has state 'OK' whereas 'No Incidents' is expected"));
    }

    #[test]
    fn test_at_least_once_observation() {
        let state = state(STOPPED, CheckMode::AtLeastOnce);
        let check = check();
        assert!(check.observed(&Observation::new(vec![incident(OK), incident(STOPPED)]), &state));
        assert!(!check.observed(&Observation::new(vec![incident(OK)]), &state));
        assert!(!check.observed(&Observation::new(Vec::new()), &state));

        let none_expected = self::state(NO_INCIDENTS, CheckMode::AtLeastOnce);
        assert!(check.observed(&Observation::new(Vec::new()), &none_expected));
    }

    #[test]
    fn test_never_observed_title() {
        let error = check().never_observed(&state(OK, CheckMode::AtLeastOnce));
        assert_eq!(
            error.title,
            "Detector 'Checkout errors' incidents didn't have status 'OK' at least once."
        );
    }

    #[test]
    fn test_metric_projection() {
        let state = state(ANOMALOUS, CheckMode::AllTheTime);
        let now = Utc::now();
        let metric = check().to_metric(&state, &incident(STOPPED), now);
        assert_eq!(metric.name, METRIC_NAME);
        assert_eq!(metric.get("splunk.metric.id"), Some("det1"));
        assert_eq!(metric.get("splunk.metric.label"), Some("Checkout errors"));
        assert_eq!(metric.state(), Some("warn"));
        assert_eq!(metric.get("tooltip"), Some("Detector incident state is: STOPPED"));
        assert_eq!(
            metric.get("url"),
            Some("https://app.us1.signalfx.com/#/detector-wizard/det1/edit")
        );
        assert_eq!(metric.timestamp, now);
    }

    #[test]
    fn test_description() {
        let description = check().describe();
        assert_eq!(description.id, ACTION_ID);
        assert_eq!(description.target_selection.target_type, attrs::TARGET_TYPE);
        assert_eq!(description.status.call_interval.as_deref(), Some("1s"));
        let names: Vec<_> = description.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "duration",
                "checkNewIncidentsOnly",
                "expectedStateList",
                "stateCheckMode"
            ]
        );
        assert_eq!(description.parameters[2].options.len(), 5);
    }

    #[tokio::test]
    async fn test_fetch_transport_failure_is_client_error() {
        let mut state = state(ANOMALOUS, CheckMode::AllTheTime);
        let result = evaluate(&check(), &mut state, Utc::now()).await;
        assert!(matches!(result, Err(CheckError::Client { .. })));
    }
}
