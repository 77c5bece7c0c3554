//! SLO alert check
//!
//! The expected state names one or more alert categories. Each category is
//! sent to the SLO search as an independent filter flag, and the check is
//! classified on the number of SLOs the search matches.
//!
//! The [`NO_ALERTS`] expectation inverts the check: the SLO is fetched
//! unfiltered and must not have any triggered alert.

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
use crate::client::{Slo, SloSearchRequest, SplunkClient};
use crate::discovery::slo as attrs;

pub const BREACH: &str = "breach";
pub const BURN_RATE: &str = "burn rate";
pub const ERROR_BUDGET: &str = "error budget";
/// Expectation that the SLO has no triggered alerts
pub const NO_ALERTS: &str = "no alerts";

pub const ACTION_ID: &str = "com.steadybit.extension_splunk.slo.check";
pub const METRIC_NAME: &str = "splunk_slo_alert_state";

/// Parsed form of an SLO expectation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SloExpectation {
    /// No alert of any category may be triggered
    NoAlerts,
    /// Alerts of the flagged categories are expected
    Alerts {
        breach: bool,
        burn_rate: bool,
        error_budget: bool,
    },
}

impl SloExpectation {
    /// Parse an expected state; categories are matched by substring
    pub fn parse(expected: &str) -> Self {
        if expected.trim().eq_ignore_ascii_case(NO_ALERTS) {
            return SloExpectation::NoAlerts;
        }
        SloExpectation::Alerts {
            breach: expected.contains(BREACH),
            burn_rate: expected.contains(BURN_RATE),
            error_budget: expected.contains(ERROR_BUDGET),
        }
    }

    /// Whether the expectation names anything to check for
    pub fn is_valid(&self) -> bool {
        match *self {
            SloExpectation::NoAlerts => true,
            SloExpectation::Alerts {
                breach,
                burn_rate,
                error_budget,
            } => breach || burn_rate || error_budget,
        }
    }

    /// Search request for the given SLO
    pub fn search_request(&self, slo_id: &str) -> SloSearchRequest {
        let (breach, burn_rate, error_budget) = match *self {
            SloExpectation::NoAlerts => (false, false, false),
            SloExpectation::Alerts {
                breach,
                burn_rate,
                error_budget,
            } => (breach, burn_rate, error_budget),
        };
        SloSearchRequest {
            breach_alerts_triggered: breach,
            burn_rate_alerts_triggered: burn_rate,
            error_budget_left_alerts_triggered: error_budget,
            slo_ids: vec![slo_id.to_string()],
        }
    }
}

/// Whether one of the comma-separated values is the "no alerts" expectation
fn names_no_alerts(expected: &str) -> bool {
    expected
        .split(',')
        .any(|value| value.trim().eq_ignore_ascii_case(NO_ALERTS))
}

fn has_alerts(slo: &Slo) -> bool {
    !slo.triggered_alert_types().is_empty()
}

/// Checks the triggered alerts of an SLO
pub struct SloCheck {
    client: SplunkClient,
    console_url: String,
}

impl SloCheck {
    pub fn new(client: SplunkClient, console_url: impl Into<String>) -> Self {
        Self {
            client,
            console_url: console_url.into(),
        }
    }
}

#[async_trait]
impl StatusCheck for SloCheck {
    type Record = Slo;

    fn id(&self) -> &'static str {
        ACTION_ID
    }

    fn describe(&self) -> ActionDescription {
        ActionDescription::check(
            ACTION_ID,
            "Check SLO Alerts",
            "Check if the SLO has active alerts.",
            TargetSelection::by_attribute(attrs::TARGET_TYPE, attrs::ID, "Find SLO by id"),
            "2s",
        )
        .with_parameters(vec![
            ActionParameter::new("duration", "Duration", ParameterType::Duration)
                .with_default("30s")
                .required(),
            ActionParameter::new(
                "checkNewAlertsOnly",
                "Check New Alerts Only",
                ParameterType::Boolean,
            )
            .with_default("false"),
            ActionParameter::new(
                "expectedStateList",
                "Expected SLO Alerts triggered",
                ParameterType::String,
            )
            .with_option("Breach alerts triggered", BREACH)
            .with_option("Burn rate alerts triggered", BURN_RATE)
            .with_option("Error budget left alerts triggered", ERROR_BUDGET)
            .with_option("No alerts", NO_ALERTS)
            .with_order(2)
            .required(),
            super::state_check_mode_parameter(),
        ])
        .with_widget(Widget::state_over_time("Splunk SLO Active Alerts"))
    }

    fn subject_attributes(&self) -> SubjectAttributes {
        SubjectAttributes {
            id: attrs::ID,
            name: attrs::NAME,
        }
    }

    fn validate(&self, state: &CheckState) -> Result<(), CheckError> {
        let expectation = SloExpectation::parse(&state.expected_state);
        if !expectation.is_valid() {
            return Err(CheckError::Config(format!(
                "'{}' names no SLO alert category (expected '{BREACH}', '{BURN_RATE}', '{ERROR_BUDGET}' or '{NO_ALERTS}')",
                state.expected_state
            )));
        }
        if expectation != SloExpectation::NoAlerts && names_no_alerts(&state.expected_state) {
            return Err(CheckError::Config(format!(
                "'{NO_ALERTS}' cannot be combined with other SLO alert categories, got '{}'",
                state.expected_state
            )));
        }
        Ok(())
    }

    async fn fetch(&self, state: &CheckState) -> Result<Observation<Slo>, CheckError> {
        let request = SloExpectation::parse(&state.expected_state).search_request(&state.subject_id);
        let found = self.client.search_slos(&request).await.map_err(|e| {
            CheckError::client(
                format!("Failed to retrieve SLOs from Splunk for ID {}", state.subject_id),
                e,
            )
        })?;
        trace!(slo = %state.subject_id, count = found.count, "SLO search done");
        Ok(Observation::with_count(found.results, found.count))
    }

    fn updated_at(&self, slo: &Slo) -> DateTime<Utc> {
        slo.updated_at()
    }

    fn verify_all_the_time(
        &self,
        observation: &Observation<Slo>,
        state: &CheckState,
    ) -> Option<VerdictError> {
        match SloExpectation::parse(&state.expected_state) {
            SloExpectation::NoAlerts => observation.records.iter().any(has_alerts).then(|| {
                VerdictError::failed(format!(
                    "The SLO '{}' has active alerts whereas no alerts are expected.",
                    state.subject_name
                ))
            }),
            SloExpectation::Alerts { .. } => observation.is_empty().then(|| {
                VerdictError::failed(format!(
                    "The SLO '{}' has no alerts: '{}' alerts were not found.",
                    state.subject_name, state.expected_state
                ))
            }),
        }
    }

    fn observed(&self, observation: &Observation<Slo>, state: &CheckState) -> bool {
        match SloExpectation::parse(&state.expected_state) {
            SloExpectation::NoAlerts => !observation.records.iter().any(has_alerts),
            SloExpectation::Alerts { .. } => !observation.is_empty(),
        }
    }

    fn never_observed(&self, state: &CheckState) -> VerdictError {
        VerdictError::failed(format!(
            "The SLO '{}' didn't trigger '{}' alerts at least once.",
            state.subject_name, state.expected_state
        ))
    }

    fn to_metric(&self, state: &CheckState, slo: &Slo, now: DateTime<Utc>) -> Metric {
        let expected = &state.expected_state;
        let (metric_state, tooltip) = match SloExpectation::parse(expected) {
            SloExpectation::NoAlerts if !has_alerts(slo) => (
                MetricState::Info,
                format!("SLO {} with no alerts found", slo.name),
            ),
            SloExpectation::NoAlerts => (
                MetricState::Danger,
                format!(
                    "SLO {} have active {} alert",
                    slo.name,
                    slo.triggered_alert_types().join(", ")
                ),
            ),
            SloExpectation::Alerts { .. } => (
                MetricState::Danger,
                format!("SLO {} have active {expected} alert", slo.name),
            ),
        };

        Metric::new(
            METRIC_NAME,
            format!("{}-{expected}", slo.id),
            format!("{expected} active alerts"),
            metric_state,
            tooltip,
            format!("{}/#/alerts?query={}", self.console_url, slo.id),
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checks::traits::CheckMode;
    use crate::client::{SloAlertRule, SloTarget};
    use chrono::Duration;

    fn check() -> SloCheck {
        let client = SplunkClient::api("http://127.0.0.1:9", "token").unwrap();
        SloCheck::new(client, "https://app.us1.signalfx.com")
    }

    fn state(expected: &str, mode: CheckMode) -> CheckState {
        let now = Utc::now();
        CheckState {
            subject_id: "slo1".into(),
            subject_name: "Checkout latency".into(),
            check_new_only: false,
            start: now,
            end: now + Duration::seconds(30),
            expected_state: expected.into(),
            check_mode: mode,
            success: false,
        }
    }

    fn slo(alerting: bool) -> Slo {
        Slo {
            id: "slo1".into(),
            name: "Checkout latency".into(),
            targets: vec![SloTarget {
                slo_alert_rules: vec![SloAlertRule {
                    alerts_triggered: alerting,
                    rule_type: "BREACH".into(),
                }],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_expectation_parsing() {
        assert_eq!(
            SloExpectation::parse("breach,error budget"),
            SloExpectation::Alerts {
                breach: true,
                burn_rate: false,
                error_budget: true
            }
        );
        assert_eq!(SloExpectation::parse("no alerts"), SloExpectation::NoAlerts);
        assert!(!SloExpectation::parse("latency").is_valid());
    }

    #[test]
    fn test_search_request_flags() {
        let request = SloExpectation::parse("burn rate").search_request("slo1");
        assert_eq!(
            request,
            SloSearchRequest {
                breach_alerts_triggered: false,
                burn_rate_alerts_triggered: true,
                error_budget_left_alerts_triggered: false,
                slo_ids: vec!["slo1".into()],
            }
        );
        let unfiltered = SloExpectation::NoAlerts.search_request("slo1");
        assert!(!unfiltered.breach_alerts_triggered);
        assert_eq!(unfiltered.slo_ids, vec!["slo1".to_string()]);
    }

    #[test]
    fn test_all_the_time_uses_reported_count() {
        let state = state("breach", CheckMode::AllTheTime);
        let check = check();

        let found = Observation::with_count(vec![slo(true)], 1);
        assert!(check.verify_all_the_time(&found, &state).is_none());

        let none = Observation::with_count(Vec::new(), 0);
        let error = check.verify_all_the_time(&none, &state).unwrap();
        assert!(error.title.contains("no alerts"));
        assert!(error.title.contains("not found"));
    }

    #[test]
    fn test_no_alerts_expectation() {
        let state = state(NO_ALERTS, CheckMode::AllTheTime);
        let check = check();

        let quiet = Observation::new(vec![slo(false)]);
        assert!(check.verify_all_the_time(&quiet, &state).is_none());
        assert!(check.observed(&quiet, &state));

        let alerting = Observation::new(vec![slo(true)]);
        assert!(check.verify_all_the_time(&alerting, &state).is_some());
        assert!(!check.observed(&alerting, &state));
    }

    #[test]
    fn test_at_least_once() {
        let state = state("breach", CheckMode::AtLeastOnce);
        let check = check();
        assert!(check.observed(&Observation::with_count(vec![slo(true)], 1), &state));
        assert!(!check.observed(&Observation::with_count(Vec::new(), 0), &state));
        assert!(check.never_observed(&state).title.contains("didn't trigger"));
    }

    #[test]
    fn test_metric_projection() {
        let check = check();
        let now = Utc::now();

        let metric = check.to_metric(&state("breach", CheckMode::AllTheTime), &slo(true), now);
        assert_eq!(metric.name, METRIC_NAME);
        assert_eq!(metric.get("splunk.metric.id"), Some("slo1-breach"));
        assert_eq!(metric.get("splunk.metric.label"), Some("breach active alerts"));
        assert_eq!(metric.state(), Some("danger"));
        assert_eq!(
            metric.get("tooltip"),
            Some("SLO Checkout latency have active breach alert")
        );
        assert_eq!(
            metric.get("url"),
            Some("https://app.us1.signalfx.com/#/alerts?query=slo1")
        );

        let quiet = check.to_metric(&state(NO_ALERTS, CheckMode::AllTheTime), &slo(false), now);
        assert_eq!(quiet.state(), Some("info"));
        assert_eq!(
            quiet.get("tooltip"),
            Some("SLO Checkout latency with no alerts found")
        );
    }

    #[test]
    fn test_validate_rejects_unknown_category() {
        let check = check();
        assert!(check.validate(&state("breach", CheckMode::AllTheTime)).is_ok());
        assert!(matches!(
            check.validate(&state("latency", CheckMode::AllTheTime)),
            Err(CheckError::Config(_))
        ));
    }

    #[test]
    fn test_validate_rejects_no_alerts_mixed_with_categories() {
        let check = check();
        assert!(check.validate(&state("no alerts", CheckMode::AllTheTime)).is_ok());
        assert!(check.validate(&state("breach,burn rate", CheckMode::AllTheTime)).is_ok());
        for expected in ["breach,no alerts", "no alerts, error budget"] {
            assert!(matches!(
                check.validate(&state(expected, CheckMode::AllTheTime)),
                Err(CheckError::Config(_))
            ));
        }
    }

    #[test]
    fn test_description() {
        let description = check().describe();
        assert_eq!(description.id, ACTION_ID);
        assert_eq!(description.status.call_interval.as_deref(), Some("2s"));
        assert_eq!(description.parameters[1].name, "checkNewAlertsOnly");
    }
}
