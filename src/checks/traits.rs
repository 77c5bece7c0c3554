//! Check traits and the shared status evaluation
//!
//! A check is prepared once and then polled by the host until it reports
//! completion. Between calls the host keeps the [`CheckState`] and hands it
//! back on every status call; the extension itself holds nothing.
//!
//! The per-call flow is the same for every variant:
//!
//! 1. fetch the current records of the subject
//! 2. optionally drop records not updated since the check started
//! 3. classify according to the [`CheckMode`]
//! 4. report `completed` once the deadline has passed
//! 5. project every remaining record into a display metric
//!
//! Variants only decide how records are fetched, what counts as a match and
//! how a record is displayed ([`StatusCheck`]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::metric::Metric;
use crate::api::types::{ActionDescription, PrepareRequest};
use crate::client::SplunkError;

/// Errors that abort a prepare or status call
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Target is missing the '{0}' attribute.")]
    MissingAttribute(&'static str),

    #[error("Invalid check configuration: {0}")]
    Config(String),

    #[error("{context}")]
    Client {
        context: String,
        #[source]
        source: SplunkError,
    },
}

impl CheckError {
    pub fn client(context: impl Into<String>, source: SplunkError) -> Self {
        CheckError::Client {
            context: context.into(),
            source,
        }
    }
}

/// How often the expected state has to be observed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CheckMode {
    /// Every observation must match
    #[default]
    AllTheTime,
    /// One matching observation within the window suffices
    AtLeastOnce,
}

impl CheckMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckMode::AllTheTime => "allTheTime",
            CheckMode::AtLeastOnce => "atLeastOnce",
        }
    }
}

impl std::fmt::Display for CheckMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Progress of one check, round-tripped through the host
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckState {
    /// Detector or SLO id
    pub subject_id: String,
    /// Detector or SLO display name
    pub subject_name: String,
    /// Only consider records updated after `start`
    pub check_new_only: bool,
    pub start: DateTime<Utc>,
    /// Deadline; the check completes once reached
    pub end: DateTime<Utc>,
    pub expected_state: String,
    pub check_mode: CheckMode,
    /// Set once the expected state was observed (AtLeastOnce); never reset
    pub success: bool,
}

/// Failure reported inside an otherwise normal verdict
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerdictError {
    pub title: String,
    pub status: VerdictErrorStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerdictErrorStatus {
    Failed,
    Errored,
}

impl VerdictError {
    pub fn failed(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            status: VerdictErrorStatus::Failed,
        }
    }
}

/// Outcome of one status call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckVerdict {
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<VerdictError>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

impl CheckVerdict {
    pub fn passed(&self) -> bool {
        self.error.is_none()
    }
}

/// Records fetched for one status call
///
/// `count` is the number of matches the API reported. It only differs from
/// `records.len()` until the records are filtered.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation<R> {
    pub records: Vec<R>,
    pub count: usize,
}

impl<R> Observation<R> {
    pub fn new(records: Vec<R>) -> Self {
        let count = records.len();
        Self { records, count }
    }

    pub fn with_count(records: Vec<R>, count: usize) -> Self {
        Self { records, count }
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Keep only records matching `keep`; the count follows the records
    pub fn retain(&mut self, keep: impl FnMut(&R) -> bool) {
        self.records.retain(keep);
        self.count = self.records.len();
    }
}

/// Target attributes identifying the subject of a check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubjectAttributes {
    pub id: &'static str,
    pub name: &'static str,
}

/// Typed form of the configuration bag sent with `prepare`
#[derive(Debug, Clone, PartialEq)]
pub struct CheckParameters {
    /// Check window in milliseconds
    pub duration_ms: u64,
    /// Expected state; several values are joined with `,`
    pub expected_state: String,
    pub check_mode: CheckMode,
    pub check_new_only: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Text(String),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Text(s) => s.trim().eq_ignore_ascii_case("true"),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawParameters {
    duration: Option<f64>,
    expected_state_list: Option<OneOrMany>,
    state_check_mode: Option<CheckMode>,
    #[serde(alias = "checkNewIncidentsOnly", alias = "checkNewAlertsOnly")]
    check_new_only: Option<Flag>,
}

impl CheckParameters {
    /// Decode and validate the host's configuration bag
    pub fn from_config(
        config: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, CheckError> {
        let raw: RawParameters = serde_json::from_value(serde_json::Value::Object(config.clone()))
            .map_err(|e| CheckError::Config(e.to_string()))?;

        let duration = raw
            .duration
            .ok_or_else(|| CheckError::Config("'duration' is required".into()))?;
        if !duration.is_finite() || duration < 0.0 {
            return Err(CheckError::Config(format!(
                "'duration' must be a non-negative number of milliseconds, got {duration}"
            )));
        }

        let expected_state = match raw.expected_state_list {
            Some(OneOrMany::One(value)) => value,
            Some(OneOrMany::Many(values)) => values.join(","),
            None => String::new(),
        };
        if expected_state.trim().is_empty() {
            return Err(CheckError::Config("'expectedStateList' is required".into()));
        }

        Ok(Self {
            duration_ms: duration as u64,
            expected_state,
            check_mode: raw.state_check_mode.unwrap_or_default(),
            check_new_only: raw.check_new_only.is_some_and(|f| f.is_set()),
        })
    }
}

/// Build the initial state of a check from a prepare request
///
/// Fails before any network activity when the target lacks the subject
/// attributes or the configuration is invalid.
pub fn prepare_state(
    attributes: SubjectAttributes,
    request: &PrepareRequest,
    now: DateTime<Utc>,
) -> Result<CheckState, CheckError> {
    let target_attributes = request
        .target
        .as_ref()
        .map(|t| &t.attributes)
        .ok_or(CheckError::MissingAttribute(attributes.id))?;

    let first_value = |name: &'static str| {
        target_attributes
            .get(name)
            .and_then(|values| values.first())
            .filter(|value| !value.is_empty())
            .cloned()
            .ok_or(CheckError::MissingAttribute(name))
    };
    let subject_id = first_value(attributes.id)?;
    let subject_name = first_value(attributes.name)?;

    let parameters = CheckParameters::from_config(&request.config)?;
    let duration = chrono::Duration::milliseconds(
        i64::try_from(parameters.duration_ms).unwrap_or(i64::MAX),
    );
    let end = now.checked_add_signed(duration).unwrap_or(DateTime::<Utc>::MAX_UTC);

    Ok(CheckState {
        subject_id,
        subject_name,
        check_new_only: parameters.check_new_only,
        start: now,
        end,
        expected_state: parameters.expected_state,
        check_mode: parameters.check_mode,
        success: false,
    })
}

/// A check variant: how to fetch, match and display the records of a subject
///
/// Each variant supplies its own rule per mode: `verify_all_the_time` for
/// [`CheckMode::AllTheTime`], `observed` and `never_observed` for
/// [`CheckMode::AtLeastOnce`].
#[async_trait]
pub trait StatusCheck: Send + Sync {
    type Record: Send + Sync;

    /// Action id, also the path prefix of the lifecycle endpoints
    fn id(&self) -> &'static str;

    /// Description served to the host
    fn describe(&self) -> ActionDescription;

    /// Target attributes carrying the subject id and name
    fn subject_attributes(&self) -> SubjectAttributes;

    /// Variant-specific validation of a freshly prepared state
    fn validate(&self, _state: &CheckState) -> Result<(), CheckError> {
        Ok(())
    }

    /// Fetch the current records of the subject
    async fn fetch(&self, state: &CheckState) -> Result<Observation<Self::Record>, CheckError>;

    /// Last update time, used by the new-only filter
    fn updated_at(&self, record: &Self::Record) -> DateTime<Utc>;

    /// AllTheTime rule: the failure to report for this observation, if any
    fn verify_all_the_time(
        &self,
        observation: &Observation<Self::Record>,
        state: &CheckState,
    ) -> Option<VerdictError>;

    /// AtLeastOnce rule: whether this observation shows the expected state
    fn observed(&self, observation: &Observation<Self::Record>, state: &CheckState) -> bool;

    /// AtLeastOnce failure once the deadline passed without a match
    fn never_observed(&self, state: &CheckState) -> VerdictError;

    /// Display metric of one record
    fn to_metric(&self, state: &CheckState, record: &Self::Record, now: DateTime<Utc>) -> Metric;
}

/// Run one status call of a check
///
/// Fetch errors abort the call. Otherwise the state may be updated (the
/// sticky `success` flag) and a verdict with one metric per record returned.
pub async fn evaluate<C>(
    check: &C,
    state: &mut CheckState,
    now: DateTime<Utc>,
) -> Result<CheckVerdict, CheckError>
where
    C: StatusCheck + ?Sized,
{
    let mut observation = check.fetch(state).await?;

    if state.check_new_only {
        let start = state.start;
        observation.retain(|record| check.updated_at(record) > start);
    }

    let completed = now >= state.end;

    let error = match state.check_mode {
        CheckMode::AllTheTime => check.verify_all_the_time(&observation, state),
        CheckMode::AtLeastOnce => {
            if check.observed(&observation, state) {
                state.success = true;
            }
            if completed && !state.success {
                Some(check.never_observed(state))
            } else {
                None
            }
        }
    };

    let metrics: Vec<Metric> = observation
        .records
        .iter()
        .map(|record| check.to_metric(state, record, now))
        .collect();

    debug!(
        check = check.id(),
        subject = %state.subject_id,
        records = observation.count,
        completed = completed,
        failed = error.is_some(),
        "Status evaluated"
    );

    Ok(CheckVerdict {
        completed,
        error,
        metrics,
    })
}

/// Object-safe action interface used by the registry and the HTTP layer
#[async_trait]
pub trait Action: Send + Sync {
    fn id(&self) -> &'static str;

    fn describe(&self) -> ActionDescription;

    fn prepare(
        &self,
        request: &PrepareRequest,
        now: DateTime<Utc>,
    ) -> Result<CheckState, CheckError>;

    async fn status(
        &self,
        state: &mut CheckState,
        now: DateTime<Utc>,
    ) -> Result<CheckVerdict, CheckError>;
}

#[async_trait]
impl<T> Action for T
where
    T: StatusCheck,
{
    fn id(&self) -> &'static str {
        StatusCheck::id(self)
    }

    fn describe(&self) -> ActionDescription {
        StatusCheck::describe(self)
    }

    fn prepare(
        &self,
        request: &PrepareRequest,
        now: DateTime<Utc>,
    ) -> Result<CheckState, CheckError> {
        let state = prepare_state(self.subject_attributes(), request, now)?;
        self.validate(&state)?;
        Ok(state)
    }

    async fn status(
        &self,
        state: &mut CheckState,
        now: DateTime<Utc>,
    ) -> Result<CheckVerdict, CheckError> {
        evaluate(self, state, now).await
    }
}
