//! Experiment event forwarding
//!
//! The host notifies the extension about experiment lifecycle changes. Every
//! notification is translated into a Splunk custom event:
//!
//! | Endpoint | Forwarded |
//! |----------|-----------|
//! | `/events/experiment-started` | always |
//! | `/events/experiment-completed` | always, clears stored steps of the execution |
//! | `/events/experiment-step-started` | always, stores the step |
//! | `/events/experiment-step-completed` | always |
//! | `/events/experiment-target-started` | only for targets of attack steps |
//! | `/events/experiment-target-completed` | only for targets of attack steps |

mod forwarder;
mod store;
pub mod types;

use thiserror::Error;

pub use forwarder::{
    CATEGORY, EVENT_TYPE, EventForwarder, base_tags, execution_tags, step_tags, target_dimensions,
    target_tags,
};
pub use store::StepExecutionStore;
pub use types::EventRequestBody;

/// Errors that reject an event notification
#[derive(Debug, Error)]
pub enum EventError {
    #[error("Failed to decode event request body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Event is missing the '{0}' field")]
    MissingField(&'static str),
}

/// Result type for event handling
pub type EventResult<T> = Result<T, EventError>;

/// Lifecycle notifications the extension listens to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    ExperimentStarted,
    ExperimentCompleted,
    StepStarted,
    StepCompleted,
    TargetStarted,
    TargetCompleted,
}

impl EventKind {
    pub const ALL: [EventKind; 6] = [
        EventKind::ExperimentStarted,
        EventKind::ExperimentCompleted,
        EventKind::StepStarted,
        EventKind::StepCompleted,
        EventKind::TargetStarted,
        EventKind::TargetCompleted,
    ];

    /// Endpoint path of the listener
    pub fn path(&self) -> &'static str {
        match self {
            EventKind::ExperimentStarted => "/events/experiment-started",
            EventKind::ExperimentCompleted => "/events/experiment-completed",
            EventKind::StepStarted => "/events/experiment-step-started",
            EventKind::StepCompleted => "/events/experiment-step-completed",
            EventKind::TargetStarted => "/events/experiment-target-started",
            EventKind::TargetCompleted => "/events/experiment-target-completed",
        }
    }

    /// Host event names routed to the listener
    pub fn listen_to(&self) -> &'static [&'static str] {
        match self {
            EventKind::ExperimentStarted => &["experiment.execution.created"],
            EventKind::ExperimentCompleted => &[
                "experiment.execution.completed",
                "experiment.execution.failed",
                "experiment.execution.canceled",
                "experiment.execution.errored",
            ],
            EventKind::StepStarted => &["experiment.execution.step-started"],
            EventKind::StepCompleted => &[
                "experiment.execution.step-completed",
                "experiment.execution.step-canceled",
                "experiment.execution.step-errored",
                "experiment.execution.step-failed",
            ],
            EventKind::TargetStarted => &["experiment.execution.target-started"],
            EventKind::TargetCompleted => &[
                "experiment.execution.target-completed",
                "experiment.execution.target-canceled",
                "experiment.execution.target-errored",
                "experiment.execution.target-failed",
            ],
        }
    }

    /// Parse a notification body
    pub fn decode(body: &[u8]) -> EventResult<EventRequestBody> {
        Ok(serde_json::from_slice(body)?)
    }
}
