//! Splunk Observability API Client
//!
//! Hand-written client for the detector, SLO and ingest endpoints.

mod splunk;
mod types;

pub use splunk::{AuthScheme, SplunkClient, SplunkError, SplunkResult};
pub use types::*;
