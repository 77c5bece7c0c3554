//! Splunk Test Kit
//!
//! Test infrastructure for the Splunk extension.
//!
//! This crate provides:
//! - JSON fixtures shaped like Splunk Observability API payloads
//! - A mock Splunk API server built on `wiremock`
//!
//! # Example
//!
//! ```rust
//! use splunk_testkit::fixtures;
//!
//! let incident = fixtures::incident("inc1", "ANOMALOUS", 1_741_019_530_000);
//! assert_eq!(incident["anomalyState"], "ANOMALOUS");
//! ```

pub mod fixtures;
pub mod mock;

pub use mock::MockSplunkApi;
