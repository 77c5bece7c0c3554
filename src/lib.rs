//! extension-splunk - Splunk Observability extension for chaos experiments
//!
//! Lets a chaos-engineering host discover Splunk detectors and SLOs, check
//! their incidents and alerts while an experiment runs, and mirrors experiment
//! lifecycle events into Splunk.
//!
//! ## Architecture
//!
//! The host drives everything over HTTP:
//! - Loads the manifest and descriptions of actions and discoveries
//! - Polls the discovered targets once a minute
//! - Prepares a check, then calls its status endpoint until it completes
//! - Posts experiment lifecycle events
//!
//! The extension keeps no check state of its own: the host hands the state
//! back on every call.
//!
//! ## Modules
//!
//! - [`client`] - HTTP client for the Splunk Observability API
//! - [`checks`] - Status-check engine, detector and SLO checks
//! - [`discovery`] - Detector and SLO inventory
//! - [`events`] - Experiment event forwarding
//! - [`config`] - Configuration parsing
//! - [`api`] - Extension HTTP API

pub mod api;
pub mod checks;
pub mod client;
pub mod config;
pub mod discovery;
pub mod events;
