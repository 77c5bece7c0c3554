//! Configuration parsing
//!
//! The extension is configured through environment variables (or the matching
//! command-line flags):
//!
//! ```text
//! STEADYBIT_EXTENSION_ACCESS_TOKEN=<token>
//! STEADYBIT_EXTENSION_API_BASE_URL=https://api.us1.signalfx.com
//! STEADYBIT_EXTENSION_INGEST_BASE_URL=https://ingest.us1.signalfx.com
//! STEADYBIT_EXTENSION_DISCOVERY_ATTRIBUTES_EXCLUDES_DETECTOR=splunk.detector.creator
//! STEADYBIT_EXTENSION_DISCOVERY_ATTRIBUTES_EXCLUDES_SLO=splunk.slo.creator
//! ```
//!
//! The first three are required; the extension refuses to start without them.

mod extension;

pub use extension::{ConfigError, ExtensionConfig};
