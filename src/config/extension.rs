//! Extension configuration
//!
//! Every option can be given as a command-line flag or through the
//! corresponding `STEADYBIT_EXTENSION_*` environment variable.

use clap::Args;
use thiserror::Error;
use url::Url;

use crate::client::{SplunkClient, SplunkError};

/// Errors that can occur while validating the configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Invalid URL for {name}: {source}")]
    InvalidUrl {
        name: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("Failed to create client: {0}")]
    Client(#[from] SplunkError),
}

/// Configuration for the Splunk extension
#[derive(Debug, Clone, Args)]
pub struct ExtensionConfig {
    /// Splunk Observability access token
    #[arg(long, env = "STEADYBIT_EXTENSION_ACCESS_TOKEN", hide_env_values = true)]
    pub access_token: String,

    /// Base URL of the Splunk Observability REST API (e.g. https://api.us1.signalfx.com)
    #[arg(long, env = "STEADYBIT_EXTENSION_API_BASE_URL")]
    pub api_base_url: String,

    /// Base URL of the Splunk Observability ingest API (e.g. https://ingest.us1.signalfx.com)
    #[arg(long, env = "STEADYBIT_EXTENSION_INGEST_BASE_URL")]
    pub ingest_base_url: String,

    /// Detector target attributes to drop from discovery (comma-separated, `*` suffix for prefixes)
    #[arg(
        long,
        env = "STEADYBIT_EXTENSION_DISCOVERY_ATTRIBUTES_EXCLUDES_DETECTOR",
        value_delimiter = ','
    )]
    pub discovery_attributes_excludes_detector: Vec<String>,

    /// SLO target attributes to drop from discovery (comma-separated, `*` suffix for prefixes)
    #[arg(
        long,
        env = "STEADYBIT_EXTENSION_DISCOVERY_ATTRIBUTES_EXCLUDES_SLO",
        value_delimiter = ','
    )]
    pub discovery_attributes_excludes_slo: Vec<String>,

    /// Port of the extension HTTP API
    #[arg(long, env = "STEADYBIT_EXTENSION_PORT", default_value_t = 8083)]
    pub port: u16,

    /// Port of the health probes
    #[arg(long, env = "STEADYBIT_EXTENSION_HEALTH_PORT", default_value_t = 8084)]
    pub health_port: u16,
}

impl ExtensionConfig {
    /// Check that all required values are present and well-formed
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_token.trim().is_empty() {
            return Err(ConfigError::Invalid("access token must not be empty".into()));
        }

        for (name, value) in [
            ("api base URL", &self.api_base_url),
            ("ingest base URL", &self.ingest_base_url),
        ] {
            let url = Url::parse(value).map_err(|source| ConfigError::InvalidUrl { name, source })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::Invalid(format!(
                    "{name} must use http or https, got '{}'",
                    url.scheme()
                )));
            }
        }

        if self.port == self.health_port {
            return Err(ConfigError::Invalid(format!(
                "port and health port must differ (both {})",
                self.port
            )));
        }

        Ok(())
    }

    /// Client for the REST API (detectors, incidents, SLOs)
    pub fn api_client(&self) -> Result<SplunkClient, ConfigError> {
        Ok(SplunkClient::api(&self.api_base_url, &self.access_token)?)
    }

    /// Client for the ingest API (events)
    pub fn ingest_client(&self) -> Result<SplunkClient, ConfigError> {
        Ok(SplunkClient::ingest(
            &self.ingest_base_url,
            &self.access_token,
        )?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Debug, Parser)]
    struct TestCli {
        #[command(flatten)]
        config: ExtensionConfig,
    }

    fn parse(args: &[&str]) -> Result<ExtensionConfig, clap::Error> {
        let mut argv = vec!["extension-splunk"];
        argv.extend_from_slice(args);
        TestCli::try_parse_from(argv).map(|cli| cli.config)
    }

    const REQUIRED: [&str; 6] = [
        "--access-token",
        "secret",
        "--api-base-url",
        "https://api.us1.signalfx.com",
        "--ingest-base-url",
        "https://ingest.us1.signalfx.com",
    ];

    #[test]
    fn test_parse_required_options() {
        let config = parse(&REQUIRED).unwrap();
        assert_eq!(config.access_token, "secret");
        assert_eq!(config.port, 8083);
        assert_eq!(config.health_port, 8084);
        assert!(config.discovery_attributes_excludes_detector.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_access_token_is_rejected() {
        // Only meaningful when the variable is not set in the test environment
        if std::env::var_os("STEADYBIT_EXTENSION_ACCESS_TOKEN").is_some() {
            return;
        }
        let result = parse(&REQUIRED[2..]);
        assert!(result.is_err());
    }

    #[test]
    fn test_exclude_lists_are_comma_separated() {
        let mut args = REQUIRED.to_vec();
        args.extend([
            "--discovery-attributes-excludes-detector",
            "splunk.detector.creator,splunk.detector.description",
        ]);
        let config = parse(&args).unwrap();
        assert_eq!(
            config.discovery_attributes_excludes_detector,
            vec!["splunk.detector.creator", "splunk.detector.description"]
        );
    }

    #[test]
    fn test_invalid_api_url() {
        let mut config = parse(&REQUIRED).unwrap();
        config.api_base_url = "api.us1.signalfx.com".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_blank_token_is_invalid() {
        let mut config = parse(&REQUIRED).unwrap();
        config.access_token = "  ".into();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_clients_are_built() {
        let config = parse(&REQUIRED).unwrap();
        let api = config.api_client().unwrap();
        assert_eq!(api.base_url().as_str(), "https://api.us1.signalfx.com/");
        let ingest = config.ingest_client().unwrap();
        assert_eq!(ingest.base_url().as_str(), "https://ingest.us1.signalfx.com/");
    }
}
