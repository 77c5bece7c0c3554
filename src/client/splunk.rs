//! Splunk Observability HTTP API Client
//!
//! Provides a typed client for the Splunk Observability REST API and its
//! ingest endpoint.
//!
//! A request that never gets a response (connection refused, DNS failure,
//! undecodable success body) is an error. A response with a non-success status
//! code is logged and treated as "nothing found": the caller receives the empty
//! default value and carries on.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, trace, warn};
use url::Url;

use super::types::*;

const INGEST_TOKEN_HEADER: &str = "x-sf-token";

/// Errors that can occur when talking to the Splunk API
#[derive(Debug, Error)]
pub enum SplunkError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid access token: {0}")]
    InvalidToken(String),
}

/// Result type for Splunk API operations
pub type SplunkResult<T> = Result<T, SplunkError>;

/// How the access token is attached to requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <token>` (REST API)
    Bearer,
    /// `X-SF-Token: <token>` (ingest API)
    IngestToken,
}

/// Client for the Splunk Observability API
///
/// # Example
/// ```no_run
/// use extension_splunk::client::SplunkClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = SplunkClient::api("https://api.us1.signalfx.com", "token")?;
/// let detectors = client.detectors().await?;
/// println!("Found {} detectors", detectors.results.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct SplunkClient {
    /// Base URL, always ending with `/`
    base_url: Url,
    /// HTTP client with auth headers preconfigured
    client: Client,
}

impl SplunkClient {
    /// Create a client for the REST API (bearer auth)
    pub fn api(base_url: &str, access_token: &str) -> SplunkResult<Self> {
        Self::new(base_url, access_token, AuthScheme::Bearer)
    }

    /// Create a client for the ingest API (`X-SF-Token` auth)
    pub fn ingest(base_url: &str, access_token: &str) -> SplunkResult<Self> {
        Self::new(base_url, access_token, AuthScheme::IngestToken)
    }

    pub fn new(base_url: &str, access_token: &str, scheme: AuthScheme) -> SplunkResult<Self> {
        let base_url = normalize_base_url(base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let (name, value) = match scheme {
            AuthScheme::Bearer => (AUTHORIZATION, format!("Bearer {access_token}")),
            AuthScheme::IngestToken => (
                HeaderName::from_static(INGEST_TOKEN_HEADER),
                access_token.to_string(),
            ),
        };
        let mut value =
            HeaderValue::from_str(&value).map_err(|e| SplunkError::InvalidToken(e.to_string()))?;
        value.set_sensitive(true);
        headers.insert(name, value);

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self { base_url, client })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> SplunkResult<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    // =========================================================================
    // Detectors
    // =========================================================================

    /// List all detectors
    ///
    /// API: GET /v2/detector
    pub async fn detectors(&self) -> SplunkResult<DetectorList> {
        let url = self.endpoint("v2/detector")?;
        let response = self.client.get(url).send().await?;
        decode_or_default(response, "retrieving detectors").await
    }

    /// List the incidents of a detector
    ///
    /// API: GET /v2/detector/{id}/incidents
    pub async fn incidents(&self, detector_id: &str) -> SplunkResult<Vec<Incident>> {
        let url = self.endpoint(&format!("v2/detector/{detector_id}/incidents"))?;
        let response = self.client.get(url).send().await?;
        decode_or_default(response, "retrieving detector incidents").await
    }

    // =========================================================================
    // SLOs
    // =========================================================================

    /// Search SLOs matching the given alert-trigger filters
    ///
    /// API: POST /v2/slo/search
    pub async fn search_slos(&self, request: &SloSearchRequest) -> SplunkResult<SloList> {
        self.post_slo_search(request).await
    }

    /// List all SLOs (search without filters)
    ///
    /// API: POST /v2/slo/search with body `{}`
    pub async fn list_slos(&self) -> SplunkResult<SloList> {
        self.post_slo_search(&serde_json::json!({})).await
    }

    async fn post_slo_search(&self, body: &impl Serialize) -> SplunkResult<SloList> {
        let url = self.endpoint("v2/slo/search")?;
        let response = self.client.post(url).json(body).send().await?;
        decode_or_default(response, "searching SLOs").await
    }

    // =========================================================================
    // Ingest
    // =========================================================================

    /// Send custom events to the ingest API
    ///
    /// API: POST /v2/event
    pub async fn post_events(&self, events: &[IngestEvent]) -> SplunkResult<()> {
        let url = self.endpoint("v2/event")?;
        let response = self.client.post(url).json(events).send().await?;

        let status = response.status();
        if status.is_success() {
            debug!(count = events.len(), "Events posted");
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(
                status = status.as_u16(),
                body = %body,
                "Splunk ingest API responded with unexpected status code while posting events"
            );
        }
        Ok(())
    }
}

/// Decode a successful response, or log and fall back to the empty value
async fn decode_or_default<T>(response: Response, action: &str) -> SplunkResult<T>
where
    T: DeserializeOwned + Default,
{
    let status = response.status();
    let url = response.url().clone();

    if status.is_success() {
        let value = response.json().await?;
        trace!(url = %url, "Splunk response decoded");
        Ok(value)
    } else {
        let body = response.text().await.unwrap_or_default();
        warn!(
            status = status.as_u16(),
            url = %url,
            body = %body,
            "Splunk API responded with unexpected status code while {action}"
        );
        Ok(T::default())
    }
}

fn normalize_base_url(base_url: &str) -> SplunkResult<Url> {
    let trimmed = base_url.trim_end_matches('/');
    Ok(Url::parse(&format!("{trimmed}/"))?)
}
