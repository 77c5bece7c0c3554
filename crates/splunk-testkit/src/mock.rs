//! Mock Splunk Observability API
//!
//! Wraps a `wiremock` server with helpers for the endpoints the extension
//! calls. Requests that match nothing get wiremock's default 404.
//!
//! # Example
//!
//! ```rust,no_run
//! use splunk_testkit::{MockSplunkApi, fixtures};
//!
//! # async fn example() {
//! let api = MockSplunkApi::start().await;
//! api.with_incidents("det1", vec![fixtures::incident("inc1", "ANOMALOUS", 0)])
//!     .await;
//! println!("Splunk API at {}", api.uri());
//! # }
//! ```

use serde_json::{Value, json};
use wiremock::matchers::{body_json, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::fixtures;

const EVENTS_PATH: &str = "/v2/event";

/// Mock server answering like the Splunk REST and ingest APIs
pub struct MockSplunkApi {
    server: MockServer,
}

impl MockSplunkApi {
    /// Start a server on a random local port
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the server
    pub fn uri(&self) -> String {
        self.server.uri()
    }

    pub fn server(&self) -> &MockServer {
        &self.server
    }

    /// Serve `GET /v2/detector`
    pub async fn with_detectors(&self, detectors: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path("/v2/detector"))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::list(detectors)))
            .mount(&self.server)
            .await;
    }

    /// Serve `GET /v2/detector/{id}/incidents`
    pub async fn with_incidents(&self, detector_id: &str, incidents: Vec<Value>) {
        Mock::given(method("GET"))
            .and(path(format!("/v2/detector/{detector_id}/incidents")))
            .respond_with(ResponseTemplate::new(200).set_body_json(Value::Array(incidents)))
            .mount(&self.server)
            .await;
    }

    /// Serve the unfiltered SLO search used for discovery (body `{}`)
    pub async fn with_slos(&self, slos: Vec<Value>) {
        Mock::given(method("POST"))
            .and(path("/v2/slo/search"))
            .and(body_json(json!({})))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::list(slos)))
            .mount(&self.server)
            .await;
    }

    /// Serve SLO searches restricted to one SLO id
    ///
    /// Matches whatever alert filters the request carries.
    pub async fn with_slo_search(&self, slo_id: &str, slos: Vec<Value>) {
        Mock::given(method("POST"))
            .and(path("/v2/slo/search"))
            .and(body_partial_json(json!({"sloIds": [slo_id]})))
            .respond_with(ResponseTemplate::new(200).set_body_json(fixtures::list(slos)))
            .mount(&self.server)
            .await;
    }

    /// Answer every request to `path` with the given status and an empty body
    pub async fn with_status(&self, http_method: &str, request_path: &str, status: u16) {
        Mock::given(method(http_method))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Accept `POST /v2/event`
    pub async fn accept_events(&self) {
        self.with_status("POST", EVENTS_PATH, 200).await;
    }

    /// All events received on the ingest endpoint, in arrival order
    pub async fn received_events(&self) -> Vec<Value> {
        let requests = self.server.received_requests().await.unwrap_or_default();
        requests
            .iter()
            .filter(|r| r.url.path() == EVENTS_PATH)
            .filter_map(|r| serde_json::from_slice::<Vec<Value>>(&r.body).ok())
            .flatten()
            .collect()
    }

    /// Bodies of the SLO searches received so far
    pub async fn received_slo_searches(&self) -> Vec<Value> {
        let requests = self.server.received_requests().await.unwrap_or_default();
        requests
            .iter()
            .filter(|r| r.url.path() == "/v2/slo/search")
            .filter_map(|r| serde_json::from_slice(&r.body).ok())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_incidents_are_served() {
        let api = MockSplunkApi::start().await;
        api.with_incidents("det1", vec![fixtures::incident("inc1", "OK", 0)])
            .await;

        let body: Value = reqwest::get(format!("{}/v2/detector/det1/incidents", api.uri()))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(body[0]["incidentId"], "inc1");
    }

    #[tokio::test]
    async fn test_received_events_are_flattened() {
        let api = MockSplunkApi::start().await;
        api.accept_events().await;

        let client = reqwest::Client::new();
        for batch in [json!([{"eventType": "a"}]), json!([{"eventType": "b"}])] {
            client
                .post(format!("{}/v2/event", api.uri()))
                .json(&batch)
                .send()
                .await
                .unwrap();
        }

        let events = api.received_events().await;
        assert_eq!(events.len(), 2);
        assert_eq!(events[1]["eventType"], "b");
    }
}
