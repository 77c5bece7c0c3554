//! Discovery against a mock Splunk API, through the HTTP API

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use splunk_testkit::{MockSplunkApi, fixtures};
use std::sync::Arc;
use tower::ServiceExt;

use extension_splunk::api::{AppState, create_router};
use extension_splunk::checks::ActionRegistry;
use extension_splunk::client::SplunkClient;
use extension_splunk::discovery::{CachedDiscovery, DetectorDiscovery, SloDiscovery, detector};
use extension_splunk::events::{EventForwarder, StepExecutionStore};

struct Harness {
    api: MockSplunkApi,
    detectors: CachedDiscovery,
    slos: CachedDiscovery,
    state: AppState,
}

async fn harness(detector_excludes: Vec<String>) -> Harness {
    let api = MockSplunkApi::start().await;
    let client = SplunkClient::api(&api.uri(), "token").unwrap();
    let ingest = SplunkClient::ingest(&api.uri(), "token").unwrap();

    let detectors = CachedDiscovery::new(Arc::new(DetectorDiscovery::new(
        client.clone(),
        detector_excludes,
    )));
    let slos = CachedDiscovery::new(Arc::new(SloDiscovery::new(client.clone(), vec![])));
    let state = AppState::new(
        ActionRegistry::splunk(client, "https://app.us1.signalfx.com"),
        vec![detectors.clone(), slos.clone()],
        EventForwarder::new(ingest, StepExecutionStore::new()),
    );
    Harness {
        api,
        detectors,
        slos,
        state,
    }
}

async fn discovered_targets(state: &AppState, target_type: &str) -> Value {
    let request = Request::builder()
        .uri(format!("/{target_type}/discovery/discovered-targets"))
        .body(Body::empty())
        .unwrap();
    let response = create_router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_detectors_served_from_cache() {
    let h = harness(vec![]).await;
    h.api
        .with_detectors(vec![
            fixtures::detector("det1", "Checkout errors"),
            fixtures::detector("det2", "Payment latency"),
        ])
        .await;

    let body = discovered_targets(&h.state, detector::TARGET_TYPE).await;
    assert_eq!(body["targets"], serde_json::json!([]));

    h.detectors.refresh().await;
    let body = discovered_targets(&h.state, detector::TARGET_TYPE).await;
    let targets = body["targets"].as_array().unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0]["id"], "det1");
    assert_eq!(targets[0]["targetType"], detector::TARGET_TYPE);
    assert_eq!(targets[0]["label"], "Checkout errors");
    assert_eq!(
        targets[0]["attributes"]["splunk.detector.status"][0],
        "ACTIVE"
    );
}

#[tokio::test]
async fn test_detector_attribute_excludes() {
    let h = harness(vec![
        "splunk.detector.desc*".to_string(),
        " splunk.detector.creator ".to_string(),
    ])
    .await;
    h.api
        .with_detectors(vec![fixtures::detector("det1", "Checkout errors")])
        .await;

    h.detectors.refresh().await;
    let targets = h.detectors.targets();
    let attributes = &targets[0].attributes;
    assert!(!attributes.contains_key("splunk.detector.description"));
    assert!(!attributes.contains_key("splunk.detector.creator"));
    assert!(attributes.contains_key("splunk.detector.id"));
    assert!(attributes.contains_key("splunk.detector.detectorOrigin"));
}

#[tokio::test]
async fn test_slos_discovered_with_unfiltered_search() {
    let h = harness(vec![]).await;
    h.api
        .with_slos(vec![fixtures::slo("slo1", "Checkout latency", &[], 0)])
        .await;

    h.slos.refresh().await;
    let targets = h.slos.targets();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].attributes["splunk.slo.creator"], vec!["GlHA2unAgAA"]);
    assert_eq!(h.api.received_slo_searches().await, vec![serde_json::json!({})]);
}
