//! HTTP Server for the extension API
//!
//! Axum-based HTTP server implementing the host protocol, plus a separate
//! server for the health probes.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use std::error::Error as _;
use std::future::Future;
use std::net::SocketAddr;
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::state::AppState;
use super::types::{
    ActionDescription, AttributeDescriptions, DiscoveryData, DiscoveryDescription, ExtensionError,
    ExtensionList, PrepareRequest, StateRequest, StateResponse, StatusResponse, TargetDescription,
};
use crate::checks::CheckError;
use crate::events::{EventError, EventKind};

/// Errors returned to the host as an [`ExtensionError`] body
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unknown action '{0}'")]
    UnknownAction(String),

    #[error("Unknown target type '{0}'")]
    UnknownTargetType(String),

    #[error(transparent)]
    Check(#[from] CheckError),

    #[error(transparent)]
    Event(#[from] EventError),
}

impl ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::UnknownAction(_) | ApiError::UnknownTargetType(_) => StatusCode::NOT_FOUND,
            ApiError::Check(CheckError::Client { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Check(_) | ApiError::Event(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let detail = self.source().map(|source| source.to_string());
        let body = ExtensionError {
            title: self.to_string(),
            detail,
        };
        if status.is_server_error() {
            warn!(title = %body.title, detail = ?body.detail, "Request failed");
        } else {
            debug!(status = status.as_u16(), title = %body.title, "Request rejected");
        }
        (status, Json(body)).into_response()
    }
}

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Start the extension API on the given port
///
/// The state reports ready from the moment the port is bound until the
/// server stops.
pub async fn start_api_server(
    port: u16,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = bind(port, "extension API").await?;
    state.set_ready(true);

    let result = axum::serve(listener, create_router(state.clone()))
        .with_graceful_shutdown(shutdown)
        .await;

    state.set_ready(false);
    result
}

/// Start the health probes on the given port
pub async fn start_health_server(
    port: u16,
    state: AppState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    let listener = bind(port, "health probes").await?;
    axum::serve(listener, create_health_router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn bind(port: u16, name: &'static str) -> std::io::Result<TcpListener> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;
    info!(port = port, server = name, "Starting HTTP server");
    Ok(listener)
}

/// Create the extension API router
pub fn create_router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/", get(extension_list_handler))
        .route("/{id}", get(describe_action_handler))
        .route("/{id}/prepare", post(prepare_handler))
        .route("/{id}/start", post(start_handler))
        .route("/{id}/status", post(status_handler))
        .route("/{id}/stop", post(stop_handler))
        .route("/{id}/discovery", get(describe_discovery_handler))
        .route(
            "/{id}/discovery/target-description",
            get(target_description_handler),
        )
        .route(
            "/{id}/discovery/attribute-descriptions",
            get(attribute_descriptions_handler),
        )
        .route(
            "/{id}/discovery/discovered-targets",
            get(discovered_targets_handler),
        );

    for kind in EventKind::ALL {
        router = router.route(
            kind.path(),
            post(move |State(state): State<AppState>, body: Bytes| {
                event_handler(kind, state, body)
            }),
        );
    }

    router.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Create the health probe router
pub fn create_health_router(state: AppState) -> Router {
    Router::new()
        .route("/health/liveness", get(liveness_handler))
        .route("/health/readiness", get(readiness_handler))
        .with_state(state)
}

async fn extension_list_handler(State(state): State<AppState>) -> Json<ExtensionList> {
    Json(state.extension_list())
}

// =============================================================================
// Actions
// =============================================================================

async fn describe_action_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ActionDescription> {
    let action = state.action(&id).ok_or(ApiError::UnknownAction(id))?;
    Ok(Json(action.describe()))
}

async fn prepare_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<PrepareRequest>,
) -> ApiResult<StateResponse> {
    let action = state.action(&id).ok_or(ApiError::UnknownAction(id))?;
    let check_state = action.prepare(&request, Utc::now())?;
    info!(
        action = action.id(),
        subject = %check_state.subject_id,
        expected = %check_state.expected_state,
        mode = %check_state.check_mode,
        end = %check_state.end,
        "Check prepared"
    );
    Ok(Json(StateResponse { state: check_state }))
}

/// Nothing to start; the check runs in the status calls
async fn start_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StateRequest>,
) -> ApiResult<StateResponse> {
    state.action(&id).ok_or(ApiError::UnknownAction(id))?;
    Ok(Json(StateResponse {
        state: request.state,
    }))
}

async fn status_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<StateRequest>,
) -> ApiResult<StatusResponse> {
    let action = state.action(&id).ok_or(ApiError::UnknownAction(id))?;
    let mut check_state = request.state;
    let verdict = action.status(&mut check_state, Utc::now()).await?;

    if let Some(error) = &verdict.error {
        info!(
            action = action.id(),
            subject = %check_state.subject_id,
            completed = verdict.completed,
            error = %error.title,
            "Check failed"
        );
    } else if verdict.completed {
        info!(action = action.id(), subject = %check_state.subject_id, "Check completed");
    }

    Ok(Json(StatusResponse {
        verdict,
        state: check_state,
    }))
}

async fn stop_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<serde_json::Value> {
    state.action(&id).ok_or(ApiError::UnknownAction(id))?;
    Ok(Json(serde_json::json!({})))
}

// =============================================================================
// Discovery
// =============================================================================

async fn describe_discovery_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DiscoveryDescription> {
    let cache = state.discovery(&id).ok_or(ApiError::UnknownTargetType(id))?;
    Ok(Json(cache.discovery().describe()))
}

async fn target_description_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<TargetDescription> {
    let cache = state.discovery(&id).ok_or(ApiError::UnknownTargetType(id))?;
    Ok(Json(cache.discovery().describe_target()))
}

async fn attribute_descriptions_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<AttributeDescriptions> {
    let cache = state.discovery(&id).ok_or(ApiError::UnknownTargetType(id))?;
    Ok(Json(AttributeDescriptions {
        attributes: cache.discovery().describe_attributes(),
    }))
}

async fn discovered_targets_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<DiscoveryData> {
    let cache = state.discovery(&id).ok_or(ApiError::UnknownTargetType(id))?;
    Ok(Json(DiscoveryData {
        targets: cache.targets(),
    }))
}

// =============================================================================
// Events
// =============================================================================

async fn event_handler(kind: EventKind, state: AppState, body: Bytes) -> ApiResult<serde_json::Value> {
    let event = EventKind::decode(&body).inspect_err(|e| {
        warn!(path = kind.path(), error = %e, "Malformed event body");
    })?;
    debug!(event = %event.event_name, id = %event.id, "Event received");

    // The posting task is detached; the host is not kept waiting
    state.forwarder().forward(kind, &event)?;
    Ok(Json(serde_json::json!({})))
}

// =============================================================================
// Health
// =============================================================================

async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

async fn readiness_handler(State(state): State<AppState>) -> StatusCode {
    if state.is_ready() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}
