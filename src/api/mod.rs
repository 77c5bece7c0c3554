//! Extension HTTP API
//!
//! Implements the host protocol over HTTP.
//!
//! ## Endpoints
//!
//! - `GET /` - Manifest of all actions, discoveries and event listeners
//! - `GET /{actionId}` - Action description
//! - `POST /{actionId}/prepare|start|status|stop` - Action lifecycle
//! - `GET /{targetType}/discovery[/target-description|/attribute-descriptions|/discovered-targets]`
//! - `POST /events/*` - Experiment lifecycle events
//!
//! Health probes are served on their own port:
//!
//! - `GET /health/liveness` - Always 200 while the process runs
//! - `GET /health/readiness` - 200 once the extension API is up, 503 before

mod server;
mod state;
pub mod types;

pub use server::{
    ApiError, create_health_router, create_router, start_api_server, start_health_server,
};
pub use state::AppState;
