//! Axum router construction for the Observer API.
//!
//! Assembles all routes (REST + `WebSocket`) into a single [`Router`]
//! with CORS middleware enabled for cross-origin dashboard access.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{handlers, operator, ws};

/// Build the complete Axum router for the Observer server.
///
/// The router includes:
/// - `GET /ws/observations` -- `WebSocket` observation stream
/// - `GET /api/status` -- current tick and chain digest
/// - `GET /api/checkpoints` -- checkpoints by tick range
/// - `POST /api/inputs` -- gateway submission
/// - `POST /api/operator/{pause,resume,stop}`, `GET /api/operator/status`
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/observations", get(ws::ws_observations))
        .route("/api/status", get(handlers::status))
        .route("/api/checkpoints", get(handlers::list_checkpoints))
        .route("/api/inputs", post(handlers::submit_input))
        .route("/api/operator/pause", post(operator::pause))
        .route("/api/operator/resume", post(operator::resume))
        .route("/api/operator/stop", post(operator::stop))
        .route("/api/operator/status", get(operator::status))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
