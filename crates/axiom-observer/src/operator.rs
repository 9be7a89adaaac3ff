//! Operator REST API handlers for runtime control.
//!
//! Every command takes effect at the next tick boundary; a tick in
//! progress always completes.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/operator/pause` | Pause the runner |
//! | `POST` | `/api/operator/resume` | Resume the runner |
//! | `POST` | `/api/operator/stop` | Stop the runner cleanly |
//! | `GET` | `/api/operator/status` | Operator control state |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::response::IntoResponse;
use tracing::info;

use crate::state::AppState;

/// Generic success response.
#[derive(Debug, serde::Serialize)]
struct OperatorResponse {
    /// Whether the operation succeeded.
    ok: bool,
    /// Human-readable message.
    message: String,
}

fn respond(message: &str) -> Json<OperatorResponse> {
    Json(OperatorResponse {
        ok: true,
        message: message.to_owned(),
    })
}

/// Pause after the current tick.
pub async fn pause(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.operator.pause();
    info!("operator paused the runner");
    respond("Simulation paused")
}

/// Resume after a pause.
pub async fn resume(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.operator.resume();
    info!("operator resumed the runner");
    respond("Simulation resumed")
}

/// Request a clean stop. The HTTP server keeps serving afterwards.
pub async fn stop(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.operator.request_stop();
    info!("operator requested stop");
    respond("Stop requested -- simulation will end after current tick")
}

/// Return the operator control state.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.operator.status())
}
