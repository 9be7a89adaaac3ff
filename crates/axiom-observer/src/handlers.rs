//! REST API endpoint handlers for the Observer server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/status` | Current tick and latest chain digest |
//! | `GET` | `/api/checkpoints` | Checkpoints in a tick range |
//! | `POST` | `/api/inputs` | Submit an input event for ingestion |

use std::sync::Arc;

use axiom_core::runner::Submission;
use axiom_types::{InputEvent, SimTime};
use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::debug;

use crate::error::ObserverError;
use crate::state::AppState;

/// Widest tick range a single checkpoint query may cover.
pub const MAX_CHECKPOINT_RANGE: u64 = 1000;

/// Query parameters for the `GET /api/checkpoints` endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct CheckpointsQuery {
    /// First tick (default 0).
    pub from: Option<u64>,
    /// Last tick, inclusive (default: the current tick).
    pub to: Option<u64>,
}

/// Body returned for an accepted input event.
#[derive(Debug, serde::Serialize)]
struct InputAccepted {
    accepted: bool,
    tick: u64,
    sequence: u64,
    source_id: String,
}

// ---------------------------------------------------------------------------
// GET /api/status
// ---------------------------------------------------------------------------

/// Return `{current_tick, latest_chain_digest}`.
pub async fn status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.current_status())
}

// ---------------------------------------------------------------------------
// GET /api/checkpoints
// ---------------------------------------------------------------------------

/// Return the checkpoints for `from..=to`.
///
/// # Errors
///
/// Returns [`ObserverError::InvalidQuery`] when `from > to` or the range
/// is wider than [`MAX_CHECKPOINT_RANGE`].
pub async fn list_checkpoints(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CheckpointsQuery>,
) -> Result<impl IntoResponse, ObserverError> {
    let from = query.from.unwrap_or(0);
    let to = query
        .to
        .unwrap_or_else(|| state.current_status().current_tick.get());

    if from > to {
        return Err(ObserverError::InvalidQuery(format!(
            "from ({from}) is after to ({to})"
        )));
    }
    if to.saturating_sub(from) >= MAX_CHECKPOINT_RANGE {
        return Err(ObserverError::InvalidQuery(format!(
            "range covers more than {MAX_CHECKPOINT_RANGE} ticks"
        )));
    }

    Ok(Json(
        state
            .checkpoints
            .range(SimTime::new(from), SimTime::new(to)),
    ))
}

// ---------------------------------------------------------------------------
// POST /api/inputs
// ---------------------------------------------------------------------------

/// Submit an input event and wait for the kernel's ingestion verdict.
///
/// Acceptance means the event is in the log, not that it will commit: the
/// pipeline decides that when its tick runs, and the outcome arrives on
/// `/ws/observations`.
///
/// # Errors
///
/// Returns [`ObserverError::Refused`] when the kernel rejects the event
/// and [`ObserverError::Unavailable`] when the runner is gone.
pub async fn submit_input(
    State(state): State<Arc<AppState>>,
    Json(event): Json<InputEvent>,
) -> Result<impl IntoResponse, ObserverError> {
    let accepted = InputAccepted {
        accepted: true,
        tick: event.tick.get(),
        sequence: event.sequence,
        source_id: event.source_id.as_str().to_owned(),
    };

    let (submission, verdict) = Submission::new(event);
    state
        .submissions
        .send(submission)
        .await
        .map_err(|_e| ObserverError::Unavailable("ingestion channel closed".to_owned()))?;
    verdict
        .await
        .map_err(|_e| ObserverError::Unavailable("runner dropped the submission".to_owned()))??;

    debug!(
        tick = accepted.tick,
        sequence = accepted.sequence,
        source_id = %accepted.source_id,
        "input event accepted"
    );
    Ok((StatusCode::ACCEPTED, Json(accepted)))
}
