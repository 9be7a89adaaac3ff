//! Integration tests for the Observer API endpoints.
//!
//! Tests use Axum's `Router` directly via `tower::ServiceExt` without
//! starting a TCP server. A small task stands in for the runner: it owns
//! the kernel and answers submissions the way the runner does.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;

use axiom_core::config::{SimulationBoundsConfig, SimulationConfig};
use axiom_core::operator::OperatorState;
use axiom_core::runner::{Submission, TickCallback};
use axiom_core::Kernel;
use axiom_observer::router::build_router;
use axiom_observer::state::AppState;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tokio::sync::mpsc;
use tower::ServiceExt;

fn test_kernel() -> Kernel {
    let mut config = SimulationConfig::default();
    config.genesis.width = 4;
    config.genesis.height = 4;
    config.genesis.agents = 2;
    Kernel::genesis(&config).unwrap()
}

fn operator() -> Arc<OperatorState> {
    Arc::new(OperatorState::new(&SimulationBoundsConfig::default()))
}

/// State wired to a task that ingests every submission into its own kernel.
fn make_test_state() -> Arc<AppState> {
    let kernel = test_kernel();
    let (tx, mut rx) = mpsc::channel::<Submission>(8);
    let (state, _feed) = AppState::new(&kernel, tx, operator());
    tokio::spawn(async move {
        let mut kernel = kernel;
        while let Some(submission) = rx.recv().await {
            let verdict = kernel.ingest(submission.event);
            let _ = submission.reply.send(verdict);
        }
    });
    state
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn chat_input(tick: u64, sequence: u64) -> Value {
    json!({
        "tick": tick,
        "sequence": sequence,
        "source_id": "gateway-a",
        "kind": "chat",
        "payload": {"agent": 1, "text": "hello"},
    })
}

// =========================================================================
// Status and checkpoints
// =========================================================================

#[tokio::test]
async fn status_reports_genesis() {
    let kernel = test_kernel();
    let genesis_digest = kernel.status().latest_chain_digest.to_hex();
    let (tx, _rx) = mpsc::channel(1);
    let (state, _feed) = AppState::new(&kernel, tx, operator());

    let response = build_router(state)
        .oneshot(Request::get("/api/status").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["current_tick"], 0);
    assert_eq!(json["latest_chain_digest"], genesis_digest);
}

#[tokio::test]
async fn checkpoints_default_to_full_history() {
    let state = make_test_state();

    let response = build_router(state)
        .oneshot(Request::get("/api/checkpoints").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_to_json(response.into_body()).await;
    let checkpoints = json.as_array().unwrap();
    assert_eq!(checkpoints.len(), 1);
    assert_eq!(checkpoints.first().unwrap()["tick"], 0);
}

#[tokio::test]
async fn feed_publishes_new_ticks() {
    let mut kernel = test_kernel();
    let (tx, _rx) = mpsc::channel(1);
    let (state, mut feed) = AppState::new(&kernel, tx, operator());

    for _ in 0..3 {
        let outcome = kernel.run_tick().unwrap();
        feed.on_tick(&outcome, &kernel);
    }

    let response = build_router(Arc::clone(&state))
        .oneshot(
            Request::get("/api/checkpoints?from=2&to=3")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    let ticks: Vec<u64> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["tick"].as_u64().unwrap())
        .collect();
    assert_eq!(ticks, vec![2, 3]);
    assert_eq!(state.current_status().current_tick.get(), 3);
}

#[tokio::test]
async fn inverted_checkpoint_range_is_bad_request() {
    let state = make_test_state();

    let response = build_router(state)
        .oneshot(
            Request::get("/api/checkpoints?from=5&to=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["status"], 400);
}

#[tokio::test]
async fn oversized_checkpoint_range_is_bad_request() {
    let state = make_test_state();

    let response = build_router(state)
        .oneshot(
            Request::get("/api/checkpoints?from=0&to=5000")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =========================================================================
// Gateway submission
// =========================================================================

#[tokio::test]
async fn submitted_input_is_accepted() {
    let state = make_test_state();

    let response = build_router(state)
        .oneshot(post_json("/api/inputs", &chat_input(1, 0)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::ACCEPTED);
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["accepted"], true);
    assert_eq!(json["source_id"], "gateway-a");
}

#[tokio::test]
async fn duplicate_input_is_conflict() {
    let state = make_test_state();
    let router = build_router(state);

    let first = router
        .clone()
        .oneshot(post_json("/api/inputs", &chat_input(1, 0)))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::ACCEPTED);

    let second = router
        .oneshot(post_json("/api/inputs", &chat_input(1, 0)))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn input_for_sealed_tick_is_conflict() {
    let state = make_test_state();

    let response = build_router(state)
        .oneshot(post_json("/api/inputs", &chat_input(0, 0)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("sealed"));
}

#[tokio::test]
async fn input_with_unstorable_sequence_is_bad_request() {
    let state = make_test_state();

    let response = build_router(state)
        .oneshot(post_json("/api/inputs", &chat_input(1, u64::MAX)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_to_json(response.into_body()).await;
    assert!(json["error"].as_str().unwrap().contains("sequence"));
}

#[tokio::test]
async fn input_without_runner_is_unavailable() {
    let kernel = test_kernel();
    let (tx, rx) = mpsc::channel(1);
    drop(rx);
    let (state, _feed) = AppState::new(&kernel, tx, operator());

    let response = build_router(state)
        .oneshot(post_json("/api/inputs", &chat_input(1, 0)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn malformed_input_is_rejected_by_extractor() {
    let state = make_test_state();

    let response = build_router(state)
        .oneshot(post_json("/api/inputs", &json!({"tick": "soon"})))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

// =========================================================================
// Operator
// =========================================================================

#[tokio::test]
async fn pause_resume_and_stop() {
    let state = make_test_state();
    let router = build_router(Arc::clone(&state));

    let response = router
        .clone()
        .oneshot(Request::post("/api/operator/pause").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(state.operator.is_paused());

    let response = router
        .clone()
        .oneshot(Request::get("/api/operator/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["paused"], true);

    router
        .clone()
        .oneshot(Request::post("/api/operator/resume").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert!(!state.operator.is_paused());

    let response = router
        .oneshot(Request::post("/api/operator/stop").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let json = body_to_json(response.into_body()).await;
    assert_eq!(json["ok"], true);
    assert!(state.operator.is_stop_requested());
}

#[tokio::test]
async fn unknown_route_is_not_found() {
    let state = make_test_state();

    let response = build_router(state)
        .oneshot(Request::get("/api/agents").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
