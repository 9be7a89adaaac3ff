//! Observer API server for the Axiom simulation kernel.
//!
//! This crate provides an Axum HTTP server that exposes:
//!
//! - **`WebSocket` endpoint** (`/ws/observations`) streaming every
//!   committed or rejected input event via [`tokio::sync::broadcast`]
//! - **REST endpoints** for the kernel status and checkpoint history
//! - **Gateway endpoint** (`POST /api/inputs`) forwarding input events
//!   into the kernel's ordered ingestion channel
//! - **Operator REST endpoints** for pause, resume, stop, and status
//!
//! # Architecture
//!
//! The observer never touches the kernel. It reads the latest
//! [`KernelStatus`] from a `watch` channel and checkpoint history from a
//! [`CheckpointHistory`] that the runner fills through an
//! [`ObserverFeed`] callback. Writes go through the same `mpsc` channel
//! every gateway uses, so an event submitted over HTTP is ordered exactly
//! like any other.
//!
//! [`KernelStatus`]: axiom_core::KernelStatus
//! [`CheckpointHistory`]: state::CheckpointHistory
//! [`ObserverFeed`]: state::ObserverFeed

pub mod error;
pub mod handlers;
pub mod operator;
pub mod router;
pub mod server;
pub mod startup;
pub mod state;
pub mod ws;

pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, CheckpointHistory, ObserverFeed};
