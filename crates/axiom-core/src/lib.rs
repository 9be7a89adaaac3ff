//! Tick scheduler, authority pipeline, and snapshots for the Axiom
//! simulation kernel.
//!
//! Given a seed and an ordered stream of input events, the [`Kernel`]
//! reproduces the same Universe and the same hash chain on every run.
//!
//! # Modules
//!
//! - [`clock`] -- Tick counter and fixed-step accumulator.
//! - [`config`] -- Configuration loading from `axiom-config.yaml`.
//! - [`kernel`] -- [`Kernel`]: ingestion, the tick cycle, and the query
//!   surface.
//! - [`operator`] -- Pause, resume, stop, and run bounds.
//! - [`pipeline`] -- The authority pipeline from input event to commit or
//!   rejection.
//! - [`replay`] -- Replay from genesis or a snapshot and divergence
//!   detection.
//! - [`runner`] -- The async fixed-timestep runner.
//! - [`snapshot`] -- Snapshot blobs and the snapshot archive.
//! - [`subsystems`] -- Ambient per-tick subsystems.

pub mod clock;
pub mod config;
pub mod kernel;
pub mod operator;
pub mod pipeline;
pub mod replay;
pub mod runner;
pub mod snapshot;
pub mod subsystems;

pub use kernel::{IngestError, Kernel, KernelError, KernelStatus, MAX_EVENT_KEY, TickOutcome};
