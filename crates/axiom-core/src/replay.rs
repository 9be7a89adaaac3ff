//! Deterministic replay.
//!
//! Replay rebuilds a kernel from genesis or from a snapshot, feeds it the
//! logged input events, and runs it forward. Because every tick is a pure
//! function of the previous state and that tick's events, the replayed
//! checkpoints must match the recorded ones exactly. The first tick where
//! they differ locates the divergence.

use axiom_log::{CheckpointChain, EventLog};
use axiom_types::{HashCheckpoint, SimTime};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::SimulationConfig;
use crate::kernel::{IngestError, Kernel, KernelError};

/// Replay failure.
#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    /// The replaying kernel failed.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// A logged event could not be re-ingested.
    #[error("replay ingestion failed: {0}")]
    Ingest(#[from] IngestError),
}

/// Outcome of comparing a replay against a recorded chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReplayReport {
    /// Checkpoints compared.
    pub compared: u64,
    /// First tick whose replayed checkpoint differs from, or is missing
    /// in, the recorded chain.
    pub first_divergence: Option<SimTime>,
}

impl ReplayReport {
    /// Whether every compared checkpoint matched.
    pub const fn is_consistent(&self) -> bool {
        self.first_divergence.is_none()
    }
}

/// Run `kernel` forward to `until`, ingesting logged events as it goes.
fn run_to(kernel: &mut Kernel, log: &EventLog, until: SimTime) -> Result<Vec<HashCheckpoint>, ReplayError> {
    let from = kernel.current_tick();
    if let Some(first) = from.next() {
        for event in log.read_range(first, until) {
            kernel.ingest(event.clone())?;
        }
    }
    let mut produced = Vec::new();
    while kernel.current_tick() < until {
        produced.push(kernel.run_tick()?.checkpoint);
    }
    Ok(produced)
}

/// Replay from genesis through `until`.
///
/// Returns every checkpoint from tick 0 through `until`.
///
/// # Errors
///
/// See [`ReplayError`].
pub fn replay_from_genesis(
    config: &SimulationConfig,
    log: &EventLog,
    until: SimTime,
) -> Result<Vec<HashCheckpoint>, ReplayError> {
    let mut kernel = Kernel::genesis(config)?;
    let mut checkpoints: Vec<HashCheckpoint> = kernel.chain().iter().copied().collect();
    checkpoints.extend(run_to(&mut kernel, log, until)?);
    info!(until = until.get(), "replay from genesis complete");
    Ok(checkpoints)
}

/// Replay from a snapshot through `until`.
///
/// Returns the checkpoints for ticks after the snapshot tick.
///
/// # Errors
///
/// See [`ReplayError`].
pub fn replay_from_snapshot(
    blob: &[u8],
    config: &SimulationConfig,
    log: &EventLog,
    until: SimTime,
) -> Result<Vec<HashCheckpoint>, ReplayError> {
    let mut kernel = Kernel::restore(blob, config)?;
    let from = kernel.current_tick();
    let checkpoints = run_to(&mut kernel, log, until)?;
    info!(
        from = from.get(),
        until = until.get(),
        "replay from snapshot complete"
    );
    Ok(checkpoints)
}

/// Compare replayed checkpoints against a recorded chain.
pub fn verify_replay(recorded: &CheckpointChain, replayed: &[HashCheckpoint]) -> ReplayReport {
    let mut compared: u64 = 0;
    for checkpoint in replayed {
        compared = compared.saturating_add(1);
        if recorded.get(checkpoint.tick) != Some(checkpoint) {
            warn!(
                tick = checkpoint.tick.get(),
                replayed = %checkpoint.chain_digest,
                "replay diverged from recorded chain"
            );
            return ReplayReport {
                compared,
                first_divergence: Some(checkpoint.tick),
            };
        }
    }
    ReplayReport {
        compared,
        first_divergence: None,
    }
}
