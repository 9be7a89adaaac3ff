//! Async runner: drives the kernel on a fixed timestep.
//!
//! [`run_kernel`] is the only place wall-clock time is read, and only to
//! decide how many ticks are due. Gateways reach the kernel through an
//! `mpsc` channel of [`Submission`]s and get their ingestion verdict back
//! on a `oneshot`. Results flow out through a [`TickCallback`].
//!
//! Between ticks the runner:
//!
//! - drains pending submissions
//! - honors pause, resume, and stop
//! - stops at `max_ticks` or `max_real_time_seconds`
//!
//! A tick, once started, always runs to completion.

use std::sync::Arc;
use std::time::Duration;

use axiom_types::{InputEvent, ObservationEvent};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::clock::{ClockError, FixedStep};
use crate::kernel::{IngestError, Kernel, KernelError, KernelStatus, TickOutcome};
use crate::operator::{OperatorState, SimulationEndReason};

/// Errors that end a run abnormally.
#[derive(Debug, thiserror::Error)]
pub enum RunnerError {
    /// The kernel halted.
    #[error("kernel error: {source}")]
    Kernel {
        /// The underlying kernel error.
        #[from]
        source: KernelError,
    },

    /// The tick period is unusable.
    #[error(transparent)]
    Clock(#[from] ClockError),
}

/// An input event from a gateway plus the channel for its verdict.
#[derive(Debug)]
pub struct Submission {
    /// The event to ingest.
    pub event: InputEvent,
    /// Receives the ingestion verdict.
    pub reply: oneshot::Sender<Result<(), IngestError>>,
}

impl Submission {
    /// Pair `event` with a fresh reply channel.
    pub fn new(event: InputEvent) -> (Self, oneshot::Receiver<Result<(), IngestError>>) {
        let (reply, verdict) = oneshot::channel();
        (Self { event, reply }, verdict)
    }
}

/// How a run ended.
#[derive(Debug)]
pub struct RunResult {
    /// Why the runner stopped.
    pub end_reason: SimulationEndReason,
    /// Status at the end of the run.
    pub final_status: KernelStatus,
    /// Ticks executed during this run.
    pub total_ticks: u64,
}

/// Called after every completed tick, and for every accepted input event.
pub trait TickCallback: Send {
    /// Handle one tick's outcome.
    fn on_tick(&mut self, outcome: &TickOutcome, kernel: &Kernel);

    /// Handle an event the kernel just accepted, before the submitter
    /// hears the verdict.
    fn on_ingest(&mut self, _event: &InputEvent) {}
}

/// A callback that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpCallback;

impl TickCallback for NoOpCallback {
    fn on_tick(&mut self, _outcome: &TickOutcome, _kernel: &Kernel) {}
}

/// Fans tick results out to observers: observations on a `broadcast`
/// channel and the latest status on a `watch` channel.
#[derive(Debug, Clone)]
pub struct ChannelPublisher {
    observations: broadcast::Sender<ObservationEvent>,
    status: watch::Sender<KernelStatus>,
}

impl ChannelPublisher {
    /// Publish on the given channels.
    pub const fn new(
        observations: broadcast::Sender<ObservationEvent>,
        status: watch::Sender<KernelStatus>,
    ) -> Self {
        Self {
            observations,
            status,
        }
    }
}

impl TickCallback for ChannelPublisher {
    fn on_tick(&mut self, outcome: &TickOutcome, kernel: &Kernel) {
        for result in &outcome.outcomes {
            // No subscribers is not an error.
            let _ = self.observations.send(result.observation().clone());
        }
        self.status.send_replace(kernel.status());
    }
}

fn end(
    operator: &OperatorState,
    kernel: &Kernel,
    reason: SimulationEndReason,
    total_ticks: u64,
) -> RunResult {
    operator.set_end_reason(reason);
    RunResult {
        end_reason: reason,
        final_status: kernel.status(),
        total_ticks,
    }
}

fn handle_submission(
    kernel: &mut Kernel,
    submission: Submission,
    callback: &mut dyn TickCallback,
) {
    let Submission { event, reply } = submission;
    let verdict = kernel.ingest(event.clone());
    match &verdict {
        Ok(()) => callback.on_ingest(&event),
        Err(e) => warn!(error = %e, "input event refused"),
    }
    // The submitter may have gone away.
    let _ = reply.send(verdict);
}

/// Drive `kernel` until a bound is reached, the operator stops it, or it
/// halts.
///
/// # Errors
///
/// Returns [`RunnerError::Kernel`] when the kernel halts. The end reason
/// is recorded as [`SimulationEndReason::Halted`] first.
pub async fn run_kernel(
    kernel: &mut Kernel,
    dt: Duration,
    inbound: &mut mpsc::Receiver<Submission>,
    operator: &Arc<OperatorState>,
    callback: &mut dyn TickCallback,
) -> Result<RunResult, RunnerError> {
    let mut step = FixedStep::new(dt)?;
    let mut total_ticks: u64 = 0;
    let mut inbound_open = true;
    let mut last = Instant::now();

    info!(
        tick = kernel.current_tick().get(),
        dt_ms = u64::try_from(dt.as_millis()).unwrap_or(u64::MAX),
        max_ticks = operator.max_ticks(),
        max_real_time_seconds = operator.max_real_time_seconds(),
        "kernel runner starting"
    );

    loop {
        if operator.is_paused() && !operator.is_stop_requested() {
            info!(tick = kernel.current_tick().get(), "runner paused");
            while operator.is_paused() && !operator.is_stop_requested() {
                tokio::select! {
                    () = operator.wait_if_paused() => {}
                    maybe = inbound.recv(), if inbound_open => match maybe {
                        Some(submission) => handle_submission(kernel, submission, callback),
                        None => inbound_open = false,
                    },
                }
            }
            info!("runner resumed");
            last = Instant::now();
        }

        if operator.is_stop_requested() {
            info!("operator stop requested");
            return Ok(end(operator, kernel, SimulationEndReason::OperatorStop, total_ticks));
        }

        if operator.time_limit_reached() {
            info!(
                max_seconds = operator.max_real_time_seconds(),
                elapsed = operator.elapsed_seconds(),
                "real-time limit reached"
            );
            return Ok(end(
                operator,
                kernel,
                SimulationEndReason::MaxRealTimeReached,
                total_ticks,
            ));
        }

        let wait = step.dt().saturating_sub(step.accumulated());
        tokio::select! {
            biased;
            maybe = inbound.recv(), if inbound_open => {
                match maybe {
                    Some(submission) => handle_submission(kernel, submission, callback),
                    None => inbound_open = false,
                }
            }
            () = tokio::time::sleep(wait) => {}
        }

        let now = Instant::now();
        let due = step.advance(now.saturating_duration_since(last));
        last = now;

        for _ in 0..due {
            let outcome = match kernel.run_tick() {
                Ok(outcome) => outcome,
                Err(e) => {
                    error!(error = %e, "kernel halted, runner stopping");
                    operator.set_end_reason(SimulationEndReason::Halted);
                    return Err(e.into());
                }
            };
            total_ticks = total_ticks.saturating_add(1);
            callback.on_tick(&outcome, kernel);

            if operator.tick_limit_reached(outcome.tick.get()) {
                info!(
                    tick = outcome.tick.get(),
                    max_ticks = operator.max_ticks(),
                    "tick limit reached"
                );
                return Ok(end(
                    operator,
                    kernel,
                    SimulationEndReason::MaxTicksReached,
                    total_ticks,
                ));
            }
            if operator.is_stop_requested() || operator.is_paused() {
                break;
            }
        }
    }
}

/// Log how a run ended.
pub fn log_simulation_end(result: &RunResult) {
    info!(
        reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        final_tick = result.final_status.current_tick.get(),
        chain_digest = %result.final_status.latest_chain_digest,
        "simulation ended"
    );
}
