//! Operator control for the kernel runner.
//!
//! The runner and the observer's operator endpoints share one
//! [`OperatorState`]. The runner only looks at it between ticks, so every
//! command lands on a tick boundary. Control is a single atomic word:
//!
//! ```text
//! Running <──resume── Paused
//!    │  ───pause──►     │
//!    └──── stop ────────┴──► Stopping (terminal)
//! ```

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use crate::config::SimulationBoundsConfig;

/// Why the runner stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationEndReason {
    /// The tick bound was reached.
    MaxTicksReached,
    /// The wall-clock bound was reached.
    MaxRealTimeReached,
    /// An operator asked for a stop.
    OperatorStop,
    /// The kernel halted on a fatal integrity error.
    Halted,
}

const RUNNING: u8 = 0;
const PAUSED: u8 = 1;
const STOPPING: u8 = 2;

/// Shared operator control state.
#[derive(Debug)]
pub struct OperatorState {
    control: AtomicU8,
    wake: Notify,
    started: Instant,
    started_at: DateTime<Utc>,
    max_ticks: Option<u64>,
    max_real_time: Option<Duration>,
    end_reason: OnceLock<SimulationEndReason>,
}

impl OperatorState {
    /// Control state for a run with the given bounds. Zero means unbounded.
    pub fn new(bounds: &SimulationBoundsConfig) -> Self {
        Self {
            control: AtomicU8::new(RUNNING),
            wake: Notify::new(),
            started: Instant::now(),
            started_at: Utc::now(),
            max_ticks: (bounds.max_ticks > 0).then_some(bounds.max_ticks),
            max_real_time: (bounds.max_real_time_seconds > 0)
                .then(|| Duration::from_secs(bounds.max_real_time_seconds)),
            end_reason: OnceLock::new(),
        }
    }

    fn transition(&self, from: u8, to: u8) -> bool {
        self.control
            .compare_exchange(from, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Pause at the next tick boundary. No effect once stopping.
    pub fn pause(&self) {
        self.transition(RUNNING, PAUSED);
    }

    /// Leave a pause and wake the runner.
    pub fn resume(&self) {
        if self.transition(PAUSED, RUNNING) {
            self.wake.notify_waiters();
            self.wake.notify_one();
        }
    }

    /// Stop at the next tick boundary. Overrides a pause.
    pub fn request_stop(&self) {
        self.control.store(STOPPING, Ordering::Release);
        self.wake.notify_waiters();
        self.wake.notify_one();
    }

    /// Whether the runner should hold between ticks.
    pub fn is_paused(&self) -> bool {
        self.control.load(Ordering::Acquire) == PAUSED
    }

    /// Whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.control.load(Ordering::Acquire) == STOPPING
    }

    /// Resolve once the runner is no longer paused.
    pub async fn wait_if_paused(&self) {
        while self.is_paused() {
            self.wake.notified().await;
        }
    }

    /// Record why the run ended. Only the first reason sticks.
    pub fn set_end_reason(&self, reason: SimulationEndReason) -> bool {
        self.end_reason.set(reason).is_ok()
    }

    /// Why the run ended, if it has.
    pub fn end_reason(&self) -> Option<SimulationEndReason> {
        self.end_reason.get().copied()
    }

    /// Whether `tick` is at or past the tick bound.
    pub fn tick_limit_reached(&self, tick: u64) -> bool {
        self.max_ticks.is_some_and(|max| tick >= max)
    }

    /// Whether the wall-clock bound has passed.
    pub fn time_limit_reached(&self) -> bool {
        self.max_real_time
            .is_some_and(|max| self.started.elapsed() >= max)
    }

    /// Wall-clock start, for display.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Whole seconds since the run started.
    pub fn elapsed_seconds(&self) -> u64 {
        self.started.elapsed().as_secs()
    }

    /// Tick bound, 0 when unbounded.
    pub fn max_ticks(&self) -> u64 {
        self.max_ticks.unwrap_or(0)
    }

    /// Wall-clock bound in seconds, 0 when unbounded.
    pub fn max_real_time_seconds(&self) -> u64 {
        self.max_real_time.map_or(0, |d| d.as_secs())
    }

    /// JSON view for the operator API.
    pub fn status(&self) -> OperatorStatus {
        OperatorStatus {
            paused: self.is_paused(),
            stop_requested: self.is_stop_requested(),
            elapsed_seconds: self.elapsed_seconds(),
            max_ticks: self.max_ticks(),
            max_real_time_seconds: self.max_real_time_seconds(),
            end_reason: self.end_reason(),
            started_at: self.started_at.to_rfc3339(),
        }
    }
}

/// JSON view of [`OperatorState`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorStatus {
    /// Held between ticks.
    pub paused: bool,
    /// Stopping at the next boundary, or stopped.
    pub stop_requested: bool,
    /// Seconds since start.
    pub elapsed_seconds: u64,
    /// Tick bound (0 = unbounded).
    pub max_ticks: u64,
    /// Wall-clock bound in seconds (0 = unbounded).
    pub max_real_time_seconds: u64,
    /// Why the run ended, once it has.
    pub end_reason: Option<SimulationEndReason>,
    /// RFC 3339 start time.
    pub started_at: String,
}
