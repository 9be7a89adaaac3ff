//! Deterministic tick clock and the fixed-step accumulator.
//!
//! [`TickClock`] is the only source of simulation time: a counter of sealed
//! ticks. [`FixedStep`] is the only place wall-clock time is consulted, and
//! only to decide how many ticks are due. Its output is a count; no
//! wall-clock value ever reaches simulation state.

use std::time::Duration;

use axiom_types::SimTime;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance beyond u64::MAX")]
    TickOverflow,

    /// Invalid timing configuration.
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Counter of sealed ticks. Starts at genesis (tick 0 is sealed by genesis
/// itself) and only moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickClock {
    tick: SimTime,
}

impl TickClock {
    /// A clock whose last sealed tick is genesis.
    pub const fn new() -> Self {
        Self {
            tick: SimTime::GENESIS,
        }
    }

    /// A clock resuming after `tick` (used on snapshot restore).
    pub const fn starting_at(tick: SimTime) -> Self {
        Self { tick }
    }

    /// Advance by one tick and return the new tick.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] at `u64::MAX`.
    pub fn advance(&mut self) -> Result<SimTime, ClockError> {
        self.tick = self.tick.next().ok_or(ClockError::TickOverflow)?;
        Ok(self.tick)
    }

    /// The last sealed tick.
    pub const fn tick(&self) -> SimTime {
        self.tick
    }
}

/// Fixed-timestep accumulator.
///
/// ```text
/// accumulator += wall_elapsed
/// while accumulator >= dt { due += 1; accumulator -= dt }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedStep {
    dt: Duration,
    accumulator: Duration,
}

impl FixedStep {
    /// Create an accumulator with tick period `dt`.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `dt` is zero.
    pub fn new(dt: Duration) -> Result<Self, ClockError> {
        if dt.is_zero() {
            return Err(ClockError::InvalidConfig {
                reason: "tick period must be non-zero".to_owned(),
            });
        }
        Ok(Self {
            dt,
            accumulator: Duration::ZERO,
        })
    }

    /// The fixed tick period.
    pub const fn dt(&self) -> Duration {
        self.dt
    }

    /// Wall time carried over toward the next tick.
    pub const fn accumulated(&self) -> Duration {
        self.accumulator
    }

    /// Feed elapsed wall time and return how many ticks are now due.
    pub fn advance(&mut self, wall_elapsed: Duration) -> u64 {
        self.accumulator = self.accumulator.saturating_add(wall_elapsed);
        let mut due: u64 = 0;
        while let Some(rest) = self.accumulator.checked_sub(self.dt) {
            self.accumulator = rest;
            due = due.saturating_add(1);
        }
        due
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn clock_starts_at_genesis() {
        assert_eq!(TickClock::new().tick(), SimTime::GENESIS);
    }

    #[test]
    fn advance_increments() {
        let mut clock = TickClock::new();
        assert_eq!(clock.advance().unwrap(), SimTime(1));
        assert_eq!(clock.advance().unwrap(), SimTime(2));
        assert_eq!(clock.tick(), SimTime(2));
    }

    #[test]
    fn advance_refuses_overflow() {
        let mut clock = TickClock::starting_at(SimTime(u64::MAX));
        assert!(matches!(clock.advance(), Err(ClockError::TickOverflow)));
        assert_eq!(clock.tick(), SimTime(u64::MAX));
    }

    #[test]
    fn zero_period_is_rejected() {
        assert!(FixedStep::new(Duration::ZERO).is_err());
    }

    #[test]
    fn accumulator_carries_remainder() {
        let mut step = FixedStep::new(Duration::from_millis(50)).unwrap();
        assert_eq!(step.advance(Duration::from_millis(30)), 0);
        assert_eq!(step.advance(Duration::from_millis(30)), 1);
        assert_eq!(step.accumulated(), Duration::from_millis(10));
        assert_eq!(step.advance(Duration::from_millis(140)), 3);
        assert_eq!(step.accumulated(), Duration::ZERO);
    }

    #[test]
    fn due_count_depends_only_on_total_elapsed() {
        let mut coarse = FixedStep::new(Duration::from_millis(50)).unwrap();
        let mut fine = FixedStep::new(Duration::from_millis(50)).unwrap();
        let coarse_due = coarse.advance(Duration::from_millis(1_000));
        let fine_due: u64 = (0..100)
            .map(|_| fine.advance(Duration::from_millis(10)))
            .sum();
        assert_eq!(coarse_due, 20);
        assert_eq!(fine_due, 20);
    }
}
