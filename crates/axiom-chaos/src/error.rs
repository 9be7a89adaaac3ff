//! Chaos tree misuse errors.
//!
//! Every variant here is an implementation bug. Callers must propagate them
//! to the top level and stop tick advancement.

use axiom_types::SimTime;

use crate::subsystem::{StreamKey, SubsystemId};

/// The chaos tree was used in a way that breaks determinism.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RngMisuseError {
    /// A draw was requested from a subsystem that was never registered.
    #[error("subsystem `{subsystem}` is not registered with the chaos tree")]
    UnregisteredSubsystem {
        /// The subsystem that was requested.
        subsystem: SubsystemId,
    },

    /// A stream's draw counter did not advance by exactly one.
    #[error("stream {stream} counter went from {previous} to {observed} at tick {tick}")]
    CounterRegression {
        /// The offending stream.
        stream: StreamKey,
        /// Last counter seen for the stream.
        previous: u64,
        /// Counter that broke monotonic order.
        observed: u64,
        /// Tick the bad record belongs to.
        tick: SimTime,
    },

    /// A stream's draw counter would overflow.
    #[error("stream {stream} draw counter overflow")]
    CounterOverflow {
        /// The exhausted stream.
        stream: StreamKey,
    },
}
