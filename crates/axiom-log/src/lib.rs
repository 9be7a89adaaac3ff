//! Append-only event log and hash chain for the Axiom simulation kernel.
//!
//! Two structures live here, both append-only:
//!
//! - [`event_log`] -- The [`EventLog`] of accepted input events. Each source
//!   must present strictly increasing `(tick, sequence)` keys; anything else
//!   is an [`LogError::OrderingViolation`] and leaves the log unchanged.
//!   Range reads are lazy, ordered by [`EventKey`], and can be restarted.
//! - [`chain`] -- The [`CheckpointChain`], one [`HashCheckpoint`] per tick.
//!   [`CheckpointChain::verify_chain`] recomputes every link and reports the
//!   first [`LogError::HashMismatch`]; [`CheckpointChain::verify_new_links`]
//!   checks only what was appended since its last call.
//!
//! # Chain rule
//!
//! ```text
//! chain_digest(t) = BLAKE3(chain_digest(t - 1) || t as u64 LE || state_digest(t))
//! chain_digest(-1) = 32 zero bytes
//! ```
//!
//! [`EventKey`]: axiom_types::EventKey
//! [`HashCheckpoint`]: axiom_types::HashCheckpoint

pub mod chain;
pub mod event_log;

pub use chain::CheckpointChain;
pub use event_log::{EventLog, EventRange};

use axiom_types::{Digest, SimTime, SourceId};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors raised by the event log and the hash chain.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LogError {
    /// An event's `(tick, sequence)` does not exceed the last accepted key
    /// for its source.
    #[error(
        "ordering violation from `{source_id}`: ({tick}, {sequence}) does not exceed ({last_tick}, {last_sequence})"
    )]
    OrderingViolation {
        /// The offending source.
        source_id: SourceId,
        /// Tick of the last accepted event from this source.
        last_tick: SimTime,
        /// Sequence of the last accepted event from this source.
        last_sequence: u64,
        /// Tick of the rejected event.
        tick: SimTime,
        /// Sequence of the rejected event.
        sequence: u64,
    },

    /// A stored chain digest disagrees with its recomputation.
    #[error("hash mismatch at tick {tick}: stored {stored}, computed {computed}")]
    HashMismatch {
        /// Tick of the first bad checkpoint.
        tick: SimTime,
        /// Digest found in the chain.
        stored: Digest,
        /// Digest recomputed from the predecessor.
        computed: Digest,
    },

    /// A checkpoint does not directly follow its predecessor's tick.
    #[error("non-contiguous checkpoint: expected tick {expected}, got {got}")]
    NonContiguousTick {
        /// The tick that should come next.
        expected: SimTime,
        /// The tick presented.
        got: SimTime,
    },
}
