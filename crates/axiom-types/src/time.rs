//! Simulation time.
//!
//! [`SimTime`] is the only notion of time that enters simulation state. It is
//! a plain tick index: monotonic, never decremented, and never derived from
//! the wall clock.

use serde::{Deserialize, Serialize};

/// A discrete tick index. Tick 0 is genesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SimTime(pub u64);

impl SimTime {
    /// The genesis tick.
    pub const GENESIS: Self = Self(0);

    /// Wrap a raw tick number.
    pub const fn new(tick: u64) -> Self {
        Self(tick)
    }

    /// Return the raw tick number.
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Return the following tick, or `None` on overflow.
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(t) => Some(Self(t)),
            None => None,
        }
    }

    /// Little-endian bytes, the canonical encoding used in digests.
    pub const fn to_le_bytes(self) -> [u8; 8] {
        self.0.to_le_bytes()
    }
}

impl core::fmt::Display for SimTime {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for SimTime {
    fn from(tick: u64) -> Self {
        Self(tick)
    }
}
