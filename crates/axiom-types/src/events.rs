//! Input events and their total order.
//!
//! An [`InputEvent`] is immutable once accepted. Events are ordered by
//! [`EventKey`]: `(tick, sequence)` first, then `source_id` compared as
//! bytes. The tie-break is fixed and never depends on arrival order.

use serde::{Deserialize, Serialize};

use crate::time::SimTime;

/// Identifies the external gateway or client that produced an event.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    /// Wrap a source name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Borrow the source name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SourceId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SourceId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// An externally supplied request to change the Universe.
///
/// `kind` and `payload` are kept in their wire form here. They are decoded
/// into the closed action set by the Perception stage, so an unknown kind is
/// a pipeline rejection rather than an ingestion failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputEvent {
    /// Tick at which the event is due.
    pub tick: SimTime,
    /// Per-source sequence number.
    pub sequence: u64,
    /// Producer of the event.
    pub source_id: SourceId,
    /// Action kind wire name, e.g. `"chat"`.
    pub kind: String,
    /// Kind-specific parameters.
    pub payload: serde_json::Value,
    /// Gateway signature, verified upstream and carried for audit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

impl InputEvent {
    /// Build an unsigned event.
    pub fn new(
        tick: SimTime,
        sequence: u64,
        source_id: impl Into<SourceId>,
        kind: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            tick,
            sequence,
            source_id: source_id.into(),
            kind: kind.into(),
            payload,
            signature: None,
        }
    }

    /// This event's position in the total order.
    pub fn key(&self) -> EventKey {
        EventKey {
            tick: self.tick,
            sequence: self.sequence,
            source_id: self.source_id.clone(),
        }
    }
}

/// Total-order key for input events.
///
/// Field declaration order drives the derived [`Ord`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventKey {
    /// Tick at which the event is due.
    pub tick: SimTime,
    /// Per-source sequence number.
    pub sequence: u64,
    /// Tie-break between sources with the same `(tick, sequence)`.
    pub source_id: SourceId,
}

impl EventKey {
    /// The `(tick, sequence)` pair used for per-source monotonicity checks.
    pub const fn tick_sequence(&self) -> (SimTime, u64) {
        (self.tick, self.sequence)
    }
}
