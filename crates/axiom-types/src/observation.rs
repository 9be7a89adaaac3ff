//! Observation events emitted by the authority pipeline.

use serde::{Deserialize, Serialize};

use crate::digest::Digest;
use crate::time::SimTime;

/// What an observation records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationType {
    /// An input event passed every stage and was committed.
    Committed,
    /// An input event was rejected by a pipeline stage.
    Rejected,
}

impl ObservationType {
    /// Stable tag mixed into the content hash.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Rejected => "rejected",
        }
    }
}

/// A read-only record of a commit or rejection.
///
/// Observations never feed back into simulation state. `content_hash`
/// binds the tick, type, and payload so audit consumers can detect
/// tampering in transit or storage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationEvent {
    /// Tick at which the observed event was processed.
    pub tick: SimTime,
    /// Commit or rejection.
    pub event_type: ObservationType,
    /// Type-specific body.
    pub payload: serde_json::Value,
    /// BLAKE3 over `tick_le || type tag || payload JSON`.
    pub content_hash: Digest,
}

impl ObservationEvent {
    /// Build an observation and compute its content hash.
    pub fn new(tick: SimTime, event_type: ObservationType, payload: serde_json::Value) -> Self {
        let content_hash = Self::compute_hash(tick, event_type, &payload);
        Self {
            tick,
            event_type,
            payload,
            content_hash,
        }
    }

    fn compute_hash(tick: SimTime, event_type: ObservationType, payload: &serde_json::Value) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&tick.to_le_bytes());
        hasher.update(event_type.as_str().as_bytes());
        hasher.update(payload.to_string().as_bytes());
        Digest::from(hasher.finalize())
    }

    /// Recompute the content hash and compare.
    pub fn verify(&self) -> bool {
        Self::compute_hash(self.tick, self.event_type, &self.payload) == self.content_hash
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn fresh_observation_verifies() {
        let obs = ObservationEvent::new(
            SimTime(7),
            ObservationType::Rejected,
            serde_json::json!({"reason": "agent is resting"}),
        );
        assert!(obs.verify());
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let mut obs = ObservationEvent::new(
            SimTime(7),
            ObservationType::Committed,
            serde_json::json!({"agent": 1}),
        );
        obs.payload = serde_json::json!({"agent": 2});
        assert!(!obs.verify());
    }

    #[test]
    fn survives_json_transport() {
        let obs = ObservationEvent::new(
            SimTime(3),
            ObservationType::Committed,
            serde_json::json!({"kind": "chat", "text": "hi"}),
        );
        let json = serde_json::to_string(&obs).unwrap();
        let back: ObservationEvent = serde_json::from_str(&json).unwrap();
        assert!(back.verify());
        assert_eq!(back, obs);
    }
}
