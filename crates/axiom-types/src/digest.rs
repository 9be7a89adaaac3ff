//! Cryptographic digests and the per-tick hash checkpoint.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::time::SimTime;

/// A 32-byte BLAKE3 digest.
///
/// Serialized as a lowercase hex string so that persisted checkpoints and
/// observation payloads stay readable.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Digest([u8; 32]);

/// A hex string could not be parsed into a [`Digest`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid digest hex: {0}")]
pub struct DigestParseError(String);

impl Digest {
    /// The all-zero digest, used as the chain predecessor of tick 0.
    pub const ZERO: Self = Self([0; 32]);

    /// Wrap raw digest bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash `data` with BLAKE3.
    pub fn of(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Borrow the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        blake3::Hash::from(self.0).to_hex().to_string()
    }

    /// Parse a 64-character hex string.
    ///
    /// # Errors
    ///
    /// Returns [`DigestParseError`] if the string is not valid hex of the
    /// right length.
    pub fn from_hex(hex: &str) -> Result<Self, DigestParseError> {
        blake3::Hash::from_hex(hex)
            .map(|hash| Self(*hash.as_bytes()))
            .map_err(|e| DigestParseError(e.to_string()))
    }
}

impl From<blake3::Hash> for Digest {
    fn from(hash: blake3::Hash) -> Self {
        Self(*hash.as_bytes())
    }
}

impl core::fmt::Debug for Digest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl core::fmt::Display for Digest {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Digest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Digest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::from_hex(&hex).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Hash checkpoint
// ---------------------------------------------------------------------------

/// One link of the hash chain, produced once per tick.
///
/// `chain_digest = H(prev_chain_digest || tick_le || state_digest)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashCheckpoint {
    /// The tick this checkpoint seals.
    pub tick: SimTime,
    /// Digest of the canonical Universe encoding at the end of the tick.
    pub state_digest: Digest,
    /// Cumulative digest linking this tick to every prior tick.
    pub chain_digest: Digest,
}

impl HashCheckpoint {
    /// Compute the chain digest for `tick` given its predecessor.
    pub fn link(prev_chain: &Digest, tick: SimTime, state_digest: &Digest) -> Digest {
        let mut hasher = blake3::Hasher::new();
        hasher.update(prev_chain.as_bytes());
        hasher.update(&tick.to_le_bytes());
        hasher.update(state_digest.as_bytes());
        Digest::from(hasher.finalize())
    }

    /// Build the checkpoint that follows `prev_chain`.
    pub fn next(prev_chain: &Digest, tick: SimTime, state_digest: Digest) -> Self {
        Self {
            tick,
            state_digest,
            chain_digest: Self::link(prev_chain, tick, &state_digest),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() {
        let digest = Digest::of(b"axiom");
        let parsed = Digest::from_hex(&digest.to_hex()).unwrap();
        assert_eq!(parsed, digest);
    }

    #[test]
    fn bad_hex_is_rejected() {
        assert!(Digest::from_hex("not-a-digest").is_err());
    }

    #[test]
    fn serializes_as_hex_string() {
        let json = serde_json::to_value(Digest::ZERO).unwrap();
        assert_eq!(json, serde_json::Value::String("0".repeat(64)));
    }

    #[test]
    fn chain_link_is_order_sensitive() {
        let a = Digest::of(b"a");
        let b = Digest::of(b"b");
        let ab = HashCheckpoint::link(&HashCheckpoint::link(&Digest::ZERO, SimTime(0), &a), SimTime(1), &b);
        let ba = HashCheckpoint::link(&HashCheckpoint::link(&Digest::ZERO, SimTime(0), &b), SimTime(1), &a);
        assert_ne!(ab, ba);
    }

    #[test]
    fn chain_link_depends_on_tick() {
        let state = Digest::of(b"state");
        assert_ne!(
            HashCheckpoint::link(&Digest::ZERO, SimTime(1), &state),
            HashCheckpoint::link(&Digest::ZERO, SimTime(2), &state)
        );
    }
}
