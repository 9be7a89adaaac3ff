//! Versioned, checksummed snapshots and the snapshot archive.
//!
//! # Blob format
//!
//! A snapshot blob is a JSON envelope:
//!
//! ```json
//! { "version": 1, "checksum": "<blake3 hex>", "body": "<canonical JSON>" }
//! ```
//!
//! The body is kept as a string so the checksum covers the exact bytes
//! that were written. It holds the tick, the world seed, the Universe,
//! the chaos tree's stream positions, and the checkpoint sealed at that
//! tick. The checkpoint lets a restored kernel continue the hash chain
//! without the checkpoints that came before it.

use std::collections::BTreeMap;

use axiom_chaos::RngState;
use axiom_types::{Digest, HashCheckpoint, SimTime};
use axiom_world::{Universe, WorldError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Current blob format version.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// Snapshot write or read failure.
///
/// A bad snapshot is fatal for that snapshot only; older snapshots stay
/// usable.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    /// Encoding the snapshot failed.
    #[error("snapshot encoding failed: {0}")]
    Encode(#[source] serde_json::Error),

    /// The blob is not a well-formed snapshot.
    #[error("malformed snapshot: {0}")]
    Malformed(#[source] serde_json::Error),

    /// The blob was written by an unknown format version.
    #[error("unsupported snapshot version {found} (supported: {supported})")]
    UnsupportedVersion {
        /// Version in the blob.
        found: u32,
        /// Version this build reads.
        supported: u32,
    },

    /// The body does not hash to the stored checksum.
    #[error("snapshot checksum mismatch: stored {stored}, computed {computed}")]
    ChecksumMismatch {
        /// Checksum in the envelope.
        stored: Digest,
        /// Checksum of the body as read.
        computed: Digest,
    },

    /// The stored checkpoint belongs to a different tick.
    #[error("snapshot at tick {snapshot} carries checkpoint for tick {checkpoint}")]
    TickMismatch {
        /// Snapshot tick.
        snapshot: SimTime,
        /// Checkpoint tick.
        checkpoint: SimTime,
    },

    /// The Universe does not hash to the checkpoint's state digest.
    #[error("snapshot universe does not match its checkpoint at tick {tick}")]
    StateDigestMismatch {
        /// Snapshot tick.
        tick: SimTime,
    },

    /// The Universe could not be digested.
    #[error(transparent)]
    World(#[from] WorldError),
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    version: u32,
    checksum: Digest,
    body: String,
}

#[derive(Serialize)]
struct BodyRef<'a> {
    tick: SimTime,
    seed: u64,
    universe: &'a Universe,
    rng_state: &'a RngState,
    chain_tip: &'a HashCheckpoint,
}

#[derive(Deserialize)]
struct Body {
    tick: SimTime,
    seed: u64,
    universe: Universe,
    rng_state: RngState,
    chain_tip: HashCheckpoint,
}

/// Everything needed to resume from a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredState {
    /// Tick the snapshot was taken at.
    pub tick: SimTime,
    /// World seed.
    pub seed: u64,
    /// Universe as of the end of `tick`.
    pub universe: Universe,
    /// Chaos stream positions as of the end of `tick`.
    pub rng_state: RngState,
    /// Checkpoint sealed at `tick`.
    pub chain_tip: HashCheckpoint,
}

/// Snapshot cadence plus blob encoding and decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotManager {
    interval_ticks: u64,
}

impl SnapshotManager {
    /// Snapshot every `interval_ticks` ticks. Zero disables periodic
    /// snapshots.
    pub const fn new(interval_ticks: u64) -> Self {
        Self { interval_ticks }
    }

    /// The configured interval.
    pub const fn interval_ticks(&self) -> u64 {
        self.interval_ticks
    }

    /// Whether a periodic snapshot is due after sealing `tick`.
    pub fn is_due(&self, tick: SimTime) -> bool {
        self.interval_ticks > 0
            && tick > SimTime::GENESIS
            && tick.get().checked_rem(self.interval_ticks) == Some(0)
    }

    /// Encode a snapshot blob.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Encode`] if serialization fails.
    pub fn snapshot(
        &self,
        universe: &Universe,
        rng_state: &RngState,
        tick: SimTime,
        seed: u64,
        chain_tip: &HashCheckpoint,
    ) -> Result<Vec<u8>, SnapshotError> {
        let body = serde_json::to_string(&BodyRef {
            tick,
            seed,
            universe,
            rng_state,
            chain_tip,
        })
        .map_err(SnapshotError::Encode)?;
        let envelope = Envelope {
            version: SNAPSHOT_FORMAT_VERSION,
            checksum: Digest::of(body.as_bytes()),
            body,
        };
        let blob = serde_json::to_vec(&envelope).map_err(SnapshotError::Encode)?;
        debug!(tick = tick.get(), bytes = blob.len(), "snapshot encoded");
        Ok(blob)
    }

    /// Decode and validate a snapshot blob.
    ///
    /// # Errors
    ///
    /// Fails on malformed JSON, an unknown version, a checksum mismatch,
    /// or a Universe that does not match the stored checkpoint.
    pub fn restore(&self, blob: &[u8]) -> Result<RestoredState, SnapshotError> {
        let envelope: Envelope = serde_json::from_slice(blob).map_err(SnapshotError::Malformed)?;
        if envelope.version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: envelope.version,
                supported: SNAPSHOT_FORMAT_VERSION,
            });
        }
        let computed = Digest::of(envelope.body.as_bytes());
        if computed != envelope.checksum {
            return Err(SnapshotError::ChecksumMismatch {
                stored: envelope.checksum,
                computed,
            });
        }
        let body: Body = serde_json::from_str(&envelope.body).map_err(SnapshotError::Malformed)?;
        if body.chain_tip.tick != body.tick {
            return Err(SnapshotError::TickMismatch {
                snapshot: body.tick,
                checkpoint: body.chain_tip.tick,
            });
        }
        if body.universe.state_digest()? != body.chain_tip.state_digest {
            return Err(SnapshotError::StateDigestMismatch { tick: body.tick });
        }
        Ok(RestoredState {
            tick: body.tick,
            seed: body.seed,
            universe: body.universe,
            rng_state: body.rng_state,
            chain_tip: body.chain_tip,
        })
    }
}

/// Every snapshot taken, keyed by tick.
///
/// Snapshots are superseded by later ones but never removed.
#[derive(Debug, Clone, Default)]
pub struct SnapshotArchive {
    blobs: BTreeMap<SimTime, Vec<u8>>,
}

impl SnapshotArchive {
    /// An empty archive.
    pub const fn new() -> Self {
        Self {
            blobs: BTreeMap::new(),
        }
    }

    /// Store the blob for `tick`. A tick already archived keeps its
    /// original blob and this returns `false`.
    pub fn insert(&mut self, tick: SimTime, blob: Vec<u8>) -> bool {
        if self.blobs.contains_key(&tick) {
            return false;
        }
        self.blobs.insert(tick, blob);
        true
    }

    /// Blob for exactly `tick`.
    pub fn get(&self, tick: SimTime) -> Option<&[u8]> {
        self.blobs.get(&tick).map(Vec::as_slice)
    }

    /// Latest snapshot taken at or before `tick`.
    pub fn latest_at_or_before(&self, tick: SimTime) -> Option<(SimTime, &[u8])> {
        self.blobs
            .range(..=tick)
            .next_back()
            .map(|(t, blob)| (*t, blob.as_slice()))
    }

    /// Archived ticks in order.
    pub fn ticks(&self) -> impl Iterator<Item = SimTime> + '_ {
        self.blobs.keys().copied()
    }

    /// Number of archived snapshots.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    /// Whether the archive is empty.
    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }

    /// Restore the newest valid snapshot at or before `tick`, skipping
    /// any that fail validation.
    pub fn restore_latest_valid(
        &self,
        manager: &SnapshotManager,
        tick: SimTime,
    ) -> Option<RestoredState> {
        self.blobs
            .range(..=tick)
            .rev()
            .find_map(|(at, blob)| match manager.restore(blob) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!(tick = at.get(), error = %e, "skipping unusable snapshot");
                    None
                }
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axiom_chaos::{ChaosTree, SubsystemId};
    use axiom_world::{GenesisConfig, genesis};

    use super::*;

    fn fixture() -> (Universe, RngState, HashCheckpoint) {
        let mut chaos = ChaosTree::new(9, SubsystemId::ALL);
        let universe = genesis(&GenesisConfig::default(), &mut chaos).unwrap();
        let tip = HashCheckpoint::next(&Digest::ZERO, SimTime::GENESIS, universe.state_digest().unwrap());
        (universe, chaos.state(), tip)
    }

    fn blob(manager: &SnapshotManager) -> Vec<u8> {
        let (universe, rng, tip) = fixture();
        manager
            .snapshot(&universe, &rng, SimTime::GENESIS, 9, &tip)
            .unwrap()
    }

    #[test]
    fn restore_returns_what_was_saved() {
        let manager = SnapshotManager::new(500);
        let (universe, rng, tip) = fixture();
        let restored = manager.restore(&blob(&manager)).unwrap();
        assert_eq!(restored.universe, universe);
        assert_eq!(restored.rng_state, rng);
        assert_eq!(restored.chain_tip, tip);
        assert_eq!(restored.seed, 9);
    }

    #[test]
    fn corrupted_body_fails_checksum() {
        let manager = SnapshotManager::new(500);
        let mut envelope: serde_json::Value = serde_json::from_slice(&blob(&manager)).unwrap();
        let body = envelope
            .get("body")
            .and_then(serde_json::Value::as_str)
            .unwrap()
            .replacen("\"energy\":80", "\"energy\":81", 1);
        envelope
            .as_object_mut()
            .unwrap()
            .insert(String::from("body"), serde_json::Value::String(body));
        let tampered = serde_json::to_vec(&envelope).unwrap();
        assert!(matches!(
            manager.restore(&tampered),
            Err(SnapshotError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn unknown_version_is_refused() {
        let manager = SnapshotManager::new(500);
        let mut envelope: serde_json::Value = serde_json::from_slice(&blob(&manager)).unwrap();
        envelope
            .as_object_mut()
            .unwrap()
            .insert(String::from("version"), serde_json::json!(99));
        let blob = serde_json::to_vec(&envelope).unwrap();
        assert!(matches!(
            manager.restore(&blob),
            Err(SnapshotError::UnsupportedVersion { found: 99, .. })
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        let manager = SnapshotManager::new(500);
        assert!(matches!(
            manager.restore(b"not a snapshot"),
            Err(SnapshotError::Malformed(_))
        ));
    }

    #[test]
    fn due_on_interval_multiples_only() {
        let manager = SnapshotManager::new(250);
        assert!(!manager.is_due(SimTime::GENESIS));
        assert!(!manager.is_due(SimTime::new(249)));
        assert!(manager.is_due(SimTime::new(250)));
        assert!(manager.is_due(SimTime::new(500)));
        assert!(!SnapshotManager::new(0).is_due(SimTime::new(500)));
    }

    #[test]
    fn archive_falls_back_past_bad_snapshots() {
        let manager = SnapshotManager::new(500);
        let mut archive = SnapshotArchive::new();
        assert!(archive.insert(SimTime::GENESIS, blob(&manager)));
        assert!(archive.insert(SimTime::new(500), b"corrupt".to_vec()));
        assert!(!archive.insert(SimTime::new(500), blob(&manager)));
        assert_eq!(archive.len(), 2);

        let (latest, _) = archive.latest_at_or_before(SimTime::new(700)).unwrap();
        assert_eq!(latest, SimTime::new(500));
        let restored = archive
            .restore_latest_valid(&manager, SimTime::new(700))
            .unwrap();
        assert_eq!(restored.tick, SimTime::GENESIS);
    }
}
