//! Seed derivation, stream handles, and serializable RNG state.

use std::collections::{BTreeMap, BTreeSet};
use std::panic::Location;

use axiom_types::{EntityId, SimTime};
use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::audit::{DrawAudit, DrawRecord};
use crate::error::RngMisuseError;
use crate::subsystem::{StreamKey, SubsystemId};

/// Domain-separation context for stretching the world seed.
const GLOBAL_SEED_CONTEXT: &str = "axiom chaos tree global seed v1";

/// `ChaCha` words consumed by one `next_u64`.
const WORDS_PER_DRAW: u128 = 2;

/// Scale for turning a 53-bit integer into a float in `[0, 1)`.
const F64_UNIT: f64 = 1.0 / 9_007_199_254_740_992.0;

// ---------------------------------------------------------------------------
// Key derivation
// ---------------------------------------------------------------------------

fn global_key(seed: u64) -> [u8; 32] {
    blake3::derive_key(GLOBAL_SEED_CONTEXT, &seed.to_le_bytes())
}

fn subsystem_key(global: &[u8; 32], subsystem: SubsystemId) -> [u8; 32] {
    *blake3::keyed_hash(global, subsystem.as_str().as_bytes()).as_bytes()
}

fn stream_seed(global: &[u8; 32], key: StreamKey) -> [u8; 32] {
    let parent = subsystem_key(global, key.subsystem);
    match key.entity {
        None => parent,
        Some(entity) => *blake3::keyed_hash(&parent, &entity.into_inner().to_le_bytes()).as_bytes(),
    }
}

// ---------------------------------------------------------------------------
// RNG state
// ---------------------------------------------------------------------------

/// How far one stream has advanced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPosition {
    /// Owning subsystem.
    pub subsystem: SubsystemId,
    /// Entity for a sub-stream, absent for the subsystem root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<EntityId>,
    /// Number of draws made so far.
    pub draws: u64,
}

impl StreamPosition {
    const fn key(&self) -> StreamKey {
        StreamKey {
            subsystem: self.subsystem,
            entity: self.entity,
        }
    }
}

/// The complete RNG state of a chaos tree, excluding the seed.
///
/// Positions are sorted by stream key and streams with zero draws are
/// omitted, so two trees that behave identically serialize identically.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RngState {
    /// One entry per stream that has drawn at least once.
    pub streams: Vec<StreamPosition>,
}

// ---------------------------------------------------------------------------
// Chaos tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct StreamSlot {
    rng: ChaCha20Rng,
    draws: u64,
}

impl StreamSlot {
    fn new(seed: [u8; 32]) -> Self {
        Self {
            rng: ChaCha20Rng::from_seed(seed),
            draws: 0,
        }
    }

    fn at(seed: [u8; 32], draws: u64) -> Self {
        let mut rng = ChaCha20Rng::from_seed(seed);
        rng.set_word_pos(u128::from(draws).saturating_mul(WORDS_PER_DRAW));
        Self { rng, draws }
    }
}

/// Root of all simulation randomness.
///
/// Owned by the kernel alongside the Universe. Subsystems receive it by
/// `&mut` at call time and draw through [`Stream`] handles.
#[derive(Debug, Clone)]
pub struct ChaosTree {
    seed: u64,
    global: [u8; 32],
    registered: BTreeSet<SubsystemId>,
    streams: BTreeMap<StreamKey, StreamSlot>,
    audit: DrawAudit,
    tick: SimTime,
}

impl ChaosTree {
    /// Build a tree for `seed` with the given subsystems registered.
    pub fn new(seed: u64, subsystems: impl IntoIterator<Item = SubsystemId>) -> Self {
        Self {
            seed,
            global: global_key(seed),
            registered: subsystems.into_iter().collect(),
            streams: BTreeMap::new(),
            audit: DrawAudit::default(),
            tick: SimTime::GENESIS,
        }
    }

    /// Replace the draw audit configuration.
    #[must_use]
    pub fn with_audit(mut self, audit: DrawAudit) -> Self {
        self.audit = audit;
        self
    }

    /// Rebuild a tree from a saved [`RngState`]. Every stream resumes at its
    /// recorded draw count.
    pub fn restore(
        seed: u64,
        subsystems: impl IntoIterator<Item = SubsystemId>,
        state: &RngState,
        audit: DrawAudit,
    ) -> Result<Self, RngMisuseError> {
        let mut tree = Self::new(seed, subsystems).with_audit(audit);
        for position in &state.streams {
            if !tree.registered.contains(&position.subsystem) {
                return Err(RngMisuseError::UnregisteredSubsystem {
                    subsystem: position.subsystem,
                });
            }
            let key = position.key();
            tree.streams
                .insert(key, StreamSlot::at(stream_seed(&tree.global, key), position.draws));
        }
        tree.audit
            .seed_counters(state.streams.iter().map(|p| (p.key(), p.draws)));
        debug!(seed, streams = state.streams.len(), "chaos tree restored");
        Ok(tree)
    }

    /// The world seed.
    pub const fn seed(&self) -> u64 {
        self.seed
    }

    /// Set the tick stamped on subsequent audit records.
    pub const fn set_tick(&mut self, tick: SimTime) {
        self.tick = tick;
    }

    /// Whether `subsystem` may draw.
    pub fn is_registered(&self, subsystem: SubsystemId) -> bool {
        self.registered.contains(&subsystem)
    }

    /// Registered subsystems in order.
    pub fn subsystems(&self) -> impl Iterator<Item = SubsystemId> + '_ {
        self.registered.iter().copied()
    }

    /// A handle to `subsystem`'s root stream.
    pub fn fork(&mut self, subsystem: SubsystemId) -> Result<Stream<'_>, RngMisuseError> {
        self.stream(StreamKey::root(subsystem))
    }

    /// A handle to `entity`'s sub-stream under `subsystem`.
    ///
    /// The sub-stream key is derived from the entity id alone, so it does
    /// not matter when the stream is first touched.
    pub fn fork_entity(
        &mut self,
        subsystem: SubsystemId,
        entity: impl Into<EntityId>,
    ) -> Result<Stream<'_>, RngMisuseError> {
        self.stream(StreamKey::entity(subsystem, entity.into()))
    }

    fn stream(&mut self, key: StreamKey) -> Result<Stream<'_>, RngMisuseError> {
        if !self.registered.contains(&key.subsystem) {
            return Err(RngMisuseError::UnregisteredSubsystem {
                subsystem: key.subsystem,
            });
        }
        let global = self.global;
        let slot = self
            .streams
            .entry(key)
            .or_insert_with(|| StreamSlot::new(stream_seed(&global, key)));
        Ok(Stream {
            key,
            slot,
            audit: &mut self.audit,
            tick: self.tick,
        })
    }

    /// Draws made so far on `key`.
    pub fn draws(&self, key: StreamKey) -> u64 {
        self.streams.get(&key).map_or(0, |slot| slot.draws)
    }

    /// Snapshot of every stream's position.
    pub fn state(&self) -> RngState {
        RngState {
            streams: self
                .streams
                .iter()
                .filter(|(_, slot)| slot.draws > 0)
                .map(|(key, slot)| StreamPosition {
                    subsystem: key.subsystem,
                    entity: key.entity,
                    draws: slot.draws,
                })
                .collect(),
        }
    }

    /// The draw audit trail.
    pub const fn audit(&self) -> &DrawAudit {
        &self.audit
    }

    /// Draw records made since the previous call, for export.
    pub fn take_draws(&mut self) -> Vec<DrawRecord> {
        self.audit.take_pending()
    }
}

// ---------------------------------------------------------------------------
// Stream handle
// ---------------------------------------------------------------------------

/// A borrowed handle to one stream. Every draw is audited.
#[derive(Debug)]
pub struct Stream<'a> {
    key: StreamKey,
    slot: &'a mut StreamSlot,
    audit: &'a mut DrawAudit,
    tick: SimTime,
}

impl Stream<'_> {
    /// The stream this handle draws from.
    pub const fn key(&self) -> StreamKey {
        self.key
    }

    /// Next raw 64-bit value.
    #[track_caller]
    pub fn next_u64(&mut self) -> Result<u64, RngMisuseError> {
        let callsite = Location::caller();
        let draws = self
            .slot
            .draws
            .checked_add(1)
            .ok_or(RngMisuseError::CounterOverflow { stream: self.key })?;
        let value = self.slot.rng.next_u64();
        self.slot.draws = draws;
        self.audit
            .record(self.tick, self.key, callsite, draws, value)?;
        Ok(value)
    }

    /// Next float in `[0, 1)`, built from the top 53 bits of one draw.
    #[track_caller]
    pub fn next_f64(&mut self) -> Result<f64, RngMisuseError> {
        let bits = self.next_u64()? >> 11;
        // 53-bit integers are exact in f64.
        #[allow(clippy::cast_precision_loss)]
        let value = bits as f64 * F64_UNIT;
        Ok(value)
    }

    /// Next integer in `[0, bound)`. Returns 0 when `bound` is 0.
    #[track_caller]
    pub fn next_below(&mut self, bound: u64) -> Result<u64, RngMisuseError> {
        let raw = self.next_u64()?;
        let wide = u128::from(raw).wrapping_mul(u128::from(bound)) >> 64;
        Ok(u64::try_from(wide).unwrap_or(0))
    }
}
