//! Entity records held in the Universe arena.
//!
//! Entities never hold references to one another. Cross-links are integer
//! ids resolved through the owning [`Universe`].
//!
//! [`Universe`]: crate::Universe

use axiom_types::{ActionKind, AgentId, AssetId, ChunkId, LawId, SimTime};
use serde::{Deserialize, Serialize};

/// Upper bound for agent energy.
pub const MAX_ENERGY: u32 = 100;

/// Starting and maximum health.
pub const MAX_HEALTH: u32 = 10;

/// Affinity values are clamped to `[-AFFINITY_LIMIT, AFFINITY_LIMIT]`.
pub const AFFINITY_LIMIT: i32 = 100;

/// A simulated agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique id, assigned from the Universe's entity counter.
    pub id: AgentId,
    /// Chunk the agent stands on.
    pub chunk: ChunkId,
    /// Current energy, `0..=MAX_ENERGY`.
    pub energy: u32,
    /// Current health. Zero means incapacitated.
    pub health: u32,
    /// Whether the agent is resting.
    pub resting: bool,
    /// Resources carried.
    pub inventory: u64,
    /// Tick of birth (0 for genesis agents).
    pub born_at: SimTime,
    /// Parents, empty for genesis agents.
    pub parents: Vec<AgentId>,
}

impl Agent {
    /// Whether the agent can act at all.
    pub const fn is_alive(&self) -> bool {
        self.health > 0
    }
}

/// One cell of the world grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Row-major index, `y * width + x`.
    pub id: ChunkId,
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
    /// Gatherable resources currently present.
    pub resources: u32,
    /// Ceiling for regrowth.
    pub capacity: u32,
}

/// An ownable asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// Unique id, assigned from the Universe's entity counter.
    pub id: AssetId,
    /// Descriptive label.
    pub label: String,
    /// Chunk the asset sits on.
    pub chunk: ChunkId,
}

/// An active law forbidding one action kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Law {
    /// Unique id, assigned from the Universe's entity counter.
    pub id: LawId,
    /// Action kind this law forbids.
    pub forbids: ActionKind,
    /// Agent that enacted the law.
    pub enacted_by: AgentId,
    /// Tick of enactment.
    pub enacted_at: SimTime,
}

/// One line of committed chat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utterance {
    /// Tick the line was committed.
    pub tick: SimTime,
    /// Speaker.
    pub speaker: AgentId,
    /// Normalized text.
    pub text: String,
}
