//! Deterministic genesis.
//!
//! The tick-0 Universe is a pure function of the world seed and the
//! [`GenesisConfig`]. Chunk resources come from the Environment stream and
//! agent placement from the Physics stream; entity ids are handed out by
//! the Universe's counter starting at 1, agent before homestead.

use axiom_chaos::{ChaosTree, SubsystemId};
use axiom_types::{AgentId, AssetId, ChunkId};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::entities::{Agent, Asset, Chunk, MAX_ENERGY, MAX_HEALTH};
use crate::error::WorldError;
use crate::universe::Universe;

/// Largest grid genesis will build.
pub const MAX_CHUNKS: u64 = 1 << 20;

/// Parameters for the tick-0 Universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenesisConfig {
    /// Number of genesis agents.
    pub agents: u32,
    /// Grid width in chunks.
    pub width: u32,
    /// Grid height in chunks.
    pub height: u32,
    /// Upper bound on a chunk's starting resources.
    pub initial_resources: u32,
    /// Regrowth ceiling per chunk.
    pub resource_capacity: u32,
    /// Starting energy for every genesis agent.
    pub initial_energy: u32,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            agents: 8,
            width: 16,
            height: 16,
            initial_resources: 20,
            resource_capacity: 50,
            initial_energy: 80,
        }
    }
}

impl GenesisConfig {
    fn validate(&self) -> Result<u64, WorldError> {
        if self.width == 0 || self.height == 0 {
            return Err(WorldError::InvalidGenesis(String::from(
                "grid must have at least one chunk",
            )));
        }
        let chunks = u64::from(self.width)
            .checked_mul(u64::from(self.height))
            .filter(|n| *n <= MAX_CHUNKS)
            .ok_or_else(|| WorldError::InvalidGenesis(format!("grid exceeds {MAX_CHUNKS} chunks")))?;
        if self.initial_resources > self.resource_capacity {
            return Err(WorldError::InvalidGenesis(String::from(
                "initial_resources exceeds resource_capacity",
            )));
        }
        if self.initial_energy > MAX_ENERGY {
            return Err(WorldError::InvalidGenesis(format!(
                "initial_energy exceeds {MAX_ENERGY}"
            )));
        }
        Ok(chunks)
    }
}

/// Build the tick-0 Universe.
pub fn genesis(config: &GenesisConfig, chaos: &mut ChaosTree) -> Result<Universe, WorldError> {
    let chunk_count = config.validate()?;
    let mut universe = Universe::empty(config.width, config.height);

    {
        let mut environment = chaos.fork(SubsystemId::Environment)?;
        let half = config.initial_resources / 2;
        let spread = u64::from(config.initial_resources.saturating_sub(half)).saturating_add(1);
        for y in 0..config.height {
            for x in 0..config.width {
                let id = universe
                    .chunk_at(i64::from(x), i64::from(y))
                    .ok_or(WorldError::ArithmeticOverflow)?;
                let extra = u32::try_from(environment.next_below(spread)?)
                    .map_err(|_e| WorldError::ArithmeticOverflow)?;
                universe.insert_chunk(Chunk {
                    id,
                    x,
                    y,
                    resources: half.saturating_add(extra),
                    capacity: config.resource_capacity,
                });
            }
        }
    }

    let mut physics = chaos.fork(SubsystemId::Physics)?;
    for _ in 0..config.agents {
        let agent = AgentId::from(universe.allocate_id()?);
        let chunk = ChunkId::new(physics.next_below(chunk_count)?);
        universe.insert_agent(Agent {
            id: agent,
            chunk,
            energy: config.initial_energy,
            health: MAX_HEALTH,
            resting: false,
            inventory: 0,
            born_at: axiom_types::SimTime::GENESIS,
            parents: Vec::new(),
        });
        let home = AssetId::from(universe.allocate_id()?);
        universe.insert_owned_asset(
            Asset {
                id: home,
                label: String::from("homestead"),
                chunk,
            },
            agent,
        );
    }

    info!(
        agents = config.agents,
        width = config.width,
        height = config.height,
        seed = chaos.seed(),
        "genesis universe built"
    );
    Ok(universe)
}
