//! The Universe: sole owner of mutable simulation state.
//!
//! Fields are private. Readers get accessors; the only write path is
//! [`Universe::apply`]. All collections are ordered so the canonical JSON
//! encoding, and therefore the state digest, is identical on every
//! platform.

use std::collections::BTreeMap;

use axiom_types::{ActionKind, AgentId, AssetId, ChunkId, Digest, EntityId, LawId, SimTime};
use serde::{Deserialize, Serialize};

use crate::entities::{AFFINITY_LIMIT, Agent, Asset, Chunk, Law, MAX_ENERGY, MAX_HEALTH, Utterance};
use crate::environment::Weather;
use crate::error::WorldError;
use crate::mutation::{Applied, Effect, Mutation};

/// Complete simulation state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Universe {
    width: u32,
    height: u32,
    weather: Weather,
    next_entity_id: u64,
    chunks: BTreeMap<ChunkId, Chunk>,
    agents: BTreeMap<AgentId, Agent>,
    assets: BTreeMap<AssetId, Asset>,
    ownership: BTreeMap<AssetId, AgentId>,
    relationships: BTreeMap<AgentId, BTreeMap<AgentId, i32>>,
    laws: BTreeMap<LawId, Law>,
    transcript: Vec<Utterance>,
}

impl Universe {
    /// An empty grid with no chunks populated. Used by genesis.
    pub(crate) const fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            weather: Weather::Clear,
            next_entity_id: 1,
            chunks: BTreeMap::new(),
            agents: BTreeMap::new(),
            assets: BTreeMap::new(),
            ownership: BTreeMap::new(),
            relationships: BTreeMap::new(),
            laws: BTreeMap::new(),
            transcript: Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Genesis-only construction
    // -----------------------------------------------------------------------

    pub(crate) fn allocate_id(&mut self) -> Result<EntityId, WorldError> {
        let id = self.next_entity_id;
        self.next_entity_id = id.checked_add(1).ok_or(WorldError::IdSpaceExhausted)?;
        Ok(EntityId::new(id))
    }

    pub(crate) fn insert_chunk(&mut self, chunk: Chunk) {
        self.chunks.insert(chunk.id, chunk);
    }

    pub(crate) fn insert_agent(&mut self, agent: Agent) {
        self.agents.insert(agent.id, agent);
    }

    pub(crate) fn insert_owned_asset(&mut self, asset: Asset, owner: AgentId) {
        self.ownership.insert(asset.id, owner);
        self.assets.insert(asset.id, asset);
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    /// Grid width in chunks.
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Grid height in chunks.
    pub const fn height(&self) -> u32 {
        self.height
    }

    /// Current weather.
    pub const fn weather(&self) -> Weather {
        self.weather
    }

    /// The id the next created entity will receive.
    pub const fn next_entity_id(&self) -> u64 {
        self.next_entity_id
    }

    /// Look up an agent.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(&id)
    }

    /// All agents in id order.
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    /// Number of agents, alive or not.
    pub fn population(&self) -> usize {
        self.agents.len()
    }

    /// Look up a chunk.
    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(&id)
    }

    /// All chunks in row-major order.
    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    /// The chunk at signed grid coordinates, or `None` if off the grid.
    pub fn chunk_at(&self, x: i64, y: i64) -> Option<ChunkId> {
        let x = u32::try_from(x).ok().filter(|x| *x < self.width)?;
        let y = u32::try_from(y).ok().filter(|y| *y < self.height)?;
        let index = u64::from(y)
            .checked_mul(u64::from(self.width))?
            .checked_add(u64::from(x))?;
        Some(ChunkId::new(index))
    }

    /// Look up an asset.
    pub fn asset(&self, id: AssetId) -> Option<&Asset> {
        self.assets.get(&id)
    }

    /// Current owner of an asset.
    pub fn owner_of(&self, asset: AssetId) -> Option<AgentId> {
        self.ownership.get(&asset).copied()
    }

    /// Directed affinity from `from` toward `to` (0 if never set).
    pub fn affinity(&self, from: AgentId, to: AgentId) -> i32 {
        self.relationships
            .get(&from)
            .and_then(|row| row.get(&to))
            .copied()
            .unwrap_or(0)
    }

    /// Look up an active law.
    pub fn law(&self, id: LawId) -> Option<&Law> {
        self.laws.get(&id)
    }

    /// Active laws in id order.
    pub fn laws(&self) -> impl Iterator<Item = &Law> {
        self.laws.values()
    }

    /// The lowest-numbered active law forbidding `kind`, if any.
    pub fn forbidding_law(&self, kind: ActionKind) -> Option<&Law> {
        self.laws.values().find(|law| law.forbids == kind)
    }

    /// Committed chat, oldest first.
    pub fn transcript(&self) -> &[Utterance] {
        &self.transcript
    }

    // -----------------------------------------------------------------------
    // Canonical encoding
    // -----------------------------------------------------------------------

    /// The canonical byte encoding hashed into checkpoints.
    pub fn canonical_bytes(&self) -> Result<Vec<u8>, WorldError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode a canonical encoding.
    pub fn from_canonical_bytes(bytes: &[u8]) -> Result<Self, WorldError> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// BLAKE3 digest of [`Universe::canonical_bytes`].
    pub fn state_digest(&self) -> Result<Digest, WorldError> {
        Ok(Digest::of(&self.canonical_bytes()?))
    }

    // -----------------------------------------------------------------------
    // The single write path
    // -----------------------------------------------------------------------

    /// Apply one mutation at `tick`.
    ///
    /// Every precondition is checked before anything is written, so a
    /// failed mutation leaves the Universe untouched.
    pub fn apply(&mut self, tick: SimTime, mutation: &Mutation) -> Result<Applied, WorldError> {
        match mutation {
            Mutation::Act {
                actor,
                energy_cost,
                effect,
            } => {
                self.check_effect(*actor, *energy_cost, effect)?;
                let agent = self.agent_mut(*actor)?;
                agent.energy = agent
                    .energy
                    .checked_sub(*energy_cost)
                    .ok_or(WorldError::ArithmeticOverflow)?;
                self.apply_effect(tick, *actor, effect)
            }
            Mutation::SetWeather { weather } => {
                self.weather = *weather;
                Ok(Applied::Done)
            }
            Mutation::Regrow { chunk, amount } => {
                let chunk = self
                    .chunks
                    .get_mut(chunk)
                    .ok_or(WorldError::ChunkNotFound(*chunk))?;
                chunk.resources = chunk.resources.saturating_add(*amount).min(chunk.capacity);
                Ok(Applied::Done)
            }
            Mutation::Metabolize { agent, delta } => {
                let agent = self.agent_mut(*agent)?;
                let energy = i64::from(agent.energy)
                    .saturating_add(i64::from(*delta))
                    .clamp(0, i64::from(MAX_ENERGY));
                agent.energy = u32::try_from(energy).map_err(|_e| WorldError::ArithmeticOverflow)?;
                if agent.energy == 0 {
                    agent.health = agent.health.saturating_sub(1);
                }
                Ok(Applied::Done)
            }
        }
    }

    fn agent_mut(&mut self, id: AgentId) -> Result<&mut Agent, WorldError> {
        self.agents.get_mut(&id).ok_or(WorldError::AgentNotFound(id))
    }

    fn require_energy(&self, agent: AgentId, required: u32) -> Result<(), WorldError> {
        let available = self
            .agent(agent)
            .ok_or(WorldError::AgentNotFound(agent))?
            .energy;
        if available < required {
            return Err(WorldError::InsufficientEnergy {
                agent,
                required,
                available,
            });
        }
        Ok(())
    }

    fn check_effect(&self, actor: AgentId, cost: u32, effect: &Effect) -> Result<(), WorldError> {
        self.require_energy(actor, cost)?;
        match effect {
            Effect::Say { .. } | Effect::SetResting { .. } | Effect::EnactLaw { .. } => Ok(()),
            Effect::Gather { .. } => {
                let chunk = self.agent(actor).ok_or(WorldError::AgentNotFound(actor))?.chunk;
                self.chunk(chunk).ok_or(WorldError::ChunkNotFound(chunk))?;
                Ok(())
            }
            Effect::Move { to } => {
                self.chunk(*to).ok_or(WorldError::ChunkNotFound(*to))?;
                Ok(())
            }
            Effect::TransferAsset { asset, to } => {
                self.agent(*to).ok_or(WorldError::AgentNotFound(*to))?;
                if self.owner_of(*asset) != Some(actor) {
                    self.asset(*asset).ok_or(WorldError::AssetNotFound(*asset))?;
                    return Err(WorldError::NotOwner {
                        agent: actor,
                        asset: *asset,
                    });
                }
                Ok(())
            }
            Effect::Relate { other, .. } => {
                self.agent(*other).ok_or(WorldError::AgentNotFound(*other))?;
                Ok(())
            }
            Effect::Reproduce {
                partner,
                partner_cost,
                ..
            } => self.require_energy(*partner, *partner_cost),
            Effect::RepealLaw { law } => {
                self.law(*law).ok_or(WorldError::LawNotFound(*law))?;
                Ok(())
            }
        }
    }

    fn apply_effect(
        &mut self,
        tick: SimTime,
        actor: AgentId,
        effect: &Effect,
    ) -> Result<Applied, WorldError> {
        match effect {
            Effect::Say { text } => {
                self.transcript.push(Utterance {
                    tick,
                    speaker: actor,
                    text: text.clone(),
                });
                Ok(Applied::Done)
            }
            Effect::Move { to } => {
                self.agent_mut(actor)?.chunk = *to;
                Ok(Applied::Done)
            }
            Effect::Gather { amount } => {
                let chunk_id = self.agent_mut(actor)?.chunk;
                let chunk = self
                    .chunks
                    .get_mut(&chunk_id)
                    .ok_or(WorldError::ChunkNotFound(chunk_id))?;
                let taken = (*amount).min(chunk.resources);
                chunk.resources = chunk
                    .resources
                    .checked_sub(taken)
                    .ok_or(WorldError::ArithmeticOverflow)?;
                let agent = self.agent_mut(actor)?;
                agent.inventory = agent
                    .inventory
                    .checked_add(u64::from(taken))
                    .ok_or(WorldError::ArithmeticOverflow)?;
                Ok(Applied::Gathered { amount: taken })
            }
            Effect::SetResting { resting } => {
                self.agent_mut(actor)?.resting = *resting;
                Ok(Applied::Done)
            }
            Effect::TransferAsset { asset, to } => {
                self.ownership.insert(*asset, *to);
                Ok(Applied::Done)
            }
            Effect::Relate { other, delta } => {
                let slot = self
                    .relationships
                    .entry(actor)
                    .or_default()
                    .entry(*other)
                    .or_insert(0);
                *slot = slot.saturating_add(*delta).clamp(-AFFINITY_LIMIT, AFFINITY_LIMIT);
                Ok(Applied::Done)
            }
            Effect::Reproduce {
                partner,
                partner_cost,
                offspring_energy,
            } => {
                let partner_agent = self.agent_mut(*partner)?;
                partner_agent.energy = partner_agent
                    .energy
                    .checked_sub(*partner_cost)
                    .ok_or(WorldError::ArithmeticOverflow)?;
                let chunk = self.agent_mut(actor)?.chunk;
                let child = AgentId::from(self.allocate_id()?);
                self.insert_agent(Agent {
                    id: child,
                    chunk,
                    energy: (*offspring_energy).min(MAX_ENERGY),
                    health: MAX_HEALTH,
                    resting: false,
                    inventory: 0,
                    born_at: tick,
                    parents: vec![actor, *partner],
                });
                Ok(Applied::Spawned { agent: child })
            }
            Effect::EnactLaw { forbids } => {
                let id = LawId::from(self.allocate_id()?);
                self.laws.insert(
                    id,
                    Law {
                        id,
                        forbids: *forbids,
                        enacted_by: actor,
                        enacted_at: tick,
                    },
                );
                Ok(Applied::Enacted { law: id })
            }
            Effect::RepealLaw { law } => {
                self.laws.remove(law);
                Ok(Applied::Done)
            }
        }
    }
}
