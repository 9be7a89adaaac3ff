//! The closed set of Universe mutations.
//!
//! Every state change is one of these values. The kernel's commit step is
//! the only caller of [`Universe::apply`].
//!
//! [`Universe::apply`]: crate::Universe::apply

use axiom_types::{ActionKind, AgentId, AssetId, ChunkId, LawId};
use serde::{Deserialize, Serialize};

use crate::environment::Weather;

/// A single state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mutation", rename_all = "snake_case")]
pub enum Mutation {
    /// An agent's validated action. The energy cost is paid before the
    /// effect lands.
    Act {
        /// Acting agent.
        actor: AgentId,
        /// Energy debited from the actor.
        energy_cost: u32,
        /// What the action does.
        effect: Effect,
    },
    /// Replace the weather.
    SetWeather {
        /// New weather.
        weather: Weather,
    },
    /// Add resources to a chunk, capped at its capacity.
    Regrow {
        /// Chunk to regrow.
        chunk: ChunkId,
        /// Units to add before capping.
        amount: u32,
    },
    /// Shift an agent's energy, clamped to `0..=MAX_ENERGY`. An agent left
    /// at zero energy loses one health.
    Metabolize {
        /// Agent affected.
        agent: AgentId,
        /// Signed energy change.
        delta: i32,
    },
}

/// The effect of an agent action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "effect", rename_all = "snake_case")]
pub enum Effect {
    /// Append a line to the transcript.
    Say {
        /// Normalized text.
        text: String,
    },
    /// Relocate the actor.
    Move {
        /// Destination chunk.
        to: ChunkId,
    },
    /// Take resources from the actor's chunk.
    Gather {
        /// Units requested; fewer are taken if fewer remain.
        amount: u32,
    },
    /// Start or stop resting.
    SetResting {
        /// New resting flag.
        resting: bool,
    },
    /// Give an owned asset to another agent.
    TransferAsset {
        /// The asset.
        asset: AssetId,
        /// Recipient.
        to: AgentId,
    },
    /// Adjust the actor's affinity toward another agent.
    Relate {
        /// The other agent.
        other: AgentId,
        /// Signed change, clamped at the affinity limit.
        delta: i32,
    },
    /// Create a child agent on the actor's chunk.
    Reproduce {
        /// Co-parent.
        partner: AgentId,
        /// Energy debited from the partner.
        partner_cost: u32,
        /// Child's starting energy.
        offspring_energy: u32,
    },
    /// Add a law forbidding `forbids`.
    EnactLaw {
        /// Forbidden action kind.
        forbids: ActionKind,
    },
    /// Remove an active law.
    RepealLaw {
        /// Law to remove.
        law: LawId,
    },
}

/// What a successful [`Mutation`] produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum Applied {
    /// State changed with nothing further to report.
    Done,
    /// Resources actually gathered.
    Gathered {
        /// Units taken.
        amount: u32,
    },
    /// A new agent was created.
    Spawned {
        /// The child.
        agent: AgentId,
    },
    /// A new law was enacted.
    Enacted {
        /// The law.
        law: LawId,
    },
}
