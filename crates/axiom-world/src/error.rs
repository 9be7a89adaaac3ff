//! Error types for the `axiom-world` crate.
//!
//! A [`WorldError`] out of [`Universe::apply`] means a mutation reached the
//! store that the pipeline should have rejected. The kernel treats that as
//! fatal.
//!
//! [`Universe::apply`]: crate::Universe::apply

use axiom_chaos::RngMisuseError;
use axiom_types::{AgentId, AssetId, ChunkId, LawId};

/// Errors that can occur while building or mutating the Universe.
#[derive(Debug, thiserror::Error)]
pub enum WorldError {
    /// An agent was not found.
    #[error("agent not found: {0}")]
    AgentNotFound(AgentId),

    /// An asset was not found.
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    /// A chunk was not found.
    #[error("chunk not found: {0}")]
    ChunkNotFound(ChunkId),

    /// A law was not found in the active law set.
    #[error("law not found: {0}")]
    LawNotFound(LawId),

    /// The asset is not owned by the agent giving it away.
    #[error("agent {agent} does not own asset {asset}")]
    NotOwner {
        /// The claimed owner.
        agent: AgentId,
        /// The asset.
        asset: AssetId,
    },

    /// The agent cannot pay the energy cost.
    #[error("agent {agent} has {available} energy, needs {required}")]
    InsufficientEnergy {
        /// The agent.
        agent: AgentId,
        /// Energy required.
        required: u32,
        /// Energy held.
        available: u32,
    },

    /// The entity id counter is exhausted.
    #[error("entity id space exhausted")]
    IdSpaceExhausted,

    /// Arithmetic overflow during a checked operation.
    #[error("arithmetic overflow in world calculation")]
    ArithmeticOverflow,

    /// The genesis configuration cannot produce a valid universe.
    #[error("invalid genesis configuration: {0}")]
    InvalidGenesis(String),

    /// Canonical encoding or decoding failed.
    #[error("canonical encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Genesis drew from the chaos tree incorrectly.
    #[error(transparent)]
    Chaos(#[from] RngMisuseError),
}
