//! Subsystem identifiers and stream keys.

use axiom_types::EntityId;
use serde::{Deserialize, Serialize};

/// The fixed set of subsystems that may draw randomness.
///
/// The snake-case name of each variant is mixed into its key derivation, so
/// renaming a variant changes every value its streams produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemId {
    /// Terrain, weather, and resource regrowth.
    Environment,
    /// Metabolism and bodily state.
    Biology,
    /// Agent decision noise.
    Cognition,
    /// Trait inheritance at reproduction.
    Genetics,
    /// Law and institution outcomes.
    Governance,
    /// Movement and collision.
    Physics,
}

impl SubsystemId {
    /// Every subsystem, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Environment,
        Self::Biology,
        Self::Cognition,
        Self::Genetics,
        Self::Governance,
        Self::Physics,
    ];

    /// Stable name used in key derivation and audit records.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Environment => "environment",
            Self::Biology => "biology",
            Self::Cognition => "cognition",
            Self::Genetics => "genetics",
            Self::Governance => "governance",
            Self::Physics => "physics",
        }
    }

    /// Inverse of [`SubsystemId::as_str`].
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|id| id.as_str() == name)
    }
}

impl core::fmt::Display for SubsystemId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names one stream: a subsystem's root stream, or one entity's sub-stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamKey {
    /// Owning subsystem.
    pub subsystem: SubsystemId,
    /// Entity for a per-entity sub-stream, `None` for the subsystem root.
    pub entity: Option<EntityId>,
}

impl StreamKey {
    /// Key for a subsystem's root stream.
    pub const fn root(subsystem: SubsystemId) -> Self {
        Self {
            subsystem,
            entity: None,
        }
    }

    /// Key for an entity sub-stream.
    pub const fn entity(subsystem: SubsystemId, entity: EntityId) -> Self {
        Self {
            subsystem,
            entity: Some(entity),
        }
    }
}

impl core::fmt::Display for StreamKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self.entity {
            Some(entity) => write!(f, "{}/{entity}", self.subsystem),
            None => write!(f, "{}", self.subsystem),
        }
    }
}
