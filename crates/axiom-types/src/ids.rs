//! Type-safe identifier wrappers around `u64`.
//!
//! Every entity in the simulation has a strongly-typed ID to prevent
//! accidental mixing of identifiers at compile time. IDs are never random:
//! they are handed out by the Universe's monotonic entity counter, which is
//! seeded at genesis, so the same event stream always assigns the same IDs.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around `u64` with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl $name {
            /// Wrap a raw entity number.
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            /// Return the inner `u64` value.
            pub const fn into_inner(self) -> u64 {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<u64> for $name {
            fn from(id: u64) -> Self {
                Self(id)
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Raw entity number drawn from the Universe's entity counter.
    EntityId
}

define_id! {
    /// Unique identifier for an agent.
    AgentId
}

define_id! {
    /// Unique identifier for an asset (homestead, tool, stockpile).
    AssetId
}

define_id! {
    /// Unique identifier for a world chunk (one cell of the world grid).
    ChunkId
}

define_id! {
    /// Unique identifier for an enacted law.
    LawId
}

impl From<EntityId> for AgentId {
    fn from(id: EntityId) -> Self {
        Self(id.0)
    }
}

impl From<EntityId> for AssetId {
    fn from(id: EntityId) -> Self {
        Self(id.0)
    }
}

impl From<EntityId> for LawId {
    fn from(id: EntityId) -> Self {
        Self(id.0)
    }
}

impl From<AgentId> for EntityId {
    fn from(id: AgentId) -> Self {
        Self(id.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_serializes_as_bare_integer() {
        let json = serde_json::to_string(&AgentId::new(42)).ok();
        assert_eq!(json.as_deref(), Some("42"));
    }

    #[test]
    fn ids_order_numerically() {
        assert!(AssetId::new(2) < AssetId::new(10));
    }

    #[test]
    fn entity_id_converts_to_typed_ids() {
        let raw = EntityId::new(7);
        assert_eq!(AgentId::from(raw).into_inner(), 7);
        assert_eq!(LawId::from(raw).into_inner(), 7);
    }
}
