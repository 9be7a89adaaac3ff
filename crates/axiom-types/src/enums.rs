//! Enumeration types shared across the kernel.
//!
//! Every enum here is closed and exhaustively matched. New action kinds or
//! pipeline stages are compile-time changes, never runtime strings.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Action kinds
// ---------------------------------------------------------------------------

/// The closed set of action kinds an [`InputEvent`] may carry.
///
/// The wire form of an event's `kind` field is the snake-case name returned
/// by [`ActionKind::as_str`]. Any other string is rejected during Perception.
///
/// [`InputEvent`]: crate::InputEvent
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    /// Speak a line of text.
    Chat,
    /// Step to an adjacent chunk.
    Move,
    /// Harvest resources from the current chunk.
    Gather,
    /// Toggle resting (recovers energy, blocks other actions).
    Rest,
    /// Hand an owned asset to another agent.
    TransferAsset,
    /// Adjust affinity toward another agent.
    Relate,
    /// Produce a new agent together with a partner.
    Reproduce,
    /// Enact a law forbidding an action kind.
    EnactLaw,
    /// Repeal an active law.
    RepealLaw,
}

impl ActionKind {
    /// All action kinds in declaration order.
    pub const ALL: [Self; 9] = [
        Self::Chat,
        Self::Move,
        Self::Gather,
        Self::Rest,
        Self::TransferAsset,
        Self::Relate,
        Self::Reproduce,
        Self::EnactLaw,
        Self::RepealLaw,
    ];

    /// Wire name of this kind.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Move => "move",
            Self::Gather => "gather",
            Self::Rest => "rest",
            Self::TransferAsset => "transfer_asset",
            Self::Relate => "relate",
            Self::Reproduce => "reproduce",
            Self::EnactLaw => "enact_law",
            Self::RepealLaw => "repeal_law",
        }
    }

    /// Parse a wire name. Returns `None` for unknown kinds.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Whether a law may forbid this kind. Lawmaking itself is protected so
    /// the law set can never lock itself.
    pub const fn is_legislable(self) -> bool {
        !matches!(self, Self::EnactLaw | Self::RepealLaw)
    }
}

impl core::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Pipeline stages
// ---------------------------------------------------------------------------

/// The stages of the authority pipeline, in their fixed execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Decode the raw event into a typed action and resolve the actor.
    Perception,
    /// Normalize the action's parameters.
    Intent,
    /// Check the actor is in a state to act at all.
    Volition,
    /// Reject actions the actor's body cannot support.
    BioVeto,
    /// Apply laws and ownership rules.
    PolicyCheck,
    /// Check spatial and resource feasibility.
    PhysicsValidate,
    /// Write the mutation to the Universe.
    Commit,
}

impl PipelineStage {
    /// Stage order. Never reordered at runtime.
    pub const ORDER: [Self; 7] = [
        Self::Perception,
        Self::Intent,
        Self::Volition,
        Self::BioVeto,
        Self::PolicyCheck,
        Self::PhysicsValidate,
        Self::Commit,
    ];
}

// ---------------------------------------------------------------------------
// Rejection reasons
// ---------------------------------------------------------------------------

/// Why the pipeline rejected an event.
///
/// Rejections are ordinary traffic, not errors: they are recorded in an
/// observation and the simulation continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum RejectionReason {
    /// The event's kind is not part of the closed action set.
    #[error("unknown event kind `{kind}`")]
    UnknownKind {
        /// The kind string as received.
        kind: String,
    },
    /// The payload does not match the kind's schema.
    #[error("malformed payload: {detail}")]
    MalformedPayload {
        /// Decoder message.
        detail: String,
    },
    /// The acting or target agent does not exist.
    #[error("unknown agent {agent}")]
    UnknownAgent {
        /// The missing agent number.
        agent: u64,
    },
    /// The referenced asset does not exist.
    #[error("unknown asset {asset}")]
    UnknownAsset {
        /// The missing asset number.
        asset: u64,
    },
    /// The referenced law does not exist or is not active.
    #[error("unknown law {law}")]
    UnknownLaw {
        /// The missing law number.
        law: u64,
    },
    /// Chat text was empty after trimming.
    #[error("utterance is empty")]
    EmptyUtterance,
    /// Chat text exceeded the configured maximum length.
    #[error("utterance of {length} chars exceeds limit {limit}")]
    UtteranceTooLong {
        /// Length in characters.
        length: u64,
        /// Configured maximum.
        limit: u64,
    },
    /// A move step was zero or longer than one chunk.
    #[error("invalid step ({dx}, {dy})")]
    InvalidStep {
        /// Requested x delta.
        dx: i64,
        /// Requested y delta.
        dy: i64,
    },
    /// The action targets the actor itself where that is not allowed.
    #[error("action cannot target the actor itself")]
    SelfTarget,
    /// The actor is resting and may only stop resting.
    #[error("agent is resting")]
    AgentResting,
    /// The actor has no health left.
    #[error("agent is incapacitated")]
    Incapacitated,
    /// The actor lacks the energy the action costs.
    #[error("insufficient energy: need {required}, have {available}")]
    InsufficientEnergy {
        /// Energy the action costs.
        required: u32,
        /// Energy the agent has.
        available: u32,
    },
    /// An active law forbids this kind.
    #[error("forbidden by law {law}")]
    ForbiddenByLaw {
        /// The forbidding law.
        law: u64,
    },
    /// Lawmaking actions cannot themselves be outlawed.
    #[error("action kind `{kind}` cannot be outlawed")]
    ProtectedKind {
        /// The kind the law tried to forbid.
        kind: ActionKind,
    },
    /// The actor does not own the asset.
    #[error("agent does not own asset {asset}")]
    NotOwner {
        /// The asset in question.
        asset: u64,
    },
    /// The population cap has been reached.
    #[error("population cap {cap} reached")]
    PopulationCap {
        /// Configured cap.
        cap: u64,
    },
    /// The destination lies outside the world grid.
    #[error("destination ({x}, {y}) is out of bounds")]
    OutOfBounds {
        /// Destination x.
        x: i64,
        /// Destination y.
        y: i64,
    },
    /// The participants are not in the same chunk.
    #[error("agents are not co-located")]
    NotColocated,
    /// The chunk has nothing left to gather.
    #[error("chunk resources depleted")]
    ResourceDepleted,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn every_kind_round_trips_through_its_wire_name() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn unknown_wire_name_is_none() {
        assert_eq!(ActionKind::parse("teleport"), None);
    }

    #[test]
    fn lawmaking_is_not_legislable() {
        assert!(!ActionKind::EnactLaw.is_legislable());
        assert!(!ActionKind::RepealLaw.is_legislable());
        assert!(ActionKind::Chat.is_legislable());
    }

    #[test]
    fn rejection_reason_serializes_with_code_tag() {
        let json = serde_json::to_value(RejectionReason::InsufficientEnergy {
            required: 5,
            available: 2,
        })
        .unwrap();
        assert_eq!(json["code"], "insufficient_energy");
        assert_eq!(json["required"], 5);
    }

    #[test]
    fn stage_order_starts_with_perception_and_ends_with_commit() {
        assert_eq!(PipelineStage::ORDER.first(), Some(&PipelineStage::Perception));
        assert_eq!(PipelineStage::ORDER.last(), Some(&PipelineStage::Commit));
    }
}
