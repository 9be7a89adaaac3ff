//! The authority pipeline.
//!
//! Every input event runs through the same fixed sequence:
//!
//! 1. **Perception** -- decode `(kind, payload)` into a typed [`Action`] and
//!    resolve every referenced entity.
//! 2. **Intent** -- normalize parameters and price the action.
//! 3. **Volition** -- is the actor in a state to attempt this at all?
//! 4. **`BioVeto`** -- can the actor's body afford it?
//! 5. **`PolicyCheck`** -- laws, ownership, and other [`PolicyRule`]s.
//! 6. **`PhysicsValidate`** -- bounds, co-location, resource availability.
//! 7. **Commit** -- the only stage that writes to the [`Universe`].
//!
//! Stages 2-6 are [`Stage`] implementations: pure functions of the
//! proposal and a shared borrow of the Universe. A rejection at any stage
//! stops the pipeline, writes nothing, and produces one rejection
//! observation. New rule categories go into [`PolicyCheck`] as
//! additional [`PolicyRule`]s.
//!
//! [`Universe`]: axiom_world::Universe
//! [`PolicyCheck`]: policy::PolicyCheck

pub mod bio_veto;
pub mod commit;
pub mod intent;
pub mod perception;
pub mod physics;
pub mod policy;
pub mod volition;

use axiom_types::{
    ActionKind, AgentId, AssetId, ChunkId, InputEvent, LawId, ObservationEvent, ObservationType,
    PipelineStage, RejectionReason, SimTime, SourceId,
};
use axiom_world::{Applied, Universe};
use serde_json::json;
use tracing::debug;

use crate::config::RulesConfig;

pub use commit::CommitError;
pub use policy::PolicyRule;

// ---------------------------------------------------------------------------
// Proposal
// ---------------------------------------------------------------------------

/// A decoded agent action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Say a line.
    Chat {
        /// Text as submitted; trimmed by Intent.
        text: String,
    },
    /// Step by `(dx, dy)` chunks.
    Move {
        /// Column delta.
        dx: i64,
        /// Row delta.
        dy: i64,
    },
    /// Gather from the current chunk.
    Gather {
        /// Requested units; 0 means the configured default.
        amount: u32,
    },
    /// Start or stop resting.
    Rest {
        /// Desired resting flag.
        resting: bool,
    },
    /// Give an asset away.
    TransferAsset {
        /// The asset.
        asset: AssetId,
        /// Recipient.
        to: AgentId,
    },
    /// Adjust affinity toward another agent.
    Relate {
        /// The other agent.
        other: AgentId,
        /// Requested change; clamped by Intent.
        delta: i64,
    },
    /// Reproduce with a partner.
    Reproduce {
        /// Co-parent.
        partner: AgentId,
    },
    /// Outlaw an action kind.
    EnactLaw {
        /// Kind to forbid.
        forbids: ActionKind,
    },
    /// Repeal an active law.
    RepealLaw {
        /// Law to repeal.
        law: LawId,
    },
}

impl Action {
    /// The kind of this action.
    pub const fn kind(&self) -> ActionKind {
        match self {
            Self::Chat { .. } => ActionKind::Chat,
            Self::Move { .. } => ActionKind::Move,
            Self::Gather { .. } => ActionKind::Gather,
            Self::Rest { .. } => ActionKind::Rest,
            Self::TransferAsset { .. } => ActionKind::TransferAsset,
            Self::Relate { .. } => ActionKind::Relate,
            Self::Reproduce { .. } => ActionKind::Reproduce,
            Self::EnactLaw { .. } => ActionKind::EnactLaw,
            Self::RepealLaw { .. } => ActionKind::RepealLaw,
        }
    }

    /// The other agent this action involves, if any.
    pub const fn counterpart(&self) -> Option<AgentId> {
        match self {
            Self::TransferAsset { to, .. } => Some(*to),
            Self::Relate { other, .. } => Some(*other),
            Self::Reproduce { partner } => Some(*partner),
            _ => None,
        }
    }
}

/// An event in flight through the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    /// Tick being processed.
    pub tick: SimTime,
    /// Sequence number of the originating event.
    pub sequence: u64,
    /// Source of the originating event.
    pub source_id: SourceId,
    /// Acting agent.
    pub actor: AgentId,
    /// Decoded action.
    pub action: Action,
    /// Energy the action costs the actor. Priced by Intent.
    pub energy_cost: u32,
    /// Destination of a move. Resolved by `PhysicsValidate`.
    pub destination: Option<ChunkId>,
}

// ---------------------------------------------------------------------------
// Stage contract
// ---------------------------------------------------------------------------

/// Outcome of one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Continue with this (possibly transformed) proposal.
    Pass(Proposal),
    /// Stop here.
    Reject(RejectionReason),
}

impl From<Result<Proposal, RejectionReason>> for Verdict {
    fn from(result: Result<Proposal, RejectionReason>) -> Self {
        match result {
            Ok(proposal) => Self::Pass(proposal),
            Err(reason) => Self::Reject(reason),
        }
    }
}

/// A non-terminal pipeline stage.
pub trait Stage: Send + Sync {
    /// Which stage this is.
    fn id(&self) -> PipelineStage;

    /// Judge `proposal` against a read-only view of the Universe.
    fn evaluate(&self, proposal: Proposal, universe: &Universe) -> Verdict;
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of running one event through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineOutcome {
    /// The event was committed.
    Committed {
        /// Commit observation.
        observation: ObservationEvent,
        /// What the commit produced.
        applied: Applied,
    },
    /// The event was rejected; the Universe is unchanged.
    Rejected {
        /// Rejection observation.
        observation: ObservationEvent,
        /// Stage that rejected.
        stage: PipelineStage,
        /// Why.
        reason: RejectionReason,
    },
}

impl PipelineOutcome {
    /// The observation emitted for this event.
    pub const fn observation(&self) -> &ObservationEvent {
        match self {
            Self::Committed { observation, .. } | Self::Rejected { observation, .. } => {
                observation
            }
        }
    }

    /// Whether the event was committed.
    pub const fn is_committed(&self) -> bool {
        matches!(self, Self::Committed { .. })
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The fixed stage sequence plus commit.
pub struct AuthorityPipeline {
    rules: RulesConfig,
    stages: Vec<Box<dyn Stage>>,
}

impl std::fmt::Debug for AuthorityPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorityPipeline")
            .field(
                "stages",
                &self.stages.iter().map(|s| s.id()).collect::<Vec<_>>(),
            )
            .finish_non_exhaustive()
    }
}

impl AuthorityPipeline {
    /// Build the standard pipeline with the default policy rules.
    pub fn new(rules: RulesConfig) -> Self {
        Self::with_policy(rules.clone(), policy::PolicyCheck::standard(&rules))
    }

    /// Build the standard pipeline with a custom policy stage.
    pub fn with_policy(rules: RulesConfig, policy: policy::PolicyCheck) -> Self {
        let stages: Vec<Box<dyn Stage>> = vec![
            Box::new(intent::Intent::new(rules.clone())),
            Box::new(volition::Volition),
            Box::new(bio_veto::BioVeto::new(rules.reproduce_partner_cost)),
            Box::new(policy),
            Box::new(physics::PhysicsValidate),
        ];
        Self { rules, stages }
    }

    /// The rule parameters this pipeline was built with.
    pub const fn rules(&self) -> &RulesConfig {
        &self.rules
    }

    /// Run one event through every stage.
    ///
    /// # Errors
    ///
    /// Returns [`CommitError`] only if a proposal that passed every stage
    /// could not be written. That is an implementation bug and is fatal to
    /// the kernel.
    pub fn process(
        &self,
        event: &InputEvent,
        universe: &mut Universe,
    ) -> Result<PipelineOutcome, CommitError> {
        let mut proposal = match perception::perceive(event, universe) {
            Ok(proposal) => proposal,
            Err(reason) => return Ok(rejected(event, PipelineStage::Perception, reason)),
        };

        for stage in &self.stages {
            match stage.evaluate(proposal, universe) {
                Verdict::Pass(next) => proposal = next,
                Verdict::Reject(reason) => return Ok(rejected(event, stage.id(), reason)),
            }
        }

        let applied = commit::commit(&proposal, universe, &self.rules)?;
        debug!(
            tick = proposal.tick.get(),
            source_id = %proposal.source_id,
            sequence = proposal.sequence,
            kind = %proposal.action.kind(),
            "event committed"
        );
        let observation = ObservationEvent::new(
            proposal.tick,
            ObservationType::Committed,
            json!({
                "source_id": proposal.source_id,
                "sequence": proposal.sequence,
                "kind": proposal.action.kind(),
                "agent": proposal.actor,
                "energy_cost": proposal.energy_cost,
                "result": applied,
            }),
        );
        Ok(PipelineOutcome::Committed {
            observation,
            applied,
        })
    }
}

fn rejected(event: &InputEvent, stage: PipelineStage, reason: RejectionReason) -> PipelineOutcome {
    debug!(
        tick = event.tick.get(),
        source_id = %event.source_id,
        sequence = event.sequence,
        ?stage,
        %reason,
        "event rejected"
    );
    let observation = ObservationEvent::new(
        event.tick,
        ObservationType::Rejected,
        json!({
            "source_id": event.source_id,
            "sequence": event.sequence,
            "rejected_kind": event.kind,
            "stage": stage,
            "reason": reason,
            "message": reason.to_string(),
        }),
    );
    PipelineOutcome::Rejected {
        observation,
        stage,
        reason,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axiom_chaos::{ChaosTree, SubsystemId};
    use axiom_types::{AssetId, InputEvent};
    use axiom_world::{GenesisConfig, genesis};
    use serde_json::{Value, json};

    use super::*;

    /// One chunk, three agents (1, 3, 5) each owning a homestead (2, 4, 6).
    fn world(initial_energy: u32) -> Universe {
        let config = GenesisConfig {
            agents: 3,
            width: 1,
            height: 1,
            initial_resources: 20,
            resource_capacity: 50,
            initial_energy,
        };
        let mut chaos = ChaosTree::new(7, SubsystemId::ALL);
        genesis(&config, &mut chaos).unwrap()
    }

    fn event(sequence: u64, kind: &str, payload: Value) -> InputEvent {
        InputEvent::new(SimTime::new(1), sequence, "test", kind, payload)
    }

    fn run(universe: &mut Universe, kind: &str, payload: Value) -> PipelineOutcome {
        AuthorityPipeline::new(RulesConfig::default())
            .process(&event(0, kind, payload), universe)
            .unwrap()
    }

    fn rejection(outcome: &PipelineOutcome) -> Option<(PipelineStage, RejectionReason)> {
        match outcome {
            PipelineOutcome::Rejected { stage, reason, .. } => Some((*stage, reason.clone())),
            PipelineOutcome::Committed { .. } => None,
        }
    }

    #[test]
    fn chat_commits_and_charges_energy() {
        let mut u = world(80);
        let outcome = run(&mut u, "chat", json!({"agent": 1, "text": "  hello  "}));
        assert!(outcome.is_committed());
        assert_eq!(u.transcript().len(), 1);
        assert_eq!(u.transcript().first().unwrap().text, "hello");
        assert_eq!(u.agent(AgentId::new(1)).unwrap().energy, 79);
        assert_eq!(outcome.observation().event_type, ObservationType::Committed);
        assert!(outcome.observation().verify());
    }

    #[test]
    fn rejection_writes_nothing() {
        let mut u = world(80);
        let before = u.state_digest().unwrap();
        let outcomes = [
            run(&mut u, "teleport", json!({"agent": 1})),
            run(&mut u, "chat", json!({"agent": 1})),
            run(&mut u, "chat", json!({"agent": 99, "text": "hi"})),
            run(&mut u, "chat", json!({"agent": 1, "text": "   "})),
            run(&mut u, "move", json!({"agent": 1, "dx": 1, "dy": 0})),
        ];
        for outcome in &outcomes {
            assert!(!outcome.is_committed());
            assert_eq!(outcome.observation().event_type, ObservationType::Rejected);
        }
        assert_eq!(u.state_digest().unwrap(), before);
    }

    #[test]
    fn perception_rejects_unknown_kind_and_entities() {
        let mut u = world(80);
        let unknown = run(&mut u, "teleport", json!({"agent": 1}));
        assert_eq!(
            rejection(&unknown),
            Some((
                PipelineStage::Perception,
                RejectionReason::UnknownKind {
                    kind: String::from("teleport")
                }
            ))
        );

        let stranger = run(&mut u, "relate", json!({"agent": 1, "other": 42, "delta": 1}));
        assert_eq!(
            rejection(&stranger),
            Some((PipelineStage::Perception, RejectionReason::UnknownAgent { agent: 42 }))
        );

        let extra = run(&mut u, "rest", json!({"agent": 1, "mood": "sleepy"}));
        assert!(matches!(
            rejection(&extra),
            Some((PipelineStage::Perception, RejectionReason::MalformedPayload { .. }))
        ));
    }

    #[test]
    fn intent_bounds_utterances_and_steps() {
        let mut u = world(80);
        let long = "x".repeat(281);
        let outcome = run(&mut u, "chat", json!({"agent": 1, "text": long}));
        assert_eq!(
            rejection(&outcome),
            Some((
                PipelineStage::Intent,
                RejectionReason::UtteranceTooLong {
                    length: 281,
                    limit: 280
                }
            ))
        );

        let outcome = run(&mut u, "move", json!({"agent": 1, "dx": 2, "dy": 0}));
        assert_eq!(
            rejection(&outcome),
            Some((PipelineStage::Intent, RejectionReason::InvalidStep { dx: 2, dy: 0 }))
        );
    }

    #[test]
    fn intent_clamps_relate_delta() {
        let mut u = world(80);
        let outcome = run(&mut u, "relate", json!({"agent": 1, "other": 3, "delta": 500}));
        assert!(outcome.is_committed());
        assert_eq!(u.affinity(AgentId::new(1), AgentId::new(3)), 10);
    }

    #[test]
    fn gather_uses_default_amount() {
        let mut u = world(80);
        let outcome = run(&mut u, "gather", json!({"agent": 1}));
        assert!(matches!(
            outcome,
            PipelineOutcome::Committed {
                applied: Applied::Gathered { amount: 5 },
                ..
            }
        ));
        assert_eq!(u.agent(AgentId::new(1)).unwrap().inventory, 5);
    }

    #[test]
    fn volition_blocks_resting_agents_and_self_targets() {
        let mut u = world(80);
        assert!(run(&mut u, "rest", json!({"agent": 1})).is_committed());
        let outcome = run(&mut u, "chat", json!({"agent": 1, "text": "hi"}));
        assert_eq!(
            rejection(&outcome),
            Some((PipelineStage::Volition, RejectionReason::AgentResting))
        );
        assert!(run(&mut u, "rest", json!({"agent": 1, "resting": false})).is_committed());

        let outcome = run(&mut u, "relate", json!({"agent": 3, "other": 3, "delta": 1}));
        assert_eq!(
            rejection(&outcome),
            Some((PipelineStage::Volition, RejectionReason::SelfTarget))
        );
    }

    #[test]
    fn bio_veto_checks_energy() {
        let mut u = world(10);
        let outcome = run(&mut u, "reproduce", json!({"agent": 1, "partner": 3}));
        assert_eq!(
            rejection(&outcome),
            Some((
                PipelineStage::BioVeto,
                RejectionReason::InsufficientEnergy {
                    required: 20,
                    available: 10
                }
            ))
        );
    }

    #[test]
    fn policy_enforces_laws_and_ownership() {
        let mut u = world(80);
        let enacted = run(&mut u, "enact_law", json!({"agent": 1, "forbids": "chat"}));
        assert!(enacted.is_committed());
        let law = u.laws().next().unwrap().id;

        let outcome = run(&mut u, "chat", json!({"agent": 3, "text": "hi"}));
        assert_eq!(
            rejection(&outcome),
            Some((
                PipelineStage::PolicyCheck,
                RejectionReason::ForbiddenByLaw {
                    law: law.into_inner()
                }
            ))
        );

        let outcome = run(&mut u, "enact_law", json!({"agent": 1, "forbids": "repeal_law"}));
        assert_eq!(
            rejection(&outcome),
            Some((
                PipelineStage::PolicyCheck,
                RejectionReason::ProtectedKind {
                    kind: ActionKind::RepealLaw
                }
            ))
        );

        let outcome = run(&mut u, "transfer_asset", json!({"agent": 1, "asset": 4, "to": 5}));
        assert_eq!(
            rejection(&outcome),
            Some((PipelineStage::PolicyCheck, RejectionReason::NotOwner { asset: 4 }))
        );

        assert!(run(&mut u, "repeal_law", json!({"agent": 3, "law": law})).is_committed());
        assert!(run(&mut u, "chat", json!({"agent": 3, "text": "hi"})).is_committed());
    }

    #[test]
    fn transfer_moves_ownership() {
        let mut u = world(80);
        let outcome = run(&mut u, "transfer_asset", json!({"agent": 1, "asset": 2, "to": 5}));
        assert!(outcome.is_committed());
        assert_eq!(u.owner_of(AssetId::new(2)), Some(AgentId::new(5)));
    }

    #[test]
    fn physics_rejects_off_grid_moves() {
        let mut u = world(80);
        let outcome = run(&mut u, "move", json!({"agent": 1, "dx": -1, "dy": 0}));
        assert_eq!(
            rejection(&outcome),
            Some((
                PipelineStage::PhysicsValidate,
                RejectionReason::OutOfBounds { x: -1, y: 0 }
            ))
        );
    }

    #[test]
    fn reproduction_spawns_child() {
        let mut u = world(80);
        let outcome = run(&mut u, "reproduce", json!({"agent": 1, "partner": 3}));
        assert!(matches!(
            outcome,
            PipelineOutcome::Committed {
                applied: Applied::Spawned { .. },
                ..
            }
        ));
        let child = u.agents().find(|a| !a.parents.is_empty()).unwrap();
        assert_eq!(child.parents, vec![AgentId::new(1), AgentId::new(3)]);
        assert_eq!(u.population(), 4);
        assert_eq!(u.agent(AgentId::new(1)).unwrap().energy, 60);
        assert_eq!(u.agent(AgentId::new(3)).unwrap().energy, 60);
    }

    struct NoGathering;

    impl PolicyRule for NoGathering {
        fn name(&self) -> &'static str {
            "no_gathering"
        }

        fn check(&self, proposal: &Proposal, _universe: &Universe) -> Result<(), RejectionReason> {
            if proposal.action.kind() == ActionKind::Gather {
                return Err(RejectionReason::ResourceDepleted);
            }
            Ok(())
        }
    }

    #[test]
    fn custom_policy_rules_plug_in() {
        let rules = RulesConfig::default();
        let policy = policy::PolicyCheck::standard(&rules).with_rule(NoGathering);
        assert_eq!(policy.rule_names().last(), Some(&"no_gathering"));
        let pipeline = AuthorityPipeline::with_policy(rules, policy);
        let mut u = world(80);
        let outcome = pipeline
            .process(&event(0, "gather", json!({"agent": 1})), &mut u)
            .unwrap();
        assert_eq!(
            rejection(&outcome),
            Some((PipelineStage::PolicyCheck, RejectionReason::ResourceDepleted))
        );
    }
}
