//! `PolicyCheck`: the extensible rule stage.
//!
//! Each [`PolicyRule`] sees the normalized proposal and a read-only
//! Universe. Rules run in registration order and the first rejection wins.

use axiom_types::{ActionKind, PipelineStage, RejectionReason};
use axiom_world::Universe;

use super::{Action, Proposal, Stage, Verdict};
use crate::config::RulesConfig;

/// One policy rule.
pub trait PolicyRule: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Accept or reject `proposal`.
    ///
    /// # Errors
    ///
    /// Returns the [`RejectionReason`] if the rule forbids the proposal.
    fn check(&self, proposal: &Proposal, universe: &Universe) -> Result<(), RejectionReason>;
}

/// Rejects any action whose kind an active law forbids.
#[derive(Debug, Clone, Copy, Default)]
pub struct LawRule;

impl PolicyRule for LawRule {
    fn name(&self) -> &'static str {
        "law"
    }

    fn check(&self, proposal: &Proposal, universe: &Universe) -> Result<(), RejectionReason> {
        match universe.forbidding_law(proposal.action.kind()) {
            Some(law) => Err(RejectionReason::ForbiddenByLaw {
                law: law.id.into_inner(),
            }),
            None => Ok(()),
        }
    }
}

/// Rejects laws that would forbid legislation itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtectedKindRule;

impl PolicyRule for ProtectedKindRule {
    fn name(&self) -> &'static str {
        "protected_kind"
    }

    fn check(&self, proposal: &Proposal, _universe: &Universe) -> Result<(), RejectionReason> {
        match proposal.action {
            Action::EnactLaw { forbids } if !forbids.is_legislable() => {
                Err(RejectionReason::ProtectedKind { kind: forbids })
            }
            _ => Ok(()),
        }
    }
}

/// Only an asset's owner may transfer it.
#[derive(Debug, Clone, Copy, Default)]
pub struct OwnershipRule;

impl PolicyRule for OwnershipRule {
    fn name(&self) -> &'static str {
        "ownership"
    }

    fn check(&self, proposal: &Proposal, universe: &Universe) -> Result<(), RejectionReason> {
        match proposal.action {
            Action::TransferAsset { asset, .. } if universe.owner_of(asset) != Some(proposal.actor) => {
                Err(RejectionReason::NotOwner {
                    asset: asset.into_inner(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Caps the living population reproduction can reach.
#[derive(Debug, Clone, Copy)]
pub struct PopulationCapRule {
    cap: u64,
}

impl PopulationCapRule {
    /// Reject reproduction once `cap` agents are alive.
    pub const fn new(cap: u64) -> Self {
        Self { cap }
    }
}

impl PolicyRule for PopulationCapRule {
    fn name(&self) -> &'static str {
        "population_cap"
    }

    fn check(&self, proposal: &Proposal, universe: &Universe) -> Result<(), RejectionReason> {
        if proposal.action.kind() != ActionKind::Reproduce {
            return Ok(());
        }
        let alive = universe.agents().filter(|agent| agent.is_alive()).count();
        if u64::try_from(alive).unwrap_or(u64::MAX) >= self.cap {
            return Err(RejectionReason::PopulationCap { cap: self.cap });
        }
        Ok(())
    }
}

/// The policy stage: an ordered list of [`PolicyRule`]s.
pub struct PolicyCheck {
    rules: Vec<Box<dyn PolicyRule>>,
}

impl std::fmt::Debug for PolicyCheck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyCheck")
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl PolicyCheck {
    /// A policy stage with no rules.
    pub const fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// The built-in rule set: protected kinds, laws, ownership, and the
    /// population cap.
    pub fn standard(rules: &RulesConfig) -> Self {
        Self::empty()
            .with_rule(ProtectedKindRule)
            .with_rule(LawRule)
            .with_rule(OwnershipRule)
            .with_rule(PopulationCapRule::new(rules.population_cap))
    }

    /// Append a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: impl PolicyRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Names of the registered rules, in evaluation order.
    pub fn rule_names(&self) -> Vec<&'static str> {
        self.rules.iter().map(|r| r.name()).collect()
    }
}

impl Stage for PolicyCheck {
    fn id(&self) -> PipelineStage {
        PipelineStage::PolicyCheck
    }

    fn evaluate(&self, proposal: Proposal, universe: &Universe) -> Verdict {
        for rule in &self.rules {
            if let Err(reason) = rule.check(&proposal, universe) {
                tracing::trace!(rule = rule.name(), %reason, "policy rule rejected proposal");
                return Verdict::Reject(reason);
            }
        }
        Verdict::Pass(proposal)
    }
}
