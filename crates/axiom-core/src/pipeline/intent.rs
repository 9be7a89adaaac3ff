//! Intent: normalize parameters and price the action.

use axiom_types::{PipelineStage, RejectionReason};
use axiom_world::Universe;

use super::{Action, Proposal, Stage, Verdict};
use crate::config::RulesConfig;

/// Normalization stage.
///
/// - chat text is trimmed; empty or over-long text is rejected
/// - move steps must be a single chunk in any of the eight directions
/// - gather amounts default and are capped
/// - relate deltas are clamped to the configured maximum
#[derive(Debug, Clone)]
pub struct Intent {
    rules: RulesConfig,
}

impl Intent {
    /// Build the stage from rule parameters.
    pub const fn new(rules: RulesConfig) -> Self {
        Self { rules }
    }

    fn normalize(&self, mut proposal: Proposal) -> Result<Proposal, RejectionReason> {
        proposal.action = match proposal.action {
            Action::Chat { text } => {
                let text = text.trim().to_owned();
                if text.is_empty() {
                    return Err(RejectionReason::EmptyUtterance);
                }
                let length = u64::try_from(text.chars().count()).unwrap_or(u64::MAX);
                let limit = u64::from(self.rules.max_utterance_chars);
                if length > limit {
                    return Err(RejectionReason::UtteranceTooLong { length, limit });
                }
                Action::Chat { text }
            }
            Action::Move { dx, dy } => {
                let unit = -1..=1;
                if !unit.contains(&dx) || !unit.contains(&dy) || (dx == 0 && dy == 0) {
                    return Err(RejectionReason::InvalidStep { dx, dy });
                }
                Action::Move { dx, dy }
            }
            Action::Gather { amount } => {
                let amount = if amount == 0 {
                    self.rules.default_gather
                } else {
                    amount
                };
                Action::Gather {
                    amount: amount.min(self.rules.max_gather),
                }
            }
            Action::Relate { other, delta } => {
                let limit = i64::from(self.rules.max_relate_delta);
                Action::Relate {
                    other,
                    delta: delta.clamp(limit.saturating_neg(), limit),
                }
            }
            other => other,
        };
        proposal.energy_cost = self.rules.costs.cost(proposal.action.kind());
        Ok(proposal)
    }
}

impl Stage for Intent {
    fn id(&self) -> PipelineStage {
        PipelineStage::Intent
    }

    fn evaluate(&self, proposal: Proposal, _universe: &Universe) -> Verdict {
        self.normalize(proposal).into()
    }
}
