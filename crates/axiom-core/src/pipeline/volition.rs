//! Volition: is the actor in a state to attempt the action at all?

use axiom_types::{PipelineStage, RejectionReason};
use axiom_world::Universe;

use super::{Action, Proposal, Stage, Verdict};

/// Rejects self-directed social actions and anything but `rest` from a
/// resting agent.
#[derive(Debug, Clone, Copy, Default)]
pub struct Volition;

fn check(proposal: &Proposal, universe: &Universe) -> Result<(), RejectionReason> {
    if proposal.action.counterpart() == Some(proposal.actor) {
        return Err(RejectionReason::SelfTarget);
    }
    let resting = universe
        .agent(proposal.actor)
        .is_some_and(|agent| agent.resting);
    if resting && !matches!(proposal.action, Action::Rest { .. }) {
        return Err(RejectionReason::AgentResting);
    }
    Ok(())
}

impl Stage for Volition {
    fn id(&self) -> PipelineStage {
        PipelineStage::Volition
    }

    fn evaluate(&self, proposal: Proposal, universe: &Universe) -> Verdict {
        match check(&proposal, universe) {
            Ok(()) => Verdict::Pass(proposal),
            Err(reason) => Verdict::Reject(reason),
        }
    }
}
