//! `BioVeto`: reject what the actor's body cannot support.

use axiom_types::{AgentId, PipelineStage, RejectionReason};
use axiom_world::Universe;

use super::{Action, Proposal, Stage, Verdict};

/// Health and energy checks for the actor and, for reproduction, the
/// partner.
#[derive(Debug, Clone, Copy)]
pub struct BioVeto {
    partner_cost: u32,
}

impl BioVeto {
    /// Build the stage. `partner_cost` is the energy a reproduction
    /// partner must be able to pay.
    pub const fn new(partner_cost: u32) -> Self {
        Self { partner_cost }
    }
}

fn able(universe: &Universe, agent: AgentId, required: u32) -> Result<(), RejectionReason> {
    let agent = universe.agent(agent).ok_or(RejectionReason::UnknownAgent {
        agent: agent.into_inner(),
    })?;
    if !agent.is_alive() {
        return Err(RejectionReason::Incapacitated);
    }
    if agent.energy < required {
        return Err(RejectionReason::InsufficientEnergy {
            required,
            available: agent.energy,
        });
    }
    Ok(())
}

impl Stage for BioVeto {
    fn id(&self) -> PipelineStage {
        PipelineStage::BioVeto
    }

    fn evaluate(&self, proposal: Proposal, universe: &Universe) -> Verdict {
        let mut result = able(universe, proposal.actor, proposal.energy_cost);
        if let (Ok(()), Action::Reproduce { partner }) = (&result, &proposal.action) {
            result = able(universe, *partner, self.partner_cost);
        }
        match result {
            Ok(()) => Verdict::Pass(proposal),
            Err(reason) => Verdict::Reject(reason),
        }
    }
}
