//! `PhysicsValidate`: spatial and material feasibility.

use axiom_types::{AgentId, PipelineStage, RejectionReason};
use axiom_world::Universe;

use super::{Action, Proposal, Stage, Verdict};

/// Grid bounds for moves, resource availability for gathering, and
/// co-location for transfers and reproduction.
///
/// A passing move leaves its resolved chunk in
/// [`Proposal::destination`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PhysicsValidate;

fn chunk_of(universe: &Universe, agent: AgentId) -> Result<axiom_world::Chunk, RejectionReason> {
    universe
        .agent(agent)
        .and_then(|a| universe.chunk(a.chunk))
        .cloned()
        .ok_or(RejectionReason::UnknownAgent {
            agent: agent.into_inner(),
        })
}

fn validate(mut proposal: Proposal, universe: &Universe) -> Result<Proposal, RejectionReason> {
    let here = chunk_of(universe, proposal.actor)?;
    match proposal.action {
        Action::Move { dx, dy } => {
            let x = i64::from(here.x).saturating_add(dx);
            let y = i64::from(here.y).saturating_add(dy);
            let to = universe
                .chunk_at(x, y)
                .ok_or(RejectionReason::OutOfBounds { x, y })?;
            proposal.destination = Some(to);
        }
        Action::Gather { .. } if here.resources == 0 => {
            return Err(RejectionReason::ResourceDepleted);
        }
        Action::TransferAsset { to: other, .. } | Action::Reproduce { partner: other } => {
            if chunk_of(universe, other)?.id != here.id {
                return Err(RejectionReason::NotColocated);
            }
        }
        _ => {}
    }
    Ok(proposal)
}

impl Stage for PhysicsValidate {
    fn id(&self) -> PipelineStage {
        PipelineStage::PhysicsValidate
    }

    fn evaluate(&self, proposal: Proposal, universe: &Universe) -> Verdict {
        validate(proposal, universe).into()
    }
}
