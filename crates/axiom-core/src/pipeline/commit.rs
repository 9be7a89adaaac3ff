//! Commit: the single write path from a validated proposal into the
//! Universe.

use axiom_types::SimTime;
use axiom_world::{Applied, Effect, Mutation, Universe, WorldError};

use super::{Action, Proposal};
use crate::config::RulesConfig;

/// A validated proposal could not be written.
///
/// Every precondition `apply` checks has already passed an earlier stage,
/// so this only surfaces on a broken invariant. The kernel treats it as
/// fatal.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    /// The Universe refused the mutation.
    #[error("universe rejected validated mutation: {0}")]
    World(#[from] WorldError),

    /// A move reached commit without a resolved destination.
    #[error("move reached commit without a destination")]
    UnresolvedDestination,
}

/// Translate a proposal into its [`Mutation`].
///
/// # Errors
///
/// Returns [`CommitError::UnresolvedDestination`] for a move that skipped
/// `PhysicsValidate`.
pub fn mutation_for(proposal: &Proposal, rules: &RulesConfig) -> Result<Mutation, CommitError> {
    let effect = match &proposal.action {
        Action::Chat { text } => Effect::Say { text: text.clone() },
        Action::Move { .. } => Effect::Move {
            to: proposal
                .destination
                .ok_or(CommitError::UnresolvedDestination)?,
        },
        Action::Gather { amount } => Effect::Gather { amount: *amount },
        Action::Rest { resting } => Effect::SetResting { resting: *resting },
        Action::TransferAsset { asset, to } => Effect::TransferAsset {
            asset: *asset,
            to: *to,
        },
        Action::Relate { other, delta } => Effect::Relate {
            other: *other,
            delta: i32::try_from(*delta)
                .map_err(|_e| CommitError::World(WorldError::ArithmeticOverflow))?,
        },
        Action::Reproduce { partner } => Effect::Reproduce {
            partner: *partner,
            partner_cost: rules.reproduce_partner_cost,
            offspring_energy: rules.offspring_energy,
        },
        Action::EnactLaw { forbids } => Effect::EnactLaw { forbids: *forbids },
        Action::RepealLaw { law } => Effect::RepealLaw { law: *law },
    };
    Ok(Mutation::Act {
        actor: proposal.actor,
        energy_cost: proposal.energy_cost,
        effect,
    })
}

/// Write a validated proposal.
///
/// # Errors
///
/// See [`CommitError`].
pub fn commit(
    proposal: &Proposal,
    universe: &mut Universe,
    rules: &RulesConfig,
) -> Result<Applied, CommitError> {
    let mutation = mutation_for(proposal, rules)?;
    Ok(universe.apply(proposal.tick, &mutation)?)
}

/// Write a mutation produced by an ambient subsystem.
///
/// # Errors
///
/// Returns [`CommitError::World`] if the Universe refuses it.
pub fn apply_ambient(
    universe: &mut Universe,
    tick: SimTime,
    mutation: &Mutation,
) -> Result<Applied, CommitError> {
    Ok(universe.apply(tick, mutation)?)
}
