//! Perception: decode the wire event into a typed proposal.
//!
//! An unknown kind, a payload that does not match its kind's schema, or a
//! reference to an entity the Universe does not hold is rejected here.
//! Nothing past this stage ever sees raw JSON.

use axiom_types::{ActionKind, AgentId, AssetId, InputEvent, LawId, RejectionReason};
use axiom_world::Universe;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::{Action, Proposal};

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ChatPayload {
    agent: AgentId,
    text: String,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MovePayload {
    agent: AgentId,
    dx: i64,
    dy: i64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct GatherPayload {
    agent: AgentId,
    #[serde(default)]
    amount: u32,
}

const fn resting_default() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RestPayload {
    agent: AgentId,
    #[serde(default = "resting_default")]
    resting: bool,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct TransferPayload {
    agent: AgentId,
    asset: AssetId,
    to: AgentId,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RelatePayload {
    agent: AgentId,
    other: AgentId,
    delta: i64,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ReproducePayload {
    agent: AgentId,
    partner: AgentId,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct EnactLawPayload {
    agent: AgentId,
    forbids: ActionKind,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RepealLawPayload {
    agent: AgentId,
    law: LawId,
}

fn decode<T: DeserializeOwned>(payload: &serde_json::Value) -> Result<T, RejectionReason> {
    T::deserialize(payload).map_err(|e| RejectionReason::MalformedPayload {
        detail: e.to_string(),
    })
}

fn decode_action(kind: ActionKind, payload: &serde_json::Value) -> Result<(AgentId, Action), RejectionReason> {
    Ok(match kind {
        ActionKind::Chat => {
            let p: ChatPayload = decode(payload)?;
            (p.agent, Action::Chat { text: p.text })
        }
        ActionKind::Move => {
            let p: MovePayload = decode(payload)?;
            (p.agent, Action::Move { dx: p.dx, dy: p.dy })
        }
        ActionKind::Gather => {
            let p: GatherPayload = decode(payload)?;
            (p.agent, Action::Gather { amount: p.amount })
        }
        ActionKind::Rest => {
            let p: RestPayload = decode(payload)?;
            (p.agent, Action::Rest { resting: p.resting })
        }
        ActionKind::TransferAsset => {
            let p: TransferPayload = decode(payload)?;
            (
                p.agent,
                Action::TransferAsset {
                    asset: p.asset,
                    to: p.to,
                },
            )
        }
        ActionKind::Relate => {
            let p: RelatePayload = decode(payload)?;
            (
                p.agent,
                Action::Relate {
                    other: p.other,
                    delta: p.delta,
                },
            )
        }
        ActionKind::Reproduce => {
            let p: ReproducePayload = decode(payload)?;
            (p.agent, Action::Reproduce { partner: p.partner })
        }
        ActionKind::EnactLaw => {
            let p: EnactLawPayload = decode(payload)?;
            (p.agent, Action::EnactLaw { forbids: p.forbids })
        }
        ActionKind::RepealLaw => {
            let p: RepealLawPayload = decode(payload)?;
            (p.agent, Action::RepealLaw { law: p.law })
        }
    })
}

fn require_agent(universe: &Universe, agent: AgentId) -> Result<(), RejectionReason> {
    universe
        .agent(agent)
        .map(|_| ())
        .ok_or(RejectionReason::UnknownAgent {
            agent: agent.into_inner(),
        })
}

/// Decode `event` and resolve its references against `universe`.
pub fn perceive(event: &InputEvent, universe: &Universe) -> Result<Proposal, RejectionReason> {
    let kind = ActionKind::parse(&event.kind).ok_or_else(|| RejectionReason::UnknownKind {
        kind: event.kind.clone(),
    })?;
    let (actor, action) = decode_action(kind, &event.payload)?;

    require_agent(universe, actor)?;
    if let Some(other) = action.counterpart() {
        require_agent(universe, other)?;
    }
    match &action {
        Action::TransferAsset { asset, .. } if universe.asset(*asset).is_none() => {
            return Err(RejectionReason::UnknownAsset {
                asset: asset.into_inner(),
            });
        }
        Action::RepealLaw { law } if universe.law(*law).is_none() => {
            return Err(RejectionReason::UnknownLaw {
                law: law.into_inner(),
            });
        }
        _ => {}
    }

    Ok(Proposal {
        tick: event.tick,
        sequence: event.sequence,
        source_id: event.source_id.clone(),
        actor,
        action,
        energy_cost: 0,
        destination: None,
    })
}
