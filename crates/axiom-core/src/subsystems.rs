//! Per-tick ambient subsystems.
//!
//! A subsystem reads the Universe and its own chaos streams, then returns
//! the [`Mutation`]s it wants. It never writes: the kernel applies the
//! returned mutations through the commit module, in subsystem order,
//! before any input event of the tick is processed.

use axiom_chaos::{ChaosTree, RngMisuseError, SubsystemId};
use axiom_types::SimTime;
use axiom_world::entities::MAX_ENERGY;
use axiom_world::environment::{WEATHER_TOTAL_WEIGHT, regrowth, select_weather};
use axiom_world::{Mutation, Universe};

use crate::config::RulesConfig;

/// An ambient subsystem with an explicit per-tick entry point.
pub trait Subsystem: Send + Sync {
    /// The chaos subsystem this one draws from.
    fn id(&self) -> SubsystemId;

    /// Compute this tick's mutations.
    ///
    /// # Errors
    ///
    /// Returns [`RngMisuseError`] if a draw is refused. That is fatal.
    fn advance(
        &self,
        tick: SimTime,
        universe: &Universe,
        chaos: &mut ChaosTree,
    ) -> Result<Vec<Mutation>, RngMisuseError>;
}

impl std::fmt::Debug for dyn Subsystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Subsystem({})", self.id())
    }
}

/// The standard subsystem set, in application order.
pub fn standard(rules: &RulesConfig) -> Vec<Box<dyn Subsystem>> {
    vec![
        Box::new(Environment::new(rules.regrowth_per_tick)),
        Box::new(Metabolism::new(rules.metabolism_period, rules.rest_recovery)),
    ]
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Weather and resource regrowth.
///
/// One draw per tick from the Environment root stream picks the weather;
/// every chunk below capacity then regrows by the weather-adjusted rate.
#[derive(Debug, Clone, Copy)]
pub struct Environment {
    base_regrowth: u32,
}

impl Environment {
    /// Regrow `base_regrowth` units per chunk per tick in clear weather.
    pub const fn new(base_regrowth: u32) -> Self {
        Self { base_regrowth }
    }
}

impl Subsystem for Environment {
    fn id(&self) -> SubsystemId {
        SubsystemId::Environment
    }

    fn advance(
        &self,
        _tick: SimTime,
        universe: &Universe,
        chaos: &mut ChaosTree,
    ) -> Result<Vec<Mutation>, RngMisuseError> {
        let roll = chaos.fork(SubsystemId::Environment)?.next_below(WEATHER_TOTAL_WEIGHT)?;
        let weather = select_weather(universe.weather(), roll);
        let mut mutations = Vec::new();
        if weather != universe.weather() {
            mutations.push(Mutation::SetWeather { weather });
        }

        let amount = regrowth(self.base_regrowth, weather);
        if amount > 0 {
            mutations.extend(
                universe
                    .chunks()
                    .filter(|chunk| chunk.resources < chunk.capacity)
                    .map(|chunk| Mutation::Regrow {
                        chunk: chunk.id,
                        amount,
                    }),
            );
        }
        Ok(mutations)
    }
}

// ---------------------------------------------------------------------------
// Metabolism
// ---------------------------------------------------------------------------

/// Energy drift for living agents.
///
/// Resting agents recover a fixed amount. Active agents roll on their own
/// Biology entity stream and lose one energy with probability
/// `1 / period`. Each agent's stream is keyed by its id, so agents born
/// mid-run get a stream that does not depend on draw order.
#[derive(Debug, Clone, Copy)]
pub struct Metabolism {
    period: u64,
    rest_recovery: u32,
}

impl Metabolism {
    /// Build the subsystem. A `period` of 0 is treated as 1.
    pub fn new(period: u64, rest_recovery: u32) -> Self {
        Self {
            period: period.max(1),
            rest_recovery,
        }
    }
}

impl Subsystem for Metabolism {
    fn id(&self) -> SubsystemId {
        SubsystemId::Biology
    }

    fn advance(
        &self,
        _tick: SimTime,
        universe: &Universe,
        chaos: &mut ChaosTree,
    ) -> Result<Vec<Mutation>, RngMisuseError> {
        let mut mutations = Vec::new();
        let recovery = i32::try_from(self.rest_recovery).unwrap_or(i32::MAX);
        for agent in universe.agents().filter(|agent| agent.is_alive()) {
            if agent.resting {
                if agent.energy < MAX_ENERGY && recovery > 0 {
                    mutations.push(Mutation::Metabolize {
                        agent: agent.id,
                        delta: recovery,
                    });
                }
                continue;
            }
            let roll = chaos
                .fork_entity(SubsystemId::Biology, agent.id)?
                .next_below(self.period)?;
            if roll == 0 {
                mutations.push(Mutation::Metabolize {
                    agent: agent.id,
                    delta: -1,
                });
            }
        }
        Ok(mutations)
    }
}
