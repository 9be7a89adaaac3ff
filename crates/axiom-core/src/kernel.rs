//! The tick scheduler.
//!
//! [`Kernel`] exclusively owns the Universe, the chaos tree, the event log,
//! and the hash chain. One call to [`Kernel::run_tick`] runs one complete
//! tick:
//!
//! 1. advance the clock
//! 2. run each ambient [`Subsystem`] and apply its mutations
//! 3. feed the tick's logged events through the [`AuthorityPipeline`] in
//!    total order
//! 4. digest the Universe and append the checkpoint
//! 5. run the integrity sweep when due
//! 6. take a periodic snapshot when due
//!
//! A tick is never abandoned halfway. Any error from `run_tick` or from
//! an explicit [`Kernel::verify_integrity`] latches the kernel as halted:
//! the chain can no longer be trusted, so every later call returns
//! [`KernelError::Halted`].

use axiom_chaos::{ChaosTree, DrawAudit, DrawRecord, RngMisuseError, SubsystemId};
use axiom_log::{CheckpointChain, EventLog, LogError};
use axiom_types::{Digest, HashCheckpoint, InputEvent, SimTime};
use axiom_world::{Universe, WorldError, genesis};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::clock::{ClockError, TickClock};
use crate::config::SimulationConfig;
use crate::pipeline::{AuthorityPipeline, CommitError, PipelineOutcome, commit};
use crate::snapshot::{SnapshotArchive, SnapshotError, SnapshotManager};
use crate::subsystems::{self, Subsystem};

/// A determinism or integrity failure.
#[derive(Debug, thiserror::Error)]
pub enum IntegrityError {
    /// The hash chain failed to extend or verify.
    #[error(transparent)]
    Chain(#[from] LogError),

    /// A chaos stream was misused.
    #[error(transparent)]
    Rng(#[from] RngMisuseError),
}

/// Errors from kernel operations.
#[derive(Debug, thiserror::Error)]
pub enum KernelError {
    /// The kernel hit a fatal error earlier and refuses to advance.
    #[error("kernel halted: {reason}")]
    Halted {
        /// The fatal error that latched the halt.
        reason: String,
    },

    /// Hash chain or RNG integrity failure.
    #[error("integrity failure: {0}")]
    Integrity(#[from] IntegrityError),

    /// A validated proposal or ambient mutation could not be applied.
    #[error(transparent)]
    Commit(#[from] CommitError),

    /// The tick counter cannot advance.
    #[error(transparent)]
    Clock(#[from] ClockError),

    /// Genesis or digesting the Universe failed.
    #[error(transparent)]
    World(#[from] WorldError),

    /// An explicit snapshot or restore failed.
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl From<LogError> for KernelError {
    fn from(e: LogError) -> Self {
        Self::Integrity(IntegrityError::Chain(e))
    }
}

impl From<RngMisuseError> for KernelError {
    fn from(e: RngMisuseError) -> Self {
        Self::Integrity(IntegrityError::Rng(e))
    }
}

/// Why an input event was refused at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// The kernel is halted.
    #[error("kernel halted")]
    Halted,

    /// The event targets a tick that has already been sealed.
    #[error("tick {tick} is already sealed (current tick {current})")]
    TickSealed {
        /// Event tick.
        tick: SimTime,
        /// Latest sealed tick.
        current: SimTime,
    },

    /// The event does not follow the source's previous event.
    #[error(transparent)]
    Ordering(#[from] LogError),

    /// A key field exceeds what the permanent record can hold.
    #[error("{field} {value} exceeds the largest storable value {max}", max = MAX_EVENT_KEY)]
    OutOfRange {
        /// `tick` or `sequence`.
        field: &'static str,
        /// The refused value.
        value: u64,
    },
}

/// Largest accepted event tick or sequence. Keys are stored as signed
/// 64-bit integers.
pub const MAX_EVENT_KEY: u64 = i64::MAX.unsigned_abs();

/// The query surface: where the kernel is and what its chain says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelStatus {
    /// Latest sealed tick.
    pub current_tick: SimTime,
    /// Chain digest of the latest checkpoint.
    pub latest_chain_digest: Digest,
}

/// Everything one tick produced.
#[derive(Debug, Clone)]
pub struct TickOutcome {
    /// The tick that ran.
    pub tick: SimTime,
    /// The checkpoint sealing it.
    pub checkpoint: HashCheckpoint,
    /// Events processed, in the order they ran.
    pub events: Vec<InputEvent>,
    /// One outcome per event, same order.
    pub outcomes: Vec<PipelineOutcome>,
    /// Periodic snapshot taken after this tick, if one was due.
    pub snapshot: Option<Vec<u8>>,
    /// Chaos draws made since the previous outcome, oldest first. The
    /// first tick after genesis also carries the genesis draws unless
    /// [`Kernel::take_draws`] collected them.
    pub draws: Vec<DrawRecord>,
}

impl TickOutcome {
    /// Number of committed events.
    pub fn committed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_committed()).count()
    }

    /// Number of rejected events.
    pub fn rejected(&self) -> usize {
        self.outcomes.len().saturating_sub(self.committed())
    }
}

/// The deterministic simulation kernel.
#[derive(Debug)]
pub struct Kernel {
    clock: TickClock,
    chaos: ChaosTree,
    universe: Universe,
    pipeline: AuthorityPipeline,
    subsystems: Vec<Box<dyn Subsystem>>,
    log: EventLog,
    chain: CheckpointChain,
    snapshots: SnapshotManager,
    archive: SnapshotArchive,
    verify_every_ticks: u64,
    halted: Option<String>,
}

fn audit_for(config: &SimulationConfig) -> DrawAudit {
    DrawAudit::new(config.chaos.audit_enabled, config.chaos.audit_capacity)
}

impl Kernel {
    /// Build the tick-0 kernel from `config`: genesis Universe, fresh
    /// chaos tree, and checkpoint 0.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::World`] for an invalid genesis configuration.
    pub fn genesis(config: &SimulationConfig) -> Result<Self, KernelError> {
        Self::with_subsystems(config, subsystems::standard(&config.rules))
    }

    /// As [`Kernel::genesis`], running `subsystems` each tick instead of
    /// the standard set.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::World`] for an invalid genesis configuration.
    pub fn with_subsystems(
        config: &SimulationConfig,
        subsystems: Vec<Box<dyn Subsystem>>,
    ) -> Result<Self, KernelError> {
        let mut chaos =
            ChaosTree::new(config.world.seed, SubsystemId::ALL).with_audit(audit_for(config));
        chaos.set_tick(SimTime::GENESIS);
        let universe = genesis(&config.genesis, &mut chaos)?;
        let mut chain = CheckpointChain::new();
        let checkpoint = chain.append(SimTime::GENESIS, universe.state_digest()?)?;
        info!(
            seed = config.world.seed,
            chain_digest = %checkpoint.chain_digest,
            "kernel initialized at genesis"
        );
        Ok(Self::assemble(
            config,
            subsystems,
            TickClock::new(),
            chaos,
            universe,
            chain,
        ))
    }

    /// Resume from a snapshot blob. Events after the snapshot tick must be
    /// ingested again before the kernel can reproduce later ticks.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Snapshot`] for an unusable blob.
    pub fn restore(blob: &[u8], config: &SimulationConfig) -> Result<Self, KernelError> {
        let manager = SnapshotManager::new(config.snapshots.interval_ticks);
        let restored = manager.restore(blob)?;
        if restored.seed != config.world.seed {
            warn!(
                snapshot_seed = restored.seed,
                config_seed = config.world.seed,
                "snapshot seed differs from configuration, using snapshot seed"
            );
        }
        let chaos = ChaosTree::restore(
            restored.seed,
            SubsystemId::ALL,
            &restored.rng_state,
            audit_for(config),
        )?;
        info!(
            tick = restored.tick.get(),
            chain_digest = %restored.chain_tip.chain_digest,
            "kernel restored from snapshot"
        );
        let mut kernel = Self::assemble(
            config,
            subsystems::standard(&config.rules),
            TickClock::starting_at(restored.tick),
            chaos,
            restored.universe,
            CheckpointChain::resume(restored.chain_tip),
        );
        kernel.archive.insert(restored.tick, blob.to_vec());
        Ok(kernel)
    }

    fn assemble(
        config: &SimulationConfig,
        subsystems: Vec<Box<dyn Subsystem>>,
        clock: TickClock,
        chaos: ChaosTree,
        universe: Universe,
        chain: CheckpointChain,
    ) -> Self {
        Self {
            clock,
            chaos,
            universe,
            pipeline: AuthorityPipeline::new(config.rules.clone()),
            subsystems,
            log: EventLog::new(),
            chain,
            snapshots: SnapshotManager::new(config.snapshots.interval_ticks),
            archive: SnapshotArchive::new(),
            verify_every_ticks: config.integrity.verify_every_ticks,
            halted: None,
        }
    }

    /// Accept an input event into the log.
    ///
    /// # Errors
    ///
    /// Refuses events for sealed ticks, events that do not strictly follow
    /// their source's previous event, keys above [`MAX_EVENT_KEY`], and
    /// anything after a halt. A refused event leaves the log unchanged.
    pub fn ingest(&mut self, event: InputEvent) -> Result<(), IngestError> {
        if self.halted.is_some() {
            return Err(IngestError::Halted);
        }
        if event.tick.get() > MAX_EVENT_KEY {
            return Err(IngestError::OutOfRange {
                field: "tick",
                value: event.tick.get(),
            });
        }
        if event.sequence > MAX_EVENT_KEY {
            return Err(IngestError::OutOfRange {
                field: "sequence",
                value: event.sequence,
            });
        }
        let current = self.clock.tick();
        if event.tick <= current {
            return Err(IngestError::TickSealed {
                tick: event.tick,
                current,
            });
        }
        self.log.append(event)?;
        Ok(())
    }

    /// Run the next tick to completion.
    ///
    /// # Errors
    ///
    /// Every error is fatal and latches the kernel as halted.
    pub fn run_tick(&mut self) -> Result<TickOutcome, KernelError> {
        if let Some(reason) = &self.halted {
            return Err(KernelError::Halted {
                reason: reason.clone(),
            });
        }
        match self.advance_tick() {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                error!(
                    tick = self.clock.tick().get(),
                    error = %e,
                    "fatal kernel error, halting"
                );
                self.halted.get_or_insert_with(|| e.to_string());
                Err(e)
            }
        }
    }

    fn advance_tick(&mut self) -> Result<TickOutcome, KernelError> {
        let tick = self.clock.advance()?;
        self.chaos.set_tick(tick);

        for subsystem in &self.subsystems {
            let mutations = subsystem.advance(tick, &self.universe, &mut self.chaos)?;
            for mutation in &mutations {
                commit::apply_ambient(&mut self.universe, tick, mutation)?;
            }
        }

        let events: Vec<InputEvent> = self.log.events_at(tick).cloned().collect();
        let mut outcomes = Vec::with_capacity(events.len());
        for event in &events {
            outcomes.push(self.pipeline.process(event, &mut self.universe)?);
        }

        let state_digest = self.universe.state_digest()?;
        let checkpoint = self.chain.append(tick, state_digest)?;
        debug!(
            tick = tick.get(),
            events = events.len(),
            chain_digest = %checkpoint.chain_digest,
            "tick sealed"
        );

        if self.verify_every_ticks > 0 && tick.get().checked_rem(self.verify_every_ticks) == Some(0)
        {
            self.verify_integrity()?;
        }

        let snapshot = if self.snapshots.is_due(tick) {
            match self.encode_snapshot(&checkpoint) {
                Ok(blob) => {
                    self.archive.insert(tick, blob.clone());
                    info!(tick = tick.get(), "periodic snapshot taken");
                    Some(blob)
                }
                Err(e) => {
                    warn!(tick = tick.get(), error = %e, "periodic snapshot failed");
                    None
                }
            }
        } else {
            None
        };

        Ok(TickOutcome {
            tick,
            checkpoint,
            events,
            outcomes,
            snapshot,
            draws: self.chaos.take_draws(),
        })
    }

    /// Recompute the hash chain links added since the last sweep and check
    /// the retained draw audit window. A failure latches the halt.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Integrity`] on any mismatch.
    pub fn verify_integrity(&mut self) -> Result<(), KernelError> {
        let result = self.check_integrity();
        if let Err(e) = &result {
            error!(
                tick = self.clock.tick().get(),
                error = %e,
                "integrity sweep failed, halting"
            );
            self.halted.get_or_insert_with(|| e.to_string());
        }
        result
    }

    fn check_integrity(&mut self) -> Result<(), KernelError> {
        let checked = self.chain.verify_new_links()?;
        self.chaos.audit().verify()?;
        debug!(
            tick = self.clock.tick().get(),
            links = checked,
            "integrity sweep passed"
        );
        Ok(())
    }

    fn encode_snapshot(&self, tip: &HashCheckpoint) -> Result<Vec<u8>, SnapshotError> {
        self.snapshots.snapshot(
            &self.universe,
            &self.chaos.state(),
            tip.tick,
            self.chaos.seed(),
            tip,
        )
    }

    /// Snapshot the state at the current tick and archive it.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::Halted`] after a halt, or
    /// [`KernelError::Snapshot`] if encoding fails. A failed snapshot does
    /// not halt the kernel.
    pub fn snapshot(&mut self) -> Result<Vec<u8>, KernelError> {
        if let Some(reason) = &self.halted {
            return Err(KernelError::Halted {
                reason: reason.clone(),
            });
        }
        let tip = *self.chain.latest().ok_or(LogError::NonContiguousTick {
            expected: SimTime::GENESIS,
            got: self.clock.tick(),
        })?;
        let blob = self.encode_snapshot(&tip)?;
        self.archive.insert(tip.tick, blob.clone());
        Ok(blob)
    }

    /// Chaos draws not yet handed out in a [`TickOutcome`], such as the
    /// genesis draws before the first tick.
    pub fn take_draws(&mut self) -> Vec<DrawRecord> {
        self.chaos.take_draws()
    }

    /// Current tick and latest chain digest.
    pub fn status(&self) -> KernelStatus {
        KernelStatus {
            current_tick: self.clock.tick(),
            latest_chain_digest: self
                .chain
                .latest()
                .map_or(Digest::ZERO, |c| c.chain_digest),
        }
    }

    /// Latest sealed tick.
    pub const fn current_tick(&self) -> SimTime {
        self.clock.tick()
    }

    /// Read-only view of the Universe.
    pub const fn universe(&self) -> &Universe {
        &self.universe
    }

    /// The checkpoint chain.
    pub const fn chain(&self) -> &CheckpointChain {
        &self.chain
    }

    /// The input event log.
    pub const fn log(&self) -> &EventLog {
        &self.log
    }

    /// The chaos tree.
    pub const fn chaos(&self) -> &ChaosTree {
        &self.chaos
    }

    /// Snapshots taken by this kernel.
    pub const fn archive(&self) -> &SnapshotArchive {
        &self.archive
    }

    /// The snapshot cadence and codec.
    pub const fn snapshot_manager(&self) -> &SnapshotManager {
        &self.snapshots
    }

    /// Whether a fatal error has halted the kernel.
    pub const fn is_halted(&self) -> bool {
        self.halted.is_some()
    }

    /// The error that halted the kernel, if any.
    pub fn halt_reason(&self) -> Option<&str> {
        self.halted.as_deref()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axiom_types::RejectionReason;
    use axiom_world::Mutation;
    use serde_json::json;

    use super::*;

    /// Draws normally until `fail_at`, then reports a misused stream.
    #[derive(Debug)]
    struct FailsAt {
        fail_at: u64,
    }

    impl Subsystem for FailsAt {
        fn id(&self) -> SubsystemId {
            SubsystemId::Cognition
        }

        fn advance(
            &self,
            tick: SimTime,
            _universe: &Universe,
            chaos: &mut ChaosTree,
        ) -> Result<Vec<Mutation>, RngMisuseError> {
            if tick.get() >= self.fail_at {
                return Err(RngMisuseError::UnregisteredSubsystem {
                    subsystem: SubsystemId::Cognition,
                });
            }
            chaos.fork(SubsystemId::Cognition)?.next_u64()?;
            Ok(Vec::new())
        }
    }

    fn config() -> SimulationConfig {
        let mut config = SimulationConfig::default();
        config.genesis.width = 4;
        config.genesis.height = 4;
        config.genesis.agents = 3;
        config.snapshots.interval_ticks = 5;
        config.integrity.verify_every_ticks = 3;
        config
    }

    fn chat(tick: u64, sequence: u64, source: &str) -> InputEvent {
        InputEvent::new(
            SimTime::new(tick),
            sequence,
            source,
            "chat",
            json!({"agent": 1, "text": "hello"}),
        )
    }

    #[test]
    fn genesis_seals_tick_zero() {
        let kernel = Kernel::genesis(&config()).unwrap();
        let status = kernel.status();
        assert_eq!(status.current_tick, SimTime::GENESIS);
        assert_eq!(kernel.chain().len(), 1);
        let genesis = kernel.chain().latest().unwrap();
        assert_eq!(
            genesis.chain_digest,
            HashCheckpoint::link(&Digest::ZERO, SimTime::GENESIS, &genesis.state_digest)
        );
    }

    #[test]
    fn run_tick_appends_one_checkpoint() {
        let mut kernel = Kernel::genesis(&config()).unwrap();
        let outcome = kernel.run_tick().unwrap();
        assert_eq!(outcome.tick, SimTime::new(1));
        assert_eq!(kernel.chain().len(), 2);
        assert_eq!(kernel.status().latest_chain_digest, outcome.checkpoint.chain_digest);
    }

    #[test]
    fn events_run_in_total_order() {
        let mut kernel = Kernel::genesis(&config()).unwrap();
        kernel.ingest(chat(1, 2, "a")).unwrap();
        kernel.ingest(chat(1, 1, "b")).unwrap();
        kernel.ingest(chat(1, 1, "a")).unwrap();
        let outcome = kernel.run_tick().unwrap();
        let order: Vec<(u64, &str)> = outcome
            .events
            .iter()
            .map(|e| (e.sequence, e.source_id.as_str()))
            .collect();
        assert_eq!(order, vec![(1, "a"), (1, "b"), (2, "a")]);
        assert_eq!(outcome.committed(), 3);
    }

    #[test]
    fn sealed_ticks_refuse_events() {
        let mut kernel = Kernel::genesis(&config()).unwrap();
        kernel.run_tick().unwrap();
        let result = kernel.ingest(chat(1, 0, "late"));
        assert_eq!(
            result,
            Err(IngestError::TickSealed {
                tick: SimTime::new(1),
                current: SimTime::new(1)
            })
        );
        assert!(kernel.log().is_empty());
    }

    #[test]
    fn out_of_order_ingestion_is_refused() {
        let mut kernel = Kernel::genesis(&config()).unwrap();
        kernel.ingest(chat(10, 5, "gw")).unwrap();
        let result = kernel.ingest(chat(10, 3, "gw"));
        assert!(matches!(
            result,
            Err(IngestError::Ordering(LogError::OrderingViolation { .. }))
        ));
        assert_eq!(kernel.log().len(), 1);
    }

    #[test]
    fn rejected_event_still_seals_tick() {
        let mut kernel = Kernel::genesis(&config()).unwrap();
        kernel
            .ingest(InputEvent::new(
                SimTime::new(1),
                0,
                "gw",
                "fly",
                json!({"agent": 1}),
            ))
            .unwrap();
        let outcome = kernel.run_tick().unwrap();
        assert_eq!(outcome.rejected(), 1);
        assert!(matches!(
            outcome.outcomes.first(),
            Some(PipelineOutcome::Rejected {
                reason: RejectionReason::UnknownKind { kind },
                ..
            }) if kind == "fly"
        ));
    }

    #[test]
    fn periodic_snapshots_are_archived() {
        let mut kernel = Kernel::genesis(&config()).unwrap();
        let mut taken = Vec::new();
        for _ in 0..10 {
            if let Some(blob) = kernel.run_tick().unwrap().snapshot {
                taken.push(blob);
            }
        }
        assert_eq!(taken.len(), 2);
        let ticks: Vec<u64> = kernel.archive().ticks().map(SimTime::get).collect();
        assert_eq!(ticks, vec![5, 10]);
    }

    #[test]
    fn restore_continues_the_chain() {
        let cfg = config();
        let mut unbroken = Kernel::genesis(&cfg).unwrap();
        for _ in 0..5 {
            unbroken.run_tick().unwrap();
        }
        let blob = unbroken.snapshot().unwrap();
        let mut restored = Kernel::restore(&blob, &cfg).unwrap();
        assert_eq!(restored.status(), unbroken.status());

        for _ in 0..5 {
            let a = unbroken.run_tick().unwrap();
            let b = restored.run_tick().unwrap();
            assert_eq!(a.checkpoint, b.checkpoint);
        }
        restored.verify_integrity().unwrap();
    }

    #[test]
    fn subsystem_failure_latches_the_halt() {
        let mut kernel =
            Kernel::with_subsystems(&config(), vec![Box::new(FailsAt { fail_at: 3 })]).unwrap();
        kernel.run_tick().unwrap();
        kernel.run_tick().unwrap();
        let err = kernel.run_tick().unwrap_err();
        assert!(matches!(
            err,
            KernelError::Integrity(IntegrityError::Rng(
                RngMisuseError::UnregisteredSubsystem { .. }
            ))
        ));
        assert!(kernel.is_halted());
        let sealed = kernel.current_tick();

        for _ in 0..3 {
            assert!(matches!(kernel.run_tick(), Err(KernelError::Halted { .. })));
        }
        assert_eq!(kernel.current_tick(), sealed);
        assert_eq!(kernel.ingest(chat(10, 0, "gw")), Err(IngestError::Halted));
        assert!(matches!(kernel.snapshot(), Err(KernelError::Halted { .. })));
        assert!(kernel.halt_reason().is_some_and(|r| r.contains("cognition")));
    }

    #[test]
    fn failed_explicit_sweep_latches_the_halt() {
        let mut kernel = Kernel::genesis(&config()).unwrap();
        kernel.run_tick().unwrap();
        kernel.run_tick().unwrap();
        let mut tampered: Vec<HashCheckpoint> = kernel.chain().iter().copied().collect();
        if let Some(cp) = tampered.get_mut(1) {
            cp.state_digest = Digest::of(b"forged");
        }
        kernel.chain = CheckpointChain::from_checkpoints(tampered);

        assert!(matches!(
            kernel.verify_integrity(),
            Err(KernelError::Integrity(IntegrityError::Chain(
                LogError::HashMismatch { .. }
            )))
        ));
        assert!(kernel.is_halted());
        assert!(matches!(kernel.run_tick(), Err(KernelError::Halted { .. })));
        assert_eq!(kernel.ingest(chat(10, 0, "gw")), Err(IngestError::Halted));
    }

    #[test]
    fn sweep_advances_the_verified_prefix() {
        let mut kernel = Kernel::genesis(&config()).unwrap();
        for _ in 0..4 {
            kernel.run_tick().unwrap();
        }
        // The automatic sweep ran at tick 3.
        assert_eq!(kernel.chain().verified_len(), 4);
        kernel.verify_integrity().unwrap();
        assert_eq!(kernel.chain().verified_len(), 5);
        assert!(!kernel.is_halted());
    }

    #[test]
    fn oversized_keys_are_refused_at_ingestion() {
        let mut kernel = Kernel::genesis(&config()).unwrap();
        let big = u64::MAX;
        assert_eq!(
            kernel.ingest(chat(1, big, "gw")),
            Err(IngestError::OutOfRange {
                field: "sequence",
                value: big
            })
        );
        assert_eq!(
            kernel.ingest(chat(big, 0, "gw")),
            Err(IngestError::OutOfRange {
                field: "tick",
                value: big
            })
        );
        assert!(kernel.log().is_empty());
        assert!(kernel.ingest(chat(1, MAX_EVENT_KEY, "gw")).is_ok());
    }

    #[test]
    fn outcomes_carry_every_draw_once() {
        let mut cfg = config();
        cfg.chaos.audit_capacity = 4;
        let mut kernel = Kernel::genesis(&cfg).unwrap();
        let mut trail = Vec::new();
        for _ in 0..6 {
            trail.extend(kernel.run_tick().unwrap().draws);
        }
        assert!(trail.len() > 4);
        assert_eq!(kernel.chaos().audit().len(), 4);
        assert!(trail.first().is_some_and(|r| r.tick == SimTime::GENESIS));
        assert!(DrawAudit::verify_from_genesis(&trail).is_ok());
        let env = axiom_chaos::StreamKey::root(SubsystemId::Environment);
        let env_draws = trail.iter().filter(|r| r.stream == env).count();
        assert_eq!(
            u64::try_from(env_draws).unwrap(),
            kernel.chaos().draws(env)
        );
    }

    #[test]
    fn genesis_draws_can_be_collected_up_front() {
        let mut kernel = Kernel::genesis(&config()).unwrap();
        let genesis = kernel.take_draws();
        assert!(!genesis.is_empty());
        assert!(genesis.iter().all(|r| r.tick == SimTime::GENESIS));
        let first = kernel.run_tick().unwrap();
        assert!(first.draws.iter().all(|r| r.tick == SimTime::new(1)));
    }

    #[test]
    fn trail_continues_across_restore() {
        let cfg = config();
        let mut first = Kernel::genesis(&cfg).unwrap();
        let mut trail = Vec::new();
        for _ in 0..5 {
            trail.extend(first.run_tick().unwrap().draws);
        }
        let blob = first.snapshot().unwrap();
        let mut second = Kernel::restore(&blob, &cfg).unwrap();
        for _ in 0..5 {
            trail.extend(second.run_tick().unwrap().draws);
        }
        assert!(DrawAudit::verify_from_genesis(&trail).is_ok());
    }

    #[test]
    fn status_serializes_for_observers() {
        let kernel = Kernel::genesis(&config()).unwrap();
        let value = serde_json::to_value(kernel.status()).unwrap();
        assert_eq!(value.get("current_tick"), Some(&json!(0)));
        assert!(value.get("latest_chain_digest").is_some_and(serde_json::Value::is_string));
    }
}
