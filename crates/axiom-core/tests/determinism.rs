//! End-to-end determinism checks: replay equality, snapshot equivalence,
//! and monotonic ingestion, driven through the public kernel API.

#![allow(clippy::unwrap_used)]

use axiom_core::config::SimulationConfig;
use axiom_core::replay::{replay_from_genesis, replay_from_snapshot, verify_replay};
use axiom_core::{IngestError, Kernel};
use axiom_log::LogError;
use axiom_types::{HashCheckpoint, InputEvent, ObservationType, SimTime};
use serde_json::json;

fn config(seed: u64) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.world.seed = seed;
    config
}

fn chat(tick: u64, sequence: u64, text: &str) -> InputEvent {
    InputEvent::new(
        SimTime::new(tick),
        sequence,
        "gateway",
        "chat",
        json!({"agent": 1, "text": text}),
    )
}

/// A mixed workload: chats, moves, gathers, and a few invalid events.
fn workload(ticks: u64) -> Vec<InputEvent> {
    let mut events = Vec::new();
    let mut sequence = 0_u64;
    for tick in (5..ticks).step_by(25) {
        sequence += 1;
        events.push(chat(tick, sequence, "status report"));
        sequence += 1;
        events.push(InputEvent::new(
            SimTime::new(tick),
            sequence,
            "gateway",
            "move",
            json!({"agent": 3, "dx": 1, "dy": -1}),
        ));
        sequence += 1;
        events.push(InputEvent::new(
            SimTime::new(tick),
            sequence,
            "gateway",
            "gather",
            json!({"agent": 5, "amount": 4}),
        ));
        sequence += 1;
        events.push(InputEvent::new(
            SimTime::new(tick),
            sequence,
            "gateway",
            "summon",
            json!({"agent": 1}),
        ));
    }
    events
}

fn run(config: &SimulationConfig, events: &[InputEvent], ticks: u64) -> Kernel {
    let mut kernel = Kernel::genesis(config).unwrap();
    for event in events {
        kernel.ingest(event.clone()).unwrap();
    }
    for _ in 0..ticks {
        kernel.run_tick().unwrap();
    }
    kernel
}

fn checkpoints(kernel: &Kernel) -> Vec<HashCheckpoint> {
    kernel.chain().iter().copied().collect()
}

#[test]
fn scenario_a_single_chat_at_tick_500() {
    let config = config(1337);
    let events = [chat(500, 0, "hello, world")];

    let mut runs: Vec<Kernel> = (0..5).map(|_| run(&config, &events, 1000)).collect();
    let finals: Vec<_> = runs.iter().map(|k| k.status().latest_chain_digest).collect();
    assert!(finals.windows(2).all(|w| w.first() == w.last()));

    let first = runs.first_mut().unwrap();
    assert_eq!(first.current_tick(), SimTime::new(1000));
    assert_eq!(first.universe().transcript().len(), 1);
    assert_eq!(first.universe().transcript().first().unwrap().tick, SimTime::new(500));

    // Without the event, every checkpoint before tick 500 is the same and
    // tick 500 is where the chains part.
    let control = run(&config, &[], 1000);
    let tick_499 = first.chain().get(SimTime::new(499)).unwrap();
    let tick_500 = first.chain().get(SimTime::new(500)).unwrap();
    assert_eq!(control.chain().get(SimTime::new(499)), Some(tick_499));
    assert_ne!(
        control.chain().get(SimTime::new(500)).unwrap().state_digest,
        tick_500.state_digest
    );
    assert_eq!(
        tick_500.chain_digest,
        HashCheckpoint::link(&tick_499.chain_digest, SimTime::new(500), &tick_500.state_digest)
    );
    first.verify_integrity().unwrap();
}

#[test]
fn scenario_a_event_commits() {
    let config = config(1337);
    let mut kernel = Kernel::genesis(&config).unwrap();
    kernel.ingest(chat(500, 0, "hello, world")).unwrap();
    let mut committed = None;
    for _ in 0..500 {
        let outcome = kernel.run_tick().unwrap();
        if let Some(first) = outcome.outcomes.first() {
            committed = Some(first.observation().event_type);
        }
    }
    assert_eq!(committed, Some(ObservationType::Committed));
}

#[test]
fn scenario_b_snapshot_equivalence() {
    let mut config = config(1337);
    config.snapshots.interval_ticks = 250;
    let events = workload(1000);
    let unbroken = run(&config, &events, 1000);
    let expected = unbroken.status().latest_chain_digest;

    let ticks: Vec<u64> = unbroken.archive().ticks().map(SimTime::get).collect();
    assert_eq!(ticks, vec![250, 500, 750, 1000]);

    for at in [250, 500, 750] {
        let blob = unbroken.archive().get(SimTime::new(at)).unwrap();
        let replayed =
            replay_from_snapshot(blob, &config, unbroken.log(), SimTime::new(1000)).unwrap();
        assert_eq!(replayed.first().map(|c| c.tick), Some(SimTime::new(at + 1)));
        assert_eq!(replayed.last().map(|c| c.chain_digest), Some(expected));
        assert!(verify_replay(unbroken.chain(), &replayed).is_consistent());
    }
}

#[test]
fn replay_equality_across_seeds() {
    for seed in [1, 42, 9_001] {
        let config = config(seed);
        let recorded = run(&config, &workload(200), 200);
        let replayed = replay_from_genesis(&config, recorded.log(), SimTime::new(200)).unwrap();
        assert_eq!(replayed, checkpoints(&recorded));
    }
}

#[test]
fn different_seeds_diverge_at_genesis() {
    let a = Kernel::genesis(&config(1)).unwrap();
    let b = Kernel::genesis(&config(2)).unwrap();
    assert_ne!(a.status().latest_chain_digest, b.status().latest_chain_digest);
}

#[test]
fn scenario_c_ordering_violation() {
    let mut kernel = Kernel::genesis(&config(1337)).unwrap();
    kernel.ingest(chat(10, 5, "first")).unwrap();
    let result = kernel.ingest(chat(10, 3, "second"));
    assert!(matches!(
        result,
        Err(IngestError::Ordering(LogError::OrderingViolation {
            sequence: 3,
            last_sequence: 5,
            ..
        }))
    ));
    assert_eq!(kernel.log().len(), 1);
}
