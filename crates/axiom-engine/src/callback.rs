//! Tick callback that feeds the observer and the persistence task.

use axiom_core::runner::TickCallback;
use axiom_core::{Kernel, TickOutcome};
use axiom_observer::ObserverFeed;
use axiom_store::TickBatch;
use axiom_types::InputEvent;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Work for the persistence task, in the order it must be written.
#[derive(Debug)]
pub enum PersistJob {
    /// An event the kernel accepted, written ahead of its tick.
    Accepted(InputEvent),
    /// A sealed tick.
    Tick(TickBatch),
}

/// Bridges each sealed tick to the observer and, when enabled, each
/// accepted event and sealed tick to the database writer.
#[derive(Debug)]
pub struct EngineCallback {
    feed: ObserverFeed,
    persist: Option<mpsc::UnboundedSender<PersistJob>>,
}

impl EngineCallback {
    /// Create a callback. `persist` is `None` when persistence is disabled.
    pub const fn new(
        feed: ObserverFeed,
        persist: Option<mpsc::UnboundedSender<PersistJob>>,
    ) -> Self {
        Self { feed, persist }
    }

    fn send(&mut self, job: PersistJob) {
        if let Some(tx) = &self.persist
            && tx.send(job).is_err()
        {
            warn!("persistence task gone, disabling persistence");
            self.persist = None;
        }
    }
}

/// Everything about `outcome` that needs to reach the database.
pub fn tick_batch(outcome: &TickOutcome) -> TickBatch {
    TickBatch {
        checkpoint: outcome.checkpoint,
        events: outcome.events.clone(),
        draws: outcome.draws.clone(),
        observations: outcome
            .outcomes
            .iter()
            .map(|o| o.observation().clone())
            .collect(),
        snapshot: outcome.snapshot.clone(),
    }
}

impl TickCallback for EngineCallback {
    fn on_tick(&mut self, outcome: &TickOutcome, kernel: &Kernel) {
        self.feed.on_tick(outcome, kernel);
        if self.persist.is_some() {
            self.send(PersistJob::Tick(tick_batch(outcome)));
        }

        debug!(
            tick = outcome.tick.get(),
            committed = outcome.committed(),
            rejected = outcome.rejected(),
            chain_digest = %outcome.checkpoint.chain_digest,
            "tick sealed"
        );
    }

    fn on_ingest(&mut self, event: &InputEvent) {
        if self.persist.is_some() {
            self.send(PersistJob::Accepted(event.clone()));
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axiom_core::config::{SimulationBoundsConfig, SimulationConfig};
    use axiom_core::operator::OperatorState;
    use axiom_observer::AppState;
    use axiom_types::SimTime;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn forwards_batches_and_feeds_observer() {
        let mut config = SimulationConfig::default();
        config.genesis.width = 2;
        config.genesis.height = 2;
        config.genesis.agents = 1;
        let mut kernel = Kernel::genesis(&config).unwrap();
        let (sub_tx, _sub_rx) = mpsc::channel(1);
        let operator = Arc::new(OperatorState::new(&SimulationBoundsConfig::default()));
        let (state, feed) = AppState::new(&kernel, sub_tx, operator);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut callback = EngineCallback::new(feed, Some(tx));

        kernel
            .ingest(InputEvent::new(
                SimTime::new(1),
                0,
                "gw",
                "chat",
                json!({"agent": 1, "text": "hi"}),
            ))
            .unwrap();
        let outcome = kernel.run_tick().unwrap();
        callback.on_tick(&outcome, &kernel);

        let job = rx.recv().await;
        assert!(matches!(&job, Some(PersistJob::Tick(_))));
        if let Some(PersistJob::Tick(batch)) = job {
            assert_eq!(batch.checkpoint, outcome.checkpoint);
            assert_eq!(batch.events.len(), 1);
            assert_eq!(batch.observations.len(), 1);
            assert!(!batch.draws.is_empty());
        }
        assert_eq!(state.current_status().current_tick, SimTime::new(1));
        assert_eq!(state.checkpoints.len(), 2);
    }

    #[tokio::test]
    async fn closed_persistence_channel_is_dropped() {
        let config = SimulationConfig::default();
        let mut kernel = Kernel::genesis(&config).unwrap();
        let (sub_tx, _sub_rx) = mpsc::channel(1);
        let operator = Arc::new(OperatorState::new(&SimulationBoundsConfig::default()));
        let (_state, feed) = AppState::new(&kernel, sub_tx, operator);
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let mut callback = EngineCallback::new(feed, Some(tx));

        let outcome = kernel.run_tick().unwrap();
        callback.on_tick(&outcome, &kernel);
        assert!(callback.persist.is_none());
    }

    #[tokio::test]
    async fn accepted_events_are_queued_before_their_tick() {
        let config = SimulationConfig::default();
        let mut kernel = Kernel::genesis(&config).unwrap();
        let (sub_tx, _sub_rx) = mpsc::channel(1);
        let operator = Arc::new(OperatorState::new(&SimulationBoundsConfig::default()));
        let (_state, feed) = AppState::new(&kernel, sub_tx, operator);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut callback = EngineCallback::new(feed, Some(tx));

        let future = InputEvent::new(
            SimTime::new(40),
            0,
            "gw",
            "chat",
            json!({"agent": 1, "text": "later"}),
        );
        kernel.ingest(future.clone()).unwrap();
        callback.on_ingest(&future);
        let outcome = kernel.run_tick().unwrap();
        callback.on_tick(&outcome, &kernel);

        assert!(matches!(rx.recv().await, Some(PersistJob::Accepted(event)) if event == future));
        assert!(matches!(
            rx.recv().await,
            Some(PersistJob::Tick(batch)) if batch.events.is_empty()
        ));
    }
}
