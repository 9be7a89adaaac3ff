//! Shared application state for the Observer API server.
//!
//! [`AppState`] is built together with its [`ObserverFeed`]. The feed is
//! handed to the kernel runner as its tick callback and is the only writer;
//! the HTTP handlers only read.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

use axiom_core::operator::OperatorState;
use axiom_core::runner::{ChannelPublisher, Submission, TickCallback};
use axiom_core::{Kernel, KernelStatus, TickOutcome};
use axiom_types::{HashCheckpoint, ObservationEvent, SimTime};
use tokio::sync::{broadcast, mpsc, watch};

/// Capacity of the broadcast channel for observations.
///
/// A subscriber that falls behind by more than this many messages
/// receives [`broadcast::error::RecvError::Lagged`] and skips ahead.
const BROADCAST_CAPACITY: usize = 1024;

/// Checkpoints published so far, keyed by tick.
#[derive(Debug, Clone, Default)]
pub struct CheckpointHistory {
    inner: Arc<RwLock<BTreeMap<SimTime, HashCheckpoint>>>,
}

impl CheckpointHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one checkpoint.
    pub fn record(&self, checkpoint: HashCheckpoint) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        guard.insert(checkpoint.tick, checkpoint);
    }

    /// Record every checkpoint from `checkpoints`.
    pub fn extend<'a>(&self, checkpoints: impl IntoIterator<Item = &'a HashCheckpoint>) {
        let mut guard = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        for checkpoint in checkpoints {
            guard.insert(checkpoint.tick, *checkpoint);
        }
    }

    /// Checkpoints with `from <= tick <= to`, in tick order.
    pub fn range(&self, from: SimTime, to: SimTime) -> Vec<HashCheckpoint> {
        if from > to {
            return Vec::new();
        }
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        guard.range(from..=to).map(|(_, c)| *c).collect()
    }

    /// Number of recorded checkpoints.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Runner callback that feeds the observer.
#[derive(Debug)]
pub struct ObserverFeed {
    publisher: ChannelPublisher,
    history: CheckpointHistory,
}

impl TickCallback for ObserverFeed {
    fn on_tick(&mut self, outcome: &TickOutcome, kernel: &Kernel) {
        self.history.record(outcome.checkpoint);
        self.publisher.on_tick(outcome, kernel);
    }
}

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor.
#[derive(Debug)]
pub struct AppState {
    /// Broadcast sender for observations; handlers only subscribe.
    pub observations: broadcast::Sender<ObservationEvent>,
    /// Latest kernel status.
    pub status: watch::Receiver<KernelStatus>,
    /// Published checkpoints.
    pub checkpoints: CheckpointHistory,
    /// The kernel's ingestion channel.
    pub submissions: mpsc::Sender<Submission>,
    /// Shared operator control state.
    pub operator: Arc<OperatorState>,
}

impl AppState {
    /// Build the observer state for `kernel` and the feed the runner
    /// should call after every tick.
    ///
    /// The history starts with every checkpoint `kernel` already holds.
    pub fn new(
        kernel: &Kernel,
        submissions: mpsc::Sender<Submission>,
        operator: Arc<OperatorState>,
    ) -> (Arc<Self>, ObserverFeed) {
        let (observations, _) = broadcast::channel(BROADCAST_CAPACITY);
        let (status_tx, status) = watch::channel(kernel.status());
        let checkpoints = CheckpointHistory::new();
        checkpoints.extend(kernel.chain().iter());

        let feed = ObserverFeed {
            publisher: ChannelPublisher::new(observations.clone(), status_tx),
            history: checkpoints.clone(),
        };
        let state = Arc::new(Self {
            observations,
            status,
            checkpoints,
            submissions,
            operator,
        });
        (state, feed)
    }

    /// Subscribe to the observation stream.
    pub fn subscribe(&self) -> broadcast::Receiver<ObservationEvent> {
        self.observations.subscribe()
    }

    /// The most recently published kernel status.
    pub fn current_status(&self) -> KernelStatus {
        *self.status.borrow()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axiom_types::Digest;

    use super::*;

    fn checkpoint(tick: u64) -> HashCheckpoint {
        HashCheckpoint::next(&Digest::ZERO, SimTime::new(tick), Digest::of(&tick.to_le_bytes()))
    }

    #[test]
    fn history_range_is_inclusive_and_ordered() {
        let history = CheckpointHistory::new();
        for tick in [3, 1, 2, 5] {
            history.record(checkpoint(tick));
        }
        let ticks: Vec<u64> = history
            .range(SimTime::new(2), SimTime::new(5))
            .iter()
            .map(|c| c.tick.get())
            .collect();
        assert_eq!(ticks, vec![2, 3, 5]);
        assert_eq!(history.len(), 4);
    }

    #[test]
    fn inverted_range_is_empty() {
        let history = CheckpointHistory::new();
        history.record(checkpoint(1));
        assert!(history.range(SimTime::new(2), SimTime::new(1)).is_empty());
    }
}
