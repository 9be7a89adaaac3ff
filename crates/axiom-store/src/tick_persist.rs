//! Per-tick persistence.
//!
//! The runner hands each sealed tick to a persistence task as a
//! [`TickBatch`]. Writes happen off the kernel's task, so a slow database
//! never delays the next tick. A batch is written in one transaction: a
//! stored checkpoint always has its inputs and draws beside it, and a
//! failed batch leaves nothing behind.
//!
//! ```text
//! persist_tick()  BEGIN
//!   |
//!   +-- input_events   (events processed this tick)
//!   +-- rng_draws      (draws since the previous batch)
//!   +-- observations   (one per event)
//!   +-- checkpoints    (the tick's checkpoint)
//!   +-- snapshots      (when one was taken)
//!                 COMMIT
//! ```

use axiom_chaos::DrawRecord;
use axiom_types::{HashCheckpoint, InputEvent, ObservationEvent};

use crate::checkpoint_store::insert_checkpoint;
use crate::draw_store::insert_draws;
use crate::error::DbError;
use crate::event_store::insert_events;
use crate::observation_store::insert_observations;
use crate::postgres::PostgresPool;
use crate::snapshot_store::insert_snapshot;

/// Errors that can occur during tick persistence.
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// A write failed.
    #[error("persist failed at tick {tick}: {source}")]
    Write {
        /// Tick being persisted.
        tick: u64,
        /// Underlying database error.
        #[source]
        source: DbError,
    },
}

/// Everything one sealed tick needs written.
#[derive(Debug, Clone)]
pub struct TickBatch {
    /// The tick's checkpoint.
    pub checkpoint: HashCheckpoint,
    /// Input events processed in the tick.
    pub events: Vec<InputEvent>,
    /// Chaos draws made since the previous batch.
    pub draws: Vec<DrawRecord>,
    /// Observations emitted in the tick.
    pub observations: Vec<ObservationEvent>,
    /// Snapshot blob, if one was taken after the tick.
    pub snapshot: Option<Vec<u8>>,
}

/// Write one sealed tick atomically.
///
/// # Errors
///
/// Returns [`PersistError::Write`] if any write fails. Nothing from the
/// batch is stored in that case.
pub async fn persist_tick(pool: &PostgresPool, batch: &TickBatch) -> Result<(), PersistError> {
    let tick = batch.checkpoint.tick;
    write_batch(pool, batch)
        .await
        .map_err(|source| PersistError::Write {
            tick: tick.get(),
            source,
        })?;

    tracing::debug!(
        tick = tick.get(),
        events = batch.events.len(),
        draws = batch.draws.len(),
        snapshot = batch.snapshot.is_some(),
        "Persisted tick"
    );
    Ok(())
}

async fn write_batch(pool: &PostgresPool, batch: &TickBatch) -> Result<(), DbError> {
    let mut tx = pool.pool().begin().await?;
    insert_events(&mut tx, &batch.events).await?;
    insert_draws(&mut tx, &batch.draws).await?;
    insert_observations(&mut tx, &batch.observations).await?;
    insert_checkpoint(&mut tx, &batch.checkpoint).await?;
    if let Some(blob) = &batch.snapshot {
        insert_snapshot(&mut tx, batch.checkpoint.tick, blob).await?;
    }
    tx.commit().await?;
    Ok(())
}
