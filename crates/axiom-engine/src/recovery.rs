//! Boot-time recovery from the database.
//!
//! ```text
//! latest stored checkpoint ──► none? ──► genesis
//!          │
//! newest valid snapshot (older ones on failure, genesis when none)
//!          │
//! re-ingest stored events after the snapshot tick
//!          │
//! run ticks up to the stored tip, comparing every checkpoint
//! ```

use axiom_core::Kernel;
use axiom_core::config::SimulationConfig;
use axiom_store::{PostgresPool, TickBatch, persist_tick};
use axiom_types::{HashCheckpoint, SimTime};
use tracing::{info, warn};

use crate::error::EngineError;

/// Rebuild the kernel the database describes.
///
/// An empty database yields a genesis kernel whose checkpoint 0 and
/// genesis draws are written immediately. Stored events past the tip,
/// accepted before a stop, are ingested again.
///
/// # Errors
///
/// Returns [`EngineError::Store`] when the database cannot be read and
/// [`EngineError::Divergence`] when replay does not reproduce a stored
/// checkpoint.
pub async fn recover(pool: &PostgresPool, config: &SimulationConfig) -> Result<Kernel, EngineError> {
    let Some(tip) = pool.checkpoints().latest().await? else {
        let mut kernel = Kernel::genesis(config)?;
        if let Some(genesis) = kernel.chain().latest().copied() {
            let batch = TickBatch {
                checkpoint: genesis,
                events: Vec::new(),
                draws: kernel.take_draws(),
                observations: Vec::new(),
                snapshot: None,
            };
            persist_tick(pool, &batch).await?;
        }
        info!("empty database, starting from genesis");
        return Ok(kernel);
    };

    let mut kernel = restore_newest(pool, config).await?;
    let start = kernel.current_tick();
    info!(
        from = start.get(),
        to = tip.tick.get(),
        "replaying stored events"
    );

    let Some(first) = start.next() else {
        return Ok(kernel);
    };
    for event in pool.events().load_range(first, SimTime::new(u64::MAX)).await? {
        kernel.ingest(event)?;
    }

    let stored = pool.checkpoints().load_range(first, tip.tick).await?;
    let mut expected = stored.iter();
    while kernel.current_tick() < tip.tick {
        let outcome = kernel.run_tick()?;
        match expected.next() {
            Some(recorded) if *recorded == outcome.checkpoint => {}
            _ => return Err(EngineError::Divergence { tick: outcome.tick }),
        }
    }

    info!(
        tick = kernel.current_tick().get(),
        chain_digest = %kernel.status().latest_chain_digest,
        "recovery complete"
    );
    Ok(kernel)
}

/// The kernel from the newest snapshot that restores cleanly and agrees
/// with the stored chain, or genesis when none does.
async fn restore_newest(pool: &PostgresPool, config: &SimulationConfig) -> Result<Kernel, EngineError> {
    for tick in pool.snapshots().ticks_newest_first().await? {
        let Some(blob) = pool.snapshots().load(tick).await? else {
            continue;
        };
        let kernel = match Kernel::restore(&blob, config) {
            Ok(kernel) => kernel,
            Err(e) => {
                warn!(tick = tick.get(), error = %e, "snapshot unusable, trying an older one");
                continue;
            }
        };
        let stored = pool.checkpoints().load_range(tick, tick).await?;
        if !matches_tip(&kernel, stored.first()) {
            warn!(
                tick = tick.get(),
                "snapshot disagrees with the stored chain, trying an older one"
            );
            continue;
        }
        return Ok(kernel);
    }

    warn!("no usable snapshot, replaying from genesis");
    let kernel = Kernel::genesis(config)?;
    let stored = pool
        .checkpoints()
        .load_range(SimTime::GENESIS, SimTime::GENESIS)
        .await?;
    if !matches_tip(&kernel, stored.first()) {
        return Err(EngineError::Divergence {
            tick: SimTime::GENESIS,
        });
    }
    Ok(kernel)
}

fn matches_tip(kernel: &Kernel, stored: Option<&HashCheckpoint>) -> bool {
    kernel.chain().latest() == stored
}
