//! Engine binary for the Axiom simulation kernel.
//!
//! Wires the kernel runner, the observer API, and optional `PostgreSQL`
//! persistence together, then runs until a bound is reached, the
//! operator stops the run, or the kernel halts.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `axiom-config.yaml` (or `AXIOM_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Connect to `PostgreSQL` and recover, or start from genesis
//! 4. Spawn the persistence task
//! 5. Start the observer API server
//! 6. Run the kernel
//! 7. Write a final snapshot, drain persistence, log the result

mod callback;
mod error;
mod recovery;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axiom_core::config::{LogFormat, LoggingConfig, SimulationConfig};
use axiom_core::operator::OperatorState;
use axiom_core::runner::{self, Submission};
use axiom_core::Kernel;
use axiom_observer::server::ServerConfig;
use axiom_observer::startup::spawn_observer;
use axiom_observer::AppState;
use axiom_store::{PostgresConfig, PostgresPool, persist_tick};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::callback::{EngineCallback, PersistJob};
use crate::error::EngineError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "axiom-config.yaml";

/// Capacity of the gateway submission channel.
const SUBMISSION_CAPACITY: usize = 1024;

/// Application entry point for the engine.
///
/// # Errors
///
/// Returns an error if any initialization step or the run itself fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, config_path) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("axiom-engine starting");
    match &config_path {
        Some(path) => info!(path = %path.display(), "configuration loaded"),
        None => info!("config file not found, using defaults"),
    }
    info!(
        world_name = config.world.name,
        seed = config.world.seed,
        tick_interval_ms = config.world.tick_interval_ms,
        snapshot_interval = config.snapshots.interval_ticks,
        persistence = config.infrastructure.persistence_enabled,
        "configuration"
    );

    // 3. Database and kernel.
    let pool = if config.infrastructure.persistence_enabled {
        let pool =
            PostgresPool::connect(&PostgresConfig::new(&config.infrastructure.postgres_url)).await?;
        pool.run_migrations().await?;
        Some(pool)
    } else {
        None
    };
    let mut kernel = match &pool {
        Some(pool) => recovery::recover(pool, &config).await?,
        None => Kernel::genesis(&config)?,
    };

    // 4. Persistence task.
    let (persist_tx, persist_handle) = pool.as_ref().map_or((None, None), |pool| {
        let (tx, handle) = spawn_persistence(pool.clone());
        (Some(tx), Some(handle))
    });

    // 5. Observer API.
    let operator = Arc::new(OperatorState::new(&config.simulation));
    let (submissions_tx, mut submissions_rx) = mpsc::channel::<Submission>(SUBMISSION_CAPACITY);
    let (app_state, feed) = AppState::new(&kernel, submissions_tx, Arc::clone(&operator));
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let observer_handle = spawn_observer(
        ServerConfig {
            host: config.infrastructure.observer_host.clone(),
            port: config.infrastructure.observer_port,
        },
        app_state,
        async move {
            let _ = shutdown_rx.await;
        },
    )?;

    let ctrl_c_operator = Arc::clone(&operator);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, stopping at the next tick boundary");
            ctrl_c_operator.request_stop();
        }
    });

    // 6. Run.
    let mut callback = EngineCallback::new(feed, persist_tx);
    let dt = Duration::from_millis(config.world.tick_interval_ms);
    let outcome = runner::run_kernel(
        &mut kernel,
        dt,
        &mut submissions_rx,
        &operator,
        &mut callback,
    )
    .await;

    // 7. Wind down.
    drop(callback);
    if let Some(handle) = persist_handle {
        if let Err(e) = handle.await {
            error!(error = %e, "persistence task failed");
        }
    }
    if let (Some(pool), false) = (&pool, kernel.is_halted()) {
        write_final_snapshot(pool, &mut kernel).await;
    }
    let _ = shutdown_tx.send(());
    if let Err(e) = observer_handle.await {
        error!(error = %e, "observer task failed");
    }
    if let Some(pool) = &pool {
        pool.close().await;
    }

    let result = outcome?;
    runner::log_simulation_end(&result);
    info!(
        end_reason = ?result.end_reason,
        total_ticks = result.total_ticks,
        "axiom-engine shutdown complete"
    );
    Ok(())
}

/// Load configuration from `AXIOM_CONFIG` or `axiom-config.yaml`.
///
/// A missing file means defaults. Returns the path actually read.
fn load_config() -> Result<(SimulationConfig, Option<PathBuf>), EngineError> {
    let path = std::env::var_os("AXIOM_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if Path::new(&path).exists() {
        let config = SimulationConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        Ok((SimulationConfig::parse("")?, None))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    match logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init(),
    }
}

/// Write accepted events and sealed ticks in order until the sender is
/// dropped.
fn spawn_persistence(pool: PostgresPool) -> (mpsc::UnboundedSender<PersistJob>, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<PersistJob>();
    let handle = tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            match job {
                PersistJob::Accepted(event) => {
                    if let Err(e) = pool.events().insert(&event).await {
                        error!(
                            tick = event.tick.get(),
                            source_id = %event.source_id,
                            error = %e,
                            "failed to persist accepted event"
                        );
                    }
                }
                PersistJob::Tick(batch) => {
                    if let Err(e) = persist_tick(&pool, &batch).await {
                        error!(error = %e, "failed to persist tick");
                    }
                }
            }
        }
        info!("persistence task drained");
    });
    (tx, handle)
}

/// Snapshot the final state so the next boot restores without replay.
async fn write_final_snapshot(pool: &PostgresPool, kernel: &mut Kernel) {
    let tick = kernel.current_tick();
    match kernel.snapshot() {
        Ok(blob) => {
            if let Err(e) = pool.snapshots().insert(tick, &blob).await {
                warn!(tick = tick.get(), error = %e, "failed to store final snapshot");
            } else {
                info!(tick = tick.get(), "final snapshot stored");
            }
        }
        Err(e) => warn!(tick = tick.get(), error = %e, "failed to take final snapshot"),
    }
}
