//! `PostgreSQL` persistence for the Axiom simulation kernel.
//!
//! Every table is append-only. The kernel never reads from the database
//! while running; the store exists for audit, for offline replay, and for
//! boot-time recovery.
//!
//! ```text
//! Sealed tick
//!     |
//!     +-- persist_tick() --> PostgreSQL
//!         |-- EventStore        (input_events, keyed by tick/sequence/source)
//!         |-- CheckpointStore   (checkpoints, keyed by tick)
//!         |-- ObservationStore  (observations)
//!         |-- DrawStore         (rng_draws, keyed by stream/counter)
//!         +-- SnapshotStore     (snapshots, keyed by tick)
//! ```
//!
//! Accepted input events are also written on their own as soon as the
//! kernel takes them, so an event for a future tick survives a stop.
//!
//! # Modules
//!
//! - [`postgres`] -- `PostgreSQL` connection pool and configuration
//! - [`event_store`] -- Input event insertion and ordered reads
//! - [`checkpoint_store`] -- Hash chain persistence
//! - [`snapshot_store`] -- Snapshot blob persistence
//! - [`observation_store`] -- Observation persistence
//! - [`draw_store`] -- Chaos draw trail persistence
//! - [`tick_persist`] -- One call per sealed tick
//! - [`error`] -- Shared error types

pub mod checkpoint_store;
pub mod draw_store;
pub mod error;
pub mod event_store;
pub mod observation_store;
pub mod postgres;
pub mod snapshot_store;
pub mod tick_persist;

pub use checkpoint_store::CheckpointStore;
pub use draw_store::DrawStore;
pub use error::DbError;
pub use event_store::EventStore;
pub use observation_store::ObservationStore;
pub use postgres::{PostgresConfig, PostgresPool};
pub use snapshot_store::SnapshotStore;
pub use tick_persist::{PersistError, TickBatch, persist_tick};

/// Convert a tick to a `BIGINT` query bound, saturating.
pub(crate) fn tick_to_db(tick: axiom_types::SimTime) -> i64 {
    i64::try_from(tick.get()).unwrap_or(i64::MAX)
}

/// Convert a stored key to a `BIGINT` column value without clamping.
pub(crate) fn key_to_db(field: &str, value: u64) -> Result<i64, DbError> {
    i64::try_from(value).map_err(|_e| DbError::OutOfRange(format!("{field} {value}")))
}

/// Convert a `BIGINT` column value back to an unsigned key.
pub(crate) fn key_from_db(field: &str, value: i64) -> Result<u64, DbError> {
    u64::try_from(value).map_err(|_e| DbError::Corrupt(format!("negative {field} {value}")))
}

/// Convert a `BIGINT` column value back to a tick.
pub(crate) fn tick_from_db(tick: i64) -> Result<axiom_types::SimTime, DbError> {
    key_from_db("tick", tick).map(axiom_types::SimTime::new)
}

/// Convert a `BYTEA` column value back to a digest.
pub(crate) fn digest_from_db(bytes: &[u8]) -> Result<axiom_types::Digest, DbError> {
    <[u8; 32]>::try_from(bytes)
        .map(axiom_types::Digest::from_bytes)
        .map_err(|_e| DbError::Corrupt(format!("digest of {} bytes", bytes.len())))
}
