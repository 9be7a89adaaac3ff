//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during startup, recovery, and the run itself.

use axiom_types::SimTime;

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: axiom_core::config::ConfigError,
    },

    /// Kernel construction or restore failed.
    #[error("kernel error: {source}")]
    Kernel {
        /// The underlying kernel error.
        #[from]
        source: axiom_core::KernelError,
    },

    /// A stored event could not be re-ingested during recovery.
    #[error("ingest error during recovery: {source}")]
    Ingest {
        /// The underlying ingestion error.
        #[from]
        source: axiom_core::IngestError,
    },

    /// The runner stopped abnormally.
    #[error("runner error: {source}")]
    Runner {
        /// The underlying runner error.
        #[from]
        source: axiom_core::runner::RunnerError,
    },

    /// The database could not be reached or read.
    #[error("store error: {source}")]
    Store {
        /// The underlying database error.
        #[from]
        source: axiom_store::DbError,
    },

    /// The genesis checkpoint could not be written.
    #[error("persist error: {source}")]
    Persist {
        /// The underlying persistence error.
        #[from]
        source: axiom_store::PersistError,
    },

    /// Observer API server failed to start.
    #[error("observer error: {source}")]
    Observer {
        /// The underlying server error.
        #[from]
        source: axiom_observer::ServerError,
    },

    /// Replayed state does not match the stored checkpoint.
    #[error("recovery diverged from the stored chain at tick {tick}")]
    Divergence {
        /// First tick whose checkpoint differs.
        tick: SimTime,
    },
}
