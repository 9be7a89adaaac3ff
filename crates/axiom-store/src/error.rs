//! Store error type.

/// Errors from the `PostgreSQL` stores.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// A query or connection failed.
    #[error("PostgreSQL error: {0}")]
    Postgres(#[from] sqlx::Error),

    /// Applying the kernel migrations failed.
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row does not decode into a kernel value.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// A payload could not be serialized.
    #[error("payload serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    /// A value does not fit its column.
    #[error("value out of range: {0}")]
    OutOfRange(String),

    /// The connection settings are unusable.
    #[error("bad store configuration: {0}")]
    Config(String),
}
