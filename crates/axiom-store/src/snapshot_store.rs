//! Snapshot blob persistence.
//!
//! Blobs are stored exactly as the kernel encoded them. Snapshots are
//! superseded by later ones but never deleted.

use axiom_types::SimTime;
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::{key_to_db, tick_from_db, tick_to_db};

/// Operations on the `snapshots` table.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotStore<'a> {
    pool: &'a PgPool,
}

impl<'a> SnapshotStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Store the blob for `tick`. An existing row is kept.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, tick: SimTime, blob: &[u8]) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        insert_snapshot(&mut conn, tick, blob).await
    }

    /// Blob for exactly `tick`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn load(&self, tick: SimTime) -> Result<Option<Vec<u8>>, DbError> {
        let blob: Option<Vec<u8>> = sqlx::query_scalar(r"SELECT blob FROM snapshots WHERE tick = $1")
            .bind(tick_to_db(tick))
            .fetch_optional(self.pool)
            .await?;
        Ok(blob)
    }

    /// Stored snapshot ticks, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails or
    /// [`DbError::Corrupt`] for a negative tick.
    pub async fn ticks_newest_first(&self) -> Result<Vec<SimTime>, DbError> {
        let ticks: Vec<i64> = sqlx::query_scalar(r"SELECT tick FROM snapshots ORDER BY tick DESC")
            .fetch_all(self.pool)
            .await?;
        ticks.into_iter().map(tick_from_db).collect()
    }
}

/// Insert the blob for `tick` on an open connection or transaction.
pub(crate) async fn insert_snapshot(
    conn: &mut PgConnection,
    tick: SimTime,
    blob: &[u8],
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO snapshots (tick, blob)
          VALUES ($1, $2)
          ON CONFLICT (tick) DO NOTHING",
    )
    .bind(key_to_db("tick", tick.get())?)
    .bind(blob)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(tick = tick.get(), bytes = blob.len(), "Inserted snapshot");
    Ok(())
}
