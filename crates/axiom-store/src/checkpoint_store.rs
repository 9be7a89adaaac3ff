//! Hash chain persistence.

use axiom_types::{HashCheckpoint, SimTime};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::{digest_from_db, key_to_db, tick_from_db, tick_to_db};

/// Operations on the `checkpoints` table.
#[derive(Debug, Clone, Copy)]
pub struct CheckpointStore<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckpointStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert one checkpoint. A tick already stored is never overwritten.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, checkpoint: &HashCheckpoint) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        insert_checkpoint(&mut conn, checkpoint).await
    }

    /// Checkpoints with `from <= tick <= to`, in tick order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails or
    /// [`DbError::Corrupt`] for an undecodable row.
    pub async fn load_range(&self, from: SimTime, to: SimTime) -> Result<Vec<HashCheckpoint>, DbError> {
        let rows = sqlx::query_as::<_, CheckpointRow>(
            r"SELECT tick, state_digest, chain_digest
              FROM checkpoints
              WHERE tick >= $1 AND tick <= $2
              ORDER BY tick",
        )
        .bind(tick_to_db(from))
        .bind(tick_to_db(to))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CheckpointRow::into_checkpoint).collect()
    }

    /// The highest-tick checkpoint, if any.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails or
    /// [`DbError::Corrupt`] for an undecodable row.
    pub async fn latest(&self) -> Result<Option<HashCheckpoint>, DbError> {
        let row = sqlx::query_as::<_, CheckpointRow>(
            r"SELECT tick, state_digest, chain_digest
              FROM checkpoints
              ORDER BY tick DESC
              LIMIT 1",
        )
        .fetch_optional(self.pool)
        .await?;

        row.map(CheckpointRow::into_checkpoint).transpose()
    }
}

/// Insert `checkpoint` on an open connection or transaction.
pub(crate) async fn insert_checkpoint(
    conn: &mut PgConnection,
    checkpoint: &HashCheckpoint,
) -> Result<(), DbError> {
    sqlx::query(
        r"INSERT INTO checkpoints (tick, state_digest, chain_digest)
          VALUES ($1, $2, $3)
          ON CONFLICT (tick) DO NOTHING",
    )
    .bind(key_to_db("tick", checkpoint.tick.get())?)
    .bind(checkpoint.state_digest.as_bytes().as_slice())
    .bind(checkpoint.chain_digest.as_bytes().as_slice())
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// A row from the `checkpoints` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CheckpointRow {
    /// Sealed tick.
    pub tick: i64,
    /// Raw state digest.
    pub state_digest: Vec<u8>,
    /// Raw chain digest.
    pub chain_digest: Vec<u8>,
}

impl CheckpointRow {
    /// Decode the row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Corrupt`] for a negative tick or a digest that is
    /// not 32 bytes.
    pub fn into_checkpoint(self) -> Result<HashCheckpoint, DbError> {
        Ok(HashCheckpoint {
            tick: tick_from_db(self.tick)?,
            state_digest: digest_from_db(&self.state_digest)?,
            chain_digest: digest_from_db(&self.chain_digest)?,
        })
    }
}
