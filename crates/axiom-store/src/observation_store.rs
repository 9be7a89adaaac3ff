//! Observation persistence for audit consumers.

use axiom_types::{ObservationEvent, SimTime};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::tick_to_db;

/// Operations on the `observations` table.
#[derive(Debug, Clone, Copy)]
pub struct ObservationStore<'a> {
    pool: &'a PgPool,
}

impl<'a> ObservationStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert observations in emission order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn batch_insert(&self, observations: &[ObservationEvent]) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        insert_observations(&mut conn, observations).await
    }

    /// Number of observations stored for `tick`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn count_at(&self, tick: SimTime) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(r"SELECT COUNT(*) FROM observations WHERE tick = $1")
            .bind(tick_to_db(tick))
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Insert `observations` on an open connection or transaction.
pub(crate) async fn insert_observations(
    conn: &mut PgConnection,
    observations: &[ObservationEvent],
) -> Result<(), DbError> {
    if observations.is_empty() {
        return Ok(());
    }

    let len = observations.len();
    let mut ticks = Vec::with_capacity(len);
    let mut types = Vec::with_capacity(len);
    let mut payloads = Vec::with_capacity(len);
    let mut hashes = Vec::with_capacity(len);
    for observation in observations {
        ticks.push(tick_to_db(observation.tick));
        types.push(observation.event_type.as_str().to_owned());
        payloads.push(serde_json::to_string(&observation.payload)?);
        hashes.push(observation.content_hash.as_bytes().to_vec());
    }

    sqlx::query(
        r"INSERT INTO observations (tick, event_type, payload, content_hash)
          SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::TEXT[], $4::BYTEA[])",
    )
    .bind(&ticks)
    .bind(&types)
    .bind(&payloads)
    .bind(&hashes)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(count = len, "Inserted observations");
    Ok(())
}
