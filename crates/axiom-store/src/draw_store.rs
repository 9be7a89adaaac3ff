//! Chaos draw trail persistence.
//!
//! Every draw the kernel makes lands here once, keyed by stream and draw
//! counter, so the full trail can be re-verified offline with
//! [`DrawAudit::verify_from_genesis`](axiom_chaos::DrawAudit::verify_from_genesis)
//! long after the in-memory window has rolled over. Rewriting a draw that
//! is already stored is a no-op.

use axiom_chaos::{DrawRecord, StreamKey, SubsystemId};
use axiom_types::{EntityId, SimTime};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::{key_from_db, key_to_db, tick_from_db, tick_to_db};

/// Operations on the `rng_draws` table.
#[derive(Debug, Clone, Copy)]
pub struct DrawStore<'a> {
    pool: &'a PgPool,
}

impl<'a> DrawStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert draw records. Draws already stored are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the insert fails.
    pub async fn batch_insert(&self, draws: &[DrawRecord]) -> Result<(), DbError> {
        let mut conn = self.pool.acquire().await?;
        insert_draws(&mut conn, draws).await
    }

    /// Draws with `from <= tick <= to`, ordered by tick, then stream, then
    /// counter.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails or
    /// [`DbError::Corrupt`] for an undecodable row.
    pub async fn load_range(&self, from: SimTime, to: SimTime) -> Result<Vec<DrawRecord>, DbError> {
        let rows = sqlx::query_as::<_, DrawRow>(
            r"SELECT tick, subsystem, entity_id, draw_counter, value, callsite
              FROM rng_draws
              WHERE tick >= $1 AND tick <= $2
              ORDER BY tick, subsystem, entity_id NULLS FIRST, draw_counter",
        )
        .bind(tick_to_db(from))
        .bind(tick_to_db(to))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(DrawRow::into_record).collect()
    }
}

/// Insert `draws` on an open connection or transaction.
pub(crate) async fn insert_draws(conn: &mut PgConnection, draws: &[DrawRecord]) -> Result<(), DbError> {
    if draws.is_empty() {
        return Ok(());
    }

    let len = draws.len();
    let mut ticks = Vec::with_capacity(len);
    let mut subsystems = Vec::with_capacity(len);
    let mut entities: Vec<Option<i64>> = Vec::with_capacity(len);
    let mut counters = Vec::with_capacity(len);
    let mut values = Vec::with_capacity(len);
    let mut callsites = Vec::with_capacity(len);
    for draw in draws {
        ticks.push(key_to_db("tick", draw.tick.get())?);
        subsystems.push(draw.stream.subsystem.as_str().to_owned());
        entities.push(
            draw.stream
                .entity
                .map(|entity| key_to_db("entity", entity.into_inner()))
                .transpose()?,
        );
        counters.push(key_to_db("draw counter", draw.draw_counter)?);
        values.push(value_to_db(draw.value));
        callsites.push(draw.callsite.clone());
    }

    sqlx::query(
        r"INSERT INTO rng_draws (tick, subsystem, entity_id, draw_counter, value, callsite)
          SELECT * FROM UNNEST($1::BIGINT[], $2::TEXT[], $3::BIGINT[], $4::BIGINT[], $5::BIGINT[], $6::TEXT[])
          ON CONFLICT DO NOTHING",
    )
    .bind(&ticks)
    .bind(&subsystems)
    .bind(&entities)
    .bind(&counters)
    .bind(&values)
    .bind(&callsites)
    .execute(&mut *conn)
    .await?;

    tracing::debug!(count = len, "Inserted draw records");
    Ok(())
}

/// Raw draw output, reinterpreted bit for bit as a signed column value.
const fn value_to_db(value: u64) -> i64 {
    i64::from_le_bytes(value.to_le_bytes())
}

const fn value_from_db(value: i64) -> u64 {
    u64::from_le_bytes(value.to_le_bytes())
}

/// A row from the `rng_draws` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DrawRow {
    /// Tick of the draw.
    pub tick: i64,
    /// Subsystem name.
    pub subsystem: String,
    /// Entity of a sub-stream, absent for a subsystem root.
    pub entity_id: Option<i64>,
    /// Stream draw count after the draw.
    pub draw_counter: i64,
    /// Raw output, bit-cast to signed.
    pub value: i64,
    /// Requesting `file:line`.
    pub callsite: String,
}

impl DrawRow {
    /// Decode the row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Corrupt`] for an unknown subsystem or a negative
    /// tick, entity, or counter.
    pub fn into_record(self) -> Result<DrawRecord, DbError> {
        let subsystem = SubsystemId::from_name(&self.subsystem)
            .ok_or_else(|| DbError::Corrupt(format!("unknown subsystem {}", self.subsystem)))?;
        let entity = self
            .entity_id
            .map(|raw| key_from_db("entity", raw).map(EntityId::new))
            .transpose()?;
        Ok(DrawRecord {
            tick: tick_from_db(self.tick)?,
            stream: StreamKey { subsystem, entity },
            callsite: self.callsite,
            draw_counter: key_from_db("draw counter", self.draw_counter)?,
            value: value_from_db(self.value),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axiom_chaos::DrawAudit;

    use super::*;

    fn row(entity_id: Option<i64>, draw_counter: i64, value: i64) -> DrawRow {
        DrawRow {
            tick: 4,
            subsystem: String::from("biology"),
            entity_id,
            draw_counter,
            value,
            callsite: String::from("subsystems.rs:140"),
        }
    }

    #[test]
    fn high_bit_values_survive_the_signed_column() {
        for value in [0, 1, u64::MAX, 0x8000_0000_0000_0000] {
            assert_eq!(value_from_db(value_to_db(value)), value);
        }
        let record = row(None, 1, value_to_db(u64::MAX)).into_record().unwrap();
        assert_eq!(record.value, u64::MAX);
    }

    #[test]
    fn rows_decode_into_a_verifiable_trail() {
        let trail: Vec<DrawRecord> = [row(Some(7), 1, 10), row(Some(7), 2, -3), row(None, 1, 0)]
            .into_iter()
            .map(|r| r.into_record().unwrap())
            .collect();
        assert_eq!(
            trail.first().map(|r| r.stream),
            Some(StreamKey::entity(SubsystemId::Biology, EntityId::new(7)))
        );
        assert!(DrawAudit::verify_from_genesis(&trail).is_ok());
    }

    #[test]
    fn unknown_subsystem_is_corrupt() {
        let mut bad = row(None, 1, 0);
        bad.subsystem = String::from("astrology");
        assert!(matches!(bad.into_record(), Err(DbError::Corrupt(_))));
    }

    #[test]
    fn negative_counter_is_corrupt() {
        assert!(matches!(row(None, -1, 0).into_record(), Err(DbError::Corrupt(_))));
    }
}
