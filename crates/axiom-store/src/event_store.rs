//! Input event persistence.
//!
//! Rows are keyed by `(tick, sequence, source_id)`, the kernel's total
//! order. `source_id` uses the `C` collation so the database sorts it
//! bytewise, the same way the kernel does. Payloads are stored as the
//! exact JSON text, so a reloaded event is the event that was accepted.

use axiom_types::{InputEvent, SimTime, SourceId};
use sqlx::{PgConnection, PgPool};

use crate::error::DbError;
use crate::{key_from_db, key_to_db, tick_from_db, tick_to_db};

/// Default batch size for event inserts.
const DEFAULT_BATCH_SIZE: usize = 256;

/// Operations on the `input_events` table.
#[derive(Debug, Clone, Copy)]
pub struct EventStore<'a> {
    pool: &'a PgPool,
    batch_size: usize,
}

impl<'a> EventStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Set the batch size for inserts.
    #[must_use]
    pub const fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Insert events in `UNNEST` batches, one transaction per batch.
    /// Rows already present are left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if an insert fails, or
    /// [`DbError::OutOfRange`] for a key that does not fit `BIGINT`.
    pub async fn batch_insert(&self, events: &[InputEvent]) -> Result<(), DbError> {
        if events.is_empty() {
            return Ok(());
        }

        for chunk in events.chunks(self.batch_size.max(1)) {
            let mut tx = self.pool.begin().await?;
            insert_events(&mut tx, chunk).await?;
            tx.commit().await?;
        }

        tracing::debug!(count = events.len(), "Inserted input events");
        Ok(())
    }

    /// Insert one accepted event ahead of its tick.
    ///
    /// # Errors
    ///
    /// See [`EventStore::batch_insert`].
    pub async fn insert(&self, event: &InputEvent) -> Result<(), DbError> {
        self.batch_insert(std::slice::from_ref(event)).await
    }

    /// Events with `from <= tick <= to`, in total order.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails or
    /// [`DbError::Corrupt`] for an undecodable row.
    pub async fn load_range(&self, from: SimTime, to: SimTime) -> Result<Vec<InputEvent>, DbError> {
        let rows = sqlx::query_as::<_, EventRow>(
            r"SELECT tick, sequence, source_id, kind, payload, signature
              FROM input_events
              WHERE tick >= $1 AND tick <= $2
              ORDER BY tick, sequence, source_id",
        )
        .bind(tick_to_db(from))
        .bind(tick_to_db(to))
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(EventRow::into_event).collect()
    }
}

/// Insert `events` on an open connection or transaction.
pub(crate) async fn insert_events(
    conn: &mut PgConnection,
    events: &[InputEvent],
) -> Result<(), DbError> {
    if events.is_empty() {
        return Ok(());
    }

    let len = events.len();
    let mut ticks = Vec::with_capacity(len);
    let mut sequences = Vec::with_capacity(len);
    let mut sources = Vec::with_capacity(len);
    let mut kinds = Vec::with_capacity(len);
    let mut payloads = Vec::with_capacity(len);
    let mut signatures: Vec<Option<String>> = Vec::with_capacity(len);

    for event in events {
        ticks.push(key_to_db("tick", event.tick.get())?);
        sequences.push(key_to_db("sequence", event.sequence)?);
        sources.push(event.source_id.as_str().to_owned());
        kinds.push(event.kind.clone());
        payloads.push(payload_text(event)?);
        signatures.push(event.signature.clone());
    }

    sqlx::query(
        r"INSERT INTO input_events (tick, sequence, source_id, kind, payload, signature)
          SELECT * FROM UNNEST($1::BIGINT[], $2::BIGINT[], $3::TEXT[], $4::TEXT[], $5::TEXT[], $6::TEXT[])
          ON CONFLICT (tick, sequence, source_id) DO NOTHING",
    )
    .bind(&ticks)
    .bind(&sequences)
    .bind(&sources)
    .bind(&kinds)
    .bind(&payloads)
    .bind(&signatures)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

/// The stored form of an event's payload.
pub(crate) fn payload_text(event: &InputEvent) -> Result<String, DbError> {
    Ok(serde_json::to_string(&event.payload)?)
}

/// A row from the `input_events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Event tick.
    pub tick: i64,
    /// Per-source sequence number.
    pub sequence: i64,
    /// Submitting source.
    pub source_id: String,
    /// Action kind tag.
    pub kind: String,
    /// Payload JSON text, exactly as accepted.
    pub payload: String,
    /// Optional gateway signature.
    pub signature: Option<String>,
}

impl EventRow {
    /// Decode the row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Corrupt`] for a negative tick or sequence, or a
    /// payload that is not JSON.
    pub fn into_event(self) -> Result<InputEvent, DbError> {
        let payload = serde_json::from_str(&self.payload)
            .map_err(|e| DbError::Corrupt(format!("payload: {e}")))?;
        Ok(InputEvent {
            tick: tick_from_db(self.tick)?,
            sequence: key_from_db("sequence", self.sequence)?,
            source_id: SourceId::new(self.source_id),
            kind: self.kind,
            payload,
            signature: self.signature,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn row(sequence: i64, payload: &str) -> EventRow {
        EventRow {
            tick: 10,
            sequence,
            source_id: String::from("gw"),
            kind: String::from("chat"),
            payload: payload.to_owned(),
            signature: None,
        }
    }

    #[test]
    fn row_decodes_to_event() {
        let event = row(3, r#"{"agent":1,"text":"hi"}"#).into_event().unwrap();
        assert_eq!(event.key().tick_sequence(), (SimTime::new(10), 3));
        assert_eq!(event.source_id.as_str(), "gw");
        assert_eq!(event.payload, json!({"agent": 1, "text": "hi"}));
    }

    #[test]
    fn negative_sequence_is_corrupt() {
        assert!(matches!(row(-1, "{}").into_event(), Err(DbError::Corrupt(_))));
    }

    #[test]
    fn unparsable_payload_is_corrupt() {
        assert!(matches!(row(0, "{not json").into_event(), Err(DbError::Corrupt(_))));
    }

    #[test]
    fn stored_payload_reloads_unchanged() {
        let payload: serde_json::Value =
            serde_json::from_str(r#"{"agent":1e2,"amount":0.1,"text":"nul\u0000here"}"#).unwrap();
        let event = InputEvent::new(SimTime::new(10), 3, "gw", "gather", payload);
        let text = payload_text(&event).unwrap();
        assert!(!text.contains('\0'));

        let reloaded = row(3, &text).into_event().unwrap();
        assert_eq!(reloaded, event);
        let agent = reloaded.payload.get("agent").unwrap();
        assert!(agent.is_f64());
        assert_eq!(agent.as_u64(), None);
    }

    #[test]
    fn oversized_keys_are_refused_not_clamped() {
        assert!(matches!(key_to_db("sequence", u64::MAX), Err(DbError::OutOfRange(_))));
        assert_eq!(key_to_db("sequence", 7).unwrap(), 7);
    }
}
