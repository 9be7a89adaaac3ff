//! Append-only audit trail of every draw.
//!
//! Each draw records the tick, stream, callsite, counter, and value.
//! Every record is queued for export until [`DrawAudit::take_pending`]
//! hands it to the owner, which persists it; the exported trail is the
//! permanent record and [`DrawAudit::verify_from_genesis`] checks it
//! offline. A bounded window of recent records stays in memory as a cache.
//! Per-stream counters are tracked for the whole run regardless of the
//! window, so a regression is caught even after old records have rolled
//! off.

use std::collections::{BTreeMap, VecDeque};
use std::panic::Location;

use axiom_types::SimTime;
use serde::{Deserialize, Serialize};

use crate::error::RngMisuseError;
use crate::subsystem::StreamKey;

/// Default number of records kept in memory.
pub const DEFAULT_AUDIT_CAPACITY: usize = 65_536;

/// One draw from one stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    /// Tick during which the draw happened.
    pub tick: SimTime,
    /// Stream drawn from.
    pub stream: StreamKey,
    /// `file:line` of the code that requested the draw.
    pub callsite: String,
    /// The stream's draw count after this draw (first draw is 1).
    pub draw_counter: u64,
    /// Raw 64-bit output.
    pub value: u64,
}

/// In-memory draw audit.
#[derive(Debug, Clone)]
pub struct DrawAudit {
    enabled: bool,
    capacity: usize,
    records: VecDeque<DrawRecord>,
    pending: Vec<DrawRecord>,
    counters: BTreeMap<StreamKey, u64>,
}

impl Default for DrawAudit {
    fn default() -> Self {
        Self::new(true, DEFAULT_AUDIT_CAPACITY)
    }
}

impl DrawAudit {
    /// Create an audit. `capacity` bounds the in-memory window only; every
    /// record is still queued for export. When `enabled` is false counters
    /// are still checked but no records are kept or exported.
    pub const fn new(enabled: bool, capacity: usize) -> Self {
        Self {
            enabled,
            capacity,
            records: VecDeque::new(),
            pending: Vec::new(),
            counters: BTreeMap::new(),
        }
    }

    /// Record a draw. Fails if `draw_counter` is not exactly one past the
    /// stream's previous counter.
    pub(crate) fn record(
        &mut self,
        tick: SimTime,
        stream: StreamKey,
        callsite: &'static Location<'static>,
        draw_counter: u64,
        value: u64,
    ) -> Result<(), RngMisuseError> {
        let previous = self.counters.get(&stream).copied().unwrap_or(0);
        if previous.checked_add(1) != Some(draw_counter) {
            return Err(RngMisuseError::CounterRegression {
                stream,
                previous,
                observed: draw_counter,
                tick,
            });
        }
        self.counters.insert(stream, draw_counter);

        if !self.enabled {
            return Ok(());
        }
        let record = DrawRecord {
            tick,
            stream,
            callsite: format!("{}:{}", callsite.file(), callsite.line()),
            draw_counter,
            value,
        };
        if self.capacity > 0 {
            if self.records.len() >= self.capacity {
                self.records.pop_front();
            }
            self.records.push_back(record.clone());
        }
        self.pending.push(record);
        Ok(())
    }

    /// Seed the per-stream counters after a restore so the next draw on
    /// each stream is expected at `count + 1`. Draws before the restore
    /// live in the exported trail, not here.
    pub(crate) fn seed_counters(&mut self, counters: impl IntoIterator<Item = (StreamKey, u64)>) {
        for (stream, count) in counters {
            let entry = self.counters.entry(stream).or_insert(0);
            *entry = (*entry).max(count);
        }
    }

    /// Hand over every record made since the previous call, oldest first.
    pub fn take_pending(&mut self) -> Vec<DrawRecord> {
        std::mem::take(&mut self.pending)
    }

    /// Records waiting for [`DrawAudit::take_pending`].
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> impl Iterator<Item = &DrawRecord> {
        self.records.iter()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are retained.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Whether records are being retained.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Check the retained window for counter regressions.
    pub fn verify(&self) -> Result<(), RngMisuseError> {
        Self::verify_records(self.records.iter())
    }

    /// Check an exported trail: within each stream, consecutive records must
    /// have counters that increase by exactly one.
    pub fn verify_records<'a>(
        records: impl IntoIterator<Item = &'a DrawRecord>,
    ) -> Result<(), RngMisuseError> {
        Self::walk(records, false)
    }

    /// Check a complete exported trail: as [`DrawAudit::verify_records`],
    /// and additionally every stream's first record must be its first draw.
    pub fn verify_from_genesis<'a>(
        records: impl IntoIterator<Item = &'a DrawRecord>,
    ) -> Result<(), RngMisuseError> {
        Self::walk(records, true)
    }

    fn walk<'a>(
        records: impl IntoIterator<Item = &'a DrawRecord>,
        from_genesis: bool,
    ) -> Result<(), RngMisuseError> {
        let mut last: BTreeMap<StreamKey, u64> = BTreeMap::new();
        for record in records {
            let previous = match last.get(&record.stream) {
                Some(&previous) => Some(previous),
                None if from_genesis => Some(0),
                None => None,
            };
            if let Some(previous) = previous
                && previous.checked_add(1) != Some(record.draw_counter)
            {
                return Err(RngMisuseError::CounterRegression {
                    stream: record.stream,
                    previous,
                    observed: record.draw_counter,
                    tick: record.tick,
                });
            }
            last.insert(record.stream, record.draw_counter);
        }
        Ok(())
    }
}
