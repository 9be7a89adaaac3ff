//! The append-only input event log.

use std::collections::BTreeMap;
use std::collections::btree_map;
use std::ops::Bound;

use axiom_types::{EventKey, InputEvent, SimTime, SourceId};
use tracing::debug;

use crate::LogError;

/// Accepted input events in total order.
#[derive(Debug, Default, Clone)]
pub struct EventLog {
    /// Events keyed by their total-order key.
    events: BTreeMap<EventKey, InputEvent>,
    /// Last accepted `(tick, sequence)` per source.
    last_by_source: BTreeMap<SourceId, (SimTime, u64)>,
}

impl EventLog {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self {
            events: BTreeMap::new(),
            last_by_source: BTreeMap::new(),
        }
    }

    /// Number of events in the log.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Last accepted `(tick, sequence)` for `source`.
    pub fn last_key_for(&self, source: &SourceId) -> Option<(SimTime, u64)> {
        self.last_by_source.get(source).copied()
    }

    /// Append an event.
    ///
    /// # Errors
    ///
    /// Returns [`LogError::OrderingViolation`] if the event's
    /// `(tick, sequence)` does not strictly exceed the last key accepted
    /// from the same source. The log is unchanged on error.
    pub fn append(&mut self, event: InputEvent) -> Result<(), LogError> {
        let presented = (event.tick, event.sequence);
        if let Some(&(last_tick, last_sequence)) = self.last_by_source.get(&event.source_id)
            && presented <= (last_tick, last_sequence)
        {
            return Err(LogError::OrderingViolation {
                source_id: event.source_id,
                last_tick,
                last_sequence,
                tick: event.tick,
                sequence: event.sequence,
            });
        }

        debug!(
            tick = event.tick.get(),
            sequence = event.sequence,
            source_id = %event.source_id,
            "event appended"
        );
        self.last_by_source
            .insert(event.source_id.clone(), presented);
        self.events.insert(event.key(), event);
        Ok(())
    }

    /// Events with `from <= tick <= to`, in total order.
    ///
    /// The returned iterator is lazy and cheap to clone; cloning it or
    /// calling `read_range` again restarts from the beginning.
    pub fn read_range(&self, from: SimTime, to: SimTime) -> EventRange<'_> {
        if from > to {
            return EventRange { inner: None };
        }
        let lower = Bound::Included(tick_floor(from));
        let upper = to
            .next()
            .map_or(Bound::Unbounded, |next| Bound::Excluded(tick_floor(next)));
        EventRange {
            inner: Some(self.events.range((lower, upper))),
        }
    }

    /// Events due at exactly `tick`.
    pub fn events_at(&self, tick: SimTime) -> EventRange<'_> {
        self.read_range(tick, tick)
    }

    /// Every event, in total order.
    pub fn iter(&self) -> impl Iterator<Item = &InputEvent> {
        self.events.values()
    }
}

/// The smallest possible key at `tick`: sequence 0 and the empty source id.
fn tick_floor(tick: SimTime) -> EventKey {
    EventKey {
        tick,
        sequence: 0,
        source_id: SourceId::new(""),
    }
}

/// A lazy, ordered, finite view over part of an [`EventLog`].
#[derive(Debug, Clone)]
pub struct EventRange<'a> {
    inner: Option<btree_map::Range<'a, EventKey, InputEvent>>,
}

impl<'a> Iterator for EventRange<'a> {
    type Item = &'a InputEvent;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.as_mut()?.next().map(|(_, event)| event)
    }
}
