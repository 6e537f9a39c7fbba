//! Append-only audit trail of applied domain events.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value as JsonValue;

use retailops_core::StoreId;
use retailops_events::{Event, EventEnvelope};

/// In-memory append-only audit log, one stream per aggregate.
///
/// Intended for tests/dev. Sequence numbers start at 1 and increase by one
/// per recorded event within a stream.
#[derive(Debug, Default, Clone)]
pub struct AuditLog {
    streams: HashMap<String, Vec<EventEnvelope<JsonValue>>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append events to a stream, in order.
    ///
    /// Every event is serialized before anything is appended, so a failure
    /// leaves the stream untouched.
    pub fn record<E>(
        &mut self,
        store_id: &StoreId,
        stream_id: &str,
        stream_type: &str,
        events: &[E],
    ) -> Result<&[EventEnvelope<JsonValue>], serde_json::Error>
    where
        E: Event + Serialize,
    {
        let stream = self.streams.entry(stream_id.to_string()).or_default();
        let start = stream.len();

        let mut next = stream.last().map(|e| e.sequence_number()).unwrap_or(0) + 1;
        let mut envelopes = Vec::with_capacity(events.len());
        for event in events {
            envelopes.push(EventEnvelope::from_typed(
                store_id.clone(),
                stream_id,
                stream_type,
                next,
                event,
            )?);
            next += 1;
        }

        stream.extend(envelopes);
        Ok(&stream[start..])
    }

    /// Envelopes of one stream, oldest first.
    pub fn stream(&self, stream_id: &str) -> &[EventEnvelope<JsonValue>] {
        self.streams
            .get(stream_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of recorded events across all streams.
    pub fn len(&self) -> usize {
        self.streams.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.values().all(Vec::is_empty)
    }
}
