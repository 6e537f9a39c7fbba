use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use retailops_core::StoreId;

use crate::event::Event;

/// Envelope for an event, carrying store + stream metadata.
///
/// Notes:
/// - **Store scoping** is recorded via `store_id`.
/// - **Append-only**: `sequence_number` is monotonically increasing per stream.
/// - `stream_id` is a display form of the aggregate id (shipment UUID or
///   supplier code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope<E> {
    event_id: Uuid,
    store_id: StoreId,

    stream_id: String,
    stream_type: String,

    /// Position in the stream, starting at 1.
    sequence_number: u64,

    event_type: String,
    event_version: u32,
    occurred_at: DateTime<Utc>,

    payload: E,
}

impl<E> EventEnvelope<E> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        event_id: Uuid,
        store_id: StoreId,
        stream_id: impl Into<String>,
        stream_type: impl Into<String>,
        sequence_number: u64,
        event_type: impl Into<String>,
        event_version: u32,
        occurred_at: DateTime<Utc>,
        payload: E,
    ) -> Self {
        Self {
            event_id,
            store_id,
            stream_id: stream_id.into(),
            stream_type: stream_type.into(),
            sequence_number,
            event_type: event_type.into(),
            event_version,
            occurred_at,
            payload,
        }
    }

    pub fn event_id(&self) -> Uuid {
        self.event_id
    }

    pub fn store_id(&self) -> &StoreId {
        &self.store_id
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn stream_type(&self) -> &str {
        &self.stream_type
    }

    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn event_version(&self) -> u32 {
        self.event_version
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn payload(&self) -> &E {
        &self.payload
    }

    pub fn into_payload(self) -> E {
        self.payload
    }
}

impl EventEnvelope<JsonValue> {
    /// Wrap a typed domain event, serializing it to a JSON payload.
    ///
    /// Event metadata (type, version, occurred_at) is taken from the event.
    pub fn from_typed<E>(
        store_id: StoreId,
        stream_id: impl Into<String>,
        stream_type: impl Into<String>,
        sequence_number: u64,
        event: &E,
    ) -> Result<Self, serde_json::Error>
    where
        E: Event + Serialize,
    {
        let payload = serde_json::to_value(event)?;
        Ok(Self::new(
            Uuid::now_v7(),
            store_id,
            stream_id,
            stream_type,
            sequence_number,
            event.event_type(),
            event.version(),
            event.occurred_at(),
            payload,
        ))
    }
}
