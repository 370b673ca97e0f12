//! Event types for the stream-processing engine.
//!
//! An [`Event`] is the unit of flow: an immutable payload plus routing
//! metadata. Events are produced once by a source, moved edge to edge
//! through the graph, and consumed at most once per downstream edge.
//!
//! Timestamps use [`Instant`] so they are monotonic; wall-clock time is
//! deliberately absent from the data path.

use std::time::Instant;

/// Key type used for partitioning and routing.
pub type EventKey = u64;

/// Sequence number for ordering within a stream.
pub type SequenceNumber = u64;

/// Payload carried by an event.
///
/// A small closed set of value shapes. Anything else travels as
/// [`Payload::Bytes`], which user operators are free to interpret.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    /// No value (e.g. a pure signal event).
    #[default]
    Empty,
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit float.
    Float(f64),
    /// UTF-8 text.
    Text(String),
    /// Opaque binary data.
    Bytes(Vec<u8>),
}

impl From<i64> for Payload {
    fn from(v: i64) -> Self {
        Payload::Int(v)
    }
}

impl From<f64> for Payload {
    fn from(v: f64) -> Self {
        Payload::Float(v)
    }
}

impl From<String> for Payload {
    fn from(v: String) -> Self {
        Payload::Text(v)
    }
}

impl From<&str> for Payload {
    fn from(v: &str) -> Self {
        Payload::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(v: Vec<u8>) -> Self {
        Payload::Bytes(v)
    }
}

/// Metadata attached to an event for routing, ordering, and tracing.
#[derive(Debug, Clone)]
pub struct EventMetadata {
    /// Optional partitioning key.
    pub key: Option<EventKey>,
    /// Optional sequence number within the originating stream.
    pub sequence: Option<SequenceNumber>,
    /// Monotonic timestamp, captured at construction unless supplied.
    pub timestamp: Instant,
    /// Name of the operator that produced the event, if known.
    pub source: Option<String>,
}

impl Default for EventMetadata {
    fn default() -> Self {
        Self {
            key: None,
            sequence: None,
            timestamp: Instant::now(),
            source: None,
        }
    }
}

impl EventMetadata {
    /// Creates metadata with a partitioning key and a fresh timestamp.
    #[must_use]
    pub fn with_key(key: EventKey) -> Self {
        Self {
            key: Some(key),
            ..Self::default()
        }
    }
}

/// The unit of data flowing through the graph.
///
/// Constructed once, then moved (or cloned for fan-out) through queues.
#[derive(Debug, Clone, Default)]
pub struct Event {
    payload: Payload,
    metadata: EventMetadata,
}

impl Event {
    /// Creates an event from a payload with default metadata.
    #[must_use]
    pub fn new(payload: impl Into<Payload>) -> Self {
        Self {
            payload: payload.into(),
            metadata: EventMetadata::default(),
        }
    }

    /// Creates an event with a payload and a partitioning key.
    #[must_use]
    pub fn with_key(payload: impl Into<Payload>, key: EventKey) -> Self {
        Self {
            payload: payload.into(),
            metadata: EventMetadata::with_key(key),
        }
    }

    /// Creates an event with a payload and fully specified metadata.
    #[must_use]
    pub fn with_metadata(payload: impl Into<Payload>, metadata: EventMetadata) -> Self {
        Self {
            payload: payload.into(),
            metadata,
        }
    }

    /// Creates an event from a payload and fully specified metadata.
    #[must_use]
    pub fn from_parts(payload: Payload, metadata: EventMetadata) -> Self {
        Self { payload, metadata }
    }

    /// Returns the payload.
    #[inline]
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Returns the metadata.
    #[inline]
    #[must_use]
    pub fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }

    /// Returns the partitioning key, if any.
    #[inline]
    #[must_use]
    pub fn key(&self) -> Option<EventKey> {
        self.metadata.key
    }

    /// Returns the sequence number, if any.
    #[inline]
    #[must_use]
    pub fn sequence(&self) -> Option<SequenceNumber> {
        self.metadata.sequence
    }

    /// Returns the monotonic timestamp.
    #[inline]
    #[must_use]
    pub fn timestamp(&self) -> Instant {
        self.metadata.timestamp
    }

    /// Returns `true` if the payload is empty.
    #[must_use]
    pub fn holds_empty(&self) -> bool {
        matches!(self.payload, Payload::Empty)
    }

    /// Returns `true` if the payload is an integer.
    #[must_use]
    pub fn holds_int(&self) -> bool {
        matches!(self.payload, Payload::Int(_))
    }

    /// Returns `true` if the payload is a float.
    #[must_use]
    pub fn holds_float(&self) -> bool {
        matches!(self.payload, Payload::Float(_))
    }

    /// Returns `true` if the payload is text.
    #[must_use]
    pub fn holds_text(&self) -> bool {
        matches!(self.payload, Payload::Text(_))
    }

    /// Returns `true` if the payload is binary data.
    #[must_use]
    pub fn holds_bytes(&self) -> bool {
        matches!(self.payload, Payload::Bytes(_))
    }

    /// Returns the integer payload, if this event carries one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self.payload {
            Payload::Int(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the float payload, if this event carries one.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self.payload {
            Payload::Float(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the text payload, if this event carries one.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the binary payload, if this event carries one.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Consumes the event, returning payload and metadata.
    #[must_use]
    pub fn into_parts(self) -> (Payload, EventMetadata) {
        (self.payload, self.metadata)
    }
}

/// An event or an in-band end-of-stream marker.
///
/// Queue closure is the engine's authoritative end-of-stream signal;
/// `PoisonPill` exists for user-level protocols that want an in-band
/// terminator travelling with the data. The engine itself never
/// interprets it.
#[derive(Debug, Clone)]
pub enum StreamItem {
    /// A regular event.
    Event(Event),
    /// End-of-stream marker for user protocols.
    PoisonPill,
}

impl StreamItem {
    /// Returns `true` if this item is the poison pill.
    #[must_use]
    pub fn is_poison(&self) -> bool {
        matches!(self, StreamItem::PoisonPill)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_int_payload() {
        let event = Event::new(42i64);
        assert_eq!(event.as_int(), Some(42));
        assert_eq!(event.as_float(), None);
        assert_eq!(event.key(), None);
    }

    #[test]
    fn test_event_with_key() {
        let event = Event::with_key("hello", 7);
        assert_eq!(event.key(), Some(7));
        assert_eq!(event.as_text(), Some("hello"));
    }

    #[test]
    fn test_event_with_metadata() {
        let meta = EventMetadata {
            key: Some(8),
            sequence: Some(2),
            timestamp: Instant::now(),
            source: None,
        };
        let event = Event::with_metadata(100i64, meta);
        assert_eq!(event.key(), Some(8));
        assert_eq!(event.sequence(), Some(2));
        assert_eq!(event.as_int(), Some(100));
    }

    #[test]
    fn test_holds_predicates() {
        assert!(Event::default().holds_empty());
        assert!(Event::new(1i64).holds_int());
        assert!(Event::new(1.0f64).holds_float());
        assert!(Event::new("x").holds_text());
        assert!(Event::new(vec![1u8]).holds_bytes());
        assert!(!Event::new(1i64).holds_float());
        assert!(!Event::new("x").holds_empty());
    }

    #[test]
    fn test_event_from_parts_preserves_metadata() {
        let meta = EventMetadata {
            key: Some(3),
            sequence: Some(11),
            timestamp: Instant::now(),
            source: Some("gen".to_string()),
        };
        let ts = meta.timestamp;
        let event = Event::from_parts(Payload::Float(1.5), meta);
        assert_eq!(event.sequence(), Some(11));
        assert_eq!(event.timestamp(), ts);
        assert_eq!(event.metadata().source.as_deref(), Some("gen"));
    }

    #[test]
    fn test_payload_conversions() {
        assert_eq!(Payload::from(1i64), Payload::Int(1));
        assert_eq!(Payload::from(2.0f64), Payload::Float(2.0));
        assert_eq!(Payload::from("x"), Payload::Text("x".to_string()));
        assert_eq!(Payload::from(vec![1u8, 2]), Payload::Bytes(vec![1, 2]));
        assert_eq!(Payload::default(), Payload::Empty);
    }

    #[test]
    fn test_timestamps_are_monotonic() {
        let a = Event::new(1i64);
        let b = Event::new(2i64);
        assert!(b.timestamp() >= a.timestamp());
    }

    #[test]
    fn test_poison_pill() {
        let item = StreamItem::PoisonPill;
        assert!(item.is_poison());
        assert!(!StreamItem::Event(Event::default()).is_poison());
    }
}
