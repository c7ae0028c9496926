//! Core data model for partitioned event streams
//!
//! These types mirror the broker's wire vocabulary: a named event type is
//! split into partitions, and a position inside one partition is an opaque
//! broker-issued cursor. The client never inspects or compares cursor
//! contents; it only stores and replays them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a logical event stream, e.g. `order.created`.
///
/// Owned by configuration and read-only at runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(String);

impl EventType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one partition within an event type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionId(String);

impl PartitionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque broker-issued position marker within a partition.
///
/// Cursors are totally ordered only by the broker; the client treats them
/// as uninterpreted strings for storage and wire purposes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(String);

impl Cursor {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One partition as reported by discovery, with the cursor range the broker
/// currently holds for it.
///
/// Transient: refreshed on every discovery call and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    /// Partition identifier.
    #[serde(rename = "partition")]
    pub id: PartitionId,

    /// Oldest cursor still available on the broker. Used as the resume
    /// point when no cursor has been committed yet.
    #[serde(rename = "oldest_available_offset")]
    pub oldest_available: Cursor,

    /// Newest cursor the broker has written.
    #[serde(rename = "newest_available_offset")]
    pub newest_available: Cursor,
}

/// Composite key addressing a position in one partition of one event type.
///
/// Used both to open a stream and to persist committed progress. A commit
/// always carries a cursor the broker returned in a stream response; the
/// client never synthesizes cursor values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventTypeCursor {
    pub event_type: EventType,
    pub partition: PartitionId,
    pub cursor: Cursor,
}

impl EventTypeCursor {
    pub fn new(event_type: EventType, partition: PartitionId, cursor: Cursor) -> Self {
        Self {
            event_type,
            partition,
            cursor,
        }
    }
}

impl fmt::Display for EventTypeCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}@{}", self.event_type, self.partition, self.cursor)
    }
}

/// A bounded group of events delivered and committed atomically.
///
/// The cursor marks the end of the batch; committing it acknowledges every
/// event in `events`. Batches are handed to the handler in full or not at
/// all.
#[derive(Debug, Clone)]
pub struct Batch {
    pub events: Vec<serde_json::Value>,
    pub cursor: EventTypeCursor,
}
