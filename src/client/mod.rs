//! Stream client abstraction
//!
//! The consumer core talks to the broker through [`StreamClient`]: one
//! call to discover the partitions of an event type, one call to open a
//! long-lived byte stream for a single partition starting at a cursor.
//! [`HttpStreamClient`] is the reqwest-backed implementation; tests script
//! their own.

use crate::error::Result;
use crate::model::{EventType, EventTypeCursor, Partition};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;

mod http;

pub use http::HttpStreamClient;

/// Raw bytes of one open partition stream.
///
/// Chunks arrive as the broker flushes them; an `Err` item means the
/// connection died mid-stream, and the end of the stream means the broker
/// closed it. Either way the consumer reconnects from its last committed
/// cursor.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// Transport contract against the broker.
///
/// Implementations classify their failures into the crate error taxonomy
/// at this boundary: broker-transient conditions as
/// [`Transport`](crate::error::EventlineError::Transport), auth rejections
/// as [`Authorization`](crate::error::EventlineError::Authorization), and
/// removed event types or partitions as
/// [`NotFound`](crate::error::EventlineError::NotFound).
#[async_trait]
pub trait StreamClient: Send + Sync {
    /// Return the current partition set for an event type, including the
    /// available cursor range per partition.
    async fn discover_partitions(&self, event_type: &EventType) -> Result<Vec<Partition>>;

    /// Open an unbounded stream over one partition, positioned just after
    /// `cursor`.
    async fn open_stream(&self, cursor: &EventTypeCursor) -> Result<ByteStream>;
}
