//! Cursor storage
//!
//! Durable mapping from (event type, partition) to the last committed
//! cursor. The consumer reads it once at partition startup to pick a resume
//! point and writes it exactly once per successfully handled batch. The
//! backend is pluggable behind [`CursorStore`]; this crate ships a
//! file-backed store for the CLI and an in-memory store for tests and
//! embedding.

use crate::error::Result;
use crate::model::{Cursor, EventType, EventTypeCursor, PartitionId};
use async_trait::async_trait;

mod file;
mod memory;

pub use file::FileCursorStore;
pub use memory::InMemoryCursorStore;

/// Trait for cursor storage backends.
///
/// Implementations map `(event type, partition)` to the last committed
/// cursor token. Failures surface as
/// [`EventlineError::Storage`](crate::error::EventlineError::Storage), which
/// the partition consumer treats as recoverable: the uncommitted batch is
/// redelivered after backoff and the commit retried.
#[async_trait]
pub trait CursorStore: Send + Sync {
    /// Read the last committed cursor for a partition.
    ///
    /// Returns `None` when nothing has been committed yet; the consumer
    /// then falls back to the broker-reported oldest available cursor.
    async fn read(&self, event_type: &EventType, partition: &PartitionId)
        -> Result<Option<Cursor>>;

    /// Persist a committed cursor, replacing any previous value for the
    /// same (event type, partition).
    async fn write(&self, cursor: &EventTypeCursor) -> Result<()>;
}
