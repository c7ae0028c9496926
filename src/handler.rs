//! Batch handler contract
//!
//! User code consumes events by implementing [`BatchHandler`]. The handler
//! receives one decoded batch at a time for a single partition; invocations
//! for the same partition are strictly sequential, so a slow handler delays
//! only its own partition.
//!
//! # Example
//!
//! ```rust
//! use eventline::handler::{BatchHandler, HandlerError};
//! use eventline::model::{EventType, PartitionId};
//!
//! struct PrintHandler;
//!
//! #[async_trait::async_trait]
//! impl BatchHandler for PrintHandler {
//!     async fn handle(
//!         &self,
//!         event_type: &EventType,
//!         partition: &PartitionId,
//!         events: &[serde_json::Value],
//!     ) -> Result<(), HandlerError> {
//!         println!("{event_type}/{partition}: {} events", events.len());
//!         Ok(())
//!     }
//! }
//! ```

use crate::model::{EventType, PartitionId};
use thiserror::Error;
use tracing::info;

/// Failure reported by a batch handler.
///
/// Recoverable failures cause the batch to be redelivered after backoff —
/// the right choice when a downstream dependency is temporarily unavailable.
/// Unrecoverable failures terminate the partition consumer; use them to opt
/// out of retry when redelivery cannot possibly succeed.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The batch should be redelivered after backoff.
    #[error("recoverable handler failure: {0}")]
    Recoverable(String),

    /// Retry is pointless; fail the partition.
    #[error("unrecoverable handler failure: {0}")]
    Unrecoverable(String),
}

impl HandlerError {
    pub fn recoverable(message: impl Into<String>) -> Self {
        Self::Recoverable(message.into())
    }

    pub fn unrecoverable(message: impl Into<String>) -> Self {
        Self::Unrecoverable(message.into())
    }

    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable(_))
    }
}

/// Handler trait for processing decoded event batches.
///
/// The batch is delivered in full or not at all; returning `Ok(())`
/// acknowledges every event in it, after which the consumer commits the
/// batch's end cursor. At-least-once delivery: a handler may see the same
/// batch again after a recoverable failure anywhere between invocation and
/// commit, so handlers should be idempotent.
#[async_trait::async_trait]
pub trait BatchHandler: Send + Sync {
    /// Process one batch of raw event payloads from a single partition.
    async fn handle(
        &self,
        event_type: &EventType,
        partition: &PartitionId,
        events: &[serde_json::Value],
    ) -> Result<(), HandlerError>;
}

/// Handler that logs batch sizes and nothing else.
///
/// Used by the `consume` CLI command as a dry-run style sink; also handy as
/// a smoke-test handler when embedding the supervisor.
pub struct LoggingHandler;

#[async_trait::async_trait]
impl BatchHandler for LoggingHandler {
    async fn handle(
        &self,
        event_type: &EventType,
        partition: &PartitionId,
        events: &[serde_json::Value],
    ) -> Result<(), HandlerError> {
        info!(
            event_type = %event_type,
            partition = %partition,
            count = events.len(),
            "Received batch"
        );
        Ok(())
    }
}
