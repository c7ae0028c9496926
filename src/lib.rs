//! Eventline - client-side consumer for partitioned HTTP event streams
//!
//! Eventline discovers the partitions of a named event type on a
//! cursor-addressable broker, opens one durable streaming read per
//! partition, decodes newline-delimited event batches, dispatches them to a
//! user-supplied handler, and commits a per-partition cursor so consumption
//! resumes after restart or failure without loss and without unbounded
//! duplication (at-least-once delivery).
//!
//! # Architecture
//!
//! - `supervisor`: partition discovery and consumer lifecycle
//! - `consumer`: the per-partition state machine (connect, dispatch,
//!   commit, backoff)
//! - `decoder`: wire framing of one open stream into batches
//! - `client`: transport contract and the reqwest implementation
//! - `cursor`: cursor storage contract plus file and in-memory backends
//! - `handler`: the batch handler contract user code implements
//! - `error`: the closed error taxonomy driving the retry policy
//!
//! # Example
//!
//! ```no_run
//! use eventline::client::HttpStreamClient;
//! use eventline::cursor::FileCursorStore;
//! use eventline::handler::LoggingHandler;
//! use eventline::model::EventType;
//! use eventline::supervisor::{Supervisor, SupervisorOptions};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let client = HttpStreamClient::new("http://localhost:8080")?;
//!     let store = FileCursorStore::new("cursors").await?;
//!     let (supervisor, mut failures) = Supervisor::new(
//!         EventType::new("order.created"),
//!         Arc::new(client),
//!         Arc::new(store),
//!         Arc::new(LoggingHandler),
//!         SupervisorOptions::default(),
//!     );
//!     tokio::spawn(async move {
//!         while let Some(failure) = failures.recv().await {
//!             eprintln!("partition {} failed: {}", failure.partition, failure.error);
//!         }
//!     });
//!     supervisor.run(CancellationToken::new()).await?;
//!     Ok(())
//! }
//! ```

pub mod backoff;
pub mod cli;
pub mod client;
pub mod commands;
pub mod config;
pub mod consumer;
pub mod cursor;
pub mod decoder;
pub mod error;
pub mod handler;
pub mod model;
pub mod supervisor;

// Re-export commonly used types
pub use client::{HttpStreamClient, StreamClient};
pub use config::Config;
pub use consumer::{ConsumerOptions, ConsumerState, PartitionConsumer};
pub use cursor::{CursorStore, FileCursorStore, InMemoryCursorStore};
pub use error::{EventlineError, Result};
pub use handler::{BatchHandler, HandlerError};
pub use model::{Batch, Cursor, EventType, EventTypeCursor, Partition, PartitionId};
pub use supervisor::{PartitionFailure, Supervisor, SupervisorOptions};

#[cfg(test)]
pub mod test_utils;
