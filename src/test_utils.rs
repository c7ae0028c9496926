//! Shared test fixtures
//!
//! A scripted [`StreamClient`], a recording [`BatchHandler`], and a cursor
//! store that fails its first writes. Used by the consumer and supervisor
//! unit tests to drive the state machine without a broker.

use crate::client::{ByteStream, StreamClient};
use crate::cursor::{CursorStore, InMemoryCursorStore};
use crate::error::{EventlineError, Result};
use crate::handler::{BatchHandler, HandlerError};
use crate::model::{Cursor, EventType, EventTypeCursor, Partition, PartitionId};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Build a discovery partition with the given cursor range.
pub fn partition(id: &str, oldest: &str, newest: &str) -> Partition {
    Partition {
        id: PartitionId::new(id),
        oldest_available: Cursor::new(oldest),
        newest_available: Cursor::new(newest),
    }
}

/// One wire frame carrying `count` dummy events ending at `offset`.
pub fn batch_chunk(partition: &str, offset: &str, count: usize) -> Bytes {
    let events: Vec<serde_json::Value> = (0..count)
        .map(|n| serde_json::json!({"offset": offset, "n": n}))
        .collect();
    let frame = serde_json::json!({
        "cursor": {"partition": partition, "offset": offset},
        "events": events,
    });
    Bytes::from(format!("{frame}\n"))
}

/// One keep-alive frame (cursor only, no events) at `offset`.
pub fn keep_alive_chunk(partition: &str, offset: &str) -> Bytes {
    let frame = serde_json::json!({
        "cursor": {"partition": partition, "offset": offset},
    });
    Bytes::from(format!("{frame}\n"))
}

/// What one `open_stream` call should produce.
pub enum StreamScript {
    /// Yield these chunks, then end the stream.
    Chunks(Vec<Result<Bytes>>),
    /// Fail the open itself.
    Fail(EventlineError),
    /// Open successfully and never yield anything.
    Hang,
}

/// Scripted broker: a fixed discovery sequence (last entry repeats) and
/// per-partition stream scripts (defaulting to [`StreamScript::Hang`]).
/// Every opened cursor is recorded for assertions.
pub struct ScriptedClient {
    discoveries: Mutex<VecDeque<Vec<Partition>>>,
    fail_discovery: bool,
    streams: Mutex<HashMap<PartitionId, VecDeque<StreamScript>>>,
    opened: Mutex<Vec<EventTypeCursor>>,
}

impl ScriptedClient {
    pub fn new(discoveries: Vec<Vec<Partition>>) -> Self {
        Self {
            discoveries: Mutex::new(discoveries.into()),
            fail_discovery: false,
            streams: Mutex::new(HashMap::new()),
            opened: Mutex::new(Vec::new()),
        }
    }

    /// Client whose discovery calls always fail with a transport error.
    pub fn failing_discovery() -> Self {
        let mut client = Self::new(vec![]);
        client.fail_discovery = true;
        client
    }

    /// Queue the script for the next `open_stream` call on a partition.
    pub fn push_stream(&self, partition: &PartitionId, script: StreamScript) {
        let mut streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
        streams.entry(partition.clone()).or_default().push_back(script);
    }

    /// Cursors passed to `open_stream` so far, in call order.
    pub fn opened_cursors(&self) -> Vec<EventTypeCursor> {
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl StreamClient for ScriptedClient {
    async fn discover_partitions(&self, event_type: &EventType) -> Result<Vec<Partition>> {
        if self.fail_discovery {
            return Err(EventlineError::Transport(format!(
                "scripted discovery failure for {event_type}"
            )));
        }
        let mut discoveries = self.discoveries.lock().unwrap_or_else(|e| e.into_inner());
        match discoveries.len() {
            0 => Ok(vec![]),
            1 => Ok(discoveries.front().cloned().unwrap_or_default()),
            _ => Ok(discoveries.pop_front().unwrap_or_default()),
        }
    }

    async fn open_stream(&self, cursor: &EventTypeCursor) -> Result<ByteStream> {
        self.opened
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(cursor.clone());
        let script = {
            let mut streams = self.streams.lock().unwrap_or_else(|e| e.into_inner());
            streams
                .get_mut(&cursor.partition)
                .and_then(|queue| queue.pop_front())
                .unwrap_or(StreamScript::Hang)
        };
        match script {
            StreamScript::Chunks(chunks) => Ok(Box::pin(futures::stream::iter(chunks))),
            StreamScript::Fail(e) => Err(e),
            StreamScript::Hang => Ok(Box::pin(futures::stream::pending())),
        }
    }
}

/// Handler that records every successful delivery and can be told to fail
/// or stall upcoming invocations.
pub struct CollectingHandler {
    batches: Mutex<Vec<(PartitionId, Vec<serde_json::Value>)>>,
    failures: Mutex<VecDeque<HandlerError>>,
    stalls: Mutex<VecDeque<Duration>>,
}

impl CollectingHandler {
    pub fn new() -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            stalls: Mutex::new(VecDeque::new()),
        }
    }

    /// Fail the next invocation with the given error.
    pub fn fail_next(&self, error: HandlerError) {
        self.failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(error);
    }

    /// Sleep this long inside the next invocation before succeeding.
    pub fn stall_next(&self, delay: Duration) {
        self.stalls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(delay);
    }

    /// Successfully handled batches, in delivery order.
    pub fn batches(&self) -> Vec<(PartitionId, Vec<serde_json::Value>)> {
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for CollectingHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BatchHandler for CollectingHandler {
    async fn handle(
        &self,
        _event_type: &EventType,
        partition: &PartitionId,
        events: &[serde_json::Value],
    ) -> std::result::Result<(), HandlerError> {
        let stall = self
            .stalls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        let failure = self
            .failures
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front();
        if let Some(error) = failure {
            return Err(error);
        }
        self.batches
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((partition.clone(), events.to_vec()));
        Ok(())
    }
}

/// Cursor store that fails its first `n` writes with a storage error, then
/// behaves like an in-memory store.
pub struct FlakyCursorStore {
    inner: InMemoryCursorStore,
    remaining_failures: AtomicUsize,
}

impl FlakyCursorStore {
    pub fn failing_writes(n: usize) -> Self {
        Self {
            inner: InMemoryCursorStore::new(),
            remaining_failures: AtomicUsize::new(n),
        }
    }
}

#[async_trait]
impl CursorStore for FlakyCursorStore {
    async fn read(
        &self,
        event_type: &EventType,
        partition: &PartitionId,
    ) -> Result<Option<Cursor>> {
        self.inner.read(event_type, partition).await
    }

    async fn write(&self, cursor: &EventTypeCursor) -> Result<()> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(EventlineError::Storage(
                "scripted cursor write failure".to_string(),
            ));
        }
        self.inner.write(cursor).await
    }
}
