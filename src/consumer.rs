//! Partition consumer state machine
//!
//! One `PartitionConsumer` owns the consumption of a single partition: it
//! picks a resume point from the cursor store, opens a stream, feeds decoded
//! batches to the handler, and commits the batch cursor after every
//! successful invocation. Recoverable failures loop back through an
//! exponential backoff into a fresh connection from the last committed
//! cursor; unrecoverable failures terminate the consumer and surface to the
//! supervisor. Commits happen only after handler success, which makes
//! delivery at-least-once, never at-most-once.

use crate::backoff::Backoff;
use crate::client::StreamClient;
use crate::cursor::CursorStore;
use crate::decoder::BatchDecoder;
use crate::error::{EventlineError, Result};
use crate::handler::{BatchHandler, HandlerError};
use crate::model::{Batch, EventType, EventTypeCursor, Partition};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Lifecycle state of one partition consumer.
///
/// Owned exclusively by the consumer instance; transitions are logged but
/// never shared across tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Reading the resume cursor and opening a stream.
    Starting,
    /// Stream open, batches flowing.
    Streaming,
    /// Waiting out a delay after a recoverable failure.
    Backoff,
    /// Unassigned by the supervisor; closing down cleanly.
    Retiring,
    /// Terminal: an unrecoverable error was reported upward.
    Failed,
}

/// Tuning knobs for one partition consumer.
#[derive(Debug, Clone)]
pub struct ConsumerOptions {
    /// Delay before the first retry after a recoverable failure.
    pub initial_backoff: Duration,
    /// Upper bound on the retry delay.
    pub max_backoff: Duration,
    /// Fraction of the base delay added as random jitter, in `[0, 1]`.
    pub backoff_jitter: f64,
    /// Optional limit on a single handler invocation; elapsing counts as a
    /// recoverable handler failure.
    pub handler_timeout: Option<Duration>,
}

impl Default for ConsumerOptions {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(30),
            backoff_jitter: 0.2,
            handler_timeout: None,
        }
    }
}

/// Consumer of a single partition of one event type.
///
/// Created and owned by the supervisor; runs until cancelled (clean
/// retirement, returns `Ok`) or until an unrecoverable error occurs
/// (returns `Err` with the classified error).
pub struct PartitionConsumer {
    event_type: EventType,
    partition: Partition,
    client: Arc<dyn StreamClient>,
    store: Arc<dyn CursorStore>,
    handler: Arc<dyn BatchHandler>,
    options: ConsumerOptions,
    cancel: CancellationToken,
    state: ConsumerState,
}

impl PartitionConsumer {
    pub fn new(
        event_type: EventType,
        partition: Partition,
        client: Arc<dyn StreamClient>,
        store: Arc<dyn CursorStore>,
        handler: Arc<dyn BatchHandler>,
        options: ConsumerOptions,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            event_type,
            partition,
            client,
            store,
            handler,
            options,
            cancel,
            state: ConsumerState::Starting,
        }
    }

    /// Run until retired or failed.
    ///
    /// Cancellation is cooperative: it is observed between batches, so an
    /// in-flight handler invocation and its cursor commit always complete
    /// before the consumer exits.
    pub async fn run(mut self) -> Result<()> {
        let mut backoff = Backoff::new(
            self.options.initial_backoff,
            self.options.max_backoff,
            self.options.backoff_jitter,
        );
        loop {
            if self.cancel.is_cancelled() {
                return self.retire();
            }
            match self.stream_once(&mut backoff).await {
                // stream_once only returns Ok on cancellation
                Ok(()) => return self.retire(),
                Err(e) if e.is_recoverable() => {
                    self.transition(ConsumerState::Backoff);
                    let delay = backoff.next_delay();
                    warn!(
                        event_type = %self.event_type,
                        partition = %self.partition.id,
                        error = %e,
                        attempts = backoff.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        "Recoverable failure; backing off before reconnect"
                    );
                    tokio::select! {
                        _ = self.cancel.cancelled() => return self.retire(),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                Err(e) => {
                    self.transition(ConsumerState::Failed);
                    error!(
                        event_type = %self.event_type,
                        partition = %self.partition.id,
                        error = %e,
                        "Unrecoverable failure; abandoning partition"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// One connection lifecycle: resume point, open, stream batches.
    ///
    /// Returns `Ok` only when cancelled; otherwise runs until some error
    /// ends the connection (a broker-closed stream counts as a recoverable
    /// transport failure, resuming from the committed cursor).
    async fn stream_once(&mut self, backoff: &mut Backoff) -> Result<()> {
        self.transition(ConsumerState::Starting);
        let resume = match self
            .store
            .read(&self.event_type, &self.partition.id)
            .await?
        {
            Some(cursor) => cursor,
            None => {
                debug!(
                    event_type = %self.event_type,
                    partition = %self.partition.id,
                    oldest = %self.partition.oldest_available,
                    "No committed cursor; starting from oldest available"
                );
                self.partition.oldest_available.clone()
            }
        };
        let position =
            EventTypeCursor::new(self.event_type.clone(), self.partition.id.clone(), resume);

        let stream = tokio::select! {
            _ = self.cancel.cancelled() => return Ok(()),
            opened = self.client.open_stream(&position) => opened?,
        };
        info!(
            event_type = %self.event_type,
            partition = %self.partition.id,
            cursor = %position.cursor,
            "Stream open"
        );
        self.transition(ConsumerState::Streaming);

        let mut decoder = BatchDecoder::new(self.event_type.clone(), stream);
        loop {
            let batch = tokio::select! {
                _ = self.cancel.cancelled() => return Ok(()),
                next = decoder.next_batch() => match next? {
                    Some(batch) => batch,
                    None => {
                        // Brokers cycle idle connections after a run of
                        // keep-alives; a clean close on a connection that
                        // spoke at least one frame must not escalate the
                        // reconnect delay.
                        if decoder.frames_decoded() > 0 {
                            backoff.reset();
                        }
                        return Err(EventlineError::Transport(
                            "broker closed the stream".to_string(),
                        ));
                    }
                },
            };
            self.process_batch(batch).await?;
            // One fully successful batch commit resets the retry sequence
            backoff.reset();
        }
    }

    /// Deliver one batch to the handler and commit its end cursor.
    ///
    /// The commit is written only after the handler returns success; a
    /// failure on either side leaves the stored cursor untouched so the
    /// batch is redelivered after recovery.
    async fn process_batch(&self, batch: Batch) -> Result<()> {
        // A frame addressing another partition means the broker's framing
        // cannot be trusted; committing it would corrupt a sibling's cursor.
        if batch.cursor.partition != self.partition.id {
            return Err(EventlineError::Decode(format!(
                "frame cursor addresses partition {} on the stream for partition {}",
                batch.cursor.partition, self.partition.id
            )));
        }
        debug!(
            event_type = %self.event_type,
            partition = %self.partition.id,
            cursor = %batch.cursor.cursor,
            count = batch.events.len(),
            "Dispatching batch"
        );
        let invocation = self
            .handler
            .handle(&self.event_type, &self.partition.id, &batch.events);
        let outcome = match self.options.handler_timeout {
            Some(limit) => match timeout(limit, invocation).await {
                Ok(outcome) => outcome,
                Err(_) => Err(HandlerError::recoverable(format!(
                    "handler timed out after {}ms",
                    limit.as_millis()
                ))),
            },
            None => invocation.await,
        };
        outcome?;

        self.store.write(&batch.cursor).await?;
        debug!(cursor = %batch.cursor, "Committed cursor");
        Ok(())
    }

    fn retire(&mut self) -> Result<()> {
        self.transition(ConsumerState::Retiring);
        info!(
            event_type = %self.event_type,
            partition = %self.partition.id,
            "Partition consumer retired"
        );
        Ok(())
    }

    fn transition(&mut self, next: ConsumerState) {
        if self.state != next {
            debug!(
                event_type = %self.event_type,
                partition = %self.partition.id,
                from = ?self.state,
                to = ?next,
                "State transition"
            );
            self.state = next;
        }
    }
}
