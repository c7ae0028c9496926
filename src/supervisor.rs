//! Consumer supervisor
//!
//! Discovers the partitions of one event type and keeps exactly one live
//! partition consumer per discovered partition: newly appeared partitions
//! get a consumer seeded from the cursor store, disappeared partitions are
//! retired cooperatively, and consumers that die on an unrecoverable error
//! are reported on the failure channel and never restarted — whether to
//! alert or restart is the operator's call. Every mutation of the
//! partition-to-consumer map happens on the supervisor's own task.

use crate::client::StreamClient;
use crate::consumer::{ConsumerOptions, PartitionConsumer};
use crate::cursor::CursorStore;
use crate::error::{EventlineError, Result};
use crate::handler::BatchHandler;
use crate::model::{EventType, Partition, PartitionId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Report of a partition consumer that died on an unrecoverable error.
///
/// This channel is where the core ends: the embedding application decides
/// whether to alert, restart the process, or ignore.
#[derive(Debug)]
pub struct PartitionFailure {
    pub event_type: EventType,
    pub partition: PartitionId,
    pub error: EventlineError,
}

/// Tuning knobs for the supervisor.
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    /// Interval between discovery calls. Zero means discover once at
    /// startup and never re-diff the partition set.
    pub discovery_interval: Duration,
    /// How long to wait for partition consumers to finish during retirement
    /// and shutdown before abandoning them.
    pub shutdown_grace: Duration,
    /// Options handed to every spawned partition consumer.
    pub consumer: ConsumerOptions,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            discovery_interval: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(10),
            consumer: ConsumerOptions::default(),
        }
    }
}

struct ConsumerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Supervisor over all partition consumers of one event type.
pub struct Supervisor {
    event_type: EventType,
    client: Arc<dyn StreamClient>,
    store: Arc<dyn CursorStore>,
    handler: Arc<dyn BatchHandler>,
    options: SupervisorOptions,
    // Only state shared across tasks in the whole crate; written solely
    // from the supervisor task.
    consumers: HashMap<PartitionId, ConsumerHandle>,
    failures_tx: mpsc::Sender<PartitionFailure>,
}

impl Supervisor {
    /// Create a supervisor and the receiving end of its failure channel.
    pub fn new(
        event_type: EventType,
        client: Arc<dyn StreamClient>,
        store: Arc<dyn CursorStore>,
        handler: Arc<dyn BatchHandler>,
        options: SupervisorOptions,
    ) -> (Self, mpsc::Receiver<PartitionFailure>) {
        let (failures_tx, failures_rx) = mpsc::channel(64);
        (
            Self {
                event_type,
                client,
                store,
                handler,
                options,
                consumers: HashMap::new(),
                failures_tx,
            },
            failures_rx,
        )
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// The initial discovery happens immediately and its failure is
    /// returned to the caller; later discovery failures are logged and the
    /// current partition assignment kept. On shutdown all consumers are
    /// cancelled concurrently and awaited within the grace period.
    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        self.reconcile().await?;

        if self.options.discovery_interval.is_zero() {
            debug!(event_type = %self.event_type, "Discovery interval is zero; partition set is fixed");
            shutdown.cancelled().await;
        } else {
            let mut ticker = interval(self.options.discovery_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick fires immediately and duplicates the initial
            // discovery above; swallow it.
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        if let Err(e) = self.reconcile().await {
                            warn!(
                                event_type = %self.event_type,
                                error = %e,
                                "Partition discovery failed; keeping current assignment"
                            );
                        }
                    }
                }
            }
        }

        self.shutdown_all().await;
        Ok(())
    }

    /// Diff the discovered partition set against running consumers.
    async fn reconcile(&mut self) -> Result<()> {
        let partitions = self.client.discover_partitions(&self.event_type).await?;
        let discovered: HashSet<PartitionId> =
            partitions.iter().map(|p| p.id.clone()).collect();

        let gone: Vec<PartitionId> = self
            .consumers
            .keys()
            .filter(|id| !discovered.contains(id))
            .cloned()
            .collect();
        for id in gone {
            if let Some(handle) = self.consumers.remove(&id) {
                info!(
                    event_type = %self.event_type,
                    partition = %id,
                    "Partition disappeared from discovery; retiring consumer"
                );
                handle.cancel.cancel();
                if timeout(self.options.shutdown_grace, handle.task)
                    .await
                    .is_err()
                {
                    warn!(
                        event_type = %self.event_type,
                        partition = %id,
                        "Retiring consumer did not stop within the grace period; abandoning it"
                    );
                }
            }
        }

        for partition in partitions {
            // A consumer that already failed keeps its map entry, so a
            // still-assigned partition is never restarted here.
            if self.consumers.contains_key(&partition.id) {
                continue;
            }
            self.spawn_consumer(partition);
        }
        Ok(())
    }

    fn spawn_consumer(&mut self, partition: Partition) {
        let cancel = CancellationToken::new();
        let id = partition.id.clone();
        let consumer = PartitionConsumer::new(
            self.event_type.clone(),
            partition,
            Arc::clone(&self.client),
            Arc::clone(&self.store),
            Arc::clone(&self.handler),
            self.options.consumer.clone(),
            cancel.clone(),
        );

        let failures_tx = self.failures_tx.clone();
        let event_type = self.event_type.clone();
        let report_id = id.clone();
        let task = tokio::spawn(async move {
            if let Err(error) = consumer.run().await {
                error!(
                    event_type = %event_type,
                    partition = %report_id,
                    error = %error,
                    "Partition consumer failed"
                );
                let _ = failures_tx
                    .send(PartitionFailure {
                        event_type,
                        partition: report_id,
                        error,
                    })
                    .await;
            }
        });

        info!(
            event_type = %self.event_type,
            partition = %id,
            "Started partition consumer"
        );
        self.consumers.insert(id, ConsumerHandle { cancel, task });
    }

    /// Cancel every consumer concurrently and wait for all of them within
    /// the shutdown grace period; stragglers are abandoned and logged.
    async fn shutdown_all(&mut self) {
        info!(
            event_type = %self.event_type,
            count = self.consumers.len(),
            "Shutting down partition consumers"
        );
        for handle in self.consumers.values() {
            handle.cancel.cancel();
        }
        let deadline = tokio::time::Instant::now() + self.options.shutdown_grace;
        for (id, handle) in self.consumers.drain() {
            if tokio::time::timeout_at(deadline, handle.task).await.is_err() {
                warn!(
                    event_type = %self.event_type,
                    partition = %id,
                    "Consumer still running after shutdown grace period; abandoning it"
                );
            }
        }
    }
}
