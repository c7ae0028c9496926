//! `consume` command
//!
//! Wires the HTTP client, file cursor store, and logging handler into a
//! supervisor and runs it until Ctrl-C. Partition failures are logged as
//! they arrive on the failure channel.

use crate::client::HttpStreamClient;
use crate::config::Config;
use crate::cursor::FileCursorStore;
use crate::handler::LoggingHandler;
use crate::model::EventType;
use crate::supervisor::Supervisor;
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

pub async fn run_consume(config: Config, cursor_dir: Option<String>) -> Result<()> {
    let event_type = EventType::new(&config.broker.event_type);
    let mut client = HttpStreamClient::new(config.broker.base_url.as_str())?;
    if let Some(token) = &config.broker.auth_token {
        client = client.with_auth_token(token.clone());
    }

    let dir = cursor_dir.unwrap_or_else(|| config.consumer.cursor_dir.clone());
    let store = FileCursorStore::new(&dir).await?;
    info!(event_type = %event_type, cursor_dir = %dir, "Starting consumption");

    let (supervisor, mut failures) = Supervisor::new(
        event_type,
        Arc::new(client),
        Arc::new(store),
        Arc::new(LoggingHandler),
        config.supervisor_options(),
    );

    let shutdown = CancellationToken::new();
    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received; shutting down");
            signal_token.cancel();
        }
    });

    let reporter = tokio::spawn(async move {
        while let Some(failure) = failures.recv().await {
            error!(
                event_type = %failure.event_type,
                partition = %failure.partition,
                error = %failure.error,
                "Partition permanently failed; healthy partitions keep running"
            );
        }
    });

    supervisor.run(shutdown).await?;
    reporter.abort();
    Ok(())
}
