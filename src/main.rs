//! Eventline - partitioned event stream consumer CLI
//!
//! Main entry point for the Eventline consumer binary.

use anyhow::Result;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use eventline::cli::{Cli, Commands};
use eventline::commands;
use eventline::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse_args();

    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = Config::load(config_path, &cli)?;
    config.validate()?;

    match cli.command {
        Commands::Consume { cursor_dir } => {
            tracing::info!(event_type = %config.broker.event_type, "Starting consumer");
            commands::consume::run_consume(config, cursor_dir).await?;
            Ok(())
        }
        Commands::Partitions => {
            commands::partitions::run_partitions(config).await?;
            Ok(())
        }
    }
}

/// Initialize tracing subscriber with environment filter
fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("eventline=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}
