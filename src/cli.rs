//! Command-line interface definition

use clap::{Parser, Subcommand};

/// Consumer for partitioned, cursor-addressable HTTP event streams
#[derive(Parser, Debug)]
#[command(name = "eventline", version, about)]
pub struct Cli {
    /// Path to the YAML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Broker base URL (overrides the configuration file)
    #[arg(long, global = true, env = "EVENTLINE_BASE_URL")]
    pub base_url: Option<String>,

    /// Event type to consume (overrides the configuration file)
    #[arg(long, global = true, env = "EVENTLINE_EVENT_TYPE")]
    pub event_type: Option<String>,

    /// Bearer token sent on every broker request
    #[arg(long, global = true, env = "EVENTLINE_AUTH_TOKEN")]
    pub auth_token: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Consume all partitions of the configured event type, logging each
    /// received batch
    Consume {
        /// Directory where committed cursors are kept
        #[arg(long)]
        cursor_dir: Option<String>,
    },

    /// List the partitions of the configured event type with their
    /// available cursor ranges
    Partitions,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
