//! Configuration management for Eventline
//!
//! This module handles loading, parsing, validating, and merging
//! configuration from a YAML file, environment variables, and CLI
//! overrides.

use crate::cli::Cli;
use crate::consumer::ConsumerOptions;
use crate::error::{EventlineError, Result};
use crate::supervisor::SupervisorOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure for Eventline
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Broker endpoint and event type to consume
    pub broker: BrokerConfig,

    /// Consumption tuning
    #[serde(default)]
    pub consumer: ConsumerConfig,
}

/// Broker connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Base URL of the broker, e.g. `https://broker.example.com`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Event type to consume
    #[serde(default)]
    pub event_type: String,

    /// Optional bearer token sent on every request
    #[serde(default)]
    pub auth_token: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            event_type: String::new(),
            auth_token: None,
        }
    }
}

/// Consumption tuning configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumerConfig {
    /// Seconds between partition discovery calls; zero discovers once at
    /// startup and keeps the partition set fixed
    #[serde(default = "default_discovery_interval_secs")]
    pub discovery_interval_secs: u64,

    /// First retry delay after a recoverable failure, in milliseconds
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    /// Upper bound on the retry delay, in milliseconds
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,

    /// Fraction of the base delay added as random jitter, in `[0, 1]`
    #[serde(default = "default_backoff_jitter")]
    pub backoff_jitter: f64,

    /// Optional limit on a single handler invocation, in seconds
    #[serde(default)]
    pub handler_timeout_secs: Option<u64>,

    /// How long shutdown waits for in-flight batches before abandoning
    /// consumers, in seconds
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Directory where committed cursors are kept by the CLI
    #[serde(default = "default_cursor_dir")]
    pub cursor_dir: String,
}

fn default_discovery_interval_secs() -> u64 {
    60
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    30_000
}

fn default_backoff_jitter() -> f64 {
    0.2
}

fn default_shutdown_grace_secs() -> u64 {
    10
}

fn default_cursor_dir() -> String {
    "cursors".to_string()
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            discovery_interval_secs: default_discovery_interval_secs(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            backoff_jitter: default_backoff_jitter(),
            handler_timeout_secs: None,
            shutdown_grace_secs: default_shutdown_grace_secs(),
            cursor_dir: default_cursor_dir(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file and apply CLI overrides.
    ///
    /// A missing file is not an error; defaults are used so that a fully
    /// CLI-driven invocation works without any file on disk.
    pub fn load(path: &str, cli: &Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            let contents = std::fs::read_to_string(path)
                .map_err(|e| EventlineError::Config(format!("reading {path}: {e}")))?;
            serde_yaml::from_str(&contents)
                .map_err(|e| EventlineError::Config(format!("parsing {path}: {e}")))?
        } else {
            tracing::debug!(path, "No configuration file; using defaults");
            Self::default()
        };

        if let Some(base_url) = &cli.base_url {
            config.broker.base_url = base_url.clone();
        }
        if let Some(event_type) = &cli.event_type {
            config.broker.event_type = event_type.clone();
        }
        if let Some(auth_token) = &cli.auth_token {
            config.broker.auth_token = Some(auth_token.clone());
        }
        Ok(config)
    }

    /// Validate the merged configuration.
    pub fn validate(&self) -> Result<()> {
        if self.broker.event_type.is_empty() {
            return Err(EventlineError::Config(
                "event type must be set (broker.event_type or --event-type)".to_string(),
            ));
        }
        if !self.broker.base_url.starts_with("http://")
            && !self.broker.base_url.starts_with("https://")
        {
            return Err(EventlineError::Config(format!(
                "base URL must be http(s), got '{}'",
                self.broker.base_url
            )));
        }
        if !(0.0..=1.0).contains(&self.consumer.backoff_jitter) {
            return Err(EventlineError::Config(format!(
                "backoff jitter must be within [0, 1], got {}",
                self.consumer.backoff_jitter
            )));
        }
        if self.consumer.initial_backoff_ms == 0 {
            return Err(EventlineError::Config(
                "initial backoff must be positive".to_string(),
            ));
        }
        if self.consumer.max_backoff_ms < self.consumer.initial_backoff_ms {
            return Err(EventlineError::Config(format!(
                "maximum backoff {}ms is below initial backoff {}ms",
                self.consumer.max_backoff_ms, self.consumer.initial_backoff_ms
            )));
        }
        Ok(())
    }

    /// Supervisor options derived from this configuration.
    pub fn supervisor_options(&self) -> SupervisorOptions {
        SupervisorOptions {
            discovery_interval: Duration::from_secs(self.consumer.discovery_interval_secs),
            shutdown_grace: Duration::from_secs(self.consumer.shutdown_grace_secs),
            consumer: ConsumerOptions {
                initial_backoff: Duration::from_millis(self.consumer.initial_backoff_ms),
                max_backoff: Duration::from_millis(self.consumer.max_backoff_ms),
                backoff_jitter: self.consumer.backoff_jitter,
                handler_timeout: self
                    .consumer
                    .handler_timeout_secs
                    .map(Duration::from_secs),
            },
        }
    }
}
