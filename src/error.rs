//! Error types for Eventline
//!
//! This module defines the closed error taxonomy used throughout the
//! consumer, using `thiserror` for ergonomic error handling. Every failure
//! is classified exactly once, at the boundary where it occurs, into one of
//! these kinds; the partition consumer's retry policy then only asks
//! [`EventlineError::is_recoverable`].

use crate::handler::HandlerError;
use thiserror::Error;

/// Main error type for Eventline operations
///
/// Recoverable kinds cause the affected partition consumer to back off and
/// reconnect from its last committed cursor. Unrecoverable kinds terminate
/// that partition consumer and are reported to the supervisor; sibling
/// partitions keep running.
#[derive(Error, Debug)]
pub enum EventlineError {
    /// Network or broker-transient failure (connection reset, timeout,
    /// 5xx-class responses). Recoverable.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Malformed stream content. Unrecoverable: once a byte stream fails to
    /// decode, its position can no longer be trusted for resumption.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Authentication or authorization rejected by the broker. Unrecoverable.
    #[error("Authorization error: {0}")]
    Authorization(String),

    /// Event type or partition no longer exists on the broker. Unrecoverable.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Cursor store failure. Recoverable: the batch is redelivered after
    /// backoff and commit is attempted again.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Handler-reported failure. Recoverable unless the handler explicitly
    /// flagged it unrecoverable.
    #[error("Handler error: {0}")]
    Handler(#[from] HandlerError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EventlineError {
    /// Whether the partition consumer should retry after backoff (true) or
    /// terminate and report to the supervisor (false).
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Transport(_) | Self::Storage(_) => true,
            Self::Handler(e) => e.is_recoverable(),
            Self::Decode(_) | Self::Authorization(_) | Self::NotFound(_) | Self::Config(_) => false,
        }
    }

    /// Classify a non-success HTTP status from the broker.
    ///
    /// 401/403 map to authorization failures, 404/410 to a removed event
    /// type or partition; everything else (including all 5xx) is treated as
    /// broker-transient.
    pub fn from_status(status: reqwest::StatusCode, context: impl Into<String>) -> Self {
        let context = context.into();
        match status.as_u16() {
            401 | 403 => Self::Authorization(format!("{status}: {context}")),
            404 | 410 => Self::NotFound(format!("{status}: {context}")),
            _ => Self::Transport(format!("{status}: {context}")),
        }
    }
}

impl From<reqwest::Error> for EventlineError {
    fn from(e: reqwest::Error) -> Self {
        // Connect failures, timeouts, and mid-body resets all land here;
        // status-code classification happens in from_status before the body
        // is consumed.
        Self::Transport(e.to_string())
    }
}

/// Result type alias for Eventline operations
pub type Result<T> = std::result::Result<T, EventlineError>;
