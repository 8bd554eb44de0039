//! Error types for the rate-limited dispatcher.

use std::time::Duration;
use thiserror::Error;

/// Failures of a single outbound call.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TransportError {
    /// The request could not be sent or the response could not be read.
    #[error("Request failed: {0}")]
    Request(String),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError::Request(e.to_string())
    }
}

/// Errors returned to callers of [`DispatchClient::dispatch`](crate::clients::DispatchClient::dispatch).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DispatchError {
    /// The shutdown signal fired before a response arrived.
    #[error("Dispatch cancelled")]
    Cancelled,

    /// No response arrived within the bounded wait.
    #[error("No response within {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The dispatcher actor is no longer accepting requests.
    #[error("Dispatcher closed")]
    DispatcherClosed,

    /// The dispatcher dropped the request without answering it.
    #[error("Dispatcher dropped response channel")]
    DispatcherDropped,
}

impl DispatchError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, DispatchError::Cancelled)
    }
}
