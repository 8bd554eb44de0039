//! Error types for the accrual service client.

use crate::dispatcher::DispatchError;
use thiserror::Error;

/// Errors that can occur while talking to the accrual service.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AccrualError {
    /// The call never produced a response (cancelled, timed out, network).
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The service refused to register the order.
    #[error("Order registration rejected: status {status}, body {body:?}")]
    Rejected { status: u16, body: String },

    /// The status endpoint answered with something other than 200 or 429.
    #[error("Unexpected accrual response: status {status}, body {body:?}")]
    UnexpectedStatus { status: u16, body: String },

    /// Still throttled after the cooldown retry.
    #[error("Accrual service still throttling after cooldown")]
    Throttled,

    /// The response body was not a valid accrual result.
    #[error("Malformed accrual response: {0}")]
    Decode(String),
}

impl AccrualError {
    /// True when the call stopped because of shutdown rather than a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AccrualError::Dispatch(e) if e.is_cancelled())
    }
}

impl From<serde_json::Error> for AccrualError {
    fn from(e: serde_json::Error) -> Self {
        AccrualError::Decode(e.to_string())
    }
}
