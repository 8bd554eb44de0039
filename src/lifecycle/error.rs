//! Error types for the pipeline lifecycle.

use crate::model::OrderNumber;
use crate::repository::RepositoryError;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PipelineError {
    /// The startup query for unresolved orders failed.
    #[error("Failed to load unresolved orders: {0}")]
    Bootstrap(#[from] RepositoryError),

    /// The registration stage is no longer accepting orders.
    #[error("Order intake closed, order {0} not queued")]
    IntakeClosed(OrderNumber),

    /// Storage could not be read while waiting for orders to resolve.
    #[error("Failed to check unresolved orders: {0}")]
    Drain(RepositoryError),

    /// Some tasks did not finish within the shutdown timeout and were aborted.
    #[error("Shutdown timed out, unfinished tasks: {unfinished:?}")]
    ShutdownTimedOut { unfinished: Vec<String> },
}
