//! Error types for order and balance persistence.

use crate::model::OrderNumber;
use thiserror::Error;

/// Errors that can occur while persisting pipeline results.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RepositoryError {
    /// The order does not exist in storage.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderNumber),

    /// Accruals are non-negative amounts.
    #[error("Invalid accrual for order {number}: {accrual}")]
    InvalidAccrual { number: OrderNumber, accrual: f64 },

    /// The storage backend failed.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The ledger actor is no longer running.
    #[error("Ledger closed")]
    LedgerClosed,

    /// The ledger dropped the request without answering it.
    #[error("Ledger dropped response channel")]
    LedgerDropped,
}
