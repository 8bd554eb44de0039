//! Persistence seam of the pipeline.
//!
//! The pipeline only ever needs three things from storage: the orders that are
//! still unresolved (to seed the polling workers after a restart), a plain
//! status update, and a combined "credit the owner and update the order"
//! operation. [`ledger`] provides an in-memory implementation.

pub mod error;
pub mod ledger;

pub use error::*;
pub use ledger::{LedgerActor, LedgerClient};

use crate::model::{OrderNumber, OrderStatus};
use async_trait::async_trait;

/// Order/balance storage as seen by the polling workers.
///
/// Implementations must make terminal updates idempotent: a terminal order is
/// never modified again, and a credit is applied only as part of moving a
/// non-terminal order to `PROCESSED`. Workers rely on this because they retry
/// any update whose outcome they could not observe.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Numbers of all orders in `NEW` or `PROCESSING`, oldest upload first.
    async fn unprocessed_order_numbers(&self) -> Result<Vec<OrderNumber>, RepositoryError>;

    /// Sets status and accrual of an order.
    async fn update_order_status(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: f64,
    ) -> Result<(), RepositoryError>;

    /// Atomically credits the owner's balance with `accrual` and sets the
    /// order's status and accrual.
    async fn increase_balance_and_update_order(
        &self,
        number: &OrderNumber,
        accrual: f64,
        status: OrderStatus,
    ) -> Result<(), RepositoryError>;
}
