use crate::model::{Balance, OrderNumber, OrderRecord, OrderStatus, UserId};
use crate::repository::RepositoryError;
use tokio::sync::oneshot;

/// Type alias for the one-shot response channel used by the ledger.
pub type Response<T> = oneshot::Sender<Result<T, RepositoryError>>;

/// Requests processed, one at a time, by the [`LedgerActor`](super::LedgerActor).
#[derive(Debug)]
pub enum LedgerRequest {
    CreateOrder {
        user: UserId,
        number: OrderNumber,
        respond_to: Response<(OrderRecord, bool)>,
    },
    GetOrder {
        number: OrderNumber,
        respond_to: Response<Option<OrderRecord>>,
    },
    OrdersForUser {
        user: UserId,
        respond_to: Response<Vec<OrderRecord>>,
    },
    GetBalance {
        user: UserId,
        respond_to: Response<Balance>,
    },
    Unprocessed {
        respond_to: Response<Vec<OrderNumber>>,
    },
    UpdateStatus {
        number: OrderNumber,
        status: OrderStatus,
        accrual: f64,
        respond_to: Response<bool>,
    },
    CreditOrder {
        number: OrderNumber,
        accrual: f64,
        status: OrderStatus,
        respond_to: Response<bool>,
    },
}
