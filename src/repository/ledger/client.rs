use crate::model::{Balance, OrderNumber, OrderRecord, OrderStatus, UserId};
use crate::repository::ledger::LedgerRequest;
use crate::repository::{OrderRepository, RepositoryError};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tracing::instrument;

/// Client for the [`LedgerActor`](super::LedgerActor). Cheap to clone.
#[derive(Clone)]
pub struct LedgerClient {
    sender: mpsc::Sender<LedgerRequest>,
}

impl LedgerClient {
    pub fn new(sender: mpsc::Sender<LedgerRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, RepositoryError>>) -> LedgerRequest,
    ) -> Result<T, RepositoryError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| RepositoryError::LedgerClosed)?;
        response.await.map_err(|_| RepositoryError::LedgerDropped)?
    }

    /// Get-or-create. Returns the stored order and whether it was created by
    /// this call.
    #[instrument(skip(self))]
    pub async fn create_order(
        &self,
        user: UserId,
        number: OrderNumber,
    ) -> Result<(OrderRecord, bool), RepositoryError> {
        self.request(|respond_to| LedgerRequest::CreateOrder {
            user,
            number,
            respond_to,
        })
        .await
    }

    pub async fn order(&self, number: OrderNumber) -> Result<Option<OrderRecord>, RepositoryError> {
        self.request(|respond_to| LedgerRequest::GetOrder { number, respond_to })
            .await
    }

    /// Orders uploaded by `user`, oldest first.
    pub async fn orders_for_user(&self, user: UserId) -> Result<Vec<OrderRecord>, RepositoryError> {
        self.request(|respond_to| LedgerRequest::OrdersForUser { user, respond_to })
            .await
    }

    pub async fn balance(&self, user: UserId) -> Result<Balance, RepositoryError> {
        self.request(|respond_to| LedgerRequest::GetBalance { user, respond_to })
            .await
    }

    /// Returns `false` when the order was already final and nothing changed.
    pub async fn credit_order(
        &self,
        number: OrderNumber,
        accrual: f64,
        status: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        self.request(|respond_to| LedgerRequest::CreditOrder {
            number,
            accrual,
            status,
            respond_to,
        })
        .await
    }
}

#[async_trait]
impl OrderRepository for LedgerClient {
    async fn unprocessed_order_numbers(&self) -> Result<Vec<OrderNumber>, RepositoryError> {
        self.request(|respond_to| LedgerRequest::Unprocessed { respond_to })
            .await
    }

    #[instrument(skip(self))]
    async fn update_order_status(
        &self,
        number: &OrderNumber,
        status: OrderStatus,
        accrual: f64,
    ) -> Result<(), RepositoryError> {
        let number = number.clone();
        self.request(|respond_to| LedgerRequest::UpdateStatus {
            number,
            status,
            accrual,
            respond_to,
        })
        .await
        .map(|_| ())
    }

    #[instrument(skip(self))]
    async fn increase_balance_and_update_order(
        &self,
        number: &OrderNumber,
        accrual: f64,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        self.credit_order(number.clone(), accrual, status).await.map(|_| ())
    }
}
