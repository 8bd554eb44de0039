use crate::model::{Balance, OrderNumber, OrderRecord, OrderStatus, UserId};
use crate::repository::ledger::{LedgerClient, LedgerRequest};
use crate::repository::RepositoryError;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// In-memory order and balance storage.
///
/// The actor owns all state and handles one request at a time, so every
/// operation, including the combined credit-and-update, is serializable
/// without locks.
pub struct LedgerActor {
    receiver: mpsc::Receiver<LedgerRequest>,
    orders: HashMap<OrderNumber, OrderRecord>,
    /// Order numbers in upload order.
    uploads: Vec<OrderNumber>,
    balances: HashMap<UserId, Balance>,
}

impl LedgerActor {
    /// A `buffer_size` of zero is raised to one.
    pub fn new(buffer_size: usize) -> (Self, LedgerClient) {
        let (sender, receiver) = mpsc::channel(buffer_size.max(1));
        let actor = Self {
            receiver,
            orders: HashMap::new(),
            uploads: Vec::new(),
            balances: HashMap::new(),
        };
        (actor, LedgerClient::new(sender))
    }

    /// Runs the actor's event loop, processing messages until every client is dropped.
    pub async fn run(mut self) {
        info!("Ledger started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                LedgerRequest::CreateOrder {
                    user,
                    number,
                    respond_to,
                } => {
                    let _ = respond_to.send(Ok(self.create_order(user, number)));
                }
                LedgerRequest::GetOrder { number, respond_to } => {
                    let order = self.orders.get(&number).cloned();
                    debug!(order = %number, found = order.is_some(), "Get order");
                    let _ = respond_to.send(Ok(order));
                }
                LedgerRequest::OrdersForUser { user, respond_to } => {
                    let orders = self
                        .uploads
                        .iter()
                        .filter_map(|number| self.orders.get(number))
                        .filter(|order| order.user_id == user)
                        .cloned()
                        .collect();
                    let _ = respond_to.send(Ok(orders));
                }
                LedgerRequest::GetBalance { user, respond_to } => {
                    let balance = self.balances.get(&user).copied().unwrap_or_default();
                    let _ = respond_to.send(Ok(balance));
                }
                LedgerRequest::Unprocessed { respond_to } => {
                    let numbers: Vec<OrderNumber> = self
                        .uploads
                        .iter()
                        .filter(|number| {
                            self.orders
                                .get(*number)
                                .is_some_and(|order| !order.status.is_terminal())
                        })
                        .cloned()
                        .collect();
                    debug!(count = numbers.len(), "Unprocessed orders");
                    let _ = respond_to.send(Ok(numbers));
                }
                LedgerRequest::UpdateStatus {
                    number,
                    status,
                    accrual,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.update_status(number, status, accrual));
                }
                LedgerRequest::CreditOrder {
                    number,
                    accrual,
                    status,
                    respond_to,
                } => {
                    let _ = respond_to.send(self.credit_order(number, accrual, status));
                }
            }
        }

        info!(orders = self.orders.len(), users = self.balances.len(), "Ledger shutdown");
    }

    fn create_order(&mut self, user: UserId, number: OrderNumber) -> (OrderRecord, bool) {
        if let Some(existing) = self.orders.get(&number) {
            debug!(order = %number, owner = %existing.user_id, "Order exists");
            return (existing.clone(), false);
        }

        let order = OrderRecord::new(number.clone(), user, Utc::now());
        self.orders.insert(number.clone(), order.clone());
        self.uploads.push(number.clone());
        info!(order = %number, %user, size = self.orders.len(), "Order created");
        (order, true)
    }

    fn update_status(
        &mut self,
        number: OrderNumber,
        status: OrderStatus,
        accrual: f64,
    ) -> Result<bool, RepositoryError> {
        validate_accrual(&number, accrual)?;
        let order = self
            .orders
            .get_mut(&number)
            .ok_or_else(|| RepositoryError::OrderNotFound(number.clone()))?;

        if order.status.is_terminal() {
            debug!(order = %number, current = %order.status, requested = %status, "Order already final, update ignored");
            return Ok(false);
        }

        order.status = status;
        order.accrual = accrual;
        debug!(order = %number, %status, accrual, "Order updated");
        Ok(true)
    }

    /// The status transition is the precondition for the credit: only an order
    /// that is still unresolved can move to `PROCESSED` and pay out.
    fn credit_order(
        &mut self,
        number: OrderNumber,
        accrual: f64,
        status: OrderStatus,
    ) -> Result<bool, RepositoryError> {
        validate_accrual(&number, accrual)?;
        let order = self
            .orders
            .get_mut(&number)
            .ok_or_else(|| RepositoryError::OrderNotFound(number.clone()))?;

        if order.status.is_terminal() {
            debug!(order = %number, current = %order.status, "Order already final, credit skipped");
            return Ok(false);
        }

        order.status = status;
        order.accrual = accrual;
        if status != OrderStatus::Processed {
            warn!(order = %number, %status, "Credit requested for non-processed status, balance untouched");
            return Ok(true);
        }

        let balance = self.balances.entry(order.user_id).or_default();
        balance.current += accrual;
        info!(order = %number, user = %order.user_id, accrual, current = balance.current, "Balance credited");
        Ok(true)
    }
}

fn validate_accrual(number: &OrderNumber, accrual: f64) -> Result<(), RepositoryError> {
    if accrual.is_finite() && accrual >= 0.0 {
        Ok(())
    } else {
        Err(RepositoryError::InvalidAccrual {
            number: number.clone(),
            accrual,
        })
    }
}
