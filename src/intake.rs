//! Order upload flow: the producer side of the pipeline.
//!
//! Validation errors are returned synchronously and the order never enters
//! the pipeline. Everything after the hand-off is fire-and-forget; the user
//! observes progress only through the stored order status.

use crate::lifecycle::OrderSender;
use crate::model::{OrderNumber, OrderRecord, UserId};
use crate::repository::{LedgerClient, RepositoryError};
use crate::validation::OrderNumberValidator;
use thiserror::Error;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Newly created and queued for registration.
    Accepted(OrderRecord),
    /// The same user uploaded this number before; nothing was queued.
    AlreadyUploaded(OrderRecord),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum IntakeError {
    #[error("Invalid order number: {0:?}")]
    InvalidNumber(String),

    #[error("Order {0} was uploaded by another user")]
    OwnedByAnotherUser(OrderNumber),

    /// The order is stored as `NEW` but the pipeline is not accepting work;
    /// the next startup picks it up.
    #[error("Pipeline closed, order {0} will be processed after restart")]
    PipelineClosed(OrderNumber),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Validates, stores and enqueues uploaded orders.
#[derive(Clone)]
pub struct OrderIntake {
    validator: OrderNumberValidator,
    ledger: LedgerClient,
    sender: OrderSender,
}

impl OrderIntake {
    pub fn new(ledger: LedgerClient, sender: OrderSender) -> Self {
        Self {
            validator: OrderNumberValidator::new(),
            ledger,
            sender,
        }
    }

    #[instrument(skip(self))]
    pub async fn submit(&self, user: UserId, raw_number: &str) -> Result<SubmitOutcome, IntakeError> {
        let raw_number = raw_number.trim();
        if !self.validator.validate(raw_number) {
            warn!("Rejected invalid order number");
            return Err(IntakeError::InvalidNumber(raw_number.to_string()));
        }

        let number = OrderNumber::from(raw_number);
        let (order, created) = self.ledger.create_order(user, number.clone()).await?;
        if !created {
            if order.user_id != user {
                warn!(owner = %order.user_id, "Order belongs to another user");
                return Err(IntakeError::OwnedByAnotherUser(number));
            }
            info!("Order already uploaded");
            return Ok(SubmitOutcome::AlreadyUploaded(order));
        }

        if let Err(e) = self.sender.send(number.clone()).await {
            warn!(error = %e, "Order left for restart recovery");
            return Err(IntakeError::PipelineClosed(number));
        }
        info!("Order accepted");
        Ok(SubmitOutcome::Accepted(order))
    }

    /// Gives up the intake handle held by this flow.
    pub fn into_sender(self) -> OrderSender {
        self.sender
    }
}
