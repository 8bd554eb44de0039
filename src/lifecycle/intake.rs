use crate::lifecycle::PipelineError;
use crate::model::OrderNumber;
use tokio::sync::mpsc;
use tracing::debug;

/// Creates the bounded intake channel feeding the registration stage.
///
/// A capacity of zero is raised to one.
pub fn order_channel(capacity: usize) -> (OrderSender, mpsc::Receiver<OrderNumber>) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    (OrderSender { sender }, receiver)
}

/// Producer handle for newly created orders.
///
/// `send` waits while the channel is full; an order number is never dropped
/// to relieve backpressure.
#[derive(Debug, Clone)]
pub struct OrderSender {
    sender: mpsc::Sender<OrderNumber>,
}

impl OrderSender {
    pub async fn send(&self, number: OrderNumber) -> Result<(), PipelineError> {
        self.sender
            .send(number)
            .await
            .map_err(|e| PipelineError::IntakeClosed(e.0))?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Gives up this handle. The registration stage sees end-of-stream once
    /// every clone is closed.
    pub fn close(self) {
        debug!("Order intake handle closed");
    }
}
