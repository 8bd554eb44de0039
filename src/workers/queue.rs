//! Bounded hand-off between the registration stage and the polling pool.
//!
//! The registration worker owns the only [`ProcessingSender`]; `send` waits
//! while the queue is full. All polling workers share one [`ProcessingQueue`].
//! Whichever worker receives a number owns it from then on.

use crate::model::OrderNumber;
use std::sync::Arc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, Mutex};

pub type ProcessingSender = mpsc::Sender<OrderNumber>;

/// Creates the processing queue. A capacity of zero is raised to one.
pub fn processing_channel(capacity: usize) -> (ProcessingSender, ProcessingQueue) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let queue = ProcessingQueue {
        receiver: Arc::new(Mutex::new(receiver)),
    };
    (sender, queue)
}

/// What a non-blocking drain found.
#[derive(Debug, Default, PartialEq)]
pub struct Drained {
    pub orders: Vec<OrderNumber>,
    /// The sender is gone and the queue is empty.
    pub closed: bool,
}

/// Shared receiving end of the processing queue.
#[derive(Clone)]
pub struct ProcessingQueue {
    receiver: Arc<Mutex<mpsc::Receiver<OrderNumber>>>,
}

impl ProcessingQueue {
    /// Waits for the next order number; `None` once the queue is closed and empty.
    ///
    /// Idle workers line up on the lock, so each number is delivered to
    /// exactly one of them.
    pub async fn recv(&self) -> Option<OrderNumber> {
        let mut receiver = self.receiver.lock().await;
        receiver.recv().await
    }

    /// Takes everything that is immediately available without waiting.
    ///
    /// Returns nothing when another worker currently holds the receiver.
    pub fn try_drain(&self) -> Drained {
        let mut drained = Drained::default();
        let Ok(mut receiver) = self.receiver.try_lock() else {
            return drained;
        };
        loop {
            match receiver.try_recv() {
                Ok(number) => drained.orders.push(number),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    drained.closed = true;
                    break;
                }
            }
        }
        drained
    }
}
