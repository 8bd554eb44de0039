use crate::clients::AccrualService;
use crate::lifecycle::Shutdown;
use crate::model::{AccrualResult, OrderNumber};
use crate::repository::{OrderRepository, RepositoryError};
use crate::workers::{PendingSet, ProcessingQueue, WorkerExit};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{self, Instant};
use tracing::{debug, error, info, warn};

/// Outcome of polling one order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PollOutcome {
    Resolved,
    Pending,
    Cancelled,
}

/// One member of the polling pool.
///
/// Owns a private [`PendingSet`], seeded with its slice of the startup backlog
/// and grown from the shared processing queue. Each iteration:
///
/// 1. If nothing is pending, block once on the queue (or shutdown).
/// 2. Drain whatever else is already queued, without waiting.
/// 3. Poll every due order once, stopping early on shutdown.
///
/// The worker exits when the queue is closed and nothing is pending.
pub struct AccrualWorker {
    id: usize,
    queue: ProcessingQueue,
    pending: PendingSet,
    accrual: Arc<dyn AccrualService>,
    repository: Arc<dyn OrderRepository>,
    min_poll_interval: Duration,
    queue_closed: bool,
}

impl AccrualWorker {
    pub fn new(
        id: usize,
        queue: ProcessingQueue,
        seed: Vec<OrderNumber>,
        accrual: Arc<dyn AccrualService>,
        repository: Arc<dyn OrderRepository>,
        min_poll_interval: Duration,
    ) -> Self {
        Self {
            id,
            queue,
            pending: seed.into_iter().collect(),
            accrual,
            repository,
            min_poll_interval,
            queue_closed: false,
        }
    }

    pub async fn run(mut self, shutdown: Shutdown) -> WorkerExit {
        let worker = self.id;
        info!(worker, seeded = self.pending.len(), "Accrual worker started");

        let exit = loop {
            if shutdown.is_triggered() {
                break WorkerExit::Cancelled;
            }

            if self.pending.is_empty() {
                if self.queue_closed {
                    break WorkerExit::QueueDrained;
                }
                debug!(worker, "Waiting for new orders");
                tokio::select! {
                    _ = shutdown.wait() => break WorkerExit::Cancelled,
                    received = self.queue.recv() => self.accept(received),
                }
                continue;
            }

            self.absorb_queued();

            let due = self.pending.due(Instant::now(), self.min_poll_interval);
            if due.is_empty() {
                if self.wait_until_due(&shutdown).await {
                    break WorkerExit::Cancelled;
                }
                continue;
            }

            if self.poll_pass(&shutdown, due).await == PollOutcome::Cancelled {
                break WorkerExit::Cancelled;
            }
            tokio::task::yield_now().await;
        };

        info!(worker, pending = self.pending.len(), reason = %exit, "Accrual worker stopped");
        exit
    }

    fn accept(&mut self, received: Option<OrderNumber>) {
        match received {
            Some(number) => {
                info!(worker = self.id, order = %number, "New order received");
                self.pending.insert(number);
            }
            None => {
                debug!(worker = self.id, "Processing queue closed");
                self.queue_closed = true;
            }
        }
    }

    fn absorb_queued(&mut self) {
        if self.queue_closed {
            return;
        }
        let drained = self.queue.try_drain();
        for number in drained.orders {
            info!(worker = self.id, order = %number, "New order received");
            self.pending.insert(number);
        }
        if drained.closed {
            debug!(worker = self.id, "Processing queue closed");
            self.queue_closed = true;
        }
    }

    /// Sleeps until the earliest pending order is due again, waking early for
    /// new orders. Returns `true` on shutdown.
    async fn wait_until_due(&mut self, shutdown: &Shutdown) -> bool {
        let Some(wake_at) = self.pending.next_due(self.min_poll_interval) else {
            return false;
        };

        if self.queue_closed {
            tokio::select! {
                _ = shutdown.wait() => true,
                _ = time::sleep_until(wake_at) => false,
            }
        } else {
            tokio::select! {
                _ = shutdown.wait() => true,
                _ = time::sleep_until(wake_at) => false,
                received = self.queue.recv() => {
                    self.accept(received);
                    false
                }
            }
        }
    }

    async fn poll_pass(&mut self, shutdown: &Shutdown, due: Vec<OrderNumber>) -> PollOutcome {
        debug!(worker = self.id, due = due.len(), pending = self.pending.len(), "Polling pass");
        for number in due {
            if shutdown.is_triggered() {
                return PollOutcome::Cancelled;
            }
            if self.poll_order(shutdown, &number).await == PollOutcome::Cancelled {
                return PollOutcome::Cancelled;
            }
        }
        PollOutcome::Pending
    }

    async fn poll_order(&mut self, shutdown: &Shutdown, number: &OrderNumber) -> PollOutcome {
        let worker = self.id;
        let result = self.accrual.fetch_accrual_result(shutdown, number).await;
        self.pending.mark_polled(number, Instant::now());
        let attempts = self.pending.get(number).map_or(0, |entry| entry.attempts);

        let result = match result {
            Ok(result) => result,
            Err(e) if e.is_cancelled() => return PollOutcome::Cancelled,
            Err(e) => {
                warn!(worker, order = %number, attempts, error = %e, "Fetching accrual failed, will retry");
                return PollOutcome::Pending;
            }
        };

        if !result.status.is_terminal() {
            if let Err(e) = self
                .repository
                .update_order_status(number, result.status, result.accrual)
                .await
            {
                warn!(worker, order = %number, error = %e, "Failed to record interim status");
            }
            debug!(worker, order = %number, attempts, status = %result.status, "Still pending");
            return PollOutcome::Pending;
        }

        match self.persist_terminal(&result).await {
            Ok(()) => {
                self.pending.remove(number);
                info!(worker, order = %number, attempts, status = %result.status, accrual = result.accrual, "Order resolved");
                PollOutcome::Resolved
            }
            Err(e) => {
                error!(worker, order = %number, attempts, error = %e, "Failed to persist final status, will retry");
                PollOutcome::Pending
            }
        }
    }

    async fn persist_terminal(&self, result: &AccrualResult) -> Result<(), RepositoryError> {
        if result.credits_balance() {
            self.repository
                .increase_balance_and_update_order(&result.order, result.accrual, result.status)
                .await
        } else {
            self.repository
                .update_order_status(&result.order, result.status, result.accrual)
                .await
        }
    }
}
