use crate::clients::AccrualService;
use crate::lifecycle::Shutdown;
use crate::model::OrderNumber;
use crate::workers::{ProcessingSender, WorkerExit};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Single worker that registers newly submitted orders with the accrual
/// service and forwards them to the polling pool.
///
/// ```text
/// WAITING ──order──▶ REGISTERING ──ok──▶ FORWARDING ──sent──▶ WAITING
///    │                    │                   │
///    └─ intake closed /   └─ rejected /       └─ cancelled / pool gone
///       cancelled            cancelled
///                 ──────────────▶ STOPPED
/// ```
///
/// A registration failure stops the stage: the accrual client already
/// absorbs throttling, so anything left is not transient. The failed order
/// stays `NEW` in storage and is picked up again by the next startup.
pub struct RegistrationWorker {
    intake: mpsc::Receiver<OrderNumber>,
    processing: ProcessingSender,
    accrual: Arc<dyn AccrualService>,
}

impl RegistrationWorker {
    pub fn new(
        intake: mpsc::Receiver<OrderNumber>,
        processing: ProcessingSender,
        accrual: Arc<dyn AccrualService>,
    ) -> Self {
        Self {
            intake,
            processing,
            accrual,
        }
    }

    /// Runs until the intake closes, `shutdown` fires, or registration fails.
    ///
    /// Consumes the worker, so the processing sender is dropped on every exit
    /// path and the polling pool observes end-of-stream.
    pub async fn run(mut self, shutdown: Shutdown) -> WorkerExit {
        info!("Registration worker started");
        let mut registered: u64 = 0;

        let exit = loop {
            let number = tokio::select! {
                _ = shutdown.wait() => break WorkerExit::Cancelled,
                received = self.intake.recv() => match received {
                    Some(number) => number,
                    None => break WorkerExit::IntakeClosed,
                },
            };
            debug!(order = %number, "Registering");

            if let Err(e) = self.accrual.register_order(&shutdown, &number).await {
                if e.is_cancelled() {
                    break WorkerExit::Cancelled;
                }
                error!(order = %number, error = %e, "Registration failed, stopping registration stage");
                break WorkerExit::RegistrationFailed(e);
            }

            tokio::select! {
                _ = shutdown.wait() => break WorkerExit::Cancelled,
                sent = self.processing.send(number.clone()) => {
                    if sent.is_err() {
                        error!(order = %number, "Polling pool is gone");
                        break WorkerExit::DownstreamClosed;
                    }
                }
            }
            registered += 1;
            debug!(order = %number, "Forwarded to polling pool");
        };

        info!(registered, reason = %exit, "Registration worker stopped");
        exit
    }
}
