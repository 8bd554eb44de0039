//! # Pipeline Stages
//!
//! ```text
//! intake ─▶ RegistrationWorker ─▶ [ProcessingQueue] ─▶ AccrualWorker × N ─▶ OrderRepository
//! ```
//!
//! Stages talk only through channels. Each polling worker owns its
//! [`PendingSet`] outright; the only state shared between workers is the
//! receiving end of the processing queue.

pub mod accrual;
pub mod pending;
pub mod queue;
pub mod registration;

pub use accrual::*;
pub use pending::*;
pub use queue::*;
pub use registration::*;

use crate::clients::AccrualError;
use std::fmt::Display;

/// Why a pipeline worker stopped.
#[derive(Debug, Clone, PartialEq)]
pub enum WorkerExit {
    /// No more new orders (registration stage).
    IntakeClosed,
    /// Processing queue closed and nothing left to poll (polling worker).
    QueueDrained,
    /// The shutdown signal fired.
    Cancelled,
    RegistrationFailed(AccrualError),
    /// Every polling worker is gone.
    DownstreamClosed,
}

impl Display for WorkerExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerExit::IntakeClosed => f.write_str("intake closed"),
            WorkerExit::QueueDrained => f.write_str("queue drained"),
            WorkerExit::Cancelled => f.write_str("cancelled"),
            WorkerExit::RegistrationFailed(e) => write!(f, "registration failed: {e}"),
            WorkerExit::DownstreamClosed => f.write_str("polling pool closed"),
        }
    }
}
