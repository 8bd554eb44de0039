//! Pipeline orchestration and lifecycle management.
//!
//! - [`AccrualPipeline`] - starts the stages, owns their task handles, drives shutdown
//! - [`Shutdown`] / [`ShutdownTrigger`] - the single cancellation signal threaded through every stage
//! - [`OrderSender`] - bounded intake handle for newly created orders
//! - [`setup_tracing`] - initializes the tracing/logging infrastructure

pub mod error;
pub mod intake;
pub mod pipeline;
pub mod shutdown;
pub mod tracing;

pub use self::error::*;
pub use self::intake::*;
pub use self::pipeline::*;
pub use self::shutdown::{Shutdown, ShutdownTrigger};
pub use self::tracing::setup_tracing;
