//! Client-side handles for the accrual service.
//!
//! - [`DispatchClient`] queues raw requests behind the rate-limited dispatcher.
//! - [`AccrualClient`] turns "register order" and "fetch accrual result" into
//!   requests and interprets the responses.

pub mod accrual_client;
pub mod dispatch_client;
pub mod error;

pub use accrual_client::*;
pub use dispatch_client::*;
pub use error::*;
