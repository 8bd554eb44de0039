//! # Rate-Limited Dispatcher
//!
//! Every outbound call to the accrual service passes through one
//! [`DispatcherActor`]. Callers hold a cheap, cloneable
//! [`DispatchClient`](crate::clients::DispatchClient) and await their own
//! private response slot; the actor is the only owner of the interval clock.
//!
//! ```text
//! caller ──┐
//! caller ──┼─▶ [unbounded queue] ─▶ DispatcherActor ──tick──▶ spawn(Transport::send)
//! caller ──┘                                                        │
//!     ▲                                                              │
//!     ├──────────────────────── released ◀──────────┘                  │
//!     └──────────────────────── oneshot response ◀───────────────────┘
//! ```
//!
//! A caller may wait in the queue for as long as the backlog takes to drain;
//! its response timeout starts only once the gate releases its call.

pub mod actor;
pub mod error;
pub mod message;
pub mod transport;

pub use actor::*;
pub use error::*;
pub use message::*;
pub use transport::*;

use crate::clients::DispatchClient;
use std::sync::Arc;
use std::time::Duration;

/// Creates a dispatcher actor and its client.
pub fn new(
    transport: Arc<dyn Transport>,
    interval: Duration,
    response_timeout: Duration,
) -> (DispatcherActor, DispatchClient) {
    DispatcherActor::new(transport, interval, response_timeout)
}
