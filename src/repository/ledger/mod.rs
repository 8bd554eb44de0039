//! In-memory ledger actor holding orders and balances.

pub mod actor;
pub mod client;
pub mod message;

pub use actor::*;
pub use client::*;
pub use message::*;

/// Creates a ledger actor and its client.
pub fn new() -> (LedgerActor, LedgerClient) {
    LedgerActor::new(32)
}
