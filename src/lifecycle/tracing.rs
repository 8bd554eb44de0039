//! # Observability & Tracing
//!
//! [`setup_tracing`] initializes structured logging with the `tracing` crate.
//! Every stage logs with structured fields rather than formatted strings, so
//! the output can be filtered by order or worker:
//!
//! ```text
//! INFO Dispatcher started interval_ms=1000
//! INFO Accrual worker started worker=0 seeded=2
//! INFO register_order{order=79927398713}: Order registered
//! INFO New order received worker=0 order=79927398713
//! INFO Balance credited order=79927398713 user=user_1 accrual=100.0 current=100.0
//! INFO Order resolved worker=0 order=79927398713 status=PROCESSED accrual=100.0
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Default: info
//! cargo run
//!
//! # Every released request and polling pass
//! RUST_LOG=debug cargo run
//!
//! # Only the dispatcher
//! RUST_LOG=loyalty_accrual::dispatcher=debug cargo run
//! ```

use tracing_subscriber::EnvFilter;

/// Initializes the global subscriber: `RUST_LOG` filter (default `info`),
/// compact format, no module targets.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
