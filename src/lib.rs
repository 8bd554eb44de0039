//! # Loyalty Accrual
//!
//! > **Order-accrual reconciliation for a loyalty-points service.**
//!
//! Users upload order numbers; an external accrual service decides, eventually,
//! how many points each order earns. This crate moves every uploaded order from
//! `NEW` to a terminal status (`PROCESSED` or `INVALID`) and credits the
//! owner's balance exactly once, while never calling the accrual service faster
//! than its configured rate.
//!
//! ## 🏗️ Design
//!
//! ```text
//! OrderIntake ─▶ [intake queue] ─▶ RegistrationWorker ─▶ [processing queue] ─▶ AccrualWorker × N
//!                                          │                                        │
//!                                          └──────────▶ DispatcherActor ◀───────────┘
//!                                                            │ one request per tick
//!                                                            ▼
//!                                                      accrual service
//! ```
//!
//! ### 1. One owner per piece of mutable state
//! The request clock is owned by the [`DispatcherActor`](dispatcher::DispatcherActor),
//! orders and balances by the [`LedgerActor`](repository::LedgerActor), and each
//! polling worker privately owns its [`PendingSet`](workers::PendingSet). Everything
//! else talks to them through channels.
//!
//! ### 2. Bounded queues, blocking producers
//! Both queues between stages are bounded. A full queue makes the producer wait;
//! an order number is never dropped.
//!
//! ### 3. Idempotent crediting
//! Delivery is at-least-once: registration treats `409 Conflict` as success and
//! the ledger refuses to touch an order that is already terminal, so replaying
//! the same terminal result never credits twice.
//!
//! ### 4. One shutdown signal
//! A single [`Shutdown`](lifecycle::Shutdown) is threaded through every blocking
//! wait. [`AccrualPipeline::shutdown`](lifecycle::AccrualPipeline::shutdown)
//! fires it and waits for every task with an upper bound.
//!
//! ## 🗺️ Module Tour
//!
//! - [`model`]: order numbers, statuses, records, balances.
//! - [`validation`]: Luhn check applied before an order is accepted.
//! - [`dispatcher`]: the rate-limited gate in front of the accrual service.
//! - [`clients`]: [`DispatchClient`](clients::DispatchClient) and the typed
//!   [`AccrualClient`](clients::AccrualClient) (register, fetch, 429 handling).
//! - [`repository`]: the [`OrderRepository`](repository::OrderRepository) seam and
//!   its in-memory ledger actor.
//! - [`workers`]: the registration stage and the polling pool.
//! - [`lifecycle`]: pipeline start, shutdown and tracing setup.
//! - [`intake`]: the user-facing upload flow.
//! - [`config`]: flags and environment.
//! - [`mock`]: test doubles for the accrual service and the HTTP transport.
//!
//! ## 🚀 Quick Start
//!
//! ```bash
//! printf '1 79927398713\n' | RUST_LOG=info cargo run -- -r http://localhost:8081
//! cargo test
//! ```

pub mod clients;
pub mod config;
pub mod dispatcher;
pub mod intake;
pub mod lifecycle;
pub mod mock;
pub mod model;
pub mod repository;
pub mod validation;
pub mod workers;
