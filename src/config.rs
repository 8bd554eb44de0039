//! Runtime configuration.
//!
//! Every flag can also be set through the environment, and a `.env` file in
//! the working directory is loaded first when present.

use clap::Parser;
use std::time::Duration;

/// Command-line / environment configuration of the binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "loyalty-accrual")]
#[command(version, about = "Reconciles uploaded orders with the accrual service")]
pub struct Config {
    /// Base URL of the accrual calculation service
    #[arg(short = 'r', long, env = "ACCRUAL_SYSTEM_ADDRESS", default_value = "http://localhost:8080")]
    pub accrual_system_address: String,

    /// Minimum spacing between outbound accrual requests
    #[arg(long, env = "ACCRUAL_REQUEST_INTERVAL_MS", default_value_t = 1000)]
    pub request_interval_ms: u64,

    /// How long a caller waits for its dispatched request
    #[arg(long, env = "ACCRUAL_RESPONSE_TIMEOUT_MS", default_value_t = 5000)]
    pub response_timeout_ms: u64,

    /// Pause after a 429 before the single retry
    #[arg(long, env = "ACCRUAL_THROTTLE_COOLDOWN_MS", default_value_t = 60_000)]
    pub throttle_cooldown_ms: u64,

    /// Number of polling workers
    #[arg(long, env = "ACCRUAL_POLL_WORKERS", default_value_t = 1)]
    pub poll_workers: usize,

    /// Capacity of the queue between registration and polling
    #[arg(long, env = "ACCRUAL_PROCESSING_QUEUE_CAPACITY", default_value_t = 64)]
    pub processing_queue_capacity: usize,

    /// Capacity of the intake queue in front of registration
    #[arg(long, env = "ACCRUAL_INTAKE_CAPACITY", default_value_t = 64)]
    pub intake_capacity: usize,

    /// Minimum time between two polls of the same order (0 = every pass)
    #[arg(long, env = "ACCRUAL_MIN_POLL_INTERVAL_MS", default_value_t = 0)]
    pub min_poll_interval_ms: u64,

    /// Upper bound on the graceful shutdown wait
    #[arg(long, env = "ACCRUAL_SHUTDOWN_TIMEOUT_MS", default_value_t = 5000)]
    pub shutdown_timeout_ms: u64,

    /// How long to keep polling after end of input before shutting down
    #[arg(long, env = "ACCRUAL_DRAIN_TIMEOUT_MS", default_value_t = 300_000)]
    pub drain_timeout_ms: u64,
}

impl Config {
    /// Loads `.env` (if any), then parses flags and environment.
    pub fn load() -> Self {
        let _ = dotenvy::dotenv();
        Self::parse()
    }

    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            request_interval: Duration::from_millis(self.request_interval_ms),
            response_timeout: Duration::from_millis(self.response_timeout_ms),
            throttle_cooldown: Duration::from_millis(self.throttle_cooldown_ms),
            poll_workers: self.poll_workers,
            processing_queue_capacity: self.processing_queue_capacity,
            intake_capacity: self.intake_capacity,
            min_poll_interval: Duration::from_millis(self.min_poll_interval_ms),
            shutdown_timeout: Duration::from_millis(self.shutdown_timeout_ms),
            drain_timeout: Duration::from_millis(self.drain_timeout_ms),
        }
    }
}

/// Tunables consumed by the library.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub request_interval: Duration,
    pub response_timeout: Duration,
    pub throttle_cooldown: Duration,
    pub poll_workers: usize,
    pub processing_queue_capacity: usize,
    pub intake_capacity: usize,
    pub min_poll_interval: Duration,
    pub shutdown_timeout: Duration,
    pub drain_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            request_interval: Duration::from_secs(1),
            response_timeout: Duration::from_secs(5),
            throttle_cooldown: Duration::from_secs(60),
            poll_workers: 1,
            processing_queue_capacity: 64,
            intake_capacity: 64,
            min_poll_interval: Duration::ZERO,
            shutdown_timeout: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(300),
        }
    }
}
