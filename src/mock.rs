//! # Test Doubles
//!
//! Utilities for testing pipeline stages without a real accrual service.
//!
//! - [`MockAccrualService`] replaces the whole [`AccrualService`] with a
//!   scripted expectation queue.
//! - [`RecordingTransport`] sits *under* the dispatcher and records when each
//!   call actually started, which is what rate-limit tests assert on.

use crate::clients::{AccrualError, AccrualService};
use crate::dispatcher::{DispatchError, OutboundRequest, OutboundResponse, Transport, TransportError};
use crate::lifecycle::Shutdown;
use crate::model::{AccrualResult, OrderNumber, OrderStatus};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// EXPECTATION BUILDER API
// =============================================================================

#[derive(Debug)]
enum Expectation {
    Register {
        number: OrderNumber,
        response: Result<(), AccrualError>,
    },
    Fetch {
        number: OrderNumber,
        response: FetchResponse,
    },
}

#[derive(Debug)]
enum FetchResponse {
    Ready(Result<AccrualResult, AccrualError>),
    /// Hangs like a call stuck behind the rate gate until shutdown fires.
    UntilCancelled,
}

impl Expectation {
    fn describe(&self) -> String {
        match self {
            Expectation::Register { number, .. } => format!("register {number}"),
            Expectation::Fetch { number, .. } => format!("fetch {number}"),
        }
    }
}

#[derive(Default)]
struct MockState {
    expectations: VecDeque<Expectation>,
    unexpected: Vec<String>,
    register_calls: Vec<OrderNumber>,
    fetch_calls: Vec<OrderNumber>,
}

/// A scripted [`AccrualService`] with expectation tracking.
///
/// Expectations are consumed in the order they were added *per order number
/// and operation*, so calls for different orders may interleave freely.
/// A call with no matching expectation fails with a 500
/// [`AccrualError::UnexpectedStatus`] and is reported by [`verify`](Self::verify).
///
/// # Example
/// ```ignore
/// let mock = MockAccrualService::new();
/// mock.expect_register("18").return_ok();
/// mock.expect_fetch("18").return_status(OrderStatus::Processing, 0.0);
/// mock.expect_fetch("18").return_status(OrderStatus::Processed, 100.0);
///
/// let service: Arc<dyn AccrualService> = Arc::new(mock.clone());
/// // Run the pipeline...
/// mock.verify(); // Ensures all expectations were met
/// ```
#[derive(Clone, Default)]
pub struct MockAccrualService {
    state: Arc<Mutex<MockState>>,
}

impl MockAccrualService {
    /// Creates a new mock with no expectations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Expects a `register_order` call for `number`.
    pub fn expect_register(&self, number: impl Into<OrderNumber>) -> RegisterExpectationBuilder {
        RegisterExpectationBuilder {
            number: number.into(),
            state: self.state.clone(),
        }
    }

    /// Expects a `fetch_accrual_result` call for `number`.
    pub fn expect_fetch(&self, number: impl Into<OrderNumber>) -> FetchExpectationBuilder {
        FetchExpectationBuilder {
            number: number.into(),
            state: self.state.clone(),
        }
    }

    pub fn register_calls(&self) -> Vec<OrderNumber> {
        self.state.lock().unwrap().register_calls.clone()
    }

    pub fn fetch_calls(&self) -> Vec<OrderNumber> {
        self.state.lock().unwrap().fetch_calls.clone()
    }

    /// Verifies that all expectations were met and nothing unexpected was called.
    pub fn verify(&self) {
        let state = self.state.lock().unwrap();
        if !state.unexpected.is_empty() {
            panic!("Unexpected calls: {:?}", state.unexpected);
        }
        if !state.expectations.is_empty() {
            let remaining: Vec<String> = state.expectations.iter().map(Expectation::describe).collect();
            panic!(
                "Not all expectations were met. {} remaining: {:?}",
                remaining.len(),
                remaining
            );
        }
    }

    fn unexpected(state: &mut MockState, call: String) -> AccrualError {
        state.unexpected.push(call.clone());
        AccrualError::UnexpectedStatus {
            status: 500,
            body: format!("unexpected call: {call}"),
        }
    }
}

#[async_trait]
impl AccrualService for MockAccrualService {
    async fn register_order(&self, _shutdown: &Shutdown, number: &OrderNumber) -> Result<(), AccrualError> {
        let mut state = self.state.lock().unwrap();
        state.register_calls.push(number.clone());
        let position = state
            .expectations
            .iter()
            .position(|e| matches!(e, Expectation::Register { number: n, .. } if n == number));
        match position.and_then(|i| state.expectations.remove(i)) {
            Some(Expectation::Register { response, .. }) => response,
            _ => Err(Self::unexpected(&mut state, format!("register {number}"))),
        }
    }

    async fn fetch_accrual_result(
        &self,
        shutdown: &Shutdown,
        number: &OrderNumber,
    ) -> Result<AccrualResult, AccrualError> {
        let response = {
            let mut state = self.state.lock().unwrap();
            state.fetch_calls.push(number.clone());
            let position = state
                .expectations
                .iter()
                .position(|e| matches!(e, Expectation::Fetch { number: n, .. } if n == number));
            match position.and_then(|i| state.expectations.remove(i)) {
                Some(Expectation::Fetch { response, .. }) => response,
                _ => FetchResponse::Ready(Err(Self::unexpected(&mut state, format!("fetch {number}")))),
            }
        };

        match response {
            FetchResponse::Ready(result) => result,
            FetchResponse::UntilCancelled => {
                shutdown.wait().await;
                Err(DispatchError::Cancelled.into())
            }
        }
    }
}

/// Builder for `register_order` expectations.
pub struct RegisterExpectationBuilder {
    number: OrderNumber,
    state: Arc<Mutex<MockState>>,
}

impl RegisterExpectationBuilder {
    pub fn return_ok(self) {
        self.push(Ok(()));
    }

    pub fn return_err(self, error: AccrualError) {
        self.push(Err(error));
    }

    fn push(self, response: Result<(), AccrualError>) {
        let mut state = self.state.lock().unwrap();
        state.expectations.push_back(Expectation::Register {
            number: self.number,
            response,
        });
    }
}

/// Builder for `fetch_accrual_result` expectations.
pub struct FetchExpectationBuilder {
    number: OrderNumber,
    state: Arc<Mutex<MockState>>,
}

impl FetchExpectationBuilder {
    /// Returns a result for the expected order with the given status and accrual.
    pub fn return_status(self, status: OrderStatus, accrual: f64) {
        let result = AccrualResult::new(self.number.clone(), status, accrual);
        self.push(FetchResponse::Ready(Ok(result)));
    }

    pub fn return_err(self, error: AccrualError) {
        self.push(FetchResponse::Ready(Err(error)));
    }

    /// The call never answers; it fails as cancelled once shutdown fires.
    pub fn stall_until_cancelled(self) {
        self.push(FetchResponse::UntilCancelled);
    }

    fn push(self, response: FetchResponse) {
        let mut state = self.state.lock().unwrap();
        state.expectations.push_back(Expectation::Fetch {
            number: self.number,
            response,
        });
    }
}

// =============================================================================
// RECORDING TRANSPORT
// =============================================================================

/// One call observed by [`RecordingTransport`].
#[derive(Debug, Clone)]
pub struct RecordedCall {
    /// When the transport was entered, on the tokio clock.
    pub at: Instant,
    pub request: OutboundRequest,
}

#[derive(Default)]
struct RecordingState {
    calls: Vec<RecordedCall>,
    responses: VecDeque<Result<OutboundResponse, TransportError>>,
}

/// A scripted [`Transport`] that records every call it receives.
///
/// Scripted responses are returned in order; once they run out every call
/// answers `200 OK` with an empty body.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    state: Arc<Mutex<RecordingState>>,
    delay: Duration,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(self, response: OutboundResponse) -> Self {
        self.state.lock().unwrap().responses.push_back(Ok(response));
        self
    }

    pub fn with_error(self, error: TransportError) -> Self {
        self.state.lock().unwrap().responses.push_back(Err(error));
        self
    }

    /// Makes every call take `delay` before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: OutboundRequest) -> Result<OutboundResponse, TransportError> {
        let response = {
            let mut state = self.state.lock().unwrap();
            state.calls.push(RecordedCall {
                at: Instant::now(),
                request,
            });
            state.responses.pop_front()
        };

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        response.unwrap_or_else(|| Ok(OutboundResponse::new(StatusCode::OK, "")))
    }
}
