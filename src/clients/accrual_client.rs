use crate::clients::{AccrualError, DispatchClient};
use crate::dispatcher::{DispatchError, OutboundRequest, OutboundResponse};
use crate::lifecycle::Shutdown;
use crate::model::{AccrualResult, AccrualStatus, OrderNumber};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// The two operations the pipeline needs from the accrual service.
///
/// Both are safe to repeat: registering an order twice is not an error, and
/// fetching a result has no side effects upstream.
#[async_trait]
pub trait AccrualService: Send + Sync {
    /// Registers an order for calculation. "Accepted" and "already registered"
    /// are both success.
    async fn register_order(&self, shutdown: &Shutdown, number: &OrderNumber) -> Result<(), AccrualError>;

    /// Fetches the current calculation state of an order.
    async fn fetch_accrual_result(
        &self,
        shutdown: &Shutdown,
        number: &OrderNumber,
    ) -> Result<AccrualResult, AccrualError>;
}

/// Body of `GET /api/orders/{number}`.
#[derive(Debug, Deserialize)]
struct AccrualResponse {
    status: AccrualStatus,
    #[serde(default)]
    accrual: f64,
}

/// HTTP client for the accrual service, routed through the rate-limited dispatcher.
#[derive(Clone)]
pub struct AccrualClient {
    dispatcher: DispatchClient,
    throttle_cooldown: Duration,
}

impl AccrualClient {
    pub fn new(dispatcher: DispatchClient, throttle_cooldown: Duration) -> Self {
        Self {
            dispatcher,
            throttle_cooldown,
        }
    }

    fn decode(number: &OrderNumber, response: &OutboundResponse) -> Result<AccrualResult, AccrualError> {
        let body: AccrualResponse = serde_json::from_str(&response.body)?;
        if !body.accrual.is_finite() || body.accrual < 0.0 {
            return Err(AccrualError::Decode(format!(
                "accrual must be a non-negative number, got {}",
                body.accrual
            )));
        }
        Ok(AccrualResult::new(number.clone(), body.status.into(), body.accrual))
    }
}

#[async_trait]
impl AccrualService for AccrualClient {
    #[instrument(skip(self, shutdown), fields(order = %number))]
    async fn register_order(&self, shutdown: &Shutdown, number: &OrderNumber) -> Result<(), AccrualError> {
        let request = OutboundRequest::post_json("/api/orders", json!({ "order": number }));
        let response = self.dispatcher.dispatch(shutdown, request).await?;

        match response.status {
            StatusCode::ACCEPTED => {
                info!("Order registered");
                Ok(())
            }
            StatusCode::CONFLICT => {
                info!("Order already registered");
                Ok(())
            }
            status => {
                warn!(status = status.as_u16(), body = %response.body, "Registration rejected");
                Err(AccrualError::Rejected {
                    status: status.as_u16(),
                    body: response.body,
                })
            }
        }
    }

    #[instrument(skip(self, shutdown), fields(order = %number))]
    async fn fetch_accrual_result(
        &self,
        shutdown: &Shutdown,
        number: &OrderNumber,
    ) -> Result<AccrualResult, AccrualError> {
        let path = format!("/api/orders/{number}");
        let mut cooled_down = false;

        loop {
            let response = self
                .dispatcher
                .dispatch(shutdown, OutboundRequest::get(path.as_str()))
                .await?;

            match response.status {
                StatusCode::OK => {
                    let result = Self::decode(number, &response)?;
                    debug!(status = %result.status, accrual = result.accrual, "Accrual result");
                    return Ok(result);
                }
                StatusCode::TOO_MANY_REQUESTS if !cooled_down => {
                    let cooldown_ms = self.throttle_cooldown.as_millis() as u64;
                    warn!(cooldown_ms, "Throttled by accrual service, cooling down");
                    tokio::select! {
                        _ = shutdown.wait() => return Err(DispatchError::Cancelled.into()),
                        _ = tokio::time::sleep(self.throttle_cooldown) => {}
                    }
                    cooled_down = true;
                }
                StatusCode::TOO_MANY_REQUESTS => {
                    warn!("Still throttled after cooldown");
                    return Err(AccrualError::Throttled);
                }
                status => {
                    warn!(status = status.as_u16(), body = %response.body, "Unexpected accrual response");
                    return Err(AccrualError::UnexpectedStatus {
                        status: status.as_u16(),
                        body: response.body,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{self, TransportError};
    use crate::lifecycle::{shutdown, ShutdownTrigger};
    use crate::mock::RecordingTransport;
    use crate::model::OrderStatus;
    use reqwest::Method;
    use std::sync::Arc;

    const INTERVAL: Duration = Duration::from_millis(100);
    const COOLDOWN: Duration = Duration::from_secs(60);

    fn client_over(transport: &RecordingTransport) -> (AccrualClient, ShutdownTrigger, Shutdown) {
        let (actor, dispatch_client) = dispatcher::new(
            Arc::new(transport.clone()),
            INTERVAL,
            Duration::from_secs(5),
        );
        let (trigger, shutdown) = shutdown::channel();
        tokio::spawn(actor.run(shutdown.clone()));
        (AccrualClient::new(dispatch_client, COOLDOWN), trigger, shutdown)
    }

    #[tokio::test(start_paused = true)]
    async fn register_posts_order_and_accepts_conflict() {
        let transport = RecordingTransport::new()
            .with_response(OutboundResponse::new(StatusCode::ACCEPTED, ""))
            .with_response(OutboundResponse::new(StatusCode::CONFLICT, "already registered"));
        let (client, _trigger, shutdown) = client_over(&transport);
        let number = OrderNumber::from("79927398713");

        client.register_order(&shutdown, &number).await.unwrap();
        client.register_order(&shutdown, &number).await.unwrap();

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].request.method, Method::POST);
        assert_eq!(calls[0].request.path, "/api/orders");
        assert_eq!(calls[0].request.body, Some(json!({ "order": "79927398713" })));
    }

    #[tokio::test(start_paused = true)]
    async fn register_rejects_other_statuses_including_throttling() {
        let transport = RecordingTransport::new()
            .with_response(OutboundResponse::new(StatusCode::BAD_REQUEST, "bad order"))
            .with_response(OutboundResponse::new(StatusCode::TOO_MANY_REQUESTS, "slow down"));
        let (client, _trigger, shutdown) = client_over(&transport);
        let number = OrderNumber::from("79927398713");

        let err = client.register_order(&shutdown, &number).await.unwrap_err();
        assert_eq!(
            err,
            AccrualError::Rejected {
                status: 400,
                body: "bad order".into()
            }
        );
        let err = client.register_order(&shutdown, &number).await.unwrap_err();
        assert!(matches!(err, AccrualError::Rejected { status: 429, .. }));
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_maps_service_statuses() {
        let transport = RecordingTransport::new()
            .with_response(OutboundResponse::new(
                StatusCode::OK,
                r#"{"order":"18","status":"REGISTERED"}"#,
            ))
            .with_response(OutboundResponse::new(
                StatusCode::OK,
                r#"{"order":"18","status":"PROCESSED","accrual":729.98}"#,
            ));
        let (client, _trigger, shutdown) = client_over(&transport);
        let number = OrderNumber::from("18");

        let first = client.fetch_accrual_result(&shutdown, &number).await.unwrap();
        assert_eq!(first, AccrualResult::new("18", OrderStatus::New, 0.0));

        let second = client.fetch_accrual_result(&shutdown, &number).await.unwrap();
        assert_eq!(second, AccrualResult::new("18", OrderStatus::Processed, 729.98));
        assert_eq!(transport.calls()[0].request.path, "/api/orders/18");
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_rejects_malformed_and_negative_bodies() {
        let transport = RecordingTransport::new()
            .with_response(OutboundResponse::new(StatusCode::OK, "not json"))
            .with_response(OutboundResponse::new(
                StatusCode::OK,
                r#"{"order":"18","status":"PROCESSED","accrual":-5}"#,
            ))
            .with_response(OutboundResponse::new(StatusCode::NO_CONTENT, ""));
        let (client, _trigger, shutdown) = client_over(&transport);
        let number = OrderNumber::from("18");

        for _ in 0..2 {
            let err = client.fetch_accrual_result(&shutdown, &number).await.unwrap_err();
            assert!(matches!(err, AccrualError::Decode(_)), "got {err:?}");
        }
        let err = client.fetch_accrual_result(&shutdown, &number).await.unwrap_err();
        assert!(matches!(err, AccrualError::UnexpectedStatus { status: 204, .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_fetch_cools_down_and_retries_once() {
        let transport = RecordingTransport::new()
            .with_response(OutboundResponse::new(StatusCode::TOO_MANY_REQUESTS, ""))
            .with_response(OutboundResponse::new(
                StatusCode::OK,
                r#"{"order":"18","status":"PROCESSING"}"#,
            ));
        let (client, _trigger, shutdown) = client_over(&transport);

        let result = client
            .fetch_accrual_result(&shutdown, &OrderNumber::from("18"))
            .await
            .unwrap();
        assert_eq!(result.status, OrderStatus::Processing);

        let calls = transport.calls();
        assert_eq!(calls.len(), 2);
        assert!(calls[1].at - calls[0].at >= COOLDOWN);
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_twice_gives_up() {
        let transport = RecordingTransport::new()
            .with_response(OutboundResponse::new(StatusCode::TOO_MANY_REQUESTS, ""))
            .with_response(OutboundResponse::new(StatusCode::TOO_MANY_REQUESTS, ""));
        let (client, _trigger, shutdown) = client_over(&transport);

        let err = client
            .fetch_accrual_result(&shutdown, &OrderNumber::from("18"))
            .await
            .unwrap_err();
        assert_eq!(err, AccrualError::Throttled);
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_races_shutdown() {
        let transport = RecordingTransport::new()
            .with_response(OutboundResponse::new(StatusCode::TOO_MANY_REQUESTS, ""));
        let (client, trigger, shutdown) = client_over(&transport);

        let call = {
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                client
                    .fetch_accrual_result(&shutdown, &OrderNumber::from("18"))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_secs(1)).await;
        trigger.trigger();

        let err = call.await.unwrap().unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_are_returned() {
        let transport = RecordingTransport::new()
            .with_error(TransportError::Request("connection reset".into()));
        let (client, _trigger, shutdown) = client_over(&transport);

        let err = client
            .fetch_accrual_result(&shutdown, &OrderNumber::from("18"))
            .await
            .unwrap_err();
        assert_eq!(
            err,
            AccrualError::Dispatch(DispatchError::Transport(TransportError::Request(
                "connection reset".into()
            )))
        );
        assert!(!err.is_cancelled());
    }
}
