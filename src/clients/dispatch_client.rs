use crate::dispatcher::{DispatchError, DispatchRequest, OutboundRequest, OutboundResponse, TransportError};
use crate::lifecycle::Shutdown;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time;

/// Client for the [`DispatcherActor`](crate::dispatcher::DispatcherActor).
///
/// Cloning is cheap; every clone feeds the same gate.
#[derive(Clone)]
pub struct DispatchClient {
    sender: mpsc::UnboundedSender<DispatchRequest>,
    response_timeout: Duration,
}

impl DispatchClient {
    pub fn new(sender: mpsc::UnboundedSender<DispatchRequest>, response_timeout: Duration) -> Self {
        Self {
            sender,
            response_timeout,
        }
    }

    /// Queues `request` behind the rate gate and waits for its response.
    ///
    /// Waiting in the queue is unbounded and ends only on release or
    /// `shutdown`. Once the gate releases the call, the response timeout
    /// applies. Giving up (timeout or cancellation) drops the response slot,
    /// so the dispatcher either skips the request or discards its late result
    /// without blocking.
    pub async fn dispatch(
        &self,
        shutdown: &Shutdown,
        request: OutboundRequest,
    ) -> Result<OutboundResponse, DispatchError> {
        if shutdown.is_triggered() {
            return Err(DispatchError::Cancelled);
        }

        let (released, release) = oneshot::channel();
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(DispatchRequest {
                request,
                released,
                respond_to,
            })
            .map_err(|_| DispatchError::DispatcherClosed)?;

        tokio::select! {
            _ = shutdown.wait() => Err(DispatchError::Cancelled),
            result = self.await_response(release, response) => result,
        }
    }

    async fn await_response(
        &self,
        release: oneshot::Receiver<()>,
        response: oneshot::Receiver<Result<OutboundResponse, TransportError>>,
    ) -> Result<OutboundResponse, DispatchError> {
        release.await.map_err(|_| DispatchError::DispatcherDropped)?;
        match time::timeout(self.response_timeout, response).await {
            Err(_) => Err(DispatchError::Timeout(self.response_timeout)),
            Ok(Err(_)) => Err(DispatchError::DispatcherDropped),
            Ok(Ok(outcome)) => outcome.map_err(DispatchError::from),
        }
    }
}
