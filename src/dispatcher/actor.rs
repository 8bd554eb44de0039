use crate::clients::DispatchClient;
use crate::dispatcher::{DispatchRequest, OutboundRequest, Response, Transport};
use crate::lifecycle::Shutdown;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info};

/// The single gate in front of the accrual service.
///
/// Owns the only rate-limit clock in the process. Requests arrive from any
/// number of [`DispatchClient`] clones through an unbounded queue; the actor
/// releases at most one per `interval` and runs each released call on its own
/// task, so a slow call delays nobody but its own caller.
pub struct DispatcherActor {
    receiver: mpsc::UnboundedReceiver<DispatchRequest>,
    transport: Arc<dyn Transport>,
    interval: Duration,
}

impl DispatcherActor {
    pub fn new(
        transport: Arc<dyn Transport>,
        interval: Duration,
        response_timeout: Duration,
    ) -> (Self, DispatchClient) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let actor = Self {
            receiver,
            transport,
            // tokio intervals cannot have a zero period
            interval: interval.max(Duration::from_millis(1)),
        };
        let client = DispatchClient::new(sender, response_timeout);
        (actor, client)
    }

    /// Runs the gate until every client is dropped or `shutdown` fires.
    ///
    /// Calls already released keep running on their own tasks and deliver to
    /// whichever callers are still waiting.
    pub async fn run(mut self, shutdown: Shutdown) {
        let interval_ms = self.interval.as_millis() as u64;
        info!(interval_ms, "Dispatcher started");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut issued: u64 = 0;
        let mut skipped: u64 = 0;

        loop {
            let msg = tokio::select! {
                _ = shutdown.wait() => break,
                msg = self.receiver.recv() => match msg {
                    Some(msg) => msg,
                    None => break,
                },
            };

            if msg.respond_to.is_closed() {
                debug!(path = %msg.request.path, "Caller gone before release, skipping");
                skipped += 1;
                continue;
            }

            tokio::select! {
                _ = shutdown.wait() => break,
                _ = ticker.tick() => {}
            }

            if msg.respond_to.is_closed() {
                debug!(path = %msg.request.path, "Caller gone while waiting for the gate, skipping");
                skipped += 1;
                continue;
            }

            let DispatchRequest {
                request,
                released,
                respond_to,
            } = msg;
            if released.send(()).is_err() {
                debug!(path = %request.path, "Caller gone at release, skipping");
                skipped += 1;
                continue;
            }
            issued += 1;
            debug!(method = %request.method, path = %request.path, issued, "Released");
            tokio::spawn(execute(self.transport.clone(), request, respond_to));
        }

        info!(issued, skipped, "Dispatcher stopped");
    }
}

async fn execute(transport: Arc<dyn Transport>, request: OutboundRequest, respond_to: Response) {
    let path = request.path.clone();
    let result = transport.send(request).await;
    if respond_to.send(result).is_err() {
        debug!(%path, "Caller gone, response discarded");
    }
}
