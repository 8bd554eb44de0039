use crate::dispatcher::{OutboundRequest, OutboundResponse, TransportError};
use tokio::sync::oneshot;

/// Private response slot of one caller.
pub type Response = oneshot::Sender<Result<OutboundResponse, TransportError>>;

/// A queued outbound call waiting for its turn at the gate.
#[derive(Debug)]
pub struct DispatchRequest {
    pub request: OutboundRequest,
    /// Fired when the gate lets the call through; the caller's response
    /// timeout starts here, not at enqueue.
    pub released: oneshot::Sender<()>,
    pub respond_to: Response,
}
