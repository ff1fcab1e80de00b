use crate::protocol::{ResourceLaunchEvent, ResourceReleaseEvent};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Accepts launch requests bound for the resource manager
pub trait ResourceLaunchHandler: Send + Sync {
    fn on_launch(&self, event: ResourceLaunchEvent);
}

/// Accepts release requests bound for the resource manager
///
/// The evaluator core calls this at most once per evaluator.
pub trait ResourceReleaseHandler: Send + Sync {
    fn on_release(&self, event: ResourceReleaseEvent);
}

/// Outbound request to the resource manager
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceRequest {
    Launch(ResourceLaunchEvent),
    Release(ResourceReleaseEvent),
}

impl ResourceRequest {
    pub fn evaluator_id(&self) -> &str {
        match self {
            Self::Launch(event) => &event.evaluator_id,
            Self::Release(event) => &event.evaluator_id,
        }
    }
}

/// Launch and release channel backed by a tokio mpsc queue
///
/// Requests are never awaited. If the resource manager side has gone away the request is
/// logged and dropped.
#[derive(Debug, Clone)]
pub struct ResourceRequestChannel {
    sender: mpsc::UnboundedSender<ResourceRequest>,
}

impl ResourceRequestChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ResourceRequest>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }

    fn forward(&self, request: ResourceRequest) {
        let evaluator_id = request.evaluator_id().to_string();
        match self.sender.send(request) {
            Ok(()) => debug!(evaluator_id = %evaluator_id, "Forwarded resource request"),
            Err(e) => warn!(
                evaluator_id = %evaluator_id,
                request = ?e.0,
                "⚠️ Resource manager channel closed, dropping request"
            ),
        }
    }
}

impl ResourceLaunchHandler for ResourceRequestChannel {
    fn on_launch(&self, event: ResourceLaunchEvent) {
        self.forward(ResourceRequest::Launch(event));
    }
}

impl ResourceReleaseHandler for ResourceRequestChannel {
    fn on_release(&self, event: ResourceReleaseEvent) {
        self.forward(ResourceRequest::Release(event));
    }
}
