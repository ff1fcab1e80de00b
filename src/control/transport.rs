use super::{ControlError, ControlResult};
use crate::protocol::EvaluatorControlMessage;
use tokio::sync::mpsc;
use tracing::trace;

/// One-way delivery of control messages to a remote evaluator
pub trait ControlTransport: Send + Sync {
    /// Push a message to the evaluator reachable at `remote_id`; never waits for an ack
    fn send(&self, remote_id: &str, message: &EvaluatorControlMessage) -> ControlResult<()>;
}

/// A serialized control message ready for the network layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundControl {
    pub remote_id: String,
    pub payload: Vec<u8>,
}

/// Control transport that hands JSON-encoded messages to a tokio channel
///
/// The receiving half is owned by whatever network layer actually talks to evaluators.
/// Messages for one destination keep their send order.
#[derive(Debug, Clone)]
pub struct MpscControlTransport {
    sender: mpsc::UnboundedSender<OutboundControl>,
}

impl MpscControlTransport {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<OutboundControl>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl ControlTransport for MpscControlTransport {
    fn send(&self, remote_id: &str, message: &EvaluatorControlMessage) -> ControlResult<()> {
        let payload = serde_json::to_vec(message)?;
        trace!(
            remote_id = %remote_id,
            evaluator_id = %message.evaluator_id,
            bytes = payload.len(),
            "Queueing control message"
        );
        self.sender
            .send(OutboundControl {
                remote_id: remote_id.to_string(),
                payload,
            })
            .map_err(|_| ControlError::ChannelClosed {
                channel: "control".to_string(),
            })
    }
}
