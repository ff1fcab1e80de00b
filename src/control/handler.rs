use super::{ControlError, ControlResult, ControlTransport};
use crate::protocol::EvaluatorControlMessage;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info};

/// Per-evaluator control channel
///
/// Messages can only be sent once the evaluator's first heartbeat has told us where it
/// lives; until then [`send`](Self::send) fails with [`ControlError::RemoteNotBound`].
pub struct EvaluatorControlHandler {
    evaluator_id: String,
    remote_id: Mutex<Option<String>>,
    transport: Arc<dyn ControlTransport>,
}

impl EvaluatorControlHandler {
    pub fn new(evaluator_id: impl Into<String>, transport: Arc<dyn ControlTransport>) -> Self {
        Self {
            evaluator_id: evaluator_id.into(),
            remote_id: Mutex::new(None),
            transport,
        }
    }

    /// Bind the evaluator's transport address
    pub fn set_remote_id(&self, remote_id: impl Into<String>) {
        let remote_id = remote_id.into();
        let mut guard = self.remote_id.lock();
        match guard.as_deref() {
            Some(existing) if existing == remote_id => {}
            Some(existing) => {
                info!(
                    evaluator_id = %self.evaluator_id,
                    previous = %existing,
                    remote_id = %remote_id,
                    "🔁 Rebinding evaluator control channel"
                );
                *guard = Some(remote_id);
            }
            None => {
                debug!(
                    evaluator_id = %self.evaluator_id,
                    remote_id = %remote_id,
                    "Bound evaluator control channel"
                );
                *guard = Some(remote_id);
            }
        }
    }

    pub fn remote_id(&self) -> Option<String> {
        self.remote_id.lock().clone()
    }

    /// Push a control message; fire and forget
    pub fn send(&self, message: &EvaluatorControlMessage) -> ControlResult<()> {
        let remote_id = self
            .remote_id
            .lock()
            .clone()
            .ok_or_else(|| ControlError::RemoteNotBound {
                evaluator_id: self.evaluator_id.clone(),
            })?;
        self.transport.send(&remote_id, message)
    }
}

impl std::fmt::Debug for EvaluatorControlHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EvaluatorControlHandler")
            .field("evaluator_id", &self.evaluator_id)
            .field("remote_id", &self.remote_id.lock())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::MpscControlTransport;

    #[test]
    fn test_send_requires_bound_remote() {
        let (transport, _receiver) = MpscControlTransport::new();
        let handler = EvaluatorControlHandler::new("eval-1", Arc::new(transport));

        let result = handler.send(&EvaluatorControlMessage::kill("eval-1"));
        assert!(matches!(result, Err(ControlError::RemoteNotBound { .. })));
    }

    #[tokio::test]
    async fn test_send_after_binding() {
        let (transport, mut receiver) = MpscControlTransport::new();
        let handler = EvaluatorControlHandler::new("eval-1", Arc::new(transport));
        handler.set_remote_id("remote-a");
        handler.set_remote_id("remote-b");
        assert_eq!(handler.remote_id().as_deref(), Some("remote-b"));

        handler.send(&EvaluatorControlMessage::kill("eval-1")).unwrap();
        assert_eq!(receiver.recv().await.unwrap().remote_id, "remote-b");
    }
}
