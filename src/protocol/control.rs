//! Control messages pushed from the driver to an evaluator.
//!
//! Control is one-way: the driver never waits for an acknowledgment. The evaluator's
//! next heartbeat is the only feedback.

use chrono::Utc;
use serde::{Deserialize, Serialize};

/// Envelope for everything the driver sends to an evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorControlMessage {
    /// Driver clock in milliseconds
    pub timestamp: i64,
    pub evaluator_id: String,
    pub payload: ControlPayload,
}

impl EvaluatorControlMessage {
    /// Kill the evaluator; it exits without sending a confirmation
    pub fn kill(evaluator_id: impl Into<String>) -> Self {
        Self::new(evaluator_id, ControlPayload::KillEvaluator)
    }

    /// Wrap a context control message
    pub fn context_control(evaluator_id: impl Into<String>, message: ContextControlMessage) -> Self {
        Self::new(evaluator_id, ControlPayload::ContextControl(message))
    }

    fn new(evaluator_id: impl Into<String>, payload: ControlPayload) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis(),
            evaluator_id: evaluator_id.into(),
            payload,
        }
    }

    pub fn is_kill(&self) -> bool {
        matches!(self.payload, ControlPayload::KillEvaluator)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ControlPayload {
    KillEvaluator,
    ContextControl(ContextControlMessage),
}

/// Operations on the evaluator's context stack and its task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ContextControlMessage {
    /// Stack a new context on top of `parent_context_id`
    AddContext {
        parent_context_id: String,
        configuration: String,
    },
    /// Pop a context off the stack
    RemoveContext { context_id: String },
    /// Launch a task in the given context
    StartTask {
        context_id: String,
        configuration: String,
    },
    /// Ask the running task to stop
    StopTask {
        #[serde(default)]
        message: Option<Vec<u8>>,
    },
    /// Ask the running task to suspend
    SuspendTask {
        #[serde(default)]
        message: Option<Vec<u8>>,
    },
    /// Deliver a message to the running task
    TaskMessage { message: Vec<u8> },
    /// Deliver a message to a context
    ContextMessage { context_id: String, message: Vec<u8> },
}
