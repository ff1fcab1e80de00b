//! Heartbeat messages pushed from evaluators to the driver.
//!
//! Heartbeats are delivered asynchronously and may be lost. Every part except the
//! timestamp is optional: an evaluator reports only what changed.

use crate::state_machine::ReportedState;
use serde::{Deserialize, Serialize};

/// A message together with the transport address of its sender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteMessage<T> {
    /// Transport address the driver uses to reach the sender
    pub sender: String,
    pub message: T,
}

impl<T> RemoteMessage<T> {
    pub fn new(sender: impl Into<String>, message: T) -> Self {
        Self {
            sender: sender.into(),
            message,
        }
    }
}

/// Periodic status push from an evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorHeartbeat {
    pub evaluator_id: String,

    /// Sender clock in milliseconds
    pub timestamp: i64,

    #[serde(default)]
    pub evaluator_status: Option<EvaluatorStatus>,

    #[serde(default)]
    pub context_status: Vec<ContextStatus>,

    /// Present whenever a task exists on the evaluator
    #[serde(default)]
    pub task_status: Option<TaskStatus>,
}

impl EvaluatorHeartbeat {
    pub fn new(evaluator_id: impl Into<String>, timestamp: i64) -> Self {
        Self {
            evaluator_id: evaluator_id.into(),
            timestamp,
            evaluator_status: None,
            context_status: Vec::new(),
            task_status: None,
        }
    }

    pub fn with_evaluator_status(mut self, status: EvaluatorStatus) -> Self {
        self.evaluator_status = Some(status);
        self
    }

    pub fn with_context_status(mut self, status: ContextStatus) -> Self {
        self.context_status.push(status);
        self
    }

    pub fn with_task_status(mut self, status: TaskStatus) -> Self {
        self.task_status = Some(status);
        self
    }
}

/// Evaluator-level status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorStatus {
    pub state: ReportedState,

    /// Encoded exception, only meaningful with `Failed`
    #[serde(default)]
    pub error: Option<Vec<u8>>,
}

impl EvaluatorStatus {
    pub fn new(state: ReportedState) -> Self {
        Self { state, error: None }
    }

    pub fn failed(error: Option<Vec<u8>>) -> Self {
        Self {
            state: ReportedState::Failed,
            error,
        }
    }
}

/// Lifecycle state of a context as reported by the evaluator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextState {
    Ready,
    Done,
    Fail,
}

/// Status of one context on the evaluator's context stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextStatus {
    pub context_id: String,

    /// Absent for the root context
    #[serde(default)]
    pub parent_id: Option<String>,

    pub state: ContextState,

    #[serde(default)]
    pub error: Option<Vec<u8>>,

    #[serde(default)]
    pub messages: Vec<SourcedMessage>,
}

impl ContextStatus {
    pub fn new(context_id: impl Into<String>, state: ContextState) -> Self {
        Self {
            context_id: context_id.into(),
            parent_id: None,
            state,
            error: None,
            messages: Vec::new(),
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_error(mut self, error: Vec<u8>) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_message(mut self, source_id: impl Into<String>, message: Vec<u8>) -> Self {
        self.messages.push(SourcedMessage::new(source_id, message));
        self
    }
}

/// Status of the task currently on the evaluator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub task_id: String,
    pub context_id: String,
    pub state: ReportedState,

    /// Task return value, suspend memento or encoded exception, depending on `state`
    #[serde(default)]
    pub result: Option<Vec<u8>>,

    #[serde(default)]
    pub messages: Vec<SourcedMessage>,
}

impl TaskStatus {
    pub fn new(
        task_id: impl Into<String>,
        context_id: impl Into<String>,
        state: ReportedState,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            context_id: context_id.into(),
            state,
            result: None,
            messages: Vec::new(),
        }
    }

    pub fn with_result(mut self, result: Vec<u8>) -> Self {
        self.result = Some(result);
        self
    }

    pub fn with_message(mut self, source_id: impl Into<String>, message: Vec<u8>) -> Self {
        self.messages.push(SourcedMessage::new(source_id, message));
        self
    }
}

/// An application message tagged with the id of the component that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourcedMessage {
    pub source_id: String,
    pub message: Vec<u8>,
}

impl SourcedMessage {
    pub fn new(source_id: impl Into<String>, message: Vec<u8>) -> Self {
        Self {
            source_id: source_id.into(),
            message,
        }
    }
}
